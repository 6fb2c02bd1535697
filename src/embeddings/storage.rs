//! Dense row-major storage for embedding vectors.

use std::sync::Arc;

use memmap2::Mmap;

use super::error::{LoadError, Result};

/// A `rows x dims` matrix of f32 values, row-major.
///
/// Backed either by an owned heap allocation or by a view into a shared
/// file mapping. Row access is zero-copy in both cases; the returned slice
/// borrows from the matrix and lives as long as the owning aggregate.
#[derive(Debug)]
pub enum EmbeddingMatrix {
    Owned(OwnedMatrix),
    Mapped(MappedMatrix),
}

impl EmbeddingMatrix {
    pub fn rows(&self) -> usize {
        match self {
            EmbeddingMatrix::Owned(m) => m.rows,
            EmbeddingMatrix::Mapped(m) => m.rows,
        }
    }

    pub fn dims(&self) -> usize {
        match self {
            EmbeddingMatrix::Owned(m) => m.dims,
            EmbeddingMatrix::Mapped(m) => m.dims,
        }
    }

    /// Borrow row `index` as a slice of `dims` floats.
    ///
    /// All indices originate from the vocabulary's validated range, so an
    /// out-of-range index is a programming error, not a recoverable
    /// condition.
    pub fn row(&self, index: usize) -> &[f32] {
        assert!(index < self.rows(), "matrix row {index} out of range");
        let dims = self.dims();
        match self {
            EmbeddingMatrix::Owned(m) => &m.data[index * dims..(index + 1) * dims],
            EmbeddingMatrix::Mapped(m) => {
                let floats: &[f32] = bytemuck::cast_slice(m.float_bytes());
                &floats[index * dims..(index + 1) * dims]
            }
        }
    }
}

/// Matrix held in an owned heap allocation.
#[derive(Debug)]
pub struct OwnedMatrix {
    data: Vec<f32>,
    rows: usize,
    dims: usize,
}

impl OwnedMatrix {
    pub fn new(data: Vec<f32>, rows: usize, dims: usize) -> Self {
        assert_eq!(data.len(), rows * dims, "matrix data length mismatch");
        OwnedMatrix { data, rows, dims }
    }
}

/// Matrix viewed in place through a shared, page-aligned file mapping.
///
/// The mapping is reference-counted: it stays alive until the last matrix
/// (or other holder) referencing it is dropped.
#[derive(Debug)]
pub struct MappedMatrix {
    map: Arc<Mmap>,
    /// Byte offset of the first float within the mapping.
    offset: usize,
    rows: usize,
    dims: usize,
}

impl MappedMatrix {
    /// Validate bounds and alignment, then bind a float view over
    /// `rows x dims` little-endian f32 values starting at `offset`.
    pub fn new(map: Arc<Mmap>, offset: usize, rows: usize, dims: usize) -> Result<Self> {
        if cfg!(target_endian = "big") {
            // On-disk floats are little-endian; an in-place view would
            // reinterpret them with the wrong byte order.
            return Err(LoadError::UnsupportedFormat(
                "memory-mapped loading requires a little-endian host".to_string(),
            ));
        }
        let len = rows
            .checked_mul(dims)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| LoadError::MalformedHeader("matrix size overflow".to_string()))?;
        let available = map.len().saturating_sub(offset);
        if available < len {
            return Err(LoadError::TruncatedInput {
                context: "mapped matrix data",
                needed: len as u64,
                available: available as u64,
            });
        }
        let matrix = MappedMatrix {
            map,
            offset,
            rows,
            dims,
        };
        // The mapping itself is page-aligned, so only the in-file offset
        // can misalign the float view.
        if bytemuck::try_cast_slice::<u8, f32>(matrix.float_bytes()).is_err() {
            return Err(LoadError::MalformedHeader(
                "matrix data is not aligned for zero-copy access".to_string(),
            ));
        }
        Ok(matrix)
    }

    fn float_bytes(&self) -> &[u8] {
        &self.map[self.offset..self.offset + self.rows * self.dims * 4]
    }
}
