//! Dense matrix with pluggable storage backends.
//!
//! A [`DenseMatrix`] is a 2-D grid of composite elements (N channels of a
//! base type) with an explicit row stride, backed either by refcounted heap
//! storage or by a non-owning view of host memory. Region-of-interest views
//! share the parent's stride, so a column-narrowed view is no longer
//! contiguous and cannot be handed back to the host without a packing copy.

use std::ops::Range;
use std::sync::Arc;

use crate::elem::{DataType, MatType};
use crate::error::{Error, Result};

/// Native element types that can back a matrix.
pub trait Element: bytemuck::Pod {
    /// Tag for this element type.
    const DATA_TYPE: DataType;
}

impl Element for u8 {
    const DATA_TYPE: DataType = DataType::U8;
}
impl Element for i8 {
    const DATA_TYPE: DataType = DataType::I8;
}
impl Element for u16 {
    const DATA_TYPE: DataType = DataType::U16;
}
impl Element for i16 {
    const DATA_TYPE: DataType = DataType::I16;
}
impl Element for i32 {
    const DATA_TYPE: DataType = DataType::I32;
}
impl Element for f32 {
    const DATA_TYPE: DataType = DataType::F32;
}
impl Element for f64 {
    const DATA_TYPE: DataType = DataType::F64;
}

/// Storage backend for matrix data
#[derive(Debug, Clone)]
pub enum MatStorage {
    /// Refcounted heap allocation; views share the buffer through the Arc
    Heap {
        /// Backing buffer
        buf: Arc<Vec<u8>>,
        /// Byte offset of the first element within the buffer
        offset: usize,
    },

    /// Non-owning view of memory owned by the host
    Borrowed {
        /// Address of the first element
        ptr: *const u8,
        /// Length of the view in bytes
        len: usize,
    },
}

// Borrowed storage is a read-only view; whoever constructed it vouches for
// the pointer (see `DenseMatrix::from_raw_parts`).
unsafe impl Send for MatStorage {}
unsafe impl Sync for MatStorage {}

/// Dense 2-D matrix of composite elements.
///
/// Invariant: `step >= cols * elem_bytes`; the matrix is contiguous exactly
/// when they are equal and only contiguous matrices can be exported.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    mat_type: MatType,
    /// Row stride in bytes
    step: usize,
    storage: MatStorage,
}

impl DenseMatrix {
    /// Build a contiguous matrix from typed element data.
    ///
    /// `data.len()` must equal `rows * cols * channels`.
    pub fn from_vec<T: Element>(
        data: Vec<T>,
        rows: usize,
        cols: usize,
        channels: usize,
    ) -> Result<DenseMatrix> {
        let expected = rows * cols * channels;
        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected: expected * std::mem::size_of::<T>(),
                actual: std::mem::size_of_val(&data[..]),
            });
        }
        let bytes: Vec<u8> = bytemuck::cast_slice(&data).to_vec();
        Self::from_bytes(bytes, rows, cols, MatType::new(T::DATA_TYPE, channels)?)
    }

    /// Build a contiguous matrix from raw bytes with an explicit type tag.
    pub fn from_bytes(
        bytes: Vec<u8>,
        rows: usize,
        cols: usize,
        mat_type: MatType,
    ) -> Result<DenseMatrix> {
        let row_bytes = cols * mat_type.elem_bytes();
        let expected = rows * row_bytes;
        if bytes.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(DenseMatrix {
            rows,
            cols,
            mat_type,
            step: row_bytes,
            storage: MatStorage::Heap {
                buf: Arc::new(bytes),
                offset: 0,
            },
        })
    }

    /// Build a contiguous non-owning view over host memory.
    ///
    /// # Safety
    ///
    /// `ptr` must point to readable memory of at least
    /// `rows * cols * channels * elem_bytes` bytes that stays valid and
    /// unmodified for the lifetime of the returned matrix and every view
    /// derived from it.
    pub unsafe fn from_raw_parts(
        ptr: *const u8,
        rows: usize,
        cols: usize,
        mat_type: MatType,
    ) -> Result<DenseMatrix> {
        if ptr.is_null() {
            return Err(Error::InvalidShape(vec![rows, cols]));
        }
        let row_bytes = cols * mat_type.elem_bytes();
        Ok(DenseMatrix {
            rows,
            cols,
            mat_type,
            step: row_bytes,
            storage: MatStorage::Borrowed {
                ptr,
                len: rows * row_bytes,
            },
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Composite element tag
    pub fn mat_type(&self) -> MatType {
        self.mat_type
    }

    /// Channel count
    pub fn channels(&self) -> usize {
        self.mat_type.channels()
    }

    /// Row stride in bytes
    pub fn step(&self) -> usize {
        self.step
    }

    /// Packed width of one row in bytes
    pub fn row_bytes(&self) -> usize {
        self.cols * self.mat_type.elem_bytes()
    }

    /// Total element count (rows x cols x channels)
    pub fn elem_count(&self) -> usize {
        self.rows * self.cols * self.mat_type.channels()
    }

    /// True when rows are packed back-to-back with no stride padding
    pub fn is_contiguous(&self) -> bool {
        self.step == self.row_bytes()
    }

    /// Bytes covered by this matrix, from the first element to the end of
    /// the last row. Strided views do not include the tail padding of the
    /// final row.
    fn span(&self) -> usize {
        if self.rows == 0 || self.cols == 0 {
            return 0;
        }
        self.step * (self.rows - 1) + self.row_bytes()
    }

    /// Raw view of the covered bytes, including any inter-row padding.
    pub fn data(&self) -> &[u8] {
        let span = self.span();
        match &self.storage {
            MatStorage::Heap { buf, offset } => &buf[*offset..*offset + span],
            // Validity of the pointer was promised at construction.
            MatStorage::Borrowed { ptr, .. } => unsafe {
                std::slice::from_raw_parts(*ptr, span)
            },
        }
    }

    /// Packed bytes of a single row.
    pub fn row(&self, r: usize) -> Result<&[u8]> {
        if r >= self.rows {
            return Err(Error::InvalidShape(vec![r, self.cols]));
        }
        let start = r * self.step;
        Ok(&self.data()[start..start + self.row_bytes()])
    }

    /// Typed view of contiguous storage.
    ///
    /// Fails when the matrix is strided, when `T` disagrees with the base
    /// element type, or when the storage is not aligned for `T`.
    pub fn as_slice_of<T: Element>(&self) -> Result<&[T]> {
        if !self.is_contiguous() {
            return Err(Error::NonContiguous {
                step: self.step,
                row_bytes: self.row_bytes(),
            });
        }
        if T::DATA_TYPE != self.mat_type.base() {
            return Err(Error::UnsupportedElementType(self.mat_type.base()));
        }
        bytemuck::try_cast_slice(self.data()).map_err(|e| Error::Cast(e.to_string()))
    }

    /// Region-of-interest view sharing this matrix's storage and stride.
    ///
    /// A view over a narrowed column range keeps the parent's step and is
    /// therefore non-contiguous.
    pub fn roi(&self, rows: Range<usize>, cols: Range<usize>) -> Result<DenseMatrix> {
        if rows.start > rows.end
            || cols.start > cols.end
            || rows.end > self.rows
            || cols.end > self.cols
        {
            return Err(Error::InvalidShape(vec![
                rows.start, rows.end, cols.start, cols.end,
            ]));
        }
        let byte_off = rows.start * self.step + cols.start * self.mat_type.elem_bytes();
        let storage = match &self.storage {
            MatStorage::Heap { buf, offset } => MatStorage::Heap {
                buf: Arc::clone(buf),
                offset: offset + byte_off,
            },
            MatStorage::Borrowed { ptr, len } => MatStorage::Borrowed {
                // Stays inside the parent view; same validity contract.
                ptr: unsafe { ptr.add(byte_off) },
                len: len.saturating_sub(byte_off),
            },
        };
        Ok(DenseMatrix {
            rows: rows.end - rows.start,
            cols: cols.end - cols.start,
            mat_type: self.mat_type,
            step: self.step,
            storage,
        })
    }

    /// Deep copy into fresh owned, contiguous storage.
    ///
    /// Works on strided views; this is the packing step that makes an
    /// arbitrary view exportable.
    pub fn clone_contiguous(&self) -> DenseMatrix {
        let row_bytes = self.row_bytes();
        let mut bytes = Vec::with_capacity(self.rows * row_bytes);
        let data = self.data();
        for r in 0..self.rows {
            let start = r * self.step;
            bytes.extend_from_slice(&data[start..start + row_bytes]);
        }
        tracing::trace!(
            rows = self.rows,
            cols = self.cols,
            "packed matrix into contiguous storage"
        );
        DenseMatrix {
            rows: self.rows,
            cols: self.cols,
            mat_type: self.mat_type,
            step: row_bytes,
            storage: MatStorage::Heap {
                buf: Arc::new(bytes),
                offset: 0,
            },
        }
    }
}
