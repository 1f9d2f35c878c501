//! Buffer import/export across the host boundary.
//!
//! Import wraps an opaque host buffer descriptor (format code, shape, data
//! pointer) as a non-owning [`DenseMatrix`] view. Export goes the other
//! way: the matrix's storage is duplicated onto the heap and handed to the
//! host under a release-once [`Capsule`], so the memory outlives the host's
//! last reference and is freed exactly once.

use std::fmt;

use hostbridge_core::{DataType, DenseMatrix, Error, MatType};

use crate::error::{MarshalError, Result};

/// Opaque description of a host-owned buffer.
///
/// The descriptor does not own the memory it points at; the construction
/// site carries the validity contract.
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    format: String,
    shape: Vec<usize>,
    data: *const u8,
}

impl BufferDescriptor {
    /// Describe a host buffer.
    ///
    /// # Safety
    ///
    /// `data` must point to readable memory covering the described shape
    /// (product of `shape` entries times the format's element width) and
    /// must stay valid and unmodified for as long as any matrix imported
    /// from this descriptor is alive.
    pub unsafe fn from_raw_parts(
        format: impl Into<String>,
        shape: Vec<usize>,
        data: *const u8,
    ) -> BufferDescriptor {
        BufferDescriptor {
            format: format.into(),
            shape,
            data,
        }
    }

    /// Per-element format string
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Buffer shape, one entry per dimension
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Address of the first element
    pub fn data(&self) -> *const u8 {
        self.data
    }
}

/// Split a descriptor shape into (rows, cols, channels).
///
/// The first two entries become rows and columns; a third becomes the
/// channel count. Rank 1 gets a single column, rank 0 and rank > 3 are
/// outside the supported family.
pub(crate) fn split_shape(shape: &[usize]) -> Result<(usize, usize, usize)> {
    match *shape {
        [rows] => Ok((rows, 1, 1)),
        [rows, cols] => Ok((rows, cols, 1)),
        [rows, cols, channels] => Ok((rows, cols, channels)),
        _ => Err(MarshalError::UnsupportedRank(shape.len())),
    }
}

fn descriptor_type(desc: &BufferDescriptor, channels: usize) -> Result<MatType> {
    let base = match desc.format.chars().next() {
        Some(code) => DataType::from_format_char(code),
        // an absent format code gets the same default as an unmapped one
        None => DataType::U8,
    };
    Ok(MatType::new(base, channels)?)
}

/// Import a host buffer as a non-owning matrix view.
///
/// The result borrows the descriptor's memory; it is valid for as long as
/// the descriptor's construction contract holds. Rows and columns come
/// from the first two shape entries, the optional third entry becomes the
/// channel count, and the format code selects the element type with an
/// 8-bit unsigned fallback.
pub fn import_buffer(desc: &BufferDescriptor) -> Result<DenseMatrix> {
    let (rows, cols, channels) = split_shape(&desc.shape)?;
    let mat_type = descriptor_type(desc, channels)?;
    tracing::debug!(
        rows,
        cols,
        channels,
        dtype = mat_type.base().name(),
        "importing host buffer"
    );
    // the descriptor's construction site vouches for the pointer
    let mat = unsafe { DenseMatrix::from_raw_parts(desc.data, rows, cols, mat_type)? };
    Ok(mat)
}

/// Import a host buffer, materializing an owned copy of its contents.
///
/// For callers that must not retain the host pointer past the call.
pub fn import_buffer_copied(desc: &BufferDescriptor) -> Result<DenseMatrix> {
    let view = import_buffer(desc)?;
    Ok(view.clone_contiguous())
}

/// Release-once wrapper pairing a heap-duplicated matrix with its release
/// action.
///
/// Releasing drops the payload exactly once; further releases (or the
/// wrapper's own drop) are no-ops. An optional hook observes the release
/// for instrumentation.
pub struct Capsule {
    payload: Option<Box<DenseMatrix>>,
    hook: Option<Box<dyn FnOnce() + Send>>,
}

impl Capsule {
    fn new(payload: DenseMatrix) -> Capsule {
        Capsule {
            payload: Some(Box::new(payload)),
            hook: None,
        }
    }

    /// Attach a hook that fires when (and only when) the payload is
    /// released.
    pub fn with_release_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Capsule {
        self.set_release_hook(hook);
        self
    }

    /// Attach a release hook to an existing capsule. Does nothing if the
    /// payload is already gone.
    pub fn set_release_hook(&mut self, hook: impl FnOnce() + Send + 'static) {
        if self.payload.is_some() {
            self.hook = Some(Box::new(hook));
        }
    }

    /// Address of the payload's first element; null once released.
    pub fn data_ptr(&self) -> *const u8 {
        self.payload
            .as_ref()
            .map(|m| m.data().as_ptr())
            .unwrap_or(std::ptr::null())
    }

    /// Drop the payload. Idempotent: the first call frees, later calls do
    /// nothing.
    pub fn release(&mut self) {
        if let Some(payload) = self.payload.take() {
            drop(payload);
            if let Some(hook) = self.hook.take() {
                hook();
            }
            tracing::trace!("capsule released");
        }
    }

    /// True once the payload has been dropped.
    pub fn is_released(&self) -> bool {
        self.payload.is_none()
    }
}

impl Drop for Capsule {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Capsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capsule")
            .field("released", &self.is_released())
            .finish()
    }
}

/// A matrix exported for the host: element tag, shape, stable data
/// pointer, and the capsule that owns the duplicated storage.
#[derive(Debug)]
pub struct ExportedBuffer {
    mat_type: MatType,
    format: char,
    shape: Vec<usize>,
    data: *const u8,
    capsule: Capsule,
}

impl ExportedBuffer {
    /// Composite element tag
    pub fn mat_type(&self) -> MatType {
        self.mat_type
    }

    /// Host format character for the base element type
    pub fn format(&self) -> char {
        self.format
    }

    /// Export shape: `[rows, cols, channels]` when multi-channel,
    /// `[rows, cols]` otherwise
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Address of the first element; stable until release
    pub fn data(&self) -> *const u8 {
        self.data
    }

    /// The release handle for the exported storage
    pub fn capsule_mut(&mut self) -> &mut Capsule {
        &mut self.capsule
    }

    /// Give up the buffer, keeping only the release handle.
    pub fn into_capsule(self) -> Capsule {
        self.capsule
    }
}

/// Export a matrix to the host.
///
/// Fails on non-contiguous storage (a strided layout cannot be described
/// by a flat shape and pointer) and on element types with no host format
/// character. The backing storage is duplicated; the source matrix is
/// untouched and independent exports never share a capsule.
pub fn export_buffer(mat: &DenseMatrix) -> Result<ExportedBuffer> {
    if !mat.is_contiguous() {
        return Err(Error::NonContiguous {
            step: mat.step(),
            row_bytes: mat.row_bytes(),
        }
        .into());
    }
    let base = mat.mat_type().base();
    let format = base
        .format_char()
        .ok_or(Error::UnsupportedElementType(base))?;

    let shape = if mat.channels() > 1 {
        vec![mat.rows(), mat.cols(), mat.channels()]
    } else {
        vec![mat.rows(), mat.cols()]
    };

    let duplicate = mat.clone_contiguous();
    let capsule = Capsule::new(duplicate);
    let data = capsule.data_ptr();
    tracing::debug!(?shape, format = %format, "exported matrix under capsule");

    Ok(ExportedBuffer {
        mat_type: mat.mat_type(),
        format,
        shape,
        data,
        capsule,
    })
}
