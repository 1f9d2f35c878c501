//! Hostbridge marshal - the boundary between host values and native data
//!
//! This crate moves data across the boundary between a dynamically-typed
//! host (nested sequences and opaque buffers, represented as
//! [`serde_json::Value`] and [`BufferDescriptor`]) and the statically-typed
//! native side (`hostbridge-core` matrices and the typed nested containers
//! defined here).
//!
//! # Architecture
//!
//! Two independent paths compose the crate:
//! - Nested sequences: [`infer_shape`] walks a host sequence once and
//!   computes (depth, element kind); [`convert_to_typed`] dispatches to one
//!   of nine typed converter instantiations; [`convert_from_typed`] mirrors
//!   back. Unsupported shapes are a defined "no value" outcome.
//! - Buffers: [`import_buffer`] wraps a host buffer descriptor as a
//!   non-owning matrix view; [`export_buffer`] duplicates a matrix onto the
//!   heap under a release-once [`Capsule`] so the host can hold the memory
//!   past the call. [`interchange`] adds a pointer-free serialized form.
//!
//! Every conversion is synchronous, self-contained, and order-preserving.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod dispatch;
pub mod interchange;
pub mod nested;

mod error;
pub use error::{MarshalError, Result};

pub use buffer::{
    export_buffer, import_buffer, import_buffer_copied, BufferDescriptor, Capsule, ExportedBuffer,
};
pub use dispatch::{convert_from_typed, convert_to_typed, TypedNested};
pub use interchange::{is_matrix_value, matrix_from_value, matrix_to_value};
pub use nested::{infer_shape, ElemKind, NestedShape, NestedValue};

/// Initialize tracing for binaries or tests embedding the library.
///
/// Respects `RUST_LOG`; defaults to `info`. Safe to call more than once;
/// later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
