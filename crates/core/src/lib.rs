//! Hostbridge core - native-side data model
//!
//! This crate holds the statically-typed half of the boundary: element type
//! tags, composite matrix types, and the dense matrix with its storage
//! backends. It knows nothing about any particular host; the marshalling
//! layer (`hostbridge-marshal`) builds on these types to move data across
//! the boundary.
//!
//! # Architecture
//!
//! Core is a pure library that:
//! - Defines element encodings and the host format-code table ([`elem`])
//! - Provides the dense matrix with owned and borrowed storage ([`matrix`])
//! - Has ZERO dependencies on host-side crates (no interpreter bindings)
//!
//! Marshalling layers are separate crates that:
//! - Depend on `hostbridge-core`
//! - Decide how host values map onto these types
//! - Handle their own interchange formats

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod elem;
pub mod matrix;

mod error;
pub use error::{Error, Result};

pub use elem::{DataType, MatType};
pub use matrix::{DenseMatrix, Element, MatStorage};
