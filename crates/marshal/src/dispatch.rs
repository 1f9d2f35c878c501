//! Dispatch from an inferred shape to a typed converter instantiation.
//!
//! The supported family is closed and small: depth 1..=3 over
//! {bool, i64, f64}, nine instantiations per direction. Each one is an
//! explicit match arm; the catch-all covers only genuinely unsupported
//! shapes and yields the "no value" sentinel rather than an error.

use std::fmt;

use serde_json::Value;

use crate::error::Result;
use crate::nested::{ElemKind, NestedShape, NestedValue};

/// The closed family of typed nested containers.
///
/// One variant per supported (depth, element type) pair. Depth and element
/// type are fixed at construction; instances always hold deep value copies
/// of the host data they were converted from.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedNested {
    /// depth-1 boolean sequence
    Bool1(Vec<bool>),
    /// depth-2 boolean sequence
    Bool2(Vec<Vec<bool>>),
    /// depth-3 boolean sequence
    Bool3(Vec<Vec<Vec<bool>>>),
    /// depth-1 integer sequence
    Int1(Vec<i64>),
    /// depth-2 integer sequence
    Int2(Vec<Vec<i64>>),
    /// depth-3 integer sequence
    Int3(Vec<Vec<Vec<i64>>>),
    /// depth-1 floating-point sequence
    Float1(Vec<f64>),
    /// depth-2 floating-point sequence
    Float2(Vec<Vec<f64>>),
    /// depth-3 floating-point sequence
    Float3(Vec<Vec<Vec<f64>>>),
}

impl TypedNested {
    /// Nesting depth of this instantiation.
    pub fn depth(&self) -> usize {
        match self {
            TypedNested::Bool1(_) | TypedNested::Int1(_) | TypedNested::Float1(_) => 1,
            TypedNested::Bool2(_) | TypedNested::Int2(_) | TypedNested::Float2(_) => 2,
            TypedNested::Bool3(_) | TypedNested::Int3(_) | TypedNested::Float3(_) => 3,
        }
    }

    /// Element kind of this instantiation.
    pub fn kind(&self) -> ElemKind {
        match self {
            TypedNested::Bool1(_) | TypedNested::Bool2(_) | TypedNested::Bool3(_) => {
                ElemKind::Boolean
            }
            TypedNested::Int1(_) | TypedNested::Int2(_) | TypedNested::Int3(_) => {
                ElemKind::Integer
            }
            TypedNested::Float1(_) | TypedNested::Float2(_) | TypedNested::Float3(_) => {
                ElemKind::Float
            }
        }
    }

    /// Top-level length.
    pub fn len(&self) -> usize {
        match self {
            TypedNested::Bool1(v) => v.len(),
            TypedNested::Bool2(v) => v.len(),
            TypedNested::Bool3(v) => v.len(),
            TypedNested::Int1(v) => v.len(),
            TypedNested::Int2(v) => v.len(),
            TypedNested::Int3(v) => v.len(),
            TypedNested::Float1(v) => v.len(),
            TypedNested::Float2(v) => v.len(),
            TypedNested::Float3(v) => v.len(),
        }
    }

    /// True when the top-level sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fmt_leaf<T: fmt::Display>(items: &[T], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

fn fmt_nested<T: fmt::Display>(items: &[Vec<T>], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        fmt_leaf(item, f)?;
    }
    write!(f, "]")
}

fn fmt_nested3<T: fmt::Display>(
    items: &[Vec<Vec<T>>],
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        fmt_nested(item, f)?;
    }
    write!(f, "]")
}

impl fmt::Display for TypedNested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedNested::Bool1(v) => fmt_leaf(v, f),
            TypedNested::Bool2(v) => fmt_nested(v, f),
            TypedNested::Bool3(v) => fmt_nested3(v, f),
            TypedNested::Int1(v) => fmt_leaf(v, f),
            TypedNested::Int2(v) => fmt_nested(v, f),
            TypedNested::Int3(v) => fmt_nested3(v, f),
            TypedNested::Float1(v) => fmt_leaf(v, f),
            TypedNested::Float2(v) => fmt_nested(v, f),
            TypedNested::Float3(v) => fmt_nested3(v, f),
        }
    }
}

/// Convert a host sequence into the typed container selected by `shape`.
///
/// Returns `Ok(None)` for shapes outside the supported family: that is the
/// defined terminal outcome for arbitrary input, not an error. Leaf-level
/// type mismatches abort the whole conversion with an error and no partial
/// result.
pub fn convert_to_typed(value: &Value, shape: NestedShape) -> Result<Option<TypedNested>> {
    let converted = match (shape.depth, shape.kind) {
        (1, ElemKind::Boolean) => TypedNested::Bool1(<Vec<bool>>::from_host(value)?),
        (2, ElemKind::Boolean) => TypedNested::Bool2(<Vec<Vec<bool>>>::from_host(value)?),
        (3, ElemKind::Boolean) => TypedNested::Bool3(<Vec<Vec<Vec<bool>>>>::from_host(value)?),
        (1, ElemKind::Integer) => TypedNested::Int1(<Vec<i64>>::from_host(value)?),
        (2, ElemKind::Integer) => TypedNested::Int2(<Vec<Vec<i64>>>::from_host(value)?),
        (3, ElemKind::Integer) => TypedNested::Int3(<Vec<Vec<Vec<i64>>>>::from_host(value)?),
        (1, ElemKind::Float) => TypedNested::Float1(<Vec<f64>>::from_host(value)?),
        (2, ElemKind::Float) => TypedNested::Float2(<Vec<Vec<f64>>>::from_host(value)?),
        (3, ElemKind::Float) => TypedNested::Float3(<Vec<Vec<Vec<f64>>>>::from_host(value)?),
        (depth, kind) => {
            tracing::debug!(depth, ?kind, "shape outside the supported dispatch family");
            return Ok(None);
        }
    };
    Ok(Some(converted))
}

/// Convert a typed container back into a host sequence, the exact mirror of
/// [`convert_to_typed`]. Order is preserved at every nesting level.
pub fn convert_from_typed(array: TypedNested) -> Value {
    match array {
        TypedNested::Bool1(v) => v.into_host(),
        TypedNested::Bool2(v) => v.into_host(),
        TypedNested::Bool3(v) => v.into_host(),
        TypedNested::Int1(v) => v.into_host(),
        TypedNested::Int2(v) => v.into_host(),
        TypedNested::Int3(v) => v.into_host(),
        TypedNested::Float1(v) => v.into_host(),
        TypedNested::Float2(v) => v.into_host(),
        TypedNested::Float3(v) => v.into_host(),
    }
}
