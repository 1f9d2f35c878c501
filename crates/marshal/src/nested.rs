//! Shape inference and typed conversion for nested host sequences.
//!
//! The host side hands us an arbitrarily nested, dynamically-typed sequence
//! (represented as [`serde_json::Value`]). One recursive walk computes its
//! shape: the maximum nesting depth across all leaves and the most general
//! leaf kind, widening Boolean < Integer < Float. The [`NestedValue`] trait
//! then performs the value-preserving copy between the dynamic sequence and
//! the statically typed nested container selected from that shape.

use serde_json::Value;

use crate::error::{MarshalError, Result};

/// Elemental kind of a leaf, ordered by generality.
///
/// Combining two kinds takes the maximum: a sequence mixing integers and
/// floats is Float, never the other way around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ElemKind {
    /// Leaf kind with no supported native counterpart
    Unknown,
    /// Boolean leaf
    Boolean,
    /// Integral numeric leaf
    Integer,
    /// Floating-point numeric leaf
    Float,
}

/// Inferred shape of a nested sequence: maximum depth and most general
/// leaf kind. Computed once per conversion request and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedShape {
    /// Maximum sequence-nesting level over all leaves
    pub depth: usize,
    /// Most general leaf kind over all leaves
    pub kind: ElemKind,
}

impl NestedShape {
    /// True when the dispatch table has an instantiation for this shape.
    pub fn is_supported(&self) -> bool {
        (1..=3).contains(&self.depth) && self.kind != ElemKind::Unknown
    }
}

/// Classify a single leaf value.
fn classify(leaf: &Value) -> ElemKind {
    match leaf {
        Value::Bool(_) => ElemKind::Boolean,
        Value::Number(n) => {
            if n.is_f64() {
                ElemKind::Float
            } else {
                ElemKind::Integer
            }
        }
        _ => ElemKind::Unknown,
    }
}

/// Host-side type name, for error reporting.
fn host_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Infer the shape of a nested dynamic sequence.
///
/// One depth-first pass over the whole tree. Depth and kind are independent
/// maxima: depth is the deepest leaf on any path, kind is the widest leaf
/// anywhere, regardless of which branch is deepest. Empty sequences
/// contribute nothing; a non-sequence root reports depth 0. Unsupported
/// shapes are a defined outcome, not an error.
pub fn infer_shape(value: &Value) -> NestedShape {
    let mut shape = NestedShape {
        depth: 0,
        kind: ElemKind::Unknown,
    };
    walk(value, 0, &mut shape);
    shape
}

fn walk(value: &Value, depth: usize, shape: &mut NestedShape) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item, depth + 1, shape);
            }
        }
        leaf => {
            shape.depth = shape.depth.max(depth);
            shape.kind = shape.kind.max(classify(leaf));
        }
    }
}

/// Bidirectional conversion between a host value and a typed container.
///
/// Implemented for the leaf types `bool`, `i64`, `f64` and structurally for
/// `Vec<T>`, which gives every `Vec^k<T>` instantiation the pair of
/// conversions for free. Both directions produce deep value copies; no
/// aliasing exists between source and destination.
pub trait NestedValue: Sized {
    /// Convert from a host value. Fails with
    /// [`MarshalError::TypeMismatch`] when a leaf cannot convert to the
    /// target element type.
    fn from_host(value: &Value) -> Result<Self>;

    /// Convert into a host value.
    fn into_host(self) -> Value;
}

impl NestedValue for bool {
    fn from_host(value: &Value) -> Result<bool> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(MarshalError::TypeMismatch {
                expected: "bool",
                found: host_type_name(other),
            }),
        }
    }

    fn into_host(self) -> Value {
        Value::Bool(self)
    }
}

impl NestedValue for i64 {
    fn from_host(value: &Value) -> Result<i64> {
        match value {
            // host booleans are integral and widen losslessly
            Value::Bool(b) => Ok(*b as i64),
            Value::Number(n) => n.as_i64().ok_or(MarshalError::TypeMismatch {
                expected: "integer",
                found: host_type_name(value),
            }),
            other => Err(MarshalError::TypeMismatch {
                expected: "integer",
                found: host_type_name(other),
            }),
        }
    }

    fn into_host(self) -> Value {
        Value::Number(self.into())
    }
}

impl NestedValue for f64 {
    fn from_host(value: &Value) -> Result<f64> {
        match value {
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => n.as_f64().ok_or(MarshalError::TypeMismatch {
                expected: "float",
                found: host_type_name(value),
            }),
            other => Err(MarshalError::TypeMismatch {
                expected: "float",
                found: host_type_name(other),
            }),
        }
    }

    fn into_host(self) -> Value {
        // NaN and infinities have no host numeral
        serde_json::Number::from_f64(self)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl<T: NestedValue> NestedValue for Vec<T> {
    fn from_host(value: &Value) -> Result<Vec<T>> {
        match value {
            // each child converts independently, whatever its length;
            // rectangularity is not checked here
            Value::Array(items) => items.iter().map(T::from_host).collect(),
            other => Err(MarshalError::TypeMismatch {
                expected: "sequence",
                found: host_type_name(other),
            }),
        }
    }

    fn into_host(self) -> Value {
        Value::Array(self.into_iter().map(T::into_host).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_depth_computation() {
        assert_eq!(infer_shape(&json!([1, 2, 3])).depth, 1);
        assert_eq!(infer_shape(&json!([[1, 2], [3]])).depth, 2);
        assert_eq!(infer_shape(&json!([[[1]]])).depth, 3);
        assert_eq!(infer_shape(&json!([[[[1]]]])).depth, 4);
    }

    #[test]
    fn test_depth_is_max_over_all_leaves() {
        // shallow and deep branches in one sequence
        let shape = infer_shape(&json!([1, [2, [3]]]));
        assert_eq!(shape.depth, 3);
        assert_eq!(shape.kind, ElemKind::Integer);
    }

    #[test]
    fn test_kind_widening() {
        assert_eq!(infer_shape(&json!([true, false])).kind, ElemKind::Boolean);
        assert_eq!(infer_shape(&json!([1, 2])).kind, ElemKind::Integer);
        assert_eq!(infer_shape(&json!([1, 2.5])).kind, ElemKind::Float);
        assert_eq!(infer_shape(&json!([true, 2])).kind, ElemKind::Integer);
        // widest leaf wins even in a shallow branch
        assert_eq!(infer_shape(&json!([[1, 2], [3.5]])).kind, ElemKind::Float);
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(infer_shape(&json!(["a", "b"])).kind, ElemKind::Unknown);
        // empty sequences contribute nothing
        let shape = infer_shape(&json!([]));
        assert_eq!(shape.depth, 0);
        assert_eq!(shape.kind, ElemKind::Unknown);
        assert!(!shape.is_supported());
        // a non-sequence root is depth 0
        assert_eq!(infer_shape(&json!(42)).depth, 0);
    }

    #[test]
    fn test_supported_predicate() {
        let ok = NestedShape {
            depth: 2,
            kind: ElemKind::Float,
        };
        assert!(ok.is_supported());
        let too_deep = NestedShape {
            depth: 4,
            kind: ElemKind::Float,
        };
        assert!(!too_deep.is_supported());
        let unknown = NestedShape {
            depth: 1,
            kind: ElemKind::Unknown,
        };
        assert!(!unknown.is_supported());
    }

    #[test]
    fn test_leaf_widening_on_convert() {
        assert_eq!(i64::from_host(&json!(true)).unwrap(), 1);
        assert_eq!(f64::from_host(&json!(true)).unwrap(), 1.0);
        assert_eq!(f64::from_host(&json!(7)).unwrap(), 7.0);
    }

    #[test]
    fn test_narrowing_fails() {
        // a float leaf under an integer dispatch aborts the conversion
        assert!(matches!(
            i64::from_host(&json!(2.5)),
            Err(MarshalError::TypeMismatch {
                expected: "integer",
                ..
            })
        ));
        assert!(matches!(
            bool::from_host(&json!(1)),
            Err(MarshalError::TypeMismatch {
                expected: "bool",
                ..
            })
        ));
    }

    #[test]
    fn test_vec_roundtrip_preserves_order() {
        let value = json!([[1, 2], [3, 4, 5]]);
        let nested = <Vec<Vec<i64>>>::from_host(&value).unwrap();
        assert_eq!(nested, vec![vec![1, 2], vec![3, 4, 5]]);
        assert_eq!(nested.into_host(), value);
    }

    #[test]
    fn test_mismatch_aborts_whole_conversion() {
        let value = json!([[1, 2], ["x", 4]]);
        assert!(<Vec<Vec<i64>>>::from_host(&value).is_err());
    }

    #[test]
    fn test_nan_maps_to_null() {
        assert_eq!(f64::NAN.into_host(), Value::Null);
    }
}
