//! Serialized interchange form for matrices.
//!
//! Some callers cannot hold a pointer across the boundary (transport
//! layers, logs, test fixtures). For them a matrix serializes to a host
//! value carrying metadata plus a base64 copy of the contiguous bytes,
//! tagged with a marker field so the receiving side can recognize it.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hostbridge_core::{DataType, DenseMatrix, Error, MatType};

use crate::buffer::split_shape;
use crate::error::{MarshalError, Result};

/// Marker field identifying a serialized matrix value.
pub const MATRIX_MARKER: &str = "__matrix__";

/// Matrix metadata for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixMeta {
    /// Matrix shape: `[rows, cols]`, with a channel entry when
    /// multi-channel
    pub shape: Vec<usize>,

    /// Base element type name (e.g. "f64", "i32")
    pub dtype: String,

    /// Total number of elements
    pub size: usize,

    /// Whether the serialized bytes are row-major contiguous (always true
    /// for values produced here)
    pub c_contiguous: bool,
}

/// Matrix data transfer structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixPayload {
    /// Matrix metadata
    pub meta: MatrixMeta,

    /// Base64-encoded element bytes
    pub data: String,
}

/// Check if a host value carries a serialized matrix.
pub fn is_matrix_value(value: &Value) -> bool {
    value
        .get(MATRIX_MARKER)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Serialize a matrix into a marked host value.
///
/// Requires contiguous storage; a strided view has no flat byte string to
/// encode.
pub fn matrix_to_value(mat: &DenseMatrix) -> Result<Value> {
    if !mat.is_contiguous() {
        return Err(Error::NonContiguous {
            step: mat.step(),
            row_bytes: mat.row_bytes(),
        }
        .into());
    }

    let shape = if mat.channels() > 1 {
        vec![mat.rows(), mat.cols(), mat.channels()]
    } else {
        vec![mat.rows(), mat.cols()]
    };
    let payload = MatrixPayload {
        meta: MatrixMeta {
            shape,
            dtype: mat.mat_type().base().name().to_string(),
            size: mat.elem_count(),
            c_contiguous: true,
        },
        data: base64::engine::general_purpose::STANDARD.encode(mat.data()),
    };

    let encoded = serde_json::to_value(&payload)
        .map_err(|e| MarshalError::Decode(format!("payload encode failed: {e}")))?;
    Ok(serde_json::json!({
        (MATRIX_MARKER): true,
        "matrix": encoded,
    }))
}

/// Rebuild an owned matrix from a marked host value.
pub fn matrix_from_value(value: &Value) -> Result<DenseMatrix> {
    if !is_matrix_value(value) {
        return Err(MarshalError::Decode("missing matrix marker".into()));
    }
    let payload: MatrixPayload = serde_json::from_value(
        value
            .get("matrix")
            .ok_or_else(|| MarshalError::Decode("missing 'matrix' field".into()))?
            .clone(),
    )
    .map_err(|e| MarshalError::Decode(format!("malformed payload: {e}")))?;

    let base = DataType::from_name(&payload.meta.dtype)
        .ok_or_else(|| MarshalError::Decode(format!("unknown dtype '{}'", payload.meta.dtype)))?;
    let (rows, cols, channels) = split_shape(&payload.meta.shape)?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&payload.data)
        .map_err(|e| MarshalError::Decode(format!("base64 decode failed: {e}")))?;

    let mat = DenseMatrix::from_bytes(bytes, rows, cols, MatType::new(base, channels)?)?;
    tracing::debug!(
        rows,
        cols,
        channels,
        dtype = base.name(),
        "rebuilt matrix from interchange value"
    );
    Ok(mat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DenseMatrix {
        let data: Vec<i32> = (0..6).collect();
        DenseMatrix::from_vec(data, 2, 3, 1).unwrap()
    }

    #[test]
    fn test_roundtrip_preserves_shape_type_and_bytes() {
        let mat = sample();
        let value = matrix_to_value(&mat).unwrap();
        assert!(is_matrix_value(&value));

        let rebuilt = matrix_from_value(&value).unwrap();
        assert_eq!(rebuilt.rows(), 2);
        assert_eq!(rebuilt.cols(), 3);
        assert_eq!(rebuilt.mat_type(), mat.mat_type());
        assert_eq!(rebuilt.data(), mat.data());
    }

    #[test]
    fn test_plain_values_are_not_matrices() {
        assert!(!is_matrix_value(&serde_json::json!({"shape": [2, 3]})));
        assert!(matches!(
            matrix_from_value(&serde_json::json!(42)),
            Err(MarshalError::Decode(_))
        ));
    }

    #[test]
    fn test_strided_view_does_not_serialize() {
        let mat = sample();
        let view = mat.roi(0..2, 0..2).unwrap();
        assert!(matches!(
            matrix_to_value(&view),
            Err(MarshalError::Matrix(Error::NonContiguous { .. }))
        ));
    }

    #[test]
    fn test_tampered_payload_fails_closed() {
        let mat = sample();
        let mut value = matrix_to_value(&mat).unwrap();

        // truncate the encoded data: byte count no longer matches shape
        let data = value["matrix"]["data"].as_str().unwrap().to_string();
        value["matrix"]["data"] = Value::String(data[..data.len() / 2].to_string());
        assert!(matrix_from_value(&value).is_err());

        // unknown dtype name
        let mut value = matrix_to_value(&mat).unwrap();
        value["matrix"]["meta"]["dtype"] = Value::String("complex128".into());
        assert!(matches!(
            matrix_from_value(&value),
            Err(MarshalError::Decode(_))
        ));
    }
}
