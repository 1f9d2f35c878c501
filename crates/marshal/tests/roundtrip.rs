//! End-to-end boundary tests: infer -> dispatch -> convert -> mirror back,
//! and buffer import/export with lifetime checks.

use anyhow::Result;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hostbridge_core::{DataType, DenseMatrix};
use hostbridge_marshal::{
    convert_from_typed, convert_to_typed, export_buffer, import_buffer, infer_shape,
    matrix_from_value, matrix_to_value, BufferDescriptor, ElemKind,
};

fn roundtrip(value: &Value) -> Option<Value> {
    let shape = infer_shape(value);
    let typed = convert_to_typed(value, shape).expect("conversion must not fail")?;
    Some(convert_from_typed(typed))
}

#[test]
fn rectangular_sequences_roundtrip_exactly() {
    hostbridge_marshal::init();
    let cases = [
        json!([true, false]),
        json!([[true, true], [false, false]]),
        json!([[[true], [false]], [[false], [true]]]),
        json!([1, 2, 3]),
        json!([[1, 2, 3], [4, 5, 6]]),
        json!([[[1, 2], [3, 4]], [[5, 6], [7, 8]]]),
        json!([0.5, 1.5, 2.5]),
        json!([[0.5, 1.5], [2.5, 3.5]]),
        json!([[[0.5]], [[1.5]]]),
    ];
    for case in &cases {
        assert_eq!(roundtrip(case).as_ref(), Some(case), "case {case}");
    }
}

#[test]
fn element_order_is_preserved_at_every_level() {
    let value = json!([[3, 1], [4, 1], [5, 9]]);
    assert_eq!(roundtrip(&value), Some(value));
}

#[test]
fn widening_promotes_but_never_narrows() {
    let mixed = json!([1, 2.5, true]);
    let shape = infer_shape(&mixed);
    assert_eq!(shape.kind, ElemKind::Float);
    // booleans and integers come back as floats under the widened dispatch
    assert_eq!(roundtrip(&mixed), Some(json!([1.0, 2.5, 1.0])));
}

#[test]
fn unsupported_inputs_yield_no_value_not_an_error() {
    for value in [json!([[[[1]]]]), json!(["x"]), json!([]), json!(null)] {
        let shape = infer_shape(&value);
        let outcome = convert_to_typed(&value, shape).expect("sentinel, not error");
        assert!(outcome.is_none(), "value {value}");
    }
}

#[test]
fn buffer_view_roundtrips_through_export() -> Result<()> {
    // host buffer -> native view -> exported duplicate -> compare bytes
    let host: Vec<f64> = (0..12).map(|v| v as f64 * 0.5).collect();
    let bytes: &[u8] = bytemuck::cast_slice(&host);
    let desc = unsafe { BufferDescriptor::from_raw_parts("d", vec![3, 4], bytes.as_ptr()) };

    let view = import_buffer(&desc)?;
    assert_eq!(view.mat_type().base(), DataType::F64);

    let exported = export_buffer(&view)?;
    assert_eq!(exported.shape(), &[3, 4]);
    let dup = unsafe { std::slice::from_raw_parts(exported.data(), bytes.len()) };
    assert_eq!(dup, bytes);
    Ok(())
}

#[test]
fn release_fires_once_per_export() -> Result<()> {
    let mat = DenseMatrix::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], 2, 2, 1)?;
    let count = Arc::new(AtomicUsize::new(0));

    let mut exported = export_buffer(&mat)?;
    let hook_count = Arc::clone(&count);
    exported.capsule_mut().set_release_hook(move || {
        hook_count.fetch_add(1, Ordering::SeqCst);
    });

    exported.capsule_mut().release();
    exported.capsule_mut().release();
    drop(exported);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn interchange_roundtrip_crosses_the_boundary_without_pointers() -> Result<()> {
    let mat = DenseMatrix::from_vec((0..6).collect::<Vec<i32>>(), 2, 3, 1)?;
    let value = matrix_to_value(&mat)?;
    assert!(hostbridge_marshal::is_matrix_value(&value));

    let rebuilt = matrix_from_value(&value)?;
    assert_eq!(rebuilt.rows(), 2);
    assert_eq!(rebuilt.cols(), 3);
    assert_eq!(rebuilt.as_slice_of::<i32>()?, mat.as_slice_of::<i32>()?);
    Ok(())
}

#[test]
fn roi_export_fails_until_packed() -> Result<()> {
    let mat = DenseMatrix::from_vec((0..16).map(f64::from).collect::<Vec<f64>>(), 4, 4, 1)?;
    let view = mat.roi(1..3, 1..3)?;
    assert!(export_buffer(&view).is_err());

    let packed = view.clone_contiguous();
    let exported = export_buffer(&packed)?;
    assert_eq!(exported.shape(), &[2, 2]);
    assert_eq!(packed.as_slice_of::<f64>()?, &[5.0, 6.0, 9.0, 10.0]);
    Ok(())
}
