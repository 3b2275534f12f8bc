//! Encode/decode fidelity for numeric, logical and char data.

use num_complex::{Complex32, Complex64};
use runmat_mxarray::{
    decode, encode, ClassId, LogicalArray, MemoryApi, MxApi, MxError, NumericArray, NumericData,
    Value,
};

fn roundtrip(api: &MemoryApi, value: &Value) -> Value {
    let array = encode(api, value).expect("encode");
    decode(api, array.handle()).expect("decode")
}

fn samples(n: usize) -> Vec<NumericData> {
    vec![
        NumericData::Double((0..n).map(|i| i as f64 * 0.5 - 1.0).collect()),
        NumericData::Single((0..n).map(|i| i as f32 * 0.25).collect()),
        NumericData::Int8((0..n).map(|i| i as i8 - 3).collect()),
        NumericData::UInt8((0..n).map(|i| 200 + i as u8).collect()),
        NumericData::Int16((0..n).map(|i| i as i16 * -7).collect()),
        NumericData::UInt16((0..n).map(|i| 60_000 + i as u16).collect()),
        NumericData::Int32((0..n).map(|i| i as i32 * -100_003).collect()),
        NumericData::UInt32((0..n).map(|i| u32::MAX - i as u32).collect()),
        NumericData::Int64((0..n).map(|i| i as i64 * -1_000_000_007).collect()),
        NumericData::UInt64((0..n).map(|i| u64::MAX - i as u64).collect()),
        NumericData::ComplexDouble((0..n).map(|i| Complex64::new(i as f64, -(i as f64))).collect()),
        NumericData::ComplexSingle((0..n).map(|i| Complex32::new(i as f32, 0.5)).collect()),
    ]
}

const SHAPES: [&[usize]; 5] = [&[4], &[3, 1], &[2, 3], &[2, 3, 1], &[2, 3, 4]];

#[test]
fn every_numeric_kind_round_trips() {
    let api = MemoryApi::new();
    for shape in SHAPES {
        let n: usize = shape.iter().product();
        for data in samples(n) {
            let value = Value::Numeric(NumericArray::new(data, shape.to_vec()).unwrap());
            let back = roundtrip(&api, &value);
            assert_eq!(back, value.squeezed(), "kind {}", value.kind());
        }
    }
    assert_eq!(api.live_arrays(), 0);
}

#[test]
fn logical_round_trips() {
    let api = MemoryApi::new();
    for shape in SHAPES {
        let n: usize = shape.iter().product();
        let data = (0..n).map(|i| i % 3 == 0).collect();
        let value = Value::Logical(LogicalArray::new(data, shape.to_vec()).unwrap());
        assert_eq!(roundtrip(&api, &value), value.squeezed());
    }
    assert_eq!(api.live_arrays(), 0);
}

#[test]
fn singleton_axes_are_squeezed() {
    let api = MemoryApi::new();
    let value = Value::Numeric(
        NumericArray::new(NumericData::Double(vec![1.0, 2.0, 3.0, 4.0, 5.0]), vec![1, 1, 5])
            .unwrap(),
    );
    assert_eq!(roundtrip(&api, &value).shape(), Some(&[5][..]));

    let column = Value::Numeric(
        NumericArray::new(NumericData::Int32(vec![7, 8, 9]), vec![3, 1]).unwrap(),
    );
    assert_eq!(roundtrip(&api, &column).shape(), Some(&[3][..]));

    let trailing = Value::Numeric(
        NumericArray::new(NumericData::Single(vec![0.5; 6]), vec![2, 3, 1]).unwrap(),
    );
    assert_eq!(roundtrip(&api, &trailing).shape(), Some(&[2, 3][..]));

    let scalar = roundtrip(&api, &Value::from(3.0));
    assert_eq!(scalar.shape(), Some(&[1][..]));
    assert_eq!(scalar.as_scalar_f64(), Some(3.0));
}

#[test]
fn layout_is_column_major() {
    let api = MemoryApi::new();
    let host = NumericArray::from_row_major(
        NumericData::Double(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        vec![2, 3],
    )
    .unwrap();
    let array = encode(&api, &Value::Numeric(host)).unwrap();
    assert_eq!(api.dimensions(array.handle()), vec![2, 3]);

    let mut raw = [0u8; 48];
    api.read_real(array.handle(), &mut raw).unwrap();
    let stored: Vec<f64> = raw
        .chunks_exact(8)
        .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(stored, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

    let Value::Numeric(back) = decode(&api, array.handle()).unwrap() else {
        panic!("expected a numeric array");
    };
    assert_eq!(back.get_f64(&[0, 1]), Some(2.0));
    assert_eq!(back.get_f64(&[1, 2]), Some(6.0));
}

#[test]
fn decodes_arrays_built_on_the_matlab_side() {
    let api = MemoryApi::new();
    let handle = api.create_numeric(&[2, 2], ClassId::Int32, false).unwrap();
    let bytes: Vec<u8> = [10i32, 20, 30, 40].iter().flat_map(|v| v.to_ne_bytes()).collect();
    api.write_real(handle, &bytes).unwrap();

    let value = decode(&api, handle).unwrap();
    assert_eq!(
        value,
        Value::Numeric(
            NumericArray::new(NumericData::Int32(vec![10, 20, 30, 40]), vec![2, 2]).unwrap()
        )
    );
    assert_eq!(value.to_string(), "[10 30; 20 40]");
    api.destroy(handle);
    assert_eq!(api.live_arrays(), 0);
}

#[test]
fn text_round_trips() {
    let api = MemoryApi::new();
    for text in ["hello", "héllo wörld ∑", ""] {
        assert_eq!(roundtrip(&api, &Value::from(text)), Value::from(text));
    }
}

#[test]
fn complex_integers_are_unsupported() {
    let api = MemoryApi::new();
    let handle = api.create_numeric(&[1, 2], ClassId::Int16, true).unwrap();
    let err = decode(&api, handle).unwrap_err();
    assert!(matches!(err, MxError::UnsupportedType(ref msg) if msg.contains("int16")));
    api.destroy(handle);
}

#[test]
fn foreign_classes_are_unsupported() {
    let api = MemoryApi::new();
    let handle = api.create_unsupported(ClassId::Function, &[1, 1]).unwrap();
    let err = decode(&api, handle).unwrap_err();
    assert_eq!(
        err,
        MxError::UnsupportedType("function_handle-arrays are not supported".into())
    );
    api.destroy(handle);

    let sparse = api.create_sparse_double(&[3, 3]).unwrap();
    let err = decode(&api, sparse).unwrap_err();
    assert!(matches!(err, MxError::UnsupportedType(ref msg) if msg.contains("sparse")));
    api.destroy(sparse);
    assert_eq!(api.live_arrays(), 0);
}
