use crate::{
    error::EvalError,
    values::{Pointer, StructValue, TensorMetadata, Value},
};
use fusor_types::{DataType, FieldInfo, PrimDataType, StructType, TensorType};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn point() -> Arc<StructType> {
    Arc::new(
        StructType::new(
            "Point",
            [
                FieldInfo::new("x", DataType::Int),
                FieldInfo::new("y", DataType::Double),
            ],
        )
        .unwrap(),
    )
}

#[test]
fn test_scalar_accessors() {
    assert_eq!(Value::Int(3).as_int().unwrap(), 3);
    assert_eq!(Value::Double(1.5).as_double().unwrap(), 1.5);
    assert_eq!(Value::Int(2).as_number().unwrap(), 2.0);
    assert_eq!(Value::Bool(true).as_bool().unwrap(), true);

    let err = Value::Double(1.5).as_int().unwrap_err();
    assert_eq!(
        err,
        EvalError::TypeMismatch {
            expected: "int".to_string(),
            found: "double 1.5".to_string(),
        }
    );
    assert!(Value::Int(1).as_double().is_err());
    assert!(Value::Int(1).as_bool().is_err());
}

#[test]
fn test_item() {
    let array = Value::from(vec![10i64, 20, 30]);
    assert_eq!(array.item(0).unwrap(), Value::Int(10));
    assert_eq!(array.item(2).unwrap(), Value::Int(30));
    assert_eq!(
        array.item(3),
        Err(EvalError::IndexOutOfRange { index: 3, len: 3 })
    );
    assert_eq!(
        array.item(-1),
        Err(EvalError::IndexOutOfRange { index: -1, len: 3 })
    );
    assert!(Value::Int(1).item(0).is_err());
}

#[test]
fn test_to_int_vec() {
    assert_eq!(
        Value::from(vec![1i64, -2]).to_int_vec().unwrap(),
        vec![1, -2]
    );
    assert!(
        Value::from(vec![Value::Int(1), Value::Bool(false)])
            .to_int_vec()
            .is_err()
    );
}

#[test]
fn test_struct_attr() {
    let value = Value::from(
        StructValue::new(point(), [("y", Value::Double(0.5)), ("x", Value::Int(4))]).unwrap(),
    );
    assert_eq!(value.attr("x").unwrap(), Value::Int(4));
    assert_eq!(value.attr("y").unwrap(), Value::Double(0.5));
    assert!(matches!(
        value.attr("z"),
        Err(EvalError::UnknownField { .. })
    ));
    assert!(matches!(
        Value::Int(0).attr("x"),
        Err(EvalError::InvalidOperand { op: "get_attr", .. })
    ));
}

#[test]
fn test_struct_construction_errors() {
    assert!(matches!(
        StructValue::new(point(), [("x", Value::Int(1))]),
        Err(EvalError::Construction(_))
    ));
    assert!(matches!(
        StructValue::new(point(), [("x", Value::Int(1)), ("y", Value::Int(2))]),
        Err(EvalError::TypeMismatch { .. })
    ));
    assert!(matches!(
        StructValue::new(
            point(),
            [
                ("x", Value::Int(1)),
                ("x", Value::Int(1)),
                ("y", Value::Double(2.0))
            ]
        ),
        Err(EvalError::Construction(_))
    ));
}

#[test]
fn test_tensor_attr() {
    let meta = TensorMetadata::new(
        Pointer::new(0x1000, PrimDataType::Half),
        &[4, 1, 8],
        &[8, 0, 1],
    )
    .unwrap();
    let value = Value::from(meta);
    assert_eq!(
        value.attr("data").unwrap(),
        Value::Pointer(Pointer::new(0x1000, PrimDataType::Half))
    );
    assert_eq!(
        value.attr("logical_size").unwrap(),
        Value::from(vec![4i64, 1, 8])
    );
    assert_eq!(
        value.attr("alloc_stride").unwrap(),
        Value::from(vec![8i64, 0, 1])
    );
    assert!(matches!(
        value.attr("numel"),
        Err(EvalError::UnknownField { .. })
    ));
}

#[test]
fn test_conforms_to() {
    assert!(Value::Int(1).conforms_to(&DataType::Int));
    assert!(!Value::Int(1).conforms_to(&DataType::Double));
    assert!(!Value::Double(1.0).conforms_to(&DataType::Int));

    let pair = Value::from(vec![1i64, 2]);
    assert!(pair.conforms_to(&DataType::array(DataType::Int, 2)));
    assert!(!pair.conforms_to(&DataType::array(DataType::Int, 3)));
    assert!(!pair.conforms_to(&DataType::array(DataType::Bool, 2)));

    let tensor = Value::from(
        TensorMetadata::contiguous(Pointer::new(0x10, PrimDataType::Float), &[2, 3]).unwrap(),
    );
    let tt = TensorType::new(PrimDataType::Float, 2);
    assert!(tensor.conforms_to(&DataType::Tensor(tt)));
    assert!(tensor.conforms_to(&DataType::TensorMetadata(tt)));
    assert!(!tensor.conforms_to(&DataType::Tensor(TensorType::new(PrimDataType::Float, 3))));
    assert!(!tensor.conforms_to(&DataType::Tensor(TensorType::new(PrimDataType::Half, 2))));

    let origin =
        StructValue::new(point(), [("x", Value::Int(0)), ("y", Value::Double(0.0))]).unwrap();
    assert!(Value::from(origin).conforms_to(&DataType::Struct(point())));
}

#[test]
fn test_display() {
    assert_eq!(Value::Int(-3).to_string(), "-3");
    assert_eq!(Value::Double(2.0).to_string(), "2.0");
    assert_eq!(Value::Double(0.25).to_string(), "0.25");
    assert_eq!(Value::Double(f64::NAN).to_string(), "nan");
    assert_eq!(Value::Double(f64::NEG_INFINITY).to_string(), "-inf");
    assert_eq!(Value::Bool(false).to_string(), "false");
    assert_eq!(
        Value::from(vec![Value::Int(1), Value::Double(1.0)]).to_string(),
        "[1, 1.0]"
    );

    let origin =
        StructValue::new(point(), [("x", Value::Int(0)), ("y", Value::Double(0.5))]).unwrap();
    assert_eq!(Value::from(origin).to_string(), "Point { x: 0, y: 0.5 }");

    let ptr = Pointer::new(0xff, PrimDataType::Float);
    assert_eq!(Value::from(ptr).to_string(), "ptr<float>(0xff)");
    let meta = TensorMetadata::contiguous(ptr, &[2, 3]).unwrap();
    assert_eq!(
        Value::from(meta).to_string(),
        "tensor<float>(sizes=[2, 3], strides=[3, 1])"
    );
}

#[test]
fn test_describe() {
    assert_eq!(Value::Int(3).describe(), "int 3");
    assert_eq!(Value::Double(1.5).describe(), "double 1.5");
    assert_eq!(Value::from(vec![1i64]).describe(), "array of length 1");
    assert_eq!(
        Value::Pointer(Pointer::null(PrimDataType::Bool)).describe(),
        "ptr<bool>"
    );
}
