//! Coercion of loosely typed host data (JSON documents) into [`Value`]s and
//! the reverse rendering used for display.

use serde_json::{json, Map, Number};

use crate::error::{MxError, Result};
use crate::value::{CellArray, FieldColumn, NumericArray, NumericData, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    Number,
    Bool,
}

/// Coerce a JSON document into a host value.
///
/// Numbers and booleans become 1x1 arrays, strings become text, and
/// rectangular nests of numbers or booleans become arrays of the nest's
/// shape (row-major input, stored column-major). Ragged or mixed lists
/// become cell arrays. Objects have no array encoding and are rejected.
pub fn from_json(json: &serde_json::Value) -> Result<Value> {
    match json {
        serde_json::Value::Null => Err(MxError::unsupported("null")),
        serde_json::Value::Bool(b) => Ok(Value::from(*b)),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| MxError::unsupported(format!("number {n}"))),
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Object(_) => Err(MxError::unsupported("mapping (dict-like) values")),
        serde_json::Value::Array(items) => from_json_array(json, items),
    }
}

impl TryFrom<&serde_json::Value> for Value {
    type Error = MxError;

    fn try_from(json: &serde_json::Value) -> Result<Self> {
        from_json(json)
    }
}

fn from_json_array(json: &serde_json::Value, items: &[serde_json::Value]) -> Result<Value> {
    if let Some((shape, leaf)) = rectangular_shape(json) {
        let mut flat = Vec::with_capacity(shape.iter().product());
        flatten(json, &mut flat);
        return match leaf.unwrap_or(Leaf::Number) {
            Leaf::Number => {
                let data = flat.iter().filter_map(|v| v.as_f64()).collect();
                NumericArray::from_row_major(NumericData::Double(data), shape)
                    .map(Value::Numeric)
                    .map_err(MxError::InvalidShape)
            }
            Leaf::Bool => {
                let data: Vec<bool> = flat.iter().filter_map(|v| v.as_bool()).collect();
                let column_major = crate::shape::row_major_to_column_major(&data, &shape);
                crate::value::LogicalArray::new(column_major, shape)
                    .map(Value::Logical)
                    .map_err(MxError::InvalidShape)
            }
        };
    }
    let data = items
        .iter()
        .map(|item| from_json(item).map(Some))
        .collect::<Result<Vec<_>>>()?;
    let n = data.len();
    CellArray::new(data, vec![n]).map(Value::Cell).map_err(MxError::InvalidShape)
}

/// Shape and leaf type of a rectangular nest of numbers or booleans.
/// An empty list has no leaf type.
fn rectangular_shape(json: &serde_json::Value) -> Option<(Vec<usize>, Option<Leaf>)> {
    match json {
        serde_json::Value::Number(_) => Some((Vec::new(), Some(Leaf::Number))),
        serde_json::Value::Bool(_) => Some((Vec::new(), Some(Leaf::Bool))),
        serde_json::Value::Array(items) => {
            let mut inner: Option<(Vec<usize>, Option<Leaf>)> = None;
            for item in items {
                let (shape, leaf) = rectangular_shape(item)?;
                match &mut inner {
                    None => inner = Some((shape, leaf)),
                    Some((expected, expected_leaf)) => {
                        if *expected != shape {
                            return None;
                        }
                        match (*expected_leaf, leaf) {
                            (Some(a), Some(b)) if a != b => return None,
                            (None, Some(b)) => *expected_leaf = Some(b),
                            _ => {}
                        }
                    }
                }
            }
            let (inner_shape, leaf) = inner.unwrap_or((Vec::new(), None));
            let mut shape = vec![items.len()];
            shape.extend(inner_shape);
            Some((shape, leaf))
        }
        _ => None,
    }
}

fn flatten<'a>(json: &'a serde_json::Value, out: &mut Vec<&'a serde_json::Value>) {
    match json {
        serde_json::Value::Array(items) => items.iter().for_each(|item| flatten(item, out)),
        leaf => out.push(leaf),
    }
}

fn number(x: f64) -> serde_json::Value {
    Number::from_f64(x)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(x.to_string()))
}

fn numeric_elements(data: &NumericData) -> Vec<serde_json::Value> {
    match data {
        NumericData::ComplexDouble(v) => v
            .iter()
            .map(|c| json!({"re": number(c.re), "im": number(c.im)}))
            .collect(),
        NumericData::ComplexSingle(v) => v
            .iter()
            .map(|c| json!({"re": number(f64::from(c.re)), "im": number(f64::from(c.im))}))
            .collect(),
        _ => (0..data.len()).filter_map(|i| data.get_f64(i)).map(number).collect(),
    }
}

fn json_or_null(value: Option<&Value>) -> serde_json::Value {
    value.map(to_json).unwrap_or(serde_json::Value::Null)
}

/// Render a value as JSON. Scalars become plain numbers; arrays keep their
/// class, shape and column-major data.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Numeric(a) if a.len() == 1 && !a.is_complex() => {
            a.data.get_f64(0).map(number).unwrap_or(serde_json::Value::Null)
        }
        Value::Numeric(a) => json!({
            "class": a.class().class_id().name(),
            "shape": a.shape,
            "data": numeric_elements(&a.data),
        }),
        Value::Logical(a) if a.data.len() == 1 => serde_json::Value::Bool(a.data[0]),
        Value::Logical(a) => json!({
            "class": "logical",
            "shape": a.shape,
            "data": a.data,
        }),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Cell(c) => json!({
            "class": "cell",
            "shape": c.shape,
            "data": c.data.iter().map(|slot| json_or_null(slot.as_ref())).collect::<Vec<_>>(),
        }),
        Value::Struct(s) => {
            let fields = s
                .fields
                .iter()
                .map(|field| {
                    let values: Vec<serde_json::Value> = (0..field.column.len())
                        .map(|i| json_or_null(field.column.get(i).as_ref()))
                        .collect();
                    let mut entry = Map::new();
                    entry.insert("name".into(), serde_json::Value::String(field.name.clone()));
                    let uniform = !matches!(field.column, FieldColumn::Mixed(_));
                    entry.insert("uniform".into(), serde_json::Value::Bool(uniform));
                    entry.insert("values".into(), serde_json::Value::Array(values));
                    serde_json::Value::Object(entry)
                })
                .collect::<Vec<_>>();
            json!({
                "class": "struct",
                "shape": s.shape,
                "fields": fields,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{LogicalArray, StructArray};
    use num_complex::Complex64;

    #[test]
    fn nested_lists_are_row_major() {
        let value = from_json(&json!([[1, 2, 3], [4, 5, 6]])).unwrap();
        let a = match value {
            Value::Numeric(a) => a,
            other => panic!("expected numeric, got {other:?}"),
        };
        assert_eq!(a.shape, vec![2, 3]);
        assert_eq!(a.get_f64(&[0, 2]), Some(3.0));
        assert_eq!(a.get_f64(&[1, 0]), Some(4.0));
    }

    #[test]
    fn scalars_and_text() {
        assert_eq!(from_json(&json!(2.5)).unwrap(), Value::from(2.5));
        assert_eq!(from_json(&json!(true)).unwrap(), Value::from(true));
        assert_eq!(from_json(&json!("abc")).unwrap(), Value::from("abc"));
    }

    #[test]
    fn boolean_lists_become_logical() {
        let value = from_json(&json!([true, false])).unwrap();
        assert_eq!(
            value,
            Value::Logical(LogicalArray::new(vec![true, false], vec![2]).unwrap())
        );
    }

    #[test]
    fn ragged_lists_become_cells() {
        let value = from_json(&json!([1, [2, 3], "x"])).unwrap();
        let c = match value {
            Value::Cell(c) => c,
            other => panic!("expected cell, got {other:?}"),
        };
        assert_eq!(c.shape, vec![3]);
        assert_eq!(c.data[2], Some(Value::from("x")));
    }

    #[test]
    fn mappings_are_rejected() {
        let err = Value::try_from(&json!({"a": 1})).unwrap_err();
        assert!(matches!(err, MxError::UnsupportedType(msg) if msg.contains("mapping")));
        let nested = from_json(&json!([1, {"a": 1}])).unwrap_err();
        assert!(matches!(nested, MxError::UnsupportedType(_)));
    }

    #[test]
    fn renders_scalars_plainly() {
        assert_eq!(to_json(&Value::from(3.0)), json!(3.0));
        let rendered = to_json(&Value::from(vec![1.0, 2.0]));
        assert_eq!(rendered["class"], json!("double"));
        assert_eq!(rendered["shape"], json!([1, 2]));
    }

    #[test]
    fn renders_containers() {
        let complex = NumericArray::new(
            NumericData::ComplexDouble(vec![Complex64::new(1.0, -1.0), Complex64::new(0.0, 2.0)]),
            vec![1, 2],
        )
        .unwrap();
        assert_eq!(
            to_json(&Value::Numeric(complex))["data"],
            json!([{"re": 1.0, "im": -1.0}, {"re": 0.0, "im": 2.0}])
        );

        let cell = CellArray::new(vec![Some(Value::from("a")), None], vec![1, 2]).unwrap();
        assert_eq!(to_json(&Value::Cell(cell))["data"], json!(["a", null]));

        let record = StructArray::from_records(
            vec![1, 2],
            vec!["n".into(), "mix".into()],
            vec![
                vec![Some(Value::from(1.0)), Some(Value::from(1.0))],
                vec![Some(Value::from(2.0)), Some(Value::from("x"))],
            ],
        )
        .unwrap();
        let rendered = to_json(&Value::Struct(record));
        assert_eq!(rendered["fields"][0]["uniform"], json!(true));
        assert_eq!(rendered["fields"][0]["values"], json!([1.0, 2.0]));
        assert_eq!(rendered["fields"][1]["uniform"], json!(false));
        assert_eq!(rendered["fields"][1]["values"], json!([1.0, "x"]));
    }
}
