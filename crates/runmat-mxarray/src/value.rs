use std::fmt;

use num_complex::{Complex32, Complex64};

use crate::class::{ElementKind, NumericClass};
use crate::error::{MxError, Result};
use crate::shape;

/// Apply `$body` to the vector inside any variant, producing a plain value.
macro_rules! numeric_apply {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            NumericData::Double($v) => $body,
            NumericData::Single($v) => $body,
            NumericData::Int8($v) => $body,
            NumericData::UInt8($v) => $body,
            NumericData::Int16($v) => $body,
            NumericData::UInt16($v) => $body,
            NumericData::Int32($v) => $body,
            NumericData::UInt32($v) => $body,
            NumericData::Int64($v) => $body,
            NumericData::UInt64($v) => $body,
            NumericData::ComplexDouble($v) => $body,
            NumericData::ComplexSingle($v) => $body,
        }
    };
}

/// Apply `$body` to the vector inside any variant and rewrap the result in
/// the same variant.
macro_rules! numeric_map {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            NumericData::Double($v) => NumericData::Double($body),
            NumericData::Single($v) => NumericData::Single($body),
            NumericData::Int8($v) => NumericData::Int8($body),
            NumericData::UInt8($v) => NumericData::UInt8($body),
            NumericData::Int16($v) => NumericData::Int16($body),
            NumericData::UInt16($v) => NumericData::UInt16($body),
            NumericData::Int32($v) => NumericData::Int32($body),
            NumericData::UInt32($v) => NumericData::UInt32($body),
            NumericData::Int64($v) => NumericData::Int64($body),
            NumericData::UInt64($v) => NumericData::UInt64($body),
            NumericData::ComplexDouble($v) => NumericData::ComplexDouble($body),
            NumericData::ComplexSingle($v) => NumericData::ComplexSingle($body),
        }
    };
}

macro_rules! concat_variant {
    ($parts:expr, $variant:ident) => {{
        let mut out = Vec::with_capacity($parts.len());
        for part in $parts {
            match part {
                NumericData::$variant(v) => out.extend_from_slice(v),
                _ => return None,
            }
        }
        Some(NumericData::$variant(out))
    }};
}

/// Column-major element storage of a numeric array.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericData {
    Double(Vec<f64>),
    Single(Vec<f32>),
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    ComplexDouble(Vec<Complex64>),
    ComplexSingle(Vec<Complex32>),
}

impl NumericData {
    pub fn len(&self) -> usize {
        numeric_apply!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn class(&self) -> NumericClass {
        match self {
            NumericData::Double(_) | NumericData::ComplexDouble(_) => NumericClass::Double,
            NumericData::Single(_) | NumericData::ComplexSingle(_) => NumericClass::Single,
            NumericData::Int8(_) => NumericClass::Int8,
            NumericData::UInt8(_) => NumericClass::UInt8,
            NumericData::Int16(_) => NumericClass::Int16,
            NumericData::UInt16(_) => NumericClass::UInt16,
            NumericData::Int32(_) => NumericClass::Int32,
            NumericData::UInt32(_) => NumericClass::UInt32,
            NumericData::Int64(_) => NumericClass::Int64,
            NumericData::UInt64(_) => NumericClass::UInt64,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            NumericData::ComplexDouble(_) | NumericData::ComplexSingle(_)
        )
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            NumericData::Double(_) => ElementKind::Float64,
            NumericData::Single(_) => ElementKind::Float32,
            NumericData::Int8(_) => ElementKind::Int8,
            NumericData::UInt8(_) => ElementKind::UInt8,
            NumericData::Int16(_) => ElementKind::Int16,
            NumericData::UInt16(_) => ElementKind::UInt16,
            NumericData::Int32(_) => ElementKind::Int32,
            NumericData::UInt32(_) => ElementKind::UInt32,
            NumericData::Int64(_) => ElementKind::Int64,
            NumericData::UInt64(_) => ElementKind::UInt64,
            NumericData::ComplexDouble(_) => ElementKind::Complex128,
            NumericData::ComplexSingle(_) => ElementKind::Complex64,
        }
    }

    /// Native-endian bytes of the real component.
    pub fn real_bytes(&self) -> Vec<u8> {
        match self {
            NumericData::Double(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            NumericData::Single(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            NumericData::Int8(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            NumericData::UInt8(v) => v.clone(),
            NumericData::Int16(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            NumericData::UInt16(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            NumericData::Int32(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            NumericData::UInt32(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            NumericData::Int64(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            NumericData::UInt64(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            NumericData::ComplexDouble(v) => {
                let re: Vec<f64> = v.iter().map(|c| c.re).collect();
                bytemuck::cast_slice::<_, u8>(re.as_slice()).to_vec()
            }
            NumericData::ComplexSingle(v) => {
                let re: Vec<f32> = v.iter().map(|c| c.re).collect();
                bytemuck::cast_slice::<_, u8>(re.as_slice()).to_vec()
            }
        }
    }

    /// Native-endian bytes of the imaginary component, `None` for real data.
    pub fn imag_bytes(&self) -> Option<Vec<u8>> {
        match self {
            NumericData::ComplexDouble(v) => {
                let im: Vec<f64> = v.iter().map(|c| c.im).collect();
                Some(bytemuck::cast_slice::<_, u8>(im.as_slice()).to_vec())
            }
            NumericData::ComplexSingle(v) => {
                let im: Vec<f32> = v.iter().map(|c| c.im).collect();
                Some(bytemuck::cast_slice::<_, u8>(im.as_slice()).to_vec())
            }
            _ => None,
        }
    }

    /// Rebuild typed data from raw component buffers copied out of an mxArray.
    pub fn from_bytes(class: NumericClass, real: &[u8], imag: Option<&[u8]>) -> Result<Self> {
        if let Some(imag) = imag {
            if imag.len() != real.len() {
                return Err(MxError::InvalidShape(format!(
                    "imaginary buffer has {} bytes, real buffer has {}",
                    imag.len(),
                    real.len()
                )));
            }
            return match class {
                NumericClass::Double => {
                    let re: Vec<f64> = typed_from_bytes(real)?;
                    let im: Vec<f64> = typed_from_bytes(imag)?;
                    Ok(NumericData::ComplexDouble(
                        re.into_iter().zip(im).map(|(r, i)| Complex64::new(r, i)).collect(),
                    ))
                }
                NumericClass::Single => {
                    let re: Vec<f32> = typed_from_bytes(real)?;
                    let im: Vec<f32> = typed_from_bytes(imag)?;
                    Ok(NumericData::ComplexSingle(
                        re.into_iter().zip(im).map(|(r, i)| Complex32::new(r, i)).collect(),
                    ))
                }
                other => Err(MxError::unsupported(format!(
                    "complex {} arrays",
                    other.class_id()
                ))),
            };
        }
        let data = match class {
            NumericClass::Double => NumericData::Double(typed_from_bytes(real)?),
            NumericClass::Single => NumericData::Single(typed_from_bytes(real)?),
            NumericClass::Int8 => NumericData::Int8(typed_from_bytes(real)?),
            NumericClass::UInt8 => NumericData::UInt8(real.to_vec()),
            NumericClass::Int16 => NumericData::Int16(typed_from_bytes(real)?),
            NumericClass::UInt16 => NumericData::UInt16(typed_from_bytes(real)?),
            NumericClass::Int32 => NumericData::Int32(typed_from_bytes(real)?),
            NumericClass::UInt32 => NumericData::UInt32(typed_from_bytes(real)?),
            NumericClass::Int64 => NumericData::Int64(typed_from_bytes(real)?),
            NumericClass::UInt64 => NumericData::UInt64(typed_from_bytes(real)?),
        };
        Ok(data)
    }

    /// One-element data holding the element at `index`.
    pub fn select(&self, index: usize) -> Option<NumericData> {
        if index >= self.len() {
            return None;
        }
        Some(numeric_map!(self, v => vec![v[index]]))
    }

    /// Concatenate parts that all share one variant; `None` on a mismatch.
    pub fn concat(parts: &[&NumericData]) -> Option<NumericData> {
        match parts.first()? {
            NumericData::Double(_) => concat_variant!(parts, Double),
            NumericData::Single(_) => concat_variant!(parts, Single),
            NumericData::Int8(_) => concat_variant!(parts, Int8),
            NumericData::UInt8(_) => concat_variant!(parts, UInt8),
            NumericData::Int16(_) => concat_variant!(parts, Int16),
            NumericData::UInt16(_) => concat_variant!(parts, UInt16),
            NumericData::Int32(_) => concat_variant!(parts, Int32),
            NumericData::UInt32(_) => concat_variant!(parts, UInt32),
            NumericData::Int64(_) => concat_variant!(parts, Int64),
            NumericData::UInt64(_) => concat_variant!(parts, UInt64),
            NumericData::ComplexDouble(_) => concat_variant!(parts, ComplexDouble),
            NumericData::ComplexSingle(_) => concat_variant!(parts, ComplexSingle),
        }
    }

    /// Real part of the element at `index` widened to `f64`.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        let value = match self {
            NumericData::Double(v) => *v.get(index)?,
            NumericData::Single(v) => f64::from(*v.get(index)?),
            NumericData::Int8(v) => f64::from(*v.get(index)?),
            NumericData::UInt8(v) => f64::from(*v.get(index)?),
            NumericData::Int16(v) => f64::from(*v.get(index)?),
            NumericData::UInt16(v) => f64::from(*v.get(index)?),
            NumericData::Int32(v) => f64::from(*v.get(index)?),
            NumericData::UInt32(v) => f64::from(*v.get(index)?),
            NumericData::Int64(v) => *v.get(index)? as f64,
            NumericData::UInt64(v) => *v.get(index)? as f64,
            NumericData::ComplexDouble(v) => v.get(index)?.re,
            NumericData::ComplexSingle(v) => f64::from(v.get(index)?.re),
        };
        Some(value)
    }

    fn format_element(&self, index: usize) -> String {
        match self {
            NumericData::ComplexDouble(v) => format_complex(v[index].re, v[index].im),
            NumericData::ComplexSingle(v) => {
                format_complex(f64::from(v[index].re), f64::from(v[index].im))
            }
            _ => numeric_apply!(self, v => v[index].to_string()),
        }
    }
}

fn format_complex(re: f64, im: f64) -> String {
    if im < 0.0 {
        format!("{re}-{}i", -im)
    } else {
        format!("{re}+{im}i")
    }
}

/// Copy raw bytes into a freshly allocated, correctly aligned typed buffer.
fn typed_from_bytes<T: bytemuck::Pod>(bytes: &[u8]) -> Result<Vec<T>> {
    let size = std::mem::size_of::<T>();
    if bytes.len() % size != 0 {
        return Err(MxError::InvalidShape(format!(
            "{} bytes is not a whole number of {}-byte elements",
            bytes.len(),
            size
        )));
    }
    let mut out = vec![T::zeroed(); bytes.len() / size];
    bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    pub data: NumericData,
    pub shape: Vec<usize>, // Column-major layout
}

impl NumericArray {
    pub fn new(data: NumericData, shape: Vec<usize>) -> std::result::Result<Self, String> {
        let expected = shape::numel(&shape);
        if data.len() != expected {
            return Err(format!(
                "Numeric data length {} doesn't match shape {:?} ({} elements)",
                data.len(),
                shape,
                expected
            ));
        }
        Ok(NumericArray { data, shape })
    }

    /// Build from row-major data, e.g. nested host lists.
    pub fn from_row_major(
        data: NumericData,
        shape: Vec<usize>,
    ) -> std::result::Result<Self, String> {
        let array = Self::new(data, shape)?;
        let shape = array.shape;
        let data = numeric_map!(&array.data, v => shape::row_major_to_column_major(v, &shape));
        Ok(NumericArray { data, shape })
    }

    pub fn row(data: Vec<f64>) -> Self {
        let n = data.len();
        NumericArray { data: NumericData::Double(data), shape: vec![1, n] }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn class(&self) -> NumericClass {
        self.data.class()
    }

    pub fn is_complex(&self) -> bool {
        self.data.is_complex()
    }

    pub fn kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn index_of(&self, index: &[usize]) -> Option<usize> {
        shape::index_of(&self.shape, index)
    }

    pub fn get_f64(&self, index: &[usize]) -> Option<f64> {
        self.data.get_f64(self.index_of(index)?)
    }

    pub fn squeezed(&self) -> Self {
        NumericArray { data: self.data.clone(), shape: shape::squeeze(&self.shape) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalArray {
    pub data: Vec<bool>,
    pub shape: Vec<usize>,
}

impl LogicalArray {
    pub fn new(data: Vec<bool>, shape: Vec<usize>) -> std::result::Result<Self, String> {
        let expected = shape::numel(&shape);
        if data.len() != expected {
            return Err(format!(
                "Logical data length {} doesn't match shape {:?} ({} elements)",
                data.len(),
                shape,
                expected
            ));
        }
        Ok(LogicalArray { data, shape })
    }

    pub fn get(&self, index: &[usize]) -> Option<bool> {
        shape::index_of(&self.shape, index).map(|i| self.data[i])
    }

    pub fn squeezed(&self) -> Self {
        LogicalArray { data: self.data.clone(), shape: shape::squeeze(&self.shape) }
    }
}

/// Cell array. A `None` slot is an uninitialized cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellArray {
    pub data: Vec<Option<Value>>,
    pub shape: Vec<usize>,
}

impl CellArray {
    pub fn new(data: Vec<Option<Value>>, shape: Vec<usize>) -> std::result::Result<Self, String> {
        let expected = shape::numel(&shape);
        if data.len() != expected {
            return Err(format!(
                "Cell data length {} doesn't match shape {:?} ({} elements)",
                data.len(),
                shape,
                expected
            ));
        }
        Ok(CellArray { data, shape })
    }

    /// Slot at a column-major multi-index.
    pub fn get(&self, index: &[usize]) -> Option<&Option<Value>> {
        shape::index_of(&self.shape, index).map(|i| &self.data[i])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Values of one struct field across every element of a struct array.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldColumn {
    Numeric(NumericData),
    Logical(Vec<bool>),
    Text(Vec<String>),
    /// Heterogeneous column; `None` entries are uninitialized fields.
    Mixed(Vec<Option<Value>>),
}

impl FieldColumn {
    /// Pick a uniform column type when every entry is a scalar of one kind
    /// (or text); anything composite, missing or mixed stays per-slot.
    pub fn from_entries(entries: Vec<Option<Value>>) -> Self {
        if entries.is_empty() {
            return FieldColumn::Mixed(entries);
        }
        if entries.iter().all(|e| matches!(e, Some(Value::Text(_)))) {
            let texts = entries
                .into_iter()
                .filter_map(|e| match e {
                    Some(Value::Text(s)) => Some(s),
                    _ => None,
                })
                .collect();
            return FieldColumn::Text(texts);
        }
        if entries
            .iter()
            .all(|e| matches!(e, Some(Value::Logical(a)) if a.data.len() == 1))
        {
            let flags = entries
                .iter()
                .filter_map(|e| match e {
                    Some(Value::Logical(a)) => a.data.first().copied(),
                    _ => None,
                })
                .collect();
            return FieldColumn::Logical(flags);
        }
        let scalars: Option<Vec<&NumericData>> = entries
            .iter()
            .map(|e| match e {
                Some(Value::Numeric(a)) if a.len() == 1 => Some(&a.data),
                _ => None,
            })
            .collect();
        if let Some(column) = scalars.and_then(|parts| NumericData::concat(&parts)) {
            return FieldColumn::Numeric(column);
        }
        FieldColumn::Mixed(entries)
    }

    pub fn len(&self) -> usize {
        match self {
            FieldColumn::Numeric(d) => d.len(),
            FieldColumn::Logical(v) => v.len(),
            FieldColumn::Text(v) => v.len(),
            FieldColumn::Mixed(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of element `index`; `None` when out of range or uninitialized.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            FieldColumn::Numeric(d) => d
                .select(index)
                .map(|data| Value::Numeric(NumericArray { data, shape: vec![1] })),
            FieldColumn::Logical(v) => v
                .get(index)
                .map(|&b| Value::Logical(LogicalArray { data: vec![b], shape: vec![1] })),
            FieldColumn::Text(v) => v.get(index).cloned().map(Value::Text),
            FieldColumn::Mixed(v) => v.get(index).cloned().flatten(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub column: FieldColumn,
}

/// Struct array: every element shares the same ordered field list.
#[derive(Debug, Clone, PartialEq)]
pub struct StructArray {
    pub shape: Vec<usize>,
    pub fields: Vec<StructField>,
}

impl StructArray {
    pub fn new(shape: Vec<usize>, fields: Vec<StructField>) -> std::result::Result<Self, String> {
        let expected = shape::numel(&shape);
        for (i, field) in fields.iter().enumerate() {
            if field.column.len() != expected {
                return Err(format!(
                    "Field '{}' has {} values, struct shape {:?} needs {}",
                    field.name,
                    field.column.len(),
                    shape,
                    expected
                ));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(format!("Duplicate field name '{}'", field.name));
            }
        }
        Ok(StructArray { shape, fields })
    }

    /// Assemble from per-element records laid out in column-major order;
    /// `records[i][f]` is field `f` of element `i`.
    pub fn from_records(
        shape: Vec<usize>,
        names: Vec<String>,
        records: Vec<Vec<Option<Value>>>,
    ) -> std::result::Result<Self, String> {
        let mut columns: Vec<Vec<Option<Value>>> =
            names.iter().map(|_| Vec::with_capacity(records.len())).collect();
        for (i, record) in records.into_iter().enumerate() {
            if record.len() != names.len() {
                return Err(format!(
                    "Record {} has {} values for {} fields",
                    i,
                    record.len(),
                    names.len()
                ));
            }
            for (column, value) in columns.iter_mut().zip(record) {
                column.push(value);
            }
        }
        let fields = names
            .into_iter()
            .zip(columns)
            .map(|(name, entries)| StructField { name, column: FieldColumn::from_entries(entries) })
            .collect();
        Self::new(shape, fields)
    }

    /// A struct with no fields and no elements.
    pub fn empty() -> Self {
        StructArray { shape: vec![0], fields: Vec::new() }
    }

    pub fn len(&self) -> usize {
        shape::numel(&self.shape)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldColumn> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.column)
    }

    pub fn get(&self, element: usize, name: &str) -> Option<Value> {
        self.field(name)?.get(element)
    }
}

/// Host-side value exchanged with the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Numeric(NumericArray),
    Logical(LogicalArray),
    Text(String),
    Cell(CellArray),
    Struct(StructArray),
}

impl Value {
    pub fn kind(&self) -> ElementKind {
        match self {
            Value::Numeric(a) => a.kind(),
            Value::Logical(_) => ElementKind::Bool,
            Value::Text(_) => ElementKind::Text,
            Value::Cell(_) | Value::Struct(_) => ElementKind::Generic,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Numeric(a) => a.class().class_id().name(),
            Value::Logical(_) => "logical",
            Value::Text(_) => "char",
            Value::Cell(_) => "cell",
            Value::Struct(_) => "struct",
        }
    }

    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            Value::Numeric(a) => Some(&a.shape),
            Value::Logical(a) => Some(&a.shape),
            Value::Text(_) => None,
            Value::Cell(a) => Some(&a.shape),
            Value::Struct(a) => Some(&a.shape),
        }
    }

    /// The single element of a one-element numeric or logical array.
    pub fn as_scalar_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(a) if a.len() == 1 => a.data.get_f64(0),
            Value::Logical(a) if a.data.len() == 1 => Some(if a.data[0] { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The value as `decode` would return it after an encode round trip.
    pub fn squeezed(&self) -> Value {
        match self {
            Value::Numeric(a) => Value::Numeric(a.squeezed()),
            Value::Logical(a) => Value::Logical(a.squeezed()),
            Value::Text(s) => Value::Text(s.clone()),
            Value::Cell(c) => Value::Cell(CellArray {
                data: c.data.iter().map(|v| v.as_ref().map(Value::squeezed)).collect(),
                shape: shape::squeeze(&c.shape),
            }),
            Value::Struct(s) => Value::Struct(StructArray {
                shape: shape::squeeze(&s.shape),
                fields: s
                    .fields
                    .iter()
                    .map(|f| StructField {
                        name: f.name.clone(),
                        column: match &f.column {
                            FieldColumn::Mixed(v) => FieldColumn::from_entries(
                                v.iter().map(|e| e.as_ref().map(Value::squeezed)).collect(),
                            ),
                            other => other.clone(),
                        },
                    })
                    .collect(),
            }),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Numeric(NumericArray { data: NumericData::Double(vec![x]), shape: vec![1, 1] })
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Numeric(NumericArray { data: NumericData::Single(vec![x]), shape: vec![1, 1] })
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Numeric(NumericArray { data: NumericData::Int32(vec![i]), shape: vec![1, 1] })
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Numeric(NumericArray { data: NumericData::Int64(vec![i]), shape: vec![1, 1] })
    }
}

impl From<Complex64> for Value {
    fn from(c: Complex64) -> Self {
        Value::Numeric(NumericArray {
            data: NumericData::ComplexDouble(vec![c]),
            shape: vec![1, 1],
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Logical(LogicalArray { data: vec![b], shape: vec![1, 1] })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Numeric(NumericArray::row(v))
    }
}

impl From<NumericArray> for Value {
    fn from(a: NumericArray) -> Self {
        Value::Numeric(a)
    }
}

impl From<LogicalArray> for Value {
    fn from(a: LogicalArray) -> Self {
        Value::Logical(a)
    }
}

impl From<CellArray> for Value {
    fn from(c: CellArray) -> Self {
        Value::Cell(c)
    }
}

impl From<StructArray> for Value {
    fn from(s: StructArray) -> Self {
        Value::Struct(s)
    }
}

fn write_matrix(
    f: &mut impl fmt::Write,
    shape: &[usize],
    len: usize,
    element: impl Fn(usize) -> String,
) -> fmt::Result {
    match shape.len() {
        0 | 1 => {
            // Treat as row vector for display
            write!(f, "[")?;
            for i in 0..len {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", element(i))?;
            }
            write!(f, "]")
        }
        2 => {
            let (rows, cols) = (shape[0], shape[1]);
            write!(f, "[")?;
            for r in 0..rows {
                for c in 0..cols {
                    if c > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", element(r + c * rows))?;
                }
                if r + 1 < rows {
                    write!(f, "; ")?;
                }
            }
            write!(f, "]")
        }
        _ => write!(f, "<{} array>", dims_label(shape)),
    }
}

fn dims_label(shape: &[usize]) -> String {
    shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("x")
}

impl fmt::Display for NumericArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_matrix(f, &self.shape, self.len(), |i| self.data.format_element(i))
    }
}

impl fmt::Display for LogicalArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_matrix(f, &self.shape, self.data.len(), |i| {
            if self.data[i] { "1" } else { "0" }.to_string()
        })
    }
}

impl fmt::Display for CellArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inner = String::new();
        write_matrix(&mut inner, &self.shape, self.data.len(), |i| match &self.data[i] {
            Some(v) => v.to_string(),
            None => "[]".to_string(),
        })?;
        // Swap the matrix brackets for cell braces
        match inner.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Some(body) => write!(f, "{{{body}}}"),
            None => write!(f, "{inner}"),
        }
    }
}

impl fmt::Display for StructArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} struct array with fields: {}",
            dims_label(&self.shape),
            self.field_names().join(", ")
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(a) => write!(f, "{a}"),
            Value::Logical(a) => write!(f, "{a}"),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Cell(c) => write!(f, "{c}"),
            Value::Struct(s) => write!(f, "{s}"),
        }
    }
}
