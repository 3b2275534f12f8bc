//! mxArray → [`Value`] conversion.

use log::trace;

use crate::api::MxApi;
use crate::class::{kind_for_class, ClassId, ElementKind};
use crate::error::{MxError, Result};
use crate::shape::squeeze;
use crate::value::{CellArray, LogicalArray, NumericArray, NumericData, StructArray, Value};

/// Upper bound on UTF-8 bytes produced per UTF-16 code unit of char data.
const UTF8_BYTES_PER_CHAR: usize = 4;

/// Convert an mxArray into a host value.
///
/// The input handle is only read; destroying it stays with the caller.
/// Cells and fields are borrowed from `array` and are not destroyed here.
pub fn decode<A: MxApi + ?Sized>(api: &A, array: A::Handle) -> Result<Value> {
    let class = api.class_id(array);
    trace!("decoding {} array {:?}", class, array);

    if api.is_sparse(array) {
        return Err(MxError::unsupported(format!("sparse {} arrays", class)));
    }
    if api.is_numeric(array) {
        return decode_numeric(api, array, class).map(Value::Numeric);
    }
    match class {
        ClassId::Char => decode_char(api, array).map(Value::Text),
        ClassId::Logical => decode_logical(api, array).map(Value::Logical),
        ClassId::Cell => decode_cell(api, array).map(Value::Cell),
        ClassId::Struct => decode_struct(api, array).map(Value::Struct),
        _ => Err(MxError::unsupported(format!(
            "{}-arrays are not supported",
            api.class_name(array)
        ))),
    }
}

fn byte_len<A: MxApi + ?Sized>(api: &A, array: A::Handle) -> Result<usize> {
    let numel = api.number_of_elements(array);
    let elem_size = api.element_size(array);
    numel.checked_mul(elem_size).ok_or_else(|| {
        MxError::InvalidShape(format!("{numel} elements of {elem_size} bytes overflow"))
    })
}

fn decode_numeric<A: MxApi + ?Sized>(
    api: &A,
    array: A::Handle,
    class: ClassId,
) -> Result<NumericArray> {
    let numeric = class
        .numeric()
        .ok_or_else(|| MxError::unsupported(format!("numeric class {class}")))?;
    let complex = api.is_complex(array);
    if kind_for_class(class, complex) == ElementKind::Generic {
        let prefix = if complex { "complex " } else { "" };
        return Err(MxError::unsupported(format!("{prefix}{class} arrays")));
    }
    let elem_size = api.element_size(array);
    if elem_size != numeric.element_size() {
        return Err(MxError::unsupported(format!(
            "{class} arrays with {elem_size}-byte elements"
        )));
    }

    let size = byte_len(api, array)?;
    let mut real = vec![0u8; size];
    api.read_real(array, &mut real)?;
    let imag = if complex {
        let mut imag = vec![0u8; size];
        api.read_imag(array, &mut imag)?;
        Some(imag)
    } else {
        None
    };

    let data = NumericData::from_bytes(numeric, &real, imag.as_deref())?;
    let dims = api.dimensions(array);
    NumericArray::new(data, squeeze(&dims)).map_err(MxError::InvalidShape)
}

fn decode_char<A: MxApi + ?Sized>(api: &A, array: A::Handle) -> Result<String> {
    let capacity = api.number_of_elements(array) * UTF8_BYTES_PER_CHAR + 1;
    let bytes = api.read_string(array, capacity)?;
    String::from_utf8(bytes)
        .map_err(|e| MxError::unsupported(format!("char data that is not valid UTF-8 ({e})")))
}

fn decode_logical<A: MxApi + ?Sized>(api: &A, array: A::Handle) -> Result<LogicalArray> {
    let size = byte_len(api, array)?;
    let mut raw = vec![0u8; size];
    api.read_real(array, &mut raw)?;
    let data = raw.into_iter().map(|b| b != 0).collect();
    let dims = api.dimensions(array);
    LogicalArray::new(data, squeeze(&dims)).map_err(MxError::InvalidShape)
}

fn decode_cell<A: MxApi + ?Sized>(api: &A, array: A::Handle) -> Result<CellArray> {
    let numel = api.number_of_elements(array);
    let mut data = Vec::with_capacity(numel);
    for i in 0..numel {
        let slot = match api.cell(array, i) {
            Some(cell) => Some(decode(api, cell)?),
            None => None,
        };
        data.push(slot);
    }
    let dims = api.dimensions(array);
    CellArray::new(data, squeeze(&dims)).map_err(MxError::InvalidShape)
}

fn decode_struct<A: MxApi + ?Sized>(api: &A, array: A::Handle) -> Result<StructArray> {
    let field_count = api.number_of_fields(array)?;
    if field_count == 0 {
        return Ok(StructArray::empty());
    }
    let names = (0..field_count)
        .map(|i| api.field_name(array, i))
        .collect::<Result<Vec<_>>>()?;

    let numel = api.number_of_elements(array);
    let mut records = Vec::with_capacity(numel);
    for i in 0..numel {
        let mut record = Vec::with_capacity(names.len());
        for name in &names {
            let value = match api.field(array, i, name) {
                Some(field) => Some(decode(api, field)?),
                None => None,
            };
            record.push(value);
        }
        records.push(record);
    }

    let dims = api.dimensions(array);
    StructArray::from_records(squeeze(&dims), names, records).map_err(MxError::InvalidShape)
}
