//! [`Value`] → mxArray conversion.

use log::trace;

use crate::api::{MxApi, OwnedArray};
use crate::class::class_for_kind;
use crate::coerce;
use crate::error::{MxError, Result};
use crate::shape::{at_least_2d, numel};
use crate::value::{CellArray, LogicalArray, NumericArray, StructArray, Value};

/// Build a new mxArray for `value`. The caller owns the result.
///
/// Children are moved into their container as soon as they are built, so a
/// failure part-way through releases everything allocated so far when the
/// partially filled container is dropped.
pub fn encode<'a, A: MxApi + ?Sized>(api: &'a A, value: &Value) -> Result<OwnedArray<'a, A>> {
    match value {
        Value::Text(text) => {
            trace!("encoding text of {} bytes", text.len());
            if text.contains('\0') {
                return Err(MxError::unsupported("char data with an embedded NUL"));
            }
            Ok(OwnedArray::new(api, api.create_string(text)?))
        }
        Value::Numeric(array) => encode_numeric(api, array),
        Value::Logical(array) => encode_logical(api, array),
        Value::Cell(cell) => encode_cell(api, cell),
        Value::Struct(record) => encode_struct(api, record),
    }
}

/// Coerce a JSON document into a host value and encode it.
pub fn encode_json<'a, A: MxApi + ?Sized>(
    api: &'a A,
    json: &serde_json::Value,
) -> Result<OwnedArray<'a, A>> {
    let value = coerce::from_json(json)?;
    encode(api, &value)
}

fn encode_numeric<'a, A: MxApi + ?Sized>(
    api: &'a A,
    array: &NumericArray,
) -> Result<OwnedArray<'a, A>> {
    let kind = array.kind();
    let class = class_for_kind(kind)?;
    let dims = at_least_2d(&array.shape);
    trace!("encoding {} array {:?}", kind, dims);

    let out = OwnedArray::new(api, api.create_numeric(&dims, class, kind.is_complex())?);
    api.write_real(out.handle(), &array.data.real_bytes())?;
    if let Some(imag) = array.data.imag_bytes() {
        api.write_imag(out.handle(), &imag)?;
    }
    Ok(out)
}

fn encode_logical<'a, A: MxApi + ?Sized>(
    api: &'a A,
    array: &LogicalArray,
) -> Result<OwnedArray<'a, A>> {
    let dims = at_least_2d(&array.shape);
    let out = OwnedArray::new(api, api.create_logical(&dims)?);
    let bytes: Vec<u8> = array.data.iter().map(|&b| u8::from(b)).collect();
    api.write_real(out.handle(), &bytes)?;
    Ok(out)
}

fn encode_cell<'a, A: MxApi + ?Sized>(api: &'a A, cell: &CellArray) -> Result<OwnedArray<'a, A>> {
    let dims = at_least_2d(&cell.shape);
    let out = OwnedArray::new(api, api.create_cell(&dims)?);
    for (i, slot) in cell.data.iter().enumerate() {
        // Empty slots stay uninitialized
        if let Some(value) = slot {
            let child = encode(api, value)?;
            api.set_cell(out.handle(), i, child.into_handle())?;
        }
    }
    Ok(out)
}

fn encode_struct<'a, A: MxApi + ?Sized>(
    api: &'a A,
    record: &StructArray,
) -> Result<OwnedArray<'a, A>> {
    let n = numel(&record.shape);
    if let Some(field) = record.fields.iter().find(|f| f.column.len() != n) {
        return Err(MxError::InvalidShape(format!(
            "field '{}' has {} values, struct shape {:?} needs {}",
            field.name,
            field.column.len(),
            record.shape,
            n
        )));
    }
    let dims = at_least_2d(&record.shape);
    let names = record.field_names();
    let out = OwnedArray::new(api, api.create_struct(&dims, &names)?);
    for i in 0..n {
        for field in &record.fields {
            // Uninitialized fields stay unset.
            let Some(value) = field.column.get(i) else {
                continue;
            };
            let child = encode(api, &value)?;
            api.set_field(out.handle(), i, &field.name, child.into_handle())?;
        }
    }
    Ok(out)
}
