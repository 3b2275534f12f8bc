//! An in-process mxArray store implementing [`MxApi`].
//!
//! `MemoryApi` follows the libmx ownership and layout rules closely enough
//! to exercise the decoder and encoder without a MATLAB installation: dims
//! are padded to two and lose trailing singletons, char data is UTF-16, and
//! cells and fields are owned by their container. Every allocation and free
//! is counted so leak checks can assert on [`MemoryApi::live_arrays`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;

use log::{trace, warn};

use crate::api::{MxApi, OwnedArray};
use crate::class::ClassId;
use crate::error::{MxError, Result};
use crate::shape::{matlab_dims, numel};

/// Opaque handle into a [`MemoryApi`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemHandle(u64);

/// Array payload. `C` is the child representation: handles inside the
/// table, nested trees in an exported copy.
#[derive(Debug, Clone, PartialEq)]
pub enum MemStorage<C> {
    /// Numeric and logical data, one buffer per component.
    Bytes { real: Vec<u8>, imag: Option<Vec<u8>> },
    Chars(Vec<u16>),
    Cells(Vec<Option<C>>),
    /// Field values laid out element-major: `values[index * names.len() + field]`.
    Fields {
        names: Vec<String>,
        values: Vec<Option<C>>,
    },
    /// Classes with no accessible payload (function handles, objects, ...).
    Opaque,
}

/// A detached deep copy of an array, independent of any table.
#[derive(Debug, Clone, PartialEq)]
pub struct MemTree {
    pub class: ClassId,
    pub dims: Vec<usize>,
    pub sparse: bool,
    pub storage: MemStorage<MemTree>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemStats {
    pub created: usize,
    pub destroyed: usize,
    /// Frees of unknown handles or of arrays owned by a container.
    pub invalid_frees: usize,
}

#[derive(Debug)]
struct MemArray {
    class: ClassId,
    dims: Vec<usize>,
    sparse: bool,
    contained: bool,
    storage: MemStorage<MemHandle>,
}

impl MemArray {
    fn new(class: ClassId, dims: Vec<usize>, storage: MemStorage<MemHandle>) -> Self {
        Self {
            class,
            dims,
            sparse: false,
            contained: false,
            storage,
        }
    }

    fn children(&self) -> Vec<MemHandle> {
        match &self.storage {
            MemStorage::Cells(slots) | MemStorage::Fields { values: slots, .. } => {
                slots.iter().flatten().copied().collect()
            }
            _ => Vec::new(),
        }
    }

    fn element_size(&self) -> usize {
        match &self.storage {
            MemStorage::Bytes { .. } if self.class == ClassId::Logical => 1,
            MemStorage::Bytes { .. } => self.class.numeric().map_or(0, |c| c.element_size()),
            MemStorage::Chars(_) => mem::size_of::<u16>(),
            MemStorage::Cells(_) | MemStorage::Fields { .. } => mem::size_of::<usize>(),
            MemStorage::Opaque => 0,
        }
    }
}

#[derive(Debug, Default)]
struct Table {
    arrays: HashMap<u64, MemArray>,
    next_id: u64,
    stats: MemStats,
    allocation_budget: Option<usize>,
}

impl Table {
    fn remove_tree(&mut self, id: u64) {
        let Some(array) = self.arrays.remove(&id) else {
            return;
        };
        self.stats.destroyed += 1;
        for child in array.children() {
            self.remove_tree(child.0);
        }
    }

    fn export(&self, id: u64) -> Option<MemTree> {
        let array = self.arrays.get(&id)?;
        let export_slots = |slots: &[Option<MemHandle>]| {
            slots
                .iter()
                .map(|slot| match slot {
                    Some(h) => self.export(h.0).map(Some),
                    None => Some(None),
                })
                .collect::<Option<Vec<_>>>()
        };
        let storage = match &array.storage {
            MemStorage::Bytes { real, imag } => MemStorage::Bytes {
                real: real.clone(),
                imag: imag.clone(),
            },
            MemStorage::Chars(chars) => MemStorage::Chars(chars.clone()),
            MemStorage::Cells(slots) => MemStorage::Cells(export_slots(slots)?),
            MemStorage::Fields { names, values } => MemStorage::Fields {
                names: names.clone(),
                values: export_slots(values)?,
            },
            MemStorage::Opaque => MemStorage::Opaque,
        };
        Some(MemTree {
            class: array.class,
            dims: array.dims.clone(),
            sparse: array.sparse,
            storage,
        })
    }
}

/// In-process [`MxApi`] with allocation accounting.
#[derive(Debug, Default)]
pub struct MemoryApi {
    table: RefCell<Table>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arrays allocated and not yet freed, including contained children.
    pub fn live_arrays(&self) -> usize {
        self.table.borrow().arrays.len()
    }

    pub fn stats(&self) -> MemStats {
        self.table.borrow().stats
    }

    /// Let the next `n` allocations succeed and fail every one after that.
    pub fn fail_allocations_after(&self, n: usize) {
        self.table.borrow_mut().allocation_budget = Some(n);
    }

    pub fn clear_allocation_failures(&self) {
        self.table.borrow_mut().allocation_budget = None;
    }

    /// An array of a class the decoder has no conversion for.
    pub fn create_unsupported(&self, class: ClassId, dims: &[usize]) -> Result<MemHandle> {
        let array = MemArray::new(class, matlab_dims(dims), MemStorage::Opaque);
        self.allocate("mxCreateUninitNumericArray", array)
    }

    /// A sparse double matrix. Only its flags are meaningful.
    pub fn create_sparse_double(&self, dims: &[usize]) -> Result<MemHandle> {
        let handle = self.create_numeric(dims, ClassId::Double, false)?;
        if let Some(array) = self.table.borrow_mut().arrays.get_mut(&handle.0) {
            array.sparse = true;
        }
        Ok(handle)
    }

    /// Deep copy of an array and everything it contains.
    pub fn export(&self, array: MemHandle) -> Result<MemTree> {
        self.table
            .borrow()
            .export(array.0)
            .ok_or_else(|| MxError::call_failed("mxDuplicateArray", "NULL", format!("{array:?}")))
    }

    /// Rebuild an exported tree as a new owned array.
    pub fn import(&self, tree: &MemTree) -> Result<MemHandle> {
        let (storage, children) = match &tree.storage {
            MemStorage::Bytes { real, imag } => (
                MemStorage::Bytes {
                    real: real.clone(),
                    imag: imag.clone(),
                },
                Vec::new(),
            ),
            MemStorage::Chars(chars) => (MemStorage::Chars(chars.clone()), Vec::new()),
            MemStorage::Cells(slots) => (
                MemStorage::Cells(vec![None; slots.len()]),
                slots.iter().collect(),
            ),
            MemStorage::Fields { names, values } => (
                MemStorage::Fields {
                    names: names.clone(),
                    values: vec![None; values.len()],
                },
                values.iter().collect(),
            ),
            MemStorage::Opaque => (MemStorage::Opaque, Vec::new()),
        };
        let mut array = MemArray::new(tree.class, tree.dims.clone(), storage);
        array.sparse = tree.sparse;
        let parent = OwnedArray::new(self, self.allocate("mxDuplicateArray", array)?);
        for (slot, child) in children.into_iter().enumerate() {
            if let Some(child) = child {
                let handle = self.import(child)?;
                self.attach(parent.handle(), slot, handle);
            }
        }
        Ok(parent.into_handle())
    }

    fn allocate(&self, function: &str, array: MemArray) -> Result<MemHandle> {
        let mut table = self.table.borrow_mut();
        if let Some(budget) = table.allocation_budget.as_mut() {
            if *budget == 0 {
                return Err(MxError::call_failed(
                    function,
                    "NULL",
                    format!("{:?}", array.dims),
                ));
            }
            *budget -= 1;
        }
        table.next_id += 1;
        let id = table.next_id;
        table.stats.created += 1;
        trace!("allocated {} array #{id} {:?}", array.class, array.dims);
        table.arrays.insert(id, array);
        Ok(MemHandle(id))
    }

    fn with_array<T>(&self, array: MemHandle, f: impl FnOnce(&MemArray) -> T) -> Option<T> {
        self.table.borrow().arrays.get(&array.0).map(f)
    }

    /// Store `child` in `slot` of a container, freeing any previous occupant.
    fn attach(&self, parent: MemHandle, slot: usize, child: MemHandle) {
        let mut table = self.table.borrow_mut();
        if let Some(array) = table.arrays.get_mut(&child.0) {
            array.contained = true;
        }
        let previous = match table.arrays.get_mut(&parent.0).map(|a| &mut a.storage) {
            Some(MemStorage::Cells(slots)) | Some(MemStorage::Fields { values: slots, .. }) => {
                slots.get_mut(slot).and_then(|s| s.replace(child))
            }
            _ => None,
        };
        if let Some(previous) = previous {
            table.remove_tree(previous.0);
        }
    }

    /// Whether `value` may be moved into a container: it exists, is not
    /// already owned by one and is not `parent` itself.
    fn is_movable(&self, parent: MemHandle, value: MemHandle) -> bool {
        parent != value && self.with_array(value, |a| !a.contained).unwrap_or(false)
    }

    fn reject_move(&self, function: &str, value: MemHandle, arguments: String) -> MxError {
        self.destroy(value);
        MxError::call_failed(function, "failed", arguments)
    }
}

impl MxApi for MemoryApi {
    type Handle = MemHandle;

    fn dimensions(&self, array: MemHandle) -> Vec<usize> {
        self.with_array(array, |a| a.dims.clone()).unwrap_or_default()
    }

    fn number_of_elements(&self, array: MemHandle) -> usize {
        self.with_array(array, |a| numel(&a.dims)).unwrap_or(0)
    }

    fn element_size(&self, array: MemHandle) -> usize {
        self.with_array(array, MemArray::element_size).unwrap_or(0)
    }

    fn class_id(&self, array: MemHandle) -> ClassId {
        self.with_array(array, |a| a.class).unwrap_or(ClassId::Unknown)
    }

    fn class_name(&self, array: MemHandle) -> String {
        self.class_id(array).name().to_string()
    }

    fn is_numeric(&self, array: MemHandle) -> bool {
        self.class_id(array).numeric().is_some()
    }

    fn is_complex(&self, array: MemHandle) -> bool {
        self.with_array(array, |a| {
            matches!(a.storage, MemStorage::Bytes { imag: Some(_), .. })
        })
        .unwrap_or(false)
    }

    fn is_sparse(&self, array: MemHandle) -> bool {
        self.with_array(array, |a| a.sparse).unwrap_or(false)
    }

    fn read_real(&self, array: MemHandle, out: &mut [u8]) -> Result<()> {
        let table = self.table.borrow();
        match table.arrays.get(&array.0).map(|a| &a.storage) {
            Some(MemStorage::Bytes { real, .. }) if real.len() >= out.len() => {
                out.copy_from_slice(&real[..out.len()]);
                Ok(())
            }
            _ => Err(MxError::call_failed(
                "mxGetData",
                "NULL",
                format!("{array:?}, {} bytes", out.len()),
            )),
        }
    }

    fn read_imag(&self, array: MemHandle, out: &mut [u8]) -> Result<()> {
        let table = self.table.borrow();
        match table.arrays.get(&array.0).map(|a| &a.storage) {
            Some(MemStorage::Bytes {
                imag: Some(imag), ..
            }) if imag.len() >= out.len() => {
                out.copy_from_slice(&imag[..out.len()]);
                Ok(())
            }
            _ => Err(MxError::call_failed(
                "mxGetImagData",
                "NULL",
                format!("{array:?}, {} bytes", out.len()),
            )),
        }
    }

    fn write_real(&self, array: MemHandle, data: &[u8]) -> Result<()> {
        let mut table = self.table.borrow_mut();
        match table.arrays.get_mut(&array.0).map(|a| &mut a.storage) {
            Some(MemStorage::Bytes { real, .. }) if real.len() == data.len() => {
                real.copy_from_slice(data);
                Ok(())
            }
            _ => Err(MxError::call_failed(
                "mxGetData",
                "NULL",
                format!("{array:?}, {} bytes", data.len()),
            )),
        }
    }

    fn write_imag(&self, array: MemHandle, data: &[u8]) -> Result<()> {
        let mut table = self.table.borrow_mut();
        match table.arrays.get_mut(&array.0).map(|a| &mut a.storage) {
            Some(MemStorage::Bytes {
                imag: Some(imag), ..
            }) if imag.len() == data.len() => {
                imag.copy_from_slice(data);
                Ok(())
            }
            _ => Err(MxError::call_failed(
                "mxGetImagData",
                "NULL",
                format!("{array:?}, {} bytes", data.len()),
            )),
        }
    }

    fn read_string(&self, array: MemHandle, capacity: usize) -> Result<Vec<u8>> {
        let table = self.table.borrow();
        let failed = |result: &str| {
            MxError::call_failed("mxGetString", result, format!("{array:?}, {capacity}"))
        };
        let Some(MemStorage::Chars(chars)) = table.arrays.get(&array.0).map(|a| &a.storage) else {
            return Err(failed("1"));
        };
        let text = String::from_utf16(chars).map_err(|_| failed("1"))?;
        if text.len() + 1 > capacity {
            return Err(failed("1"));
        }
        Ok(text.into_bytes())
    }

    fn cell(&self, array: MemHandle, index: usize) -> Option<MemHandle> {
        let table = self.table.borrow();
        match &table.arrays.get(&array.0)?.storage {
            MemStorage::Cells(slots) => slots.get(index).copied().flatten(),
            _ => None,
        }
    }

    fn set_cell(&self, array: MemHandle, index: usize, value: MemHandle) -> Result<()> {
        let fits = self
            .with_array(array, |a| {
                matches!(&a.storage, MemStorage::Cells(slots) if index < slots.len())
            })
            .unwrap_or(false);
        if !fits || !self.is_movable(array, value) {
            return Err(self.reject_move("mxSetCell", value, format!("{array:?}, {index}")));
        }
        self.attach(array, index, value);
        Ok(())
    }

    fn number_of_fields(&self, array: MemHandle) -> Result<usize> {
        self.with_array(array, |a| match &a.storage {
            MemStorage::Fields { names, .. } => Some(names.len()),
            _ => None,
        })
        .flatten()
        .ok_or_else(|| MxError::call_failed("mxGetNumberOfFields", "-1", format!("{array:?}")))
    }

    fn field_name(&self, array: MemHandle, field: usize) -> Result<String> {
        self.with_array(array, |a| match &a.storage {
            MemStorage::Fields { names, .. } => names.get(field).cloned(),
            _ => None,
        })
        .flatten()
        .ok_or_else(|| {
            MxError::call_failed("mxGetFieldNameByNumber", "NULL", format!("{array:?}, {field}"))
        })
    }

    fn field(&self, array: MemHandle, index: usize, name: &str) -> Option<MemHandle> {
        let table = self.table.borrow();
        match &table.arrays.get(&array.0)?.storage {
            MemStorage::Fields { names, values } => {
                let position = names.iter().position(|n| n == name)?;
                values
                    .get(index * names.len() + position)
                    .copied()
                    .flatten()
            }
            _ => None,
        }
    }

    fn set_field(
        &self,
        array: MemHandle,
        index: usize,
        name: &str,
        value: MemHandle,
    ) -> Result<()> {
        let slot = self
            .with_array(array, |a| match &a.storage {
                MemStorage::Fields { names, values } => {
                    let position = names.iter().position(|n| n == name)?;
                    let slot = index * names.len() + position;
                    (slot < values.len()).then_some(slot)
                }
                _ => None,
            })
            .flatten();
        match slot {
            Some(slot) if self.is_movable(array, value) => {
                self.attach(array, slot, value);
                Ok(())
            }
            _ => Err(self.reject_move(
                "mxSetField",
                value,
                format!("{array:?}, {index}, {name}"),
            )),
        }
    }

    fn create_numeric(&self, dims: &[usize], class: ClassId, complex: bool) -> Result<MemHandle> {
        let dims = matlab_dims(dims);
        let bytes = class
            .numeric()
            .and_then(|c| numel(&dims).checked_mul(c.element_size()))
            .ok_or_else(|| {
                MxError::call_failed(
                    "mxCreateNumericArray",
                    "NULL",
                    format!("{dims:?}, {class}, {complex}"),
                )
            })?;
        let storage = MemStorage::Bytes {
            real: vec![0; bytes],
            imag: complex.then(|| vec![0; bytes]),
        };
        self.allocate("mxCreateNumericArray", MemArray::new(class, dims, storage))
    }

    fn create_logical(&self, dims: &[usize]) -> Result<MemHandle> {
        let dims = matlab_dims(dims);
        let storage = MemStorage::Bytes {
            real: vec![0; numel(&dims)],
            imag: None,
        };
        self.allocate(
            "mxCreateLogicalArray",
            MemArray::new(ClassId::Logical, dims, storage),
        )
    }

    fn create_cell(&self, dims: &[usize]) -> Result<MemHandle> {
        let dims = matlab_dims(dims);
        let storage = MemStorage::Cells(vec![None; numel(&dims)]);
        self.allocate("mxCreateCellArray", MemArray::new(ClassId::Cell, dims, storage))
    }

    fn create_struct(&self, dims: &[usize], field_names: &[&str]) -> Result<MemHandle> {
        let dims = matlab_dims(dims);
        let names: Vec<String> = field_names.iter().map(|n| n.to_string()).collect();
        let duplicate = names
            .iter()
            .enumerate()
            .any(|(i, n)| names[..i].contains(n));
        if duplicate {
            return Err(MxError::call_failed(
                "mxCreateStructArray",
                "NULL",
                format!("{dims:?}, {names:?}"),
            ));
        }
        let storage = MemStorage::Fields {
            values: vec![None; numel(&dims) * names.len()],
            names,
        };
        self.allocate(
            "mxCreateStructArray",
            MemArray::new(ClassId::Struct, dims, storage),
        )
    }

    fn create_string(&self, text: &str) -> Result<MemHandle> {
        let chars: Vec<u16> = text.encode_utf16().collect();
        let dims = if chars.is_empty() {
            vec![0, 0]
        } else {
            vec![1, chars.len()]
        };
        self.allocate(
            "mxCreateString",
            MemArray::new(ClassId::Char, dims, MemStorage::Chars(chars)),
        )
    }

    fn destroy(&self, array: MemHandle) {
        let mut table = self.table.borrow_mut();
        let contained = table.arrays.get(&array.0).map(|a| a.contained);
        match contained {
            Some(false) => table.remove_tree(array.0),
            Some(true) => {
                warn!("refusing to free {array:?}: it is owned by a container");
                table.stats.invalid_frees += 1;
            }
            None => {
                warn!("free of unknown array {array:?}");
                table.stats.invalid_frees += 1;
            }
        }
    }
}
