use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::Path;
use std::ptr;

use runmat_mxarray::{ClassId, MxApi, MxError};

use super::library::NativeLibrary;
use super::{c_string, MxPtr, RawMxArray};
use crate::error::Result;

type MxResult<T> = std::result::Result<T, MxError>;

const MX_REAL: c_int = 0;
const MX_COMPLEX: c_int = 1;

struct MxFunctions {
    get_number_of_dimensions: unsafe extern "C" fn(*const RawMxArray) -> usize,
    get_dimensions: unsafe extern "C" fn(*const RawMxArray) -> *const usize,
    get_number_of_elements: unsafe extern "C" fn(*const RawMxArray) -> usize,
    get_element_size: unsafe extern "C" fn(*const RawMxArray) -> usize,
    get_class_id: unsafe extern "C" fn(*const RawMxArray) -> c_int,
    get_class_name: unsafe extern "C" fn(*const RawMxArray) -> *const c_char,
    is_numeric: unsafe extern "C" fn(*const RawMxArray) -> bool,
    is_complex: unsafe extern "C" fn(*const RawMxArray) -> bool,
    is_sparse: unsafe extern "C" fn(*const RawMxArray) -> bool,
    get_data: unsafe extern "C" fn(*const RawMxArray) -> *mut c_void,
    get_imag_data: unsafe extern "C" fn(*const RawMxArray) -> *mut c_void,
    get_string: unsafe extern "C" fn(*const RawMxArray, *mut c_char, usize) -> c_int,
    get_cell: unsafe extern "C" fn(*const RawMxArray, usize) -> *mut RawMxArray,
    set_cell: unsafe extern "C" fn(*mut RawMxArray, usize, *mut RawMxArray),
    get_number_of_fields: unsafe extern "C" fn(*const RawMxArray) -> c_int,
    get_field_name_by_number: unsafe extern "C" fn(*const RawMxArray, c_int) -> *const c_char,
    get_field_number: unsafe extern "C" fn(*const RawMxArray, *const c_char) -> c_int,
    get_field: unsafe extern "C" fn(*const RawMxArray, usize, *const c_char) -> *mut RawMxArray,
    set_field: unsafe extern "C" fn(*mut RawMxArray, usize, *const c_char, *mut RawMxArray),
    create_numeric_array:
        unsafe extern "C" fn(usize, *const usize, c_int, c_int) -> *mut RawMxArray,
    create_logical_array: unsafe extern "C" fn(usize, *const usize) -> *mut RawMxArray,
    create_cell_array: unsafe extern "C" fn(usize, *const usize) -> *mut RawMxArray,
    create_struct_array:
        unsafe extern "C" fn(usize, *const usize, c_int, *const *const c_char) -> *mut RawMxArray,
    create_string: unsafe extern "C" fn(*const c_char) -> *mut RawMxArray,
    destroy_array: unsafe extern "C" fn(*mut RawMxArray),
}

/// `libmx` loaded from a MATLAB installation.
pub struct LibMx {
    f: MxFunctions,
    // Keeps the resolved function pointers valid.
    _library: NativeLibrary,
}

macro_rules! resolve {
    ($lib:expr, { $($field:ident => $symbol:literal),* $(,)? }) => {
        // SAFETY: every field type mirrors the prototype in matrix.h.
        unsafe { MxFunctions { $($field: $lib.function($symbol)?,)* } }
    };
}

impl LibMx {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let library = NativeLibrary::load(path)?;
        let f = resolve!(library, {
            get_number_of_dimensions => "mxGetNumberOfDimensions",
            get_dimensions => "mxGetDimensions",
            get_number_of_elements => "mxGetNumberOfElements",
            get_element_size => "mxGetElementSize",
            get_class_id => "mxGetClassID",
            get_class_name => "mxGetClassName",
            is_numeric => "mxIsNumeric",
            is_complex => "mxIsComplex",
            is_sparse => "mxIsSparse",
            get_data => "mxGetData",
            get_imag_data => "mxGetImagData",
            get_string => "mxGetString",
            get_cell => "mxGetCell",
            set_cell => "mxSetCell",
            get_number_of_fields => "mxGetNumberOfFields",
            get_field_name_by_number => "mxGetFieldNameByNumber",
            get_field_number => "mxGetFieldNumber",
            get_field => "mxGetField",
            set_field => "mxSetField",
            create_numeric_array => "mxCreateNumericArray",
            create_logical_array => "mxCreateLogicalArray",
            create_cell_array => "mxCreateCellArray",
            create_struct_array => "mxCreateStructArray",
            create_string => "mxCreateString",
            destroy_array => "mxDestroyArray",
        });
        Ok(Self { f, _library: library })
    }

    fn data_len(&self, array: MxPtr) -> usize {
        self.number_of_elements(array)
            .saturating_mul(self.element_size(array))
    }

    fn created(&self, ptr: *mut RawMxArray, function: &str, arguments: String) -> MxResult<MxPtr> {
        MxPtr::from_raw(ptr).ok_or_else(|| MxError::call_failed(function, "NULL", arguments))
    }

    fn copy_out(
        &self,
        array: MxPtr,
        data: *mut c_void,
        out: &mut [u8],
        function: &str,
    ) -> MxResult<()> {
        if out.is_empty() {
            return Ok(());
        }
        if data.is_null() || out.len() > self.data_len(array) {
            return Err(MxError::call_failed(
                function,
                "NULL",
                format!("{array:?}, {} bytes", out.len()),
            ));
        }
        // SAFETY: `data` holds at least `data_len` bytes and does not alias `out`.
        unsafe { ptr::copy_nonoverlapping(data.cast::<u8>(), out.as_mut_ptr(), out.len()) };
        Ok(())
    }

    fn copy_in(
        &self,
        array: MxPtr,
        data: *mut c_void,
        bytes: &[u8],
        function: &str,
    ) -> MxResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        if data.is_null() || bytes.len() != self.data_len(array) {
            return Err(MxError::call_failed(
                function,
                "NULL",
                format!("{array:?}, {} bytes", bytes.len()),
            ));
        }
        // SAFETY: `data` holds exactly `bytes.len()` writable bytes.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), data.cast::<u8>(), bytes.len()) };
        Ok(())
    }

    fn reject_move(&self, function: &str, value: MxPtr, arguments: String) -> MxError {
        self.destroy(value);
        MxError::call_failed(function, "failed", arguments)
    }
}

fn dims_arguments(dims: &[usize]) -> String {
    format!("{} dims {:?}", dims.len(), dims)
}

impl MxApi for LibMx {
    type Handle = MxPtr;

    fn dimensions(&self, array: MxPtr) -> Vec<usize> {
        // SAFETY: `array` is a live mxArray; the dims pointer is valid for
        // `ndims` entries while the array lives.
        unsafe {
            let ndims = (self.f.get_number_of_dimensions)(array.as_ptr());
            let dims = (self.f.get_dimensions)(array.as_ptr());
            if dims.is_null() {
                return Vec::new();
            }
            std::slice::from_raw_parts(dims, ndims).to_vec()
        }
    }

    fn number_of_elements(&self, array: MxPtr) -> usize {
        unsafe { (self.f.get_number_of_elements)(array.as_ptr()) }
    }

    fn element_size(&self, array: MxPtr) -> usize {
        unsafe { (self.f.get_element_size)(array.as_ptr()) }
    }

    fn class_id(&self, array: MxPtr) -> ClassId {
        let raw = unsafe { (self.f.get_class_id)(array.as_ptr()) };
        ClassId::from_raw(raw).unwrap_or(ClassId::Unknown)
    }

    fn class_name(&self, array: MxPtr) -> String {
        let name = unsafe { (self.f.get_class_name)(array.as_ptr()) };
        if name.is_null() {
            return ClassId::Unknown.name().to_string();
        }
        // SAFETY: libmx returns a static NUL-terminated class name.
        unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
    }

    fn is_numeric(&self, array: MxPtr) -> bool {
        unsafe { (self.f.is_numeric)(array.as_ptr()) }
    }

    fn is_complex(&self, array: MxPtr) -> bool {
        unsafe { (self.f.is_complex)(array.as_ptr()) }
    }

    fn is_sparse(&self, array: MxPtr) -> bool {
        unsafe { (self.f.is_sparse)(array.as_ptr()) }
    }

    fn read_real(&self, array: MxPtr, out: &mut [u8]) -> MxResult<()> {
        let data = unsafe { (self.f.get_data)(array.as_ptr()) };
        self.copy_out(array, data, out, "mxGetData")
    }

    fn read_imag(&self, array: MxPtr, out: &mut [u8]) -> MxResult<()> {
        let data = unsafe { (self.f.get_imag_data)(array.as_ptr()) };
        self.copy_out(array, data, out, "mxGetImagData")
    }

    fn write_real(&self, array: MxPtr, bytes: &[u8]) -> MxResult<()> {
        let data = unsafe { (self.f.get_data)(array.as_ptr()) };
        self.copy_in(array, data, bytes, "mxGetData")
    }

    fn write_imag(&self, array: MxPtr, bytes: &[u8]) -> MxResult<()> {
        let data = unsafe { (self.f.get_imag_data)(array.as_ptr()) };
        self.copy_in(array, data, bytes, "mxGetImagData")
    }

    fn read_string(&self, array: MxPtr, capacity: usize) -> MxResult<Vec<u8>> {
        let mut buf = vec![0u8; capacity.max(1)];
        // SAFETY: mxGetString writes at most `buf.len()` bytes including the NUL.
        let rc = unsafe {
            (self.f.get_string)(array.as_ptr(), buf.as_mut_ptr().cast::<c_char>(), buf.len())
        };
        if rc != 0 {
            return Err(MxError::call_failed(
                "mxGetString",
                rc.to_string(),
                format!("{array:?}, {capacity}"),
            ));
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        buf.truncate(end);
        Ok(buf)
    }

    fn cell(&self, array: MxPtr, index: usize) -> Option<MxPtr> {
        if index >= self.number_of_elements(array) {
            return None;
        }
        MxPtr::from_raw(unsafe { (self.f.get_cell)(array.as_ptr(), index) })
    }

    fn set_cell(&self, array: MxPtr, index: usize, value: MxPtr) -> MxResult<()> {
        if self.class_id(array) != ClassId::Cell || index >= self.number_of_elements(array) {
            return Err(self.reject_move("mxSetCell", value, format!("{array:?}, {index}")));
        }
        // mxSetCell does not free the previous occupant.
        let previous = self.cell(array, index);
        unsafe { (self.f.set_cell)(array.as_ptr(), index, value.as_ptr()) };
        if let Some(previous) = previous {
            self.destroy(previous);
        }
        Ok(())
    }

    fn number_of_fields(&self, array: MxPtr) -> MxResult<usize> {
        let count = unsafe { (self.f.get_number_of_fields)(array.as_ptr()) };
        if self.class_id(array) != ClassId::Struct || count < 0 {
            return Err(MxError::call_failed(
                "mxGetNumberOfFields",
                count.to_string(),
                format!("{array:?}"),
            ));
        }
        Ok(count as usize)
    }

    fn field_name(&self, array: MxPtr, field: usize) -> MxResult<String> {
        let failed = || {
            MxError::call_failed("mxGetFieldNameByNumber", "NULL", format!("{array:?}, {field}"))
        };
        let number = c_int::try_from(field).map_err(|_| failed())?;
        let name = unsafe { (self.f.get_field_name_by_number)(array.as_ptr(), number) };
        if name.is_null() {
            return Err(failed());
        }
        // SAFETY: field names are NUL-terminated and owned by the array.
        Ok(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
    }

    fn field(&self, array: MxPtr, index: usize, name: &str) -> Option<MxPtr> {
        if index >= self.number_of_elements(array) {
            return None;
        }
        let name = CString::new(name).ok()?;
        MxPtr::from_raw(unsafe { (self.f.get_field)(array.as_ptr(), index, name.as_ptr()) })
    }

    fn set_field(&self, array: MxPtr, index: usize, name: &str, value: MxPtr) -> MxResult<()> {
        let arguments = || format!("{array:?}, {index}, {name}");
        let c_name = match c_string(name, "mxSetField") {
            Ok(c_name) => c_name,
            Err(_) => return Err(self.reject_move("mxSetField", value, arguments())),
        };
        let known = unsafe { (self.f.get_field_number)(array.as_ptr(), c_name.as_ptr()) } >= 0;
        if !known || index >= self.number_of_elements(array) {
            return Err(self.reject_move("mxSetField", value, arguments()));
        }
        // mxSetField does not free the previous occupant either.
        let previous = self.field(array, index, name);
        unsafe { (self.f.set_field)(array.as_ptr(), index, c_name.as_ptr(), value.as_ptr()) };
        if let Some(previous) = previous {
            self.destroy(previous);
        }
        Ok(())
    }

    fn create_numeric(&self, dims: &[usize], class: ClassId, complex: bool) -> MxResult<MxPtr> {
        let complexity = if complex { MX_COMPLEX } else { MX_REAL };
        let ptr = unsafe {
            (self.f.create_numeric_array)(dims.len(), dims.as_ptr(), class.raw(), complexity)
        };
        self.created(
            ptr,
            "mxCreateNumericArray",
            format!("{}, {class}, {complex}", dims_arguments(dims)),
        )
    }

    fn create_logical(&self, dims: &[usize]) -> MxResult<MxPtr> {
        let ptr = unsafe { (self.f.create_logical_array)(dims.len(), dims.as_ptr()) };
        self.created(ptr, "mxCreateLogicalArray", dims_arguments(dims))
    }

    fn create_cell(&self, dims: &[usize]) -> MxResult<MxPtr> {
        let ptr = unsafe { (self.f.create_cell_array)(dims.len(), dims.as_ptr()) };
        self.created(ptr, "mxCreateCellArray", dims_arguments(dims))
    }

    fn create_struct(&self, dims: &[usize], field_names: &[&str]) -> MxResult<MxPtr> {
        let names = field_names
            .iter()
            .map(|name| c_string(name, "mxCreateStructArray"))
            .collect::<MxResult<Vec<_>>>()?;
        let pointers: Vec<*const c_char> = names.iter().map(|n| n.as_ptr()).collect();
        let arguments = || format!("{}, fields {field_names:?}", dims_arguments(dims));
        let count = c_int::try_from(pointers.len())
            .map_err(|_| MxError::call_failed("mxCreateStructArray", "NULL", arguments()))?;
        let ptr = unsafe {
            (self.f.create_struct_array)(dims.len(), dims.as_ptr(), count, pointers.as_ptr())
        };
        self.created(ptr, "mxCreateStructArray", arguments())
    }

    fn create_string(&self, text: &str) -> MxResult<MxPtr> {
        let c_text = c_string(text, "mxCreateString")?;
        let ptr = unsafe { (self.f.create_string)(c_text.as_ptr()) };
        self.created(ptr, "mxCreateString", format!("{} bytes", text.len()))
    }

    fn destroy(&self, array: MxPtr) {
        unsafe { (self.f.destroy_array)(array.as_ptr()) }
    }
}
