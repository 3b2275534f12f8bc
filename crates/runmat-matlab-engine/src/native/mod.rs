//! Bindings to the MATLAB engine (`libeng`) and matrix (`libmx`) libraries,
//! loaded at runtime from the installation found by [`crate::discovery`].

mod libeng;
mod libmx;
mod library;

use std::ffi::CString;
use std::ptr::NonNull;

use runmat_mxarray::MxError;

pub use libeng::LibEng;
pub use libmx::LibMx;
pub use library::NativeLibrary;

/// Opaque `mxArray`.
#[repr(C)]
pub struct RawMxArray {
    _private: [u8; 0],
}

/// Opaque `Engine`.
#[repr(C)]
pub struct RawEngine {
    _private: [u8; 0],
}

/// Non-null `mxArray*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MxPtr(NonNull<RawMxArray>);

impl MxPtr {
    pub fn from_raw(ptr: *mut RawMxArray) -> Option<Self> {
        NonNull::new(ptr).map(MxPtr)
    }

    pub fn as_ptr(self) -> *mut RawMxArray {
        self.0.as_ptr()
    }
}

/// NUL-terminated copy of `text` for a call to `function`.
pub(crate) fn c_string(text: &str, function: &str) -> Result<CString, MxError> {
    CString::new(text).map_err(|_| {
        MxError::call_failed(function, "invalid argument", format!("{text:?} contains NUL"))
    })
}
