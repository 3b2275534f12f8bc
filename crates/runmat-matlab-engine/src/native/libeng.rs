use std::ffi::{c_char, c_int};
use std::path::Path;
use std::ptr::{self, NonNull};

use runmat_mxarray::MxError;

use super::library::NativeLibrary;
use super::{c_string, MxPtr, RawEngine, RawMxArray};
use crate::error::{EngineError, Result};

struct EngFunctions {
    open: unsafe extern "C" fn(*const c_char) -> *mut RawEngine,
    close: unsafe extern "C" fn(*mut RawEngine) -> c_int,
    eval_string: unsafe extern "C" fn(*mut RawEngine, *const c_char) -> c_int,
    get_variable: unsafe extern "C" fn(*mut RawEngine, *const c_char) -> *mut RawMxArray,
    put_variable: unsafe extern "C" fn(*mut RawEngine, *const c_char, *const RawMxArray) -> c_int,
    output_buffer: unsafe extern "C" fn(*mut RawEngine, *mut c_char, c_int) -> c_int,
}

/// `libeng` loaded from a MATLAB installation.
pub struct LibEng {
    f: EngFunctions,
    library: NativeLibrary,
}

impl LibEng {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let library = NativeLibrary::load(path)?;
        // SAFETY: the field types mirror the prototypes in engine.h.
        let f = unsafe {
            EngFunctions {
                open: library.function("engOpen")?,
                close: library.function("engClose")?,
                eval_string: library.function("engEvalString")?,
                get_variable: library.function("engGetVariable")?,
                put_variable: library.function("engPutVariable")?,
                output_buffer: library.function("engOutputBuffer")?,
            }
        };
        Ok(Self { f, library })
    }

    /// The `libeng_version` string, e.g. `"9.14"`.
    pub fn version(&self) -> Option<String> {
        self.library.string_variable("libeng_version")
    }

    /// Start MATLAB. `None` lets the platform choose the launch command.
    pub fn open(&self, command: Option<&str>) -> Result<NonNull<RawEngine>> {
        let command = command.map(|c| c_string(c, "engOpen")).transpose()?;
        let command_ptr = command.as_ref().map_or(ptr::null(), |c| c.as_ptr());
        let engine = unsafe { (self.f.open)(command_ptr) };
        NonNull::new(engine).ok_or_else(|| {
            EngineError::Startup(format!(
                "engOpen returned NULL for command {:?}",
                command.as_ref().map(|c| c.to_string_lossy())
            ))
        })
    }

    pub fn close(&self, engine: NonNull<RawEngine>) -> c_int {
        unsafe { (self.f.close)(engine.as_ptr()) }
    }

    pub fn eval_string(&self, engine: NonNull<RawEngine>, script: &str) -> Result<()> {
        let c_script = c_string(script, "engEvalString")?;
        let rc = unsafe { (self.f.eval_string)(engine.as_ptr(), c_script.as_ptr()) };
        if rc != 0 {
            return Err(MxError::call_failed("engEvalString", rc.to_string(), script).into());
        }
        Ok(())
    }

    /// Copy of a workspace variable, owned by the caller. `None` when the
    /// variable does not exist.
    pub fn get_variable(&self, engine: NonNull<RawEngine>, name: &str) -> Result<Option<MxPtr>> {
        let c_name = c_string(name, "engGetVariable")?;
        let array = unsafe { (self.f.get_variable)(engine.as_ptr(), c_name.as_ptr()) };
        Ok(MxPtr::from_raw(array))
    }

    /// Copy `array` into the workspace as `name`. The caller keeps `array`.
    pub fn put_variable(&self, engine: NonNull<RawEngine>, name: &str, array: MxPtr) -> Result<()> {
        let c_name = c_string(name, "engPutVariable")?;
        let rc = unsafe { (self.f.put_variable)(engine.as_ptr(), c_name.as_ptr(), array.as_ptr()) };
        if rc != 0 {
            return Err(MxError::call_failed("engPutVariable", rc.to_string(), name).into());
        }
        Ok(())
    }

    /// Direct command-window output into `buffer`, which must stay valid
    /// until the engine is closed or the buffer is replaced.
    ///
    /// # Safety
    /// `buffer` must point to at least `len + 1` writable bytes.
    pub unsafe fn output_buffer(
        &self,
        engine: NonNull<RawEngine>,
        buffer: *mut c_char,
        len: c_int,
    ) -> Result<()> {
        let rc = (self.f.output_buffer)(engine.as_ptr(), buffer, len);
        if rc != 0 {
            return Err(
                MxError::call_failed("engOutputBuffer", rc.to_string(), len.to_string()).into(),
            );
        }
        Ok(())
    }
}
