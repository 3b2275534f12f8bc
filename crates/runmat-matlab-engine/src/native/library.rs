//! Shared library loading with MATLAB's `_730` symbol fallback.
//!
//! MATLAB 7.3 introduced 64-bit `mwSize`/`mwIndex` variants of the libmx and
//! libeng entry points under a `_730` suffix. Resolving those first keeps
//! every size and index argument `usize` wide.

use std::ffi::{c_char, CStr};
use std::path::{Path, PathBuf};

use libloading::Library;
use log::trace;

use crate::error::{EngineError, Result};

pub struct NativeLibrary {
    library: Library,
    path: PathBuf,
}

impl NativeLibrary {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        // SAFETY: loading runs the library's initializers; MATLAB's engine
        // libraries have no initialization preconditions.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            EngineError::Library(format!("Failed to load library '{}': {}", path.display(), e))
        })?;
        Ok(Self {
            library,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a function, preferring `<name>_730` over `<name>`.
    ///
    /// # Safety
    /// `T` must be the exact `extern "C"` signature of the symbol.
    pub unsafe fn function<T: Copy>(&self, name: &str) -> Result<T> {
        let suffixed = format!("{name}_730");
        for candidate in [suffixed.as_str(), name] {
            if let Ok(symbol) = self.library.get::<T>(candidate.as_bytes()) {
                trace!("resolved {candidate} in {}", self.path.display());
                return Ok(*symbol);
            }
        }
        Err(EngineError::Library(format!(
            "symbol {name} not found in {}",
            self.path.display()
        )))
    }

    /// Read a global `const char*` variable exported by the library.
    pub fn string_variable(&self, name: &str) -> Option<String> {
        // SAFETY: the symbol is declared as `const char*` in the MATLAB headers
        // and points at a static NUL-terminated string.
        unsafe {
            let symbol = self.library.get::<*const *const c_char>(name.as_bytes()).ok()?;
            let text = **symbol;
            if text.is_null() {
                return None;
            }
            Some(CStr::from_ptr(text).to_string_lossy().into_owned())
        }
    }
}
