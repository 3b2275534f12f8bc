//! The engine operations a [`Session`](crate::Session) is built on.

use std::ffi::{c_char, c_int, CStr};
use std::ptr::NonNull;

use log::{debug, info, warn};
use runmat_mxarray::MxApi;

use crate::config::EngineConfig;
use crate::discovery::{parse_version, EngineLayout, Platform};
use crate::error::{EngineError, Result};
use crate::native::{LibEng, LibMx, MxPtr, RawEngine};

/// A running MATLAB engine. Arrays crossing this boundary are copied:
/// `get_variable` returns an array owned by the caller and
/// `put_variable` leaves ownership of its argument with the caller.
pub trait EngineBackend {
    type Api: MxApi;

    fn api(&self) -> &Self::Api;

    /// Evaluate a script in the engine's base workspace.
    fn eval_string(&self, script: &str) -> Result<()>;

    /// `None` when no variable `name` exists.
    fn get_variable(&self, name: &str) -> Result<Option<<Self::Api as MxApi>::Handle>>;

    fn put_variable(&self, name: &str, array: <Self::Api as MxApi>::Handle) -> Result<()>;

    /// Output captured since the last evaluation, `None` when capture is off.
    fn output_buffer(&self) -> Option<String>;
}

/// Heap buffer registered with `engOutputBuffer`. It never moves, so the
/// engine can keep writing into it for the life of the session.
struct OutputBuffer {
    ptr: NonNull<c_char>,
    len: usize,
}

impl OutputBuffer {
    fn new(len: usize) -> Self {
        let boxed: Box<[c_char]> = vec![0; len].into_boxed_slice();
        Self {
            ptr: NonNull::from(Box::leak(boxed)).cast::<c_char>(),
            len,
        }
    }

    fn read(&self) -> String {
        // SAFETY: the engine writes at most `len - 1` bytes and the buffer
        // starts zeroed, so it always holds a terminator.
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Drop for OutputBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` came from `Box::leak` of a `len`-element slice.
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.len,
            )));
        }
    }
}

/// MATLAB started through `libeng`, with arrays managed by `libmx`.
pub struct NativeEngine {
    engine: NonNull<RawEngine>,
    // Dropped after the engine is closed.
    output: Option<OutputBuffer>,
    version: Option<(u32, u32)>,
    layout: EngineLayout,
    eng: LibEng,
    mx: LibMx,
}

impl NativeEngine {
    pub fn open(config: &EngineConfig) -> Result<Self> {
        config.validate().map_err(EngineError::Config)?;
        let root = config.resolve_matlab_root()?;
        let layout = EngineLayout::for_root(&root, &config.startup_options)?;

        if layout.platform == Platform::Windows {
            prepend_to_path(&layout)?;
        }
        let eng = LibEng::load(&layout.libeng)?;
        let mx = LibMx::load(&layout.libmx)?;

        let version = eng.version().as_deref().and_then(parse_version);
        layout.check_environment(version);

        info!(
            "Starting MATLAB engine from {} (libeng {:?})",
            root.display(),
            version
        );
        let engine = eng.open(layout.command.as_deref())?;
        let mut native = Self {
            engine,
            output: None,
            version,
            layout,
            eng,
            mx,
        };
        if config.output_buffer_size != 0 {
            native.capture_output(config.output_buffer_size)?;
        }
        Ok(native)
    }

    /// `(major, minor)` of the loaded libeng, when it could be read.
    pub fn version(&self) -> Option<(u32, u32)> {
        self.version
    }

    pub fn layout(&self) -> &EngineLayout {
        &self.layout
    }

    fn capture_output(&mut self, size: usize) -> Result<()> {
        let buffer = OutputBuffer::new(size);
        let len = c_int::try_from(size - 1).map_err(|_| {
            EngineError::Config(format!("output buffer of {size} bytes is too large"))
        })?;
        // SAFETY: the buffer holds `size` bytes and lives in `self` until
        // after the engine is closed.
        unsafe { self.eng.output_buffer(self.engine, buffer.ptr.as_ptr(), len)? };
        self.output = Some(buffer);
        debug!("capturing up to {} bytes of MATLAB output", size - 1);
        Ok(())
    }
}

impl EngineBackend for NativeEngine {
    type Api = LibMx;

    fn api(&self) -> &LibMx {
        &self.mx
    }

    fn eval_string(&self, script: &str) -> Result<()> {
        self.eng.eval_string(self.engine, script)
    }

    fn get_variable(&self, name: &str) -> Result<Option<MxPtr>> {
        self.eng.get_variable(self.engine, name)
    }

    fn put_variable(&self, name: &str, array: MxPtr) -> Result<()> {
        self.eng.put_variable(self.engine, name, array)
    }

    fn output_buffer(&self) -> Option<String> {
        self.output.as_ref().map(OutputBuffer::read)
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        let rc = self.eng.close(self.engine);
        if rc != 0 {
            warn!("engClose returned {rc}");
        } else {
            info!("MATLAB engine closed");
        }
    }
}

/// Windows resolves libeng's own dependencies through `PATH`.
fn prepend_to_path(layout: &EngineLayout) -> Result<()> {
    let current = std::env::var_os("PATH").unwrap_or_default();
    if std::env::split_paths(&current).any(|p| p == layout.lib_dir) {
        return Ok(());
    }
    let paths = std::iter::once(layout.lib_dir.clone()).chain(std::env::split_paths(&current));
    let joined = std::env::join_paths(paths)
        .map_err(|e| EngineError::Startup(format!("cannot add MATLAB to PATH: {e}")))?;
    std::env::set_var("PATH", joined);
    Ok(())
}
