//! RunMat bridge to a running MATLAB engine.
//!
//! A [`Session`] starts MATLAB through the engine library, evaluates code in
//! its base workspace and moves variables in and out as
//! [`runmat_mxarray::Value`]s:
//!
//! ```no_run
//! use runmat_matlab_engine::{EngineConfigBuilder, Session};
//! use runmat_mxarray::Value;
//!
//! # fn main() -> Result<(), runmat_matlab_engine::EngineError> {
//! let config = EngineConfigBuilder::from_env().output_buffer_size(4096).build()?;
//! let mut session = Session::open(config)?;
//! session.put("x", &Value::from(vec![1.0, 2.0, 3.0]))?;
//! session.eval("y = cumsum(x)")?;
//! println!("{}", session.get("y")?);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod discovery;
pub mod error;
pub mod native;
pub mod session;
pub mod workspace;

pub use backend::{EngineBackend, NativeEngine};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use discovery::{find_matlab_root, find_matlab_root_in, EngineLayout, Platform};
pub use error::{EngineError, Result};
pub use session::{wrap_script, Session, ERROR_VARIABLE};
pub use workspace::{FunctionRef, Workspace, WorkspaceItem, WorkspaceKind};
