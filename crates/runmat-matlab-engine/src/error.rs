use runmat_mxarray::MxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Mx(#[from] MxError),

    /// MATLAB raised an error while evaluating an expression. The text holds
    /// the `identifier: message` line followed by the stack frames.
    #[error("Error from MATLAB\n{0}")]
    RemoteEvaluation(String),

    #[error("No such variable/function in MATLAB workspace: {0}")]
    NotFound(String),

    #[error("Failed to start MATLAB engine: {0}")]
    Startup(String),

    #[error("Failed to load MATLAB library: {0}")]
    Library(String),

    #[error("Output buffer was not initialized; set a non-zero output buffer size")]
    OutputBufferDisabled,

    #[error("Invalid engine configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
