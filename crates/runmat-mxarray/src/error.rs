use thiserror::Error;

/// Errors raised while marshalling values across the mxArray boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MxError {
    /// A libmx accessor or constructor reported failure or returned NULL.
    #[error("MATLAB function {function} failed ({result}) with arguments: {arguments}")]
    EngineCallFailed {
        function: String,
        result: String,
        arguments: String,
    },

    #[error("Data type not supported: {0}")]
    UnsupportedType(String),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),
}

impl MxError {
    pub fn call_failed(
        function: impl Into<String>,
        result: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        MxError::EngineCallFailed {
            function: function.into(),
            result: result.into(),
            arguments: arguments.into(),
        }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        MxError::UnsupportedType(what.into())
    }
}

pub type Result<T> = std::result::Result<T, MxError>;
