use log::debug;
use runmat_mxarray::{decode, encode, encode_json, MxError, OwnedArray, Value};

use crate::backend::{EngineBackend, NativeEngine};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::workspace::Workspace;

/// Workspace variable that receives the error text of the last `eval`.
pub const ERROR_VARIABLE: &str = "ERRSTR__";

/// Wrap `expression` so a MATLAB error is captured into [`ERROR_VARIABLE`]
/// (identifier, message and one line per stack frame) instead of escaping
/// through the engine.
pub fn wrap_script(expression: &str) -> String {
    format!(
        r#"{ERROR_VARIABLE} = '';
try
    {expression}
catch err
    {ERROR_VARIABLE} = sprintf('%s: %s\n', err.identifier, err.message);
    for i = 1:length(err.stack)
        {ERROR_VARIABLE} = sprintf('%sError: in function %s in file %s line %i\n', {ERROR_VARIABLE}, err.stack(i,1).name, err.stack(i,1).file, err.stack(i,1).line);
    end
end
if exist('{ERROR_VARIABLE}','var') == 0
    {ERROR_VARIABLE}='';
end
"#
    )
}

/// A MATLAB engine session.
///
/// Every exchange goes through `&mut self`: the engine serves one request
/// at a time. Arrays fetched or built during an exchange are released
/// before it returns, on success and on error.
pub struct Session<B: EngineBackend> {
    backend: B,
}

impl Session<NativeEngine> {
    /// Start MATLAB with `config`.
    pub fn open(config: EngineConfig) -> Result<Self> {
        Ok(Self::new(NativeEngine::open(&config)?))
    }

    /// `(major, minor)` of the engine library, when it could be read.
    pub fn version(&self) -> Option<(u32, u32)> {
        self.backend.version()
    }
}

impl<B: EngineBackend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Evaluate `expression` in the base workspace. A MATLAB error comes back
    /// as [`EngineError::RemoteEvaluation`] carrying MATLAB's error text.
    pub fn eval(&mut self, expression: &str) -> Result<()> {
        debug!("eval: {expression}");
        self.backend.eval_string(&wrap_script(expression))?;
        let error = match self.fetch(ERROR_VARIABLE)? {
            Value::Text(text) => text,
            other => {
                return Err(MxError::unsupported(format!(
                    "{} value in {ERROR_VARIABLE}",
                    other.kind_name()
                ))
                .into())
            }
        };
        if error.is_empty() {
            Ok(())
        } else {
            Err(EngineError::RemoteEvaluation(error))
        }
    }

    /// Fetch and decode workspace variable `name`.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        debug!("get: {name}");
        self.fetch(name)
    }

    /// Encode `value` and store it as workspace variable `name`.
    pub fn put(&mut self, name: &str, value: &Value) -> Result<()> {
        debug!("put: {name} ({})", value.kind_name());
        let array = encode(self.backend.api(), value)?;
        self.backend.put_variable(name, array.handle())
    }

    /// Coerce a JSON document and store it as workspace variable `name`.
    pub fn put_json(&mut self, name: &str, json: &serde_json::Value) -> Result<()> {
        debug!("put: {name} (json)");
        let array = encode_json(self.backend.api(), json)?;
        self.backend.put_variable(name, array.handle())
    }

    /// Command-window output of the most recent evaluation.
    pub fn output_buffer(&self) -> Result<String> {
        self.backend
            .output_buffer()
            .ok_or(EngineError::OutputBufferDisabled)
    }

    /// Remove variables from the base workspace.
    pub fn clear<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
        self.eval(&format!("clear {}", names.join(" ")))
    }

    /// Name-based access to variables and functions.
    pub fn workspace(&mut self) -> Workspace<'_, B> {
        Workspace::new(self)
    }

    fn fetch(&self, name: &str) -> Result<Value> {
        let api = self.backend.api();
        let handle = self
            .backend
            .get_variable(name)?
            .ok_or_else(|| MxError::call_failed("engGetVariable", "NULL", name))?;
        let array = OwnedArray::new(api, handle);
        Ok(decode(api, array.handle())?)
    }
}
