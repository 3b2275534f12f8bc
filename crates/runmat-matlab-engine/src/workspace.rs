//! Name-based view of the MATLAB base workspace.
//!
//! A name may refer to a variable or to a function; [`Workspace::kind_of`]
//! asks MATLAB's `exist` which one. Functions are called by staging the
//! arguments as temporary workspace variables:
//!
//! ```text
//! [OUT0__,OUT1__] = name(ARG0__,ARG1__)
//! ```
//!
//! and the temporaries are cleared again afterwards.

use std::fmt;

use log::warn;
use runmat_mxarray::{MxError, Value};

use crate::backend::EngineBackend;
use crate::error::{EngineError, Result};
use crate::session::Session;

const KIND_VARIABLE: &str = "KIND__";
const DOC_VARIABLE: &str = "DOC__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceKind {
    Missing,
    Variable,
    /// M-file, built-in, MEX or P-code function.
    Function,
}

impl WorkspaceKind {
    /// Interpret the result of `exist(name)`.
    pub fn from_exist_code(name: &str, code: f64) -> Result<Self> {
        match code as i64 {
            0 => Ok(WorkspaceKind::Missing),
            1 => Ok(WorkspaceKind::Variable),
            2 | 3 | 5 | 6 => Ok(WorkspaceKind::Function),
            other => Err(MxError::unsupported(format!(
                "workspace entry '{name}' of kind {other}"
            ))
            .into()),
        }
    }
}

/// A callable MATLAB function found in the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    name: String,
}

impl FunctionRef {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceItem {
    Variable(Value),
    Function(FunctionRef),
}

/// Borrowing proxy over a session's base workspace.
pub struct Workspace<'s, B: EngineBackend> {
    session: &'s mut Session<B>,
}

impl<'s, B: EngineBackend> Workspace<'s, B> {
    pub(crate) fn new(session: &'s mut Session<B>) -> Self {
        Self { session }
    }

    pub fn kind_of(&mut self, name: &str) -> Result<WorkspaceKind> {
        self.session
            .eval(&format!("{KIND_VARIABLE} = exist('{}')", quote(name)))?;
        let kind = self.session.get(KIND_VARIABLE);
        self.session.clear(&[KIND_VARIABLE])?;
        let code = kind?
            .as_scalar_f64()
            .ok_or_else(|| MxError::unsupported("non-scalar result from exist()"))?;
        WorkspaceKind::from_exist_code(name, code)
    }

    /// Look `name` up: a variable's value, or a reference to a function.
    pub fn get(&mut self, name: &str) -> Result<WorkspaceItem> {
        match self.kind_of(name)? {
            WorkspaceKind::Missing => Err(EngineError::NotFound(name.to_string())),
            WorkspaceKind::Variable => Ok(WorkspaceItem::Variable(self.session.get(name)?)),
            WorkspaceKind::Function => Ok(WorkspaceItem::Function(FunctionRef {
                name: name.to_string(),
            })),
        }
    }

    pub fn set(&mut self, name: &str, value: &Value) -> Result<()> {
        self.session.put(name, value)
    }

    /// Call function `name` with `args`, requesting `nout` outputs.
    pub fn call(&mut self, name: &str, args: &[Value], nout: usize) -> Result<Vec<Value>> {
        let inputs: Vec<String> = (0..args.len()).map(|i| format!("ARG{i}__")).collect();
        let outputs: Vec<String> = (0..nout).map(|i| format!("OUT{i}__")).collect();

        for (input, arg) in inputs.iter().zip(args) {
            if let Err(e) = self.session.put(input, arg) {
                self.clear_after_failure(&inputs);
                return Err(e);
            }
        }

        let command = if outputs.is_empty() {
            format!("{name}({})", inputs.join(","))
        } else {
            format!("[{}] = {name}({})", outputs.join(","), inputs.join(","))
        };
        if let Err(e) = self.session.eval(&command) {
            self.clear_after_failure(&inputs);
            self.clear_after_failure(&outputs);
            return Err(e);
        }

        let results = self.session.clear(&inputs).and_then(|()| {
            outputs
                .iter()
                .map(|output| self.session.get(output))
                .collect::<Result<Vec<_>>>()
        });
        match results {
            Ok(values) => {
                self.session.clear(&outputs)?;
                Ok(values)
            }
            Err(e) => {
                self.clear_after_failure(&outputs);
                Err(e)
            }
        }
    }

    pub fn call_function(
        &mut self,
        function: &FunctionRef,
        args: &[Value],
        nout: usize,
    ) -> Result<Vec<Value>> {
        self.call(&function.name, args, nout)
    }

    /// Clear temporaries while another error is already being returned.
    fn clear_after_failure(&mut self, names: &[String]) {
        if let Err(e) = self.session.clear(names) {
            warn!("could not clear {}: {e}", names.join(" "));
        }
    }

    /// Help text of `name`, as printed by `help name`.
    pub fn help(&mut self, name: &str) -> Result<String> {
        self.session
            .eval(&format!("{DOC_VARIABLE} = help('{}')", quote(name)))?;
        let doc = self.session.get(DOC_VARIABLE);
        self.session.clear(&[DOC_VARIABLE])?;
        match doc? {
            Value::Text(text) => Ok(text),
            other => Err(MxError::unsupported(format!("{} help text", other.kind_name())).into()),
        }
    }
}

/// Escape `text` for a single-quoted MATLAB char literal.
fn quote(text: &str) -> String {
    text.replace('\'', "''")
}
