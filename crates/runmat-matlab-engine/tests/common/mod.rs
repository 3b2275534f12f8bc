//! A scripted stand-in for the MATLAB engine.
//!
//! Variables are kept as detached [`MemTree`]s, so between exchanges the
//! array store should be empty. The interpreter understands the statement
//! shapes the session itself generates plus a few test helpers:
//!
//! ```text
//! NAME = exist('x')      NAME = help('f')      clear a b c
//! [O1,O2] = f(A1,A2)     f(A1)                 NAME = <number | 'text' | variable>
//! error('id', 'message') disp('text')
//! ```

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use runmat_matlab_engine::{EngineBackend, Result, ERROR_VARIABLE};
use runmat_mxarray::{decode, encode, MemHandle, MemTree, MemoryApi, MxApi, MxError, Value};

type Function = Box<dyn Fn(&[Value], usize) -> std::result::Result<Vec<Value>, String>>;

pub struct ScriptedEngine {
    api: MemoryApi,
    vars: RefCell<HashMap<String, MemTree>>,
    functions: HashMap<String, Function>,
    help: HashMap<String, String>,
    exist_overrides: HashMap<String, f64>,
    output: Option<RefCell<String>>,
    locked_clears: bool,
    evaluated: RefCell<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        let mut engine = Self {
            api: MemoryApi::new(),
            vars: RefCell::new(HashMap::new()),
            functions: HashMap::new(),
            help: HashMap::new(),
            exist_overrides: HashMap::new(),
            output: None,
            locked_clears: false,
            evaluated: RefCell::new(Vec::new()),
        };
        engine.define("plus", |args, _| {
            let [a, b] = args else {
                return Err("MATLAB:minrhs: Not enough input arguments.".into());
            };
            let sum = a.as_scalar_f64().unwrap_or(f64::NAN) + b.as_scalar_f64().unwrap_or(f64::NAN);
            Ok(vec![Value::from(sum)])
        });
        engine.define("sort", |args, nout| {
            let Some(Value::Numeric(a)) = args.first() else {
                return Err("MATLAB:sort:InvalidInput: Only numeric input is supported.".into());
            };
            let mut pairs: Vec<(f64, usize)> = (0..a.len())
                .filter_map(|i| a.data.get_f64(i).map(|x| (x, i + 1)))
                .collect();
            pairs.sort_by(|x, y| x.0.total_cmp(&y.0));
            let sorted = Value::from(pairs.iter().map(|p| p.0).collect::<Vec<_>>());
            let index = Value::from(pairs.iter().map(|p| p.1 as f64).collect::<Vec<_>>());
            Ok(vec![sorted, index].into_iter().take(nout.max(1)).collect())
        });
        engine.help.insert("sort".into(), " sort   Sort in ascending order.\n".into());
        engine
    }

    pub fn with_output_capture(mut self) -> Self {
        self.output = Some(RefCell::new(String::new()));
        self
    }

    /// Make every `clear` statement fail.
    pub fn with_locked_clears(mut self) -> Self {
        self.locked_clears = true;
        self
    }

    pub fn with_exist_code(mut self, name: &str, code: f64) -> Self {
        self.exist_overrides.insert(name.into(), code);
        self
    }

    pub fn define(
        &mut self,
        name: &str,
        f: impl Fn(&[Value], usize) -> std::result::Result<Vec<Value>, String> + 'static,
    ) {
        self.functions.insert(name.into(), Box::new(f));
    }

    pub fn memory(&self) -> &MemoryApi {
        &self.api
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Expressions seen by `eval_string`, unwrapped.
    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated.borrow().clone()
    }

    fn load(&self, name: &str) -> std::result::Result<Value, String> {
        let tree = self
            .vars
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| undefined(name))?;
        let handle = self.api.import(&tree).map_err(|e| e.to_string())?;
        let value = decode(&self.api, handle).map_err(|e| e.to_string());
        self.api.destroy(handle);
        value
    }

    fn store(&self, name: &str, value: &Value) -> std::result::Result<(), String> {
        let array = encode(&self.api, value).map_err(|e| e.to_string())?;
        let tree = self.api.export(array.handle()).map_err(|e| e.to_string())?;
        self.vars.borrow_mut().insert(name.to_string(), tree);
        Ok(())
    }

    fn exist_code(&self, name: &str) -> f64 {
        if let Some(code) = self.exist_overrides.get(name) {
            *code
        } else if self.vars.borrow().contains_key(name) {
            1.0
        } else if self.functions.contains_key(name) {
            2.0
        } else {
            0.0
        }
    }

    fn run(&self, statement: &str) -> std::result::Result<(), String> {
        let statement = statement.trim().trim_end_matches(';').trim();
        if let Some(names) = statement.strip_prefix("clear ") {
            if self.locked_clears {
                return Err("MATLAB:clear:locked: Variables are locked.\n".into());
            }
            let mut vars = self.vars.borrow_mut();
            for name in names.split_whitespace() {
                vars.remove(name);
            }
            return Ok(());
        }
        if let Some(args) = call_args(statement, "error") {
            let args: Vec<String> = args.iter().map(|a| unquote(a).unwrap_or_default()).collect();
            return Err(match args.as_slice() {
                [id, message] => format!("{id}: {message}\n"),
                [message] => format!(": {message}\n"),
                _ => "MATLAB:error: error\n".to_string(),
            });
        }
        if let Some(args) = call_args(statement, "disp") {
            let text = match args.first() {
                Some(arg) => match unquote(arg) {
                    Some(text) => text,
                    None => self.load(arg)?.to_string(),
                },
                None => String::new(),
            };
            if let Some(output) = &self.output {
                output.borrow_mut().push_str(&format!("{text}\n"));
            }
            return Ok(());
        }

        let (targets, rhs) = match statement.split_once(" = ") {
            Some((lhs, rhs)) => (parse_targets(lhs), rhs.trim()),
            None => (Vec::new(), statement),
        };

        let results = self.evaluate(rhs, targets.len())?;
        if results.len() < targets.len() {
            return Err("MATLAB:TooManyOutputs: Too many output arguments.\n".into());
        }
        for (target, value) in targets.iter().zip(&results) {
            self.store(target, value)?;
        }
        Ok(())
    }

    fn evaluate(&self, rhs: &str, nout: usize) -> std::result::Result<Vec<Value>, String> {
        if let Some(args) = call_args(rhs, "exist") {
            let name = args.first().and_then(|a| unquote(a)).unwrap_or_default();
            return Ok(vec![Value::from(self.exist_code(&name))]);
        }
        if let Some(args) = call_args(rhs, "help") {
            let name = args.first().and_then(|a| unquote(a)).unwrap_or_default();
            let text = self.help.get(&name).cloned().unwrap_or_default();
            return Ok(vec![Value::from(text)]);
        }
        if let Some(text) = unquote(rhs) {
            return Ok(vec![Value::from(text)]);
        }
        if let Ok(number) = rhs.parse::<f64>() {
            return Ok(vec![Value::from(number)]);
        }
        if let Some((name, _)) = rhs.split_once('(') {
            if let (Some(function), Some(args)) = (self.functions.get(name), call_args(rhs, name)) {
                let values = args
                    .iter()
                    .map(|arg| self.load(arg))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                return function(&values, nout).map_err(|e| format!("{e}\n"));
            }
            return Err(undefined(name));
        }
        Ok(vec![self.load(rhs)?])
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBackend for ScriptedEngine {
    type Api = MemoryApi;

    fn api(&self) -> &MemoryApi {
        &self.api
    }

    fn eval_string(&self, script: &str) -> Result<()> {
        let expression = unwrap_script(script)
            .ok_or_else(|| MxError::call_failed("engEvalString", "1", script))?;
        self.evaluated.borrow_mut().push(expression.to_string());
        if let Some(output) = &self.output {
            output.borrow_mut().clear();
        }
        let error = self.run(expression).err().unwrap_or_default();
        self.store(ERROR_VARIABLE, &Value::from(error))
            .map_err(|e| MxError::call_failed("engEvalString", "1", e))?;
        Ok(())
    }

    fn get_variable(&self, name: &str) -> Result<Option<MemHandle>> {
        let vars = self.vars.borrow();
        match vars.get(name) {
            Some(tree) => Ok(Some(self.api.import(tree)?)),
            None => Ok(None),
        }
    }

    fn put_variable(&self, name: &str, array: MemHandle) -> Result<()> {
        let tree = self.api.export(array)?;
        self.vars.borrow_mut().insert(name.to_string(), tree);
        Ok(())
    }

    fn output_buffer(&self) -> Option<String> {
        self.output.as_ref().map(|o| o.borrow().clone())
    }
}

/// The user expression inside a script built by `wrap_script`.
fn unwrap_script(script: &str) -> Option<&str> {
    let start = script.find("try\n")? + "try\n".len();
    let end = script.find("\ncatch err")?;
    script.get(start..end).map(str::trim)
}

/// Arguments of `name(a, b, ...)` when `text` is exactly such a call.
fn call_args(text: &str, name: &str) -> Option<Vec<String>> {
    let inner = text.strip_prefix(name)?.strip_prefix('(')?.strip_suffix(')')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    Some(inner.split(',').map(|a| a.trim().to_string()).collect())
}

fn parse_targets(lhs: &str) -> Vec<String> {
    let lhs = lhs.trim();
    match lhs.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
        Some(list) => list.split(',').map(|t| t.trim().to_string()).collect(),
        None => vec![lhs.to_string()],
    }
}

fn unquote(text: &str) -> Option<String> {
    let inner = text.trim().strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}

fn undefined(name: &str) -> String {
    format!("MATLAB:UndefinedFunction: Undefined function or variable '{name}'.\n")
}
