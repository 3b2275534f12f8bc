mod common;

use common::ScriptedEngine;
use runmat_matlab_engine::{EngineError, Session, WorkspaceItem, WorkspaceKind};
use runmat_mxarray::{MxError, Value};

#[test]
fn classifies_names() {
    let mut session = Session::new(ScriptedEngine::new());
    session.put("a", &Value::from(1.0)).unwrap();

    let mut ws = session.workspace();
    assert_eq!(ws.kind_of("a").unwrap(), WorkspaceKind::Variable);
    assert_eq!(ws.kind_of("sort").unwrap(), WorkspaceKind::Function);
    assert_eq!(ws.kind_of("zzz").unwrap(), WorkspaceKind::Missing);
    drop(ws);

    // The lookup leaves nothing behind.
    assert!(!session.backend().has_variable("KIND__"));
}

#[test]
fn unknown_kinds_are_unsupported() {
    let mut session = Session::new(ScriptedEngine::new().with_exist_code("+pkg", 7.0));
    let err = session.workspace().get("+pkg").unwrap_err();
    assert!(matches!(err, EngineError::Mx(MxError::UnsupportedType(_))));
}

#[test]
fn get_resolves_variables_and_functions() {
    let mut session = Session::new(ScriptedEngine::new());
    let mut ws = session.workspace();
    ws.set("v", &Value::from("stored")).unwrap();

    assert_eq!(ws.get("v").unwrap(), WorkspaceItem::Variable(Value::from("stored")));
    let WorkspaceItem::Function(sort) = ws.get("sort").unwrap() else {
        panic!("expected a function");
    };
    assert_eq!(sort.name(), "sort");
    assert_eq!(sort.to_string(), "@sort");

    let err = ws.get("missing").unwrap_err();
    assert!(matches!(err, EngineError::NotFound(ref name) if name == "missing"));
    assert_eq!(
        err.to_string(),
        "No such variable/function in MATLAB workspace: missing"
    );
}

#[test]
fn call_stages_and_clears_temporaries() {
    let mut session = Session::new(ScriptedEngine::new());
    let out = session
        .workspace()
        .call("plus", &[Value::from(2.0), Value::from(3.5)], 1)
        .unwrap();
    assert_eq!(out, vec![Value::from(5.5).squeezed()]);

    let evaluated = session.backend().evaluated();
    assert!(evaluated.contains(&"[OUT0__] = plus(ARG0__,ARG1__)".to_string()));
    assert!(evaluated.contains(&"clear ARG0__ ARG1__".to_string()));
    assert!(evaluated.contains(&"clear OUT0__".to_string()));
    assert_eq!(session.backend().variable_names(), vec!["ERRSTR__".to_string()]);
}

#[test]
fn call_with_several_outputs() {
    let mut session = Session::new(ScriptedEngine::new());
    let mut ws = session.workspace();
    let WorkspaceItem::Function(sort) = ws.get("sort").unwrap() else {
        panic!("expected a function");
    };
    let out = ws
        .call_function(&sort, &[Value::from(vec![3.0, 1.0, 2.0])], 2)
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0], Value::from(vec![1.0, 2.0, 3.0]).squeezed());
    assert_eq!(out[1], Value::from(vec![2.0, 3.0, 1.0]).squeezed());
}

#[test]
fn call_without_outputs() {
    let mut session = Session::new(ScriptedEngine::new());
    let out = session
        .workspace()
        .call("plus", &[Value::from(1.0), Value::from(1.0)], 0)
        .unwrap();
    assert!(out.is_empty());
    assert!(session
        .backend()
        .evaluated()
        .contains(&"plus(ARG0__,ARG1__)".to_string()));
}

#[test]
fn failed_call_still_clears_inputs() {
    let mut session = Session::new(ScriptedEngine::new());
    let err = session
        .workspace()
        .call("sort", &[Value::from("text")], 1)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::RemoteEvaluation(ref text) if text.starts_with("MATLAB:sort:InvalidInput")
    ));
    assert!(!session.backend().has_variable("ARG0__"));
    assert!(!session.backend().has_variable("OUT0__"));
    assert_eq!(session.backend().memory().live_arrays(), 0);
}

#[test]
fn help_text() {
    let mut session = Session::new(ScriptedEngine::new());
    let mut ws = session.workspace();
    assert_eq!(ws.help("sort").unwrap(), " sort   Sort in ascending order.\n");
    assert_eq!(ws.help("plus").unwrap(), "");
    drop(ws);
    assert!(!session.backend().has_variable("DOC__"));
}

#[test]
fn call_reports_the_evaluation_error_when_cleanup_fails() {
    let mut session = Session::new(ScriptedEngine::new().with_locked_clears());
    let err = session
        .workspace()
        .call("sort", &[Value::from("text")], 1)
        .unwrap_err();
    assert!(
        matches!(
            err,
            EngineError::RemoteEvaluation(ref text) if text.starts_with("MATLAB:sort:InvalidInput")
        ),
        "unexpected error {err:?}"
    );
}

#[test]
fn call_reports_cleanup_failure_after_success() {
    let mut session = Session::new(ScriptedEngine::new().with_locked_clears());
    let err = session
        .workspace()
        .call("plus", &[Value::from(1.0), Value::from(2.0)], 1)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::RemoteEvaluation(ref text) if text.starts_with("MATLAB:clear:locked")
    ));
}
