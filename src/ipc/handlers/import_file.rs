use std::path::PathBuf;

use crate::import;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};

/// Reconciles a tabular file against the current collection. Accepted rows
/// are appended as pending-decision sessions; everything else lands in the
/// skipped report with its reason.
fn handle_import_file(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = req.params.get("path").and_then(|v| v.as_str()).map(PathBuf::from)
    else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let today = req.today();
    let window = state.resolved_window(today);
    let snapshot = state.snapshot(today, window.as_ref());

    let outcome = match import::import_file(&path, &snapshot, &state.activities) {
        Ok(o) => o,
        Err(e) => return engine_err(&req.id, e),
    };

    let outcome_json = match serde_json::to_value(&outcome) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    state.activities.extend(outcome.sessions);
    ok(&req.id, outcome_json)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "import.file" => Some(handle_import_file(state, req)),
        _ => None,
    }
}
