use serde_json::json;

use crate::approval;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};

/// Builds the payload of everything not locked. The host performs the actual
/// submission and reports back through `approval.confirmSend`; a failed
/// submission simply never confirms, so nothing mutates.
fn handle_prepare_send(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (ids, payload) = match approval::prepare_send(&state.activities) {
        Ok(v) => v,
        Err(e) => return engine_err(&req.id, e),
    };
    let payload_json = match serde_json::to_value(&payload) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    ok(
        &req.id,
        json!({
            "ids": ids,
            "payload": payload_json,
            "count": payload.len(),
        }),
    )
}

fn parse_ids(req: &Request) -> Option<Vec<i64>> {
    req.params
        .get("ids")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_i64()).collect())
}

fn handle_confirm_send(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ids) = parse_ids(req) else {
        return err(&req.id, "bad_params", "missing params.ids", None);
    };
    match approval::confirm_send(&state.activities, &ids, req.now()) {
        Ok(updated) => {
            state.activities = updated;
            ok(&req.id, json!({ "sent": ids.len() }))
        }
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_decline_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ids) = parse_ids(req) else {
        return err(&req.id, "bad_params", "missing params.ids", None);
    };
    match approval::decline_import(&state.activities, &ids) {
        Ok(updated) => {
            let removed = state.activities.len() - updated.len();
            state.activities = updated;
            ok(&req.id, json!({ "removed": removed }))
        }
        Err(e) => engine_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "approval.prepareSend" => Some(handle_prepare_send(state, req)),
        "approval.confirmSend" => Some(handle_confirm_send(state, req)),
        "approval.declineImport" => Some(handle_decline_import(state, req)),
        _ => None,
    }
}
