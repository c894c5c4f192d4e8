use serde_json::json;

use crate::approval;
use crate::builder::{self, SingleSessionParams};
use crate::conflict;
use crate::eligibility;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::WeeklyScheduleFormData;
use crate::subjects;

fn handle_check_day(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(date) = req
        .params
        .get("date")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<chrono::NaiveDate>().ok())
    else {
        return err(&req.id, "bad_params", "missing or invalid params.date", None);
    };

    let today = req.today();
    let window = state.resolved_window(today);
    let snapshot = state.snapshot(today, window.as_ref());
    match eligibility::check_day(date, &snapshot) {
        Ok(()) => ok(&req.id, json!({ "eligible": true })),
        Err(rejection) => ok(
            &req.id,
            json!({
                "eligible": false,
                "reason": rejection.code,
                "message": rejection.message,
            }),
        ),
    }
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params: SingleSessionParams = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let today = req.today();
    let window = state.resolved_window(today);
    let snapshot = state.snapshot(today, window.as_ref());
    let activity = match builder::build_single(&params, &snapshot, &state.activities) {
        Ok(a) => a,
        Err(e) => return engine_err(&req.id, e),
    };

    let activity_json = match serde_json::to_value(&activity) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    state.activities.push(activity);
    ok(&req.id, json!({ "activity": activity_json }))
}

/// Expands one weekly template. On success the previous batch under the same
/// week reference is replaced atomically; on any error the collection is
/// untouched.
fn handle_generate_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form: WeeklyScheduleFormData = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let today = req.today();
    let window = state.resolved_window(today);
    let snapshot = state.snapshot(today, window.as_ref());
    let week_ref = builder::week_reference(snapshot.grade_level, form.week_start);

    // The full collection feeds the builder: ids stay monotonic past the
    // batch being replaced, and an approved session inside the old batch
    // refuses the regeneration outright.
    let batch = match builder::build_week(&form, &snapshot, &state.activities) {
        Ok(b) => b,
        Err(e) => return engine_err(&req.id, e),
    };

    let batch_json = match serde_json::to_value(&batch) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    state.activities = builder::replace_week(&state.activities, &week_ref, batch);
    ok(
        &req.id,
        json!({
            "weekRef": week_ref,
            "activities": batch_json,
        }),
    )
}

/// Edits a session in place. Approved sessions are view-only and refuse.
fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(id) = req.params.get("id").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing params.id", None);
    };
    let Some(index) = state.activities.iter().position(|a| a.id == id) else {
        return err(&req.id, "not_found", "unknown activity id", Some(json!({ "id": id })));
    };
    if approval::is_locked(&state.activities[index]) {
        return err(
            &req.id,
            "locked",
            "approved sessions are view-only",
            Some(json!({ "id": id })),
        );
    }

    let mut updated = state.activities[index].clone();
    if let Some(title) = req.params.get("title").and_then(|v| v.as_str()) {
        let trimmed = title.trim();
        if !trimmed.is_empty() {
            updated.title = trimmed.to_string();
        }
    }
    if let Some(subject) = req.params.get("subject").and_then(|v| v.as_str()) {
        match subjects::sanitize_subject(Some(subject), state.allowed_subjects()) {
            Some(s) => updated.subject = Some(s),
            None => return err(&req.id, "no_subjects", "no subjects are assigned", None),
        }
        // A subject edit must not land on a day an approved session of that
        // subject already occupies. The edited session itself is not locked
        // (checked above), so it never matches against itself.
        if conflict::has_conflict(
            updated.start,
            updated.subject.as_deref(),
            updated.grade_level.as_deref(),
            &state.activities,
        ) {
            return err(
                &req.id,
                "approved_conflict",
                format!("an approved session already occupies {}", updated.start.date()),
                Some(json!({ "id": id, "date": updated.start.date().to_string() })),
            );
        }
    }
    if let Some(kind) = req.params.get("kind").and_then(|v| v.as_str()) {
        if !kind.trim().is_empty() {
            updated.kind = kind.trim().to_string();
        }
    }
    if let Some(room) = req.params.get("room").and_then(|v| v.as_str()) {
        updated.room = Some(room.to_string());
    }
    if let Some(description) = req.params.get("description").and_then(|v| v.as_str()) {
        updated.description = Some(description.to_string());
    }

    let updated_json = match serde_json::to_value(&updated) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    state.activities[index] = updated;
    ok(&req.id, json!({ "activity": updated_json }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(id) = req.params.get("id").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing params.id", None);
    };
    let Some(activity) = state.activities.iter().find(|a| a.id == id) else {
        return err(&req.id, "not_found", "unknown activity id", Some(json!({ "id": id })));
    };
    if approval::is_locked(activity) {
        return err(
            &req.id,
            "locked",
            "approved sessions are view-only",
            Some(json!({ "id": id })),
        );
    }

    state.activities.retain(|a| a.id != id);
    ok(&req.id, json!({ "deleted": id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sessions.checkDay" => Some(handle_check_day(state, req)),
        "sessions.add" => Some(handle_add(state, req)),
        "sessions.generateWeek" => Some(handle_generate_week(state, req)),
        "sessions.update" => Some(handle_update(state, req)),
        "sessions.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
