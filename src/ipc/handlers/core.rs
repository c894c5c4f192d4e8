use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, CoordinatorProfile, Request};
use crate::model::Activity;
use crate::subjects;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "activities": state.activities.len(),
        }),
    )
}

/// Normalizes the raw profile text from the coordinator profile source. The
/// result tells the portal which subjects the coordinator may plan for and
/// whether the subject choice is locked to a single value.
fn handle_profile_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_text = req
        .params
        .get("subjectText")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let grade_text = req
        .params
        .get("gradeText")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let subjects = subjects::normalize_subjects(subject_text);
    let grade_level = subjects::normalize_grade(grade_text);
    let locked = subjects.len() == 1;

    state.profile = Some(CoordinatorProfile {
        name,
        subjects: subjects.clone(),
        grade_level: grade_level.clone(),
    });

    ok(
        &req.id,
        json!({
            "subjects": subjects,
            "grade": grade_level,
            "subjectLocked": locked,
        }),
    )
}

/// Seeds the collection from the host's persistence fetch. Statuses are
/// normalized on the way in by the Activity deserializer.
fn handle_activities_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("activities") else {
        return err(&req.id, "bad_params", "missing params.activities", None);
    };
    let activities: Vec<Activity> = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let count = activities.len();
    state.activities = activities;
    ok(&req.id, json!({ "loaded": count }))
}

fn handle_activities_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match serde_json::to_value(&state.activities) {
        Ok(v) => ok(&req.id, json!({ "activities": v })),
        Err(e) => err(&req.id, "bad_params", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "profile.set" => Some(handle_profile_set(state, req)),
        "activities.load" => Some(handle_activities_load(state, req)),
        "activities.list" => Some(handle_activities_list(state, req)),
        _ => None,
    }
}
