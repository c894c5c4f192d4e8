use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::WeeklySubjectSchedule;
use crate::window::{self, WindowConfig};

/// Stores the principal's window configuration (either the explicit record
/// or the quarter-month table) and reports the window it resolves to today.
fn handle_set_window(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("config") else {
        return err(&req.id, "bad_params", "missing params.config", None);
    };
    let config: WindowConfig = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let today = req.today();
    let resolved = window::resolve_window(&config, today);
    state.window_config = Some(config);

    window_response(&req.id, resolved.as_ref(), today)
}

fn handle_get_window(state: &mut AppState, req: &Request) -> serde_json::Value {
    let today = req.today();
    let resolved = state.resolved_window(today);
    window_response(&req.id, resolved.as_ref(), today)
}

fn window_response(
    id: &str,
    resolved: Option<&crate::model::SchedulingWindow>,
    today: chrono::NaiveDate,
) -> serde_json::Value {
    let status = window::window_status(resolved, today);
    let window_json = match resolved {
        Some(w) => match serde_json::to_value(w) {
            Ok(v) => v,
            Err(e) => return err(id, "bad_params", e.to_string(), None),
        },
        None => serde_json::Value::Null,
    };
    ok(
        id,
        json!({
            "window": window_json,
            "status": status.as_str(),
        }),
    )
}

/// Stores the weekly subject-day rota. Its time pair becomes the default
/// time-of-day for every new session.
fn handle_set_weekly_schedule(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("schedule") else {
        return err(&req.id, "bad_params", "missing params.schedule", None);
    };
    let schedule: WeeklySubjectSchedule = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if schedule.end_time <= schedule.start_time {
        return err(&req.id, "bad_time_range", "end time must be after start time", None);
    }
    state.rota = Some(schedule);
    ok(&req.id, json!({ "saved": true }))
}

fn handle_get_weekly_schedule(state: &mut AppState, req: &Request) -> serde_json::Value {
    match &state.rota {
        Some(rota) => match serde_json::to_value(rota) {
            Ok(v) => ok(&req.id, json!({ "schedule": v })),
            Err(e) => err(&req.id, "bad_params", e.to_string(), None),
        },
        None => ok(&req.id, json!({ "schedule": null })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "config.setWindow" => Some(handle_set_window(state, req)),
        "config.getWindow" => Some(handle_get_window(state, req)),
        "config.setWeeklySchedule" => Some(handle_set_weekly_schedule(state, req)),
        "config.getWeeklySchedule" => Some(handle_get_weekly_schedule(state, req)),
        _ => None,
    }
}
