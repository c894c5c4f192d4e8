//! Builds single sessions and five-day weekly batches. All collection
//! updates are copy-on-write: callers swap in the returned collection only on
//! success, which keeps the all-or-nothing batch guarantee trivial.

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use serde::Deserialize;
use serde_json::json;

use crate::approval;
use crate::conflict;
use crate::eligibility;
use crate::model::{
    weekday_label, Activity, EngineError, PlanningSnapshot, WeeklyScheduleFormData,
};
use crate::subjects;

const DEFAULT_START: (u32, u32) = (9, 0);
const DEFAULT_END: (u32, u32) = (10, 0);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSessionParams {
    pub date: NaiveDate,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "crate::model::hhmm::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "crate::model::hhmm::option")]
    pub end_time: Option<NaiveTime>,
}

/// Time-of-day pair for new sessions: the last-saved weekly rota when one
/// exists, else 09:00-10:00.
pub fn session_times(snapshot: &PlanningSnapshot) -> (NaiveTime, NaiveTime) {
    if let Some(rota) = snapshot.rota {
        return (rota.start_time, rota.end_time);
    }
    (
        NaiveTime::from_hms_opt(DEFAULT_START.0, DEFAULT_START.1, 0).unwrap_or_default(),
        NaiveTime::from_hms_opt(DEFAULT_END.0, DEFAULT_END.1, 0).unwrap_or_default(),
    )
}

pub fn next_id(existing: &[Activity]) -> i64 {
    existing.iter().map(|a| a.id).max().unwrap_or(0) + 1
}

/// Builds one session. Eligibility failures surface under their reason code;
/// an approved clash is reported as `approved_conflict`, never dropped.
pub fn build_single(
    params: &SingleSessionParams,
    snapshot: &PlanningSnapshot,
    existing: &[Activity],
) -> Result<Activity, EngineError> {
    let Some(subject) = subjects::sanitize_subject(params.subject.as_deref(), snapshot.allowed_subjects)
    else {
        return Err(EngineError::new(
            "no_subjects",
            "no subjects are assigned to this coordinator",
        ));
    };

    if let Err(rejection) = eligibility::check_day(params.date, snapshot) {
        return Err(EngineError::new(rejection.code, rejection.message));
    }

    let (default_start, default_end) = session_times(snapshot);
    let start_time = params.start_time.unwrap_or(default_start);
    let end_time = params.end_time.unwrap_or(default_end);
    if end_time <= start_time {
        return Err(EngineError::new("bad_time_range", "end time must be after start time"));
    }

    let start = params.date.and_time(start_time);
    let end = params.date.and_time(end_time);

    if conflict::has_conflict(start, Some(&subject), snapshot.grade_level, existing) {
        return Err(EngineError::new(
            "approved_conflict",
            format!("an approved session already occupies {}", params.date),
        )
        .with_details(json!({ "date": params.date.to_string(), "subject": subject })));
    }

    let title = params
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} Remediation", subject));

    Ok(Activity {
        id: next_id(existing),
        title,
        start,
        end,
        day: weekday_label(params.date.weekday()).to_string(),
        grade_level: snapshot.grade_level.map(str::to_string),
        subject: Some(subject),
        kind: params
            .kind
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or("class")
            .to_string(),
        room: params.room.clone(),
        description: params.description.clone(),
        status: None,
        week_ref: None,
        requested_by: None,
        requested_at: None,
        approved_by: None,
        approved_at: None,
        source: None,
    })
}

/// Expands a weekly template into 5 sessions. Every weekday must pass the
/// eligibility check and the conflict check; any failure rejects the whole
/// batch with the offending weekday named.
pub fn build_week(
    form: &WeeklyScheduleFormData,
    snapshot: &PlanningSnapshot,
    existing: &[Activity],
) -> Result<Vec<Activity>, EngineError> {
    if form.week_start.weekday() != Weekday::Mon {
        return Err(EngineError::new("not_monday", "week start must be a Monday")
            .with_details(json!({ "weekStart": form.week_start.to_string() })));
    }
    if form.end_time <= form.start_time {
        return Err(EngineError::new("bad_time_range", "end time must be after start time"));
    }
    if snapshot.allowed_subjects.is_empty() {
        return Err(EngineError::new(
            "no_subjects",
            "no subjects are assigned to this coordinator",
        ));
    }

    let weekdays = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    // First pass: every weekday must be eligible before anything is built.
    for (offset, weekday) in weekdays.iter().enumerate() {
        let date = day_of_week(form.week_start, offset)?;
        if let Err(rejection) = eligibility::check_day(date, snapshot) {
            return Err(EngineError::new(
                "day_ineligible",
                format!("{} is not schedulable: {}", weekday_label(*weekday), rejection.message),
            )
            .with_details(json!({
                "weekday": weekday_label(*weekday),
                "reason": rejection.code,
            })));
        }
    }

    let week_ref = week_reference(snapshot.grade_level, form.week_start);

    // Regeneration replaces the whole batch under this week reference, and
    // an approved session may never be edited or deleted. Refuse up front so
    // the lock survives regardless of what subjects the new template carries.
    if let Some(locked) = existing
        .iter()
        .find(|a| a.week_ref.as_deref() == Some(week_ref.as_str()) && approval::is_locked(a))
    {
        return Err(EngineError::new(
            "locked",
            "the week contains an approved session and cannot be regenerated",
        )
        .with_details(json!({ "id": locked.id, "weekRef": week_ref })));
    }

    let mut batch: Vec<Activity> = Vec::with_capacity(weekdays.len());
    let mut id = next_id(existing);

    for (offset, weekday) in weekdays.iter().enumerate() {
        let date = day_of_week(form.week_start, offset)?;
        let Some(subject) =
            subjects::sanitize_subject(form.subject_for(*weekday), snapshot.allowed_subjects)
        else {
            return Err(EngineError::new(
                "no_subjects",
                "no subjects are assigned to this coordinator",
            ));
        };
        let start = date.and_time(form.start_time);
        let end = date.and_time(form.end_time);

        if conflict::has_conflict(start, Some(&subject), snapshot.grade_level, existing) {
            return Err(EngineError::new(
                "approved_conflict",
                format!(
                    "an approved session already occupies {} ({})",
                    date,
                    weekday_label(*weekday)
                ),
            )
            .with_details(json!({
                "weekday": weekday_label(*weekday),
                "date": date.to_string(),
            })));
        }

        batch.push(Activity {
            id,
            title: format!("{} Remediation", subject),
            start,
            end,
            day: weekday_label(*weekday).to_string(),
            grade_level: snapshot.grade_level.map(str::to_string),
            subject: Some(subject),
            kind: "class".to_string(),
            room: None,
            description: None,
            status: None,
            week_ref: Some(week_ref.clone()),
            requested_by: None,
            requested_at: None,
            approved_by: None,
            approved_at: None,
            source: None,
        });
        id += 1;
    }

    Ok(batch)
}

/// Scopes one generated week: grade plus the Monday anchor. Regenerating the
/// same week replaces everything under this key.
pub fn week_reference(grade_level: Option<&str>, week_start: NaiveDate) -> String {
    format!("{}|{}", grade_level.unwrap_or("-"), week_start)
}

/// Copy-on-write replacement of one week's batch. Activities outside the
/// `week_ref` are untouched.
pub fn replace_week(existing: &[Activity], week_ref: &str, batch: Vec<Activity>) -> Vec<Activity> {
    let mut next: Vec<Activity> = existing
        .iter()
        .filter(|a| a.week_ref.as_deref() != Some(week_ref))
        .cloned()
        .collect();
    next.extend(batch);
    next
}

fn day_of_week(week_start: NaiveDate, offset: usize) -> Result<NaiveDate, EngineError> {
    week_start
        .checked_add_days(Days::new(offset as u64))
        .ok_or_else(|| EngineError::new("bad_params", "week start out of calendar range"))
}
