//! Decides whether a calendar date may host a remediation session. Rejection
//! reasons are stable contract codes the portal maps to guard messages.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::model::{weekday_label, PlanningSnapshot};
use crate::window;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ineligibility {
    pub code: &'static str,
    pub message: String,
}

impl Ineligibility {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Checks, in order: weekend, subject-day rota, window status and bounds.
/// Whole-day comparisons throughout; bounds inclusive.
pub fn check_day(date: NaiveDate, snapshot: &PlanningSnapshot) -> Result<(), Ineligibility> {
    let weekday = date.weekday();
    if weekday == Weekday::Sat || weekday == Weekday::Sun {
        return Err(Ineligibility::new(
            "weekend",
            format!("{} falls on a {}", date, weekday_label(weekday)),
        ));
    }

    // The rota only gates when the coordinator actually has assigned subjects
    // and the rota carries at least one subject of its own.
    if !snapshot.allowed_subjects.is_empty() {
        if let Some(rota) = snapshot.rota.filter(|r| r.has_any_subject()) {
            let matches = rota.subject_for(weekday).map(|subject| {
                snapshot
                    .allowed_subjects
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(subject))
            });
            if matches != Some(true) {
                return Err(Ineligibility::new(
                    "wrong-subject-day",
                    format!(
                        "{} is not a scheduled day for your subjects",
                        weekday_label(weekday)
                    ),
                ));
            }
        }
    }

    let Some(window) = snapshot.window else {
        return Err(Ineligibility::new(
            "window-inactive",
            "no scheduling window is configured",
        ));
    };
    let status = window::window_status(Some(window), snapshot.today);
    if status != crate::model::WindowStatus::Active {
        return Err(Ineligibility::new(
            "window-inactive",
            format!("the scheduling window is {}", status.as_str()),
        ));
    }
    if date < window.start || date > window.end {
        return Err(Ineligibility::new(
            "outside-window",
            format!(
                "{} is outside the scheduling window {}..{}",
                date, window.start, window.end
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SchedulingWindow, WeeklySubjectSchedule};
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn window() -> SchedulingWindow {
        SchedulingWindow {
            quarter: None,
            start: date(2025, 1, 6),
            end: date(2025, 1, 31),
            active: true,
        }
    }

    fn rota() -> WeeklySubjectSchedule {
        WeeklySubjectSchedule {
            monday: Some("English".to_string()),
            tuesday: Some("Math".to_string()),
            wednesday: Some("English".to_string()),
            thursday: Some("Math".to_string()),
            friday: Some("Science".to_string()),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).expect("time"),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).expect("time"),
        }
    }

    fn snapshot<'a>(
        window: Option<&'a SchedulingWindow>,
        rota: Option<&'a WeeklySubjectSchedule>,
        allowed: &'a [String],
    ) -> PlanningSnapshot<'a> {
        PlanningSnapshot {
            today: date(2025, 1, 8),
            window,
            rota,
            allowed_subjects: allowed,
            grade_level: Some("Grade 3"),
        }
    }

    #[test]
    fn weekends_are_always_rejected() {
        let w = window();
        let allowed = vec!["English".to_string()];
        let snap = snapshot(Some(&w), None, &allowed);
        for d in [date(2025, 1, 11), date(2025, 1, 12)] {
            let rejection = check_day(d, &snap).expect_err("weekend");
            assert_eq!(rejection.code, "weekend");
        }
    }

    #[test]
    fn weekend_check_precedes_window_check() {
        // Saturday outside the window still reports "weekend".
        let w = window();
        let snap = snapshot(Some(&w), None, &[]);
        let rejection = check_day(date(2025, 3, 1), &snap).expect_err("weekend");
        assert_eq!(rejection.code, "weekend");
    }

    #[test]
    fn subject_day_mismatch_is_rejected() {
        let w = window();
        let r = rota();
        let allowed = vec!["English".to_string()];
        let snap = snapshot(Some(&w), Some(&r), &allowed);
        // Tuesday is a Math day.
        let rejection = check_day(date(2025, 1, 7), &snap).expect_err("mismatch");
        assert_eq!(rejection.code, "wrong-subject-day");
        // Monday is an English day.
        assert!(check_day(date(2025, 1, 6), &snap).is_ok());
    }

    #[test]
    fn rota_does_not_gate_without_assigned_subjects() {
        let w = window();
        let r = rota();
        let snap = snapshot(Some(&w), Some(&r), &[]);
        assert!(check_day(date(2025, 1, 7), &snap).is_ok());
    }

    #[test]
    fn dates_outside_window_are_rejected() {
        let w = window();
        let allowed = vec!["English".to_string()];
        let snap = snapshot(Some(&w), None, &allowed);
        let rejection = check_day(date(2025, 2, 3), &snap).expect_err("outside");
        assert_eq!(rejection.code, "outside-window");
        // Inclusive bounds.
        assert!(check_day(date(2025, 1, 6), &snap).is_ok());
        assert!(check_day(date(2025, 1, 31), &snap).is_ok());
    }

    #[test]
    fn inactive_or_missing_window_blocks_everything() {
        let mut w = window();
        w.active = false;
        let allowed = vec!["English".to_string()];
        let snap = snapshot(Some(&w), None, &allowed);
        let rejection = check_day(date(2025, 1, 8), &snap).expect_err("inactive");
        assert_eq!(rejection.code, "window-inactive");

        let snap = snapshot(None, None, &allowed);
        let rejection = check_day(date(2025, 1, 8), &snap).expect_err("no window");
        assert_eq!(rejection.code, "window-inactive");
    }
}
