use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::model::{Activity, PlanningSnapshot, SchedulingWindow, WeeklySubjectSchedule};
use crate::window::{self, WindowConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Request {
    /// Deterministic clock for tests: requests may carry a `today`
    /// (YYYY-MM-DD) or `now` (ISO datetime) param; the local clock is the
    /// fallback.
    pub fn today(&self) -> NaiveDate {
        if let Some(s) = self.params.get("today").and_then(|v| v.as_str()) {
            if let Ok(d) = s.parse::<NaiveDate>() {
                return d;
            }
        }
        self.now().date()
    }

    pub fn now(&self) -> NaiveDateTime {
        if let Some(s) = self.params.get("now").and_then(|v| v.as_str()) {
            if let Ok(dt) = s.parse::<NaiveDateTime>() {
                return dt;
            }
            if let Ok(d) = s.parse::<NaiveDate>() {
                return d.and_hms_opt(0, 0, 0).unwrap_or_default();
            }
        }
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoordinatorProfile {
    pub name: Option<String>,
    pub subjects: Vec<String>,
    pub grade_level: Option<String>,
}

/// One coordinator's editing session. All mutation swaps `activities` for a
/// new collection; nothing here is shared across threads.
#[derive(Default)]
pub struct AppState {
    pub profile: Option<CoordinatorProfile>,
    pub window_config: Option<WindowConfig>,
    pub rota: Option<WeeklySubjectSchedule>,
    pub activities: Vec<Activity>,
}

impl AppState {
    pub fn allowed_subjects(&self) -> &[String] {
        self.profile.as_ref().map(|p| p.subjects.as_slice()).unwrap_or(&[])
    }

    pub fn grade_level(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.grade_level.as_deref())
    }

    pub fn resolved_window(&self, today: NaiveDate) -> Option<SchedulingWindow> {
        self.window_config
            .as_ref()
            .and_then(|cfg| window::resolve_window(cfg, today))
    }

    pub fn snapshot<'a>(
        &'a self,
        today: NaiveDate,
        window: Option<&'a SchedulingWindow>,
    ) -> PlanningSnapshot<'a> {
        PlanningSnapshot {
            today,
            window,
            rota: self.rota.as_ref(),
            allowed_subjects: self.allowed_subjects(),
            grade_level: self.grade_level(),
        }
    }
}
