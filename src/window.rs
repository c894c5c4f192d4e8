//! Resolves the administratively-configured scheduling window. Principals
//! configure either an explicit dated record or a quarter-month table keyed
//! by school year; both collapse to one concrete `SchedulingWindow`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::model::{SchedulingWindow, WindowStatus};

/// The two configuration shapes the portal stores. Kept as loaded so the
/// window can be re-resolved against a fresh "today" on every check.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WindowConfig {
    #[serde(rename_all = "camelCase")]
    Explicit {
        #[serde(default)]
        quarter: Option<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        #[serde(default = "default_active")]
        active: bool,
    },
    #[serde(rename_all = "camelCase")]
    QuarterTable {
        school_year: String,
        quarters: BTreeMap<String, QuarterMonths>,
        #[serde(default = "default_active")]
        active: bool,
    },
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterMonths {
    pub start_month: u32,
    pub end_month: u32,
}

/// Collapses a configuration record to the window that governs "today".
/// Returns None when no usable record exists (bad dates, empty quarter map).
pub fn resolve_window(config: &WindowConfig, today: NaiveDate) -> Option<SchedulingWindow> {
    match config {
        WindowConfig::Explicit {
            quarter,
            start_date,
            end_date,
            active,
        } => {
            if end_date < start_date {
                return None;
            }
            Some(SchedulingWindow {
                quarter: quarter.clone(),
                start: *start_date,
                end: *end_date,
                active: *active,
            })
        }
        WindowConfig::QuarterTable {
            school_year,
            quarters,
            active,
        } => resolve_from_quarters(school_year, quarters, *active, today),
    }
}

pub fn window_status(window: Option<&SchedulingWindow>, today: NaiveDate) -> WindowStatus {
    let Some(window) = window else {
        return WindowStatus::Inactive;
    };
    if !window.active {
        return WindowStatus::Inactive;
    }
    if today < window.start {
        WindowStatus::Upcoming
    } else if today > window.end {
        WindowStatus::Completed
    } else {
        WindowStatus::Active
    }
}

fn resolve_from_quarters(
    school_year: &str,
    quarters: &BTreeMap<String, QuarterMonths>,
    active: bool,
    today: NaiveDate,
) -> Option<SchedulingWindow> {
    let (start_year, end_year) = parse_school_year(school_year)?;

    let mut candidates: Vec<SchedulingWindow> = Vec::new();
    for (label, q) in quarters {
        let Some(start) = month_start(quarter_year(q.start_month, start_year, end_year), q.start_month)
        else {
            continue;
        };
        let Some(end) = month_end(quarter_year(q.end_month, start_year, end_year), q.end_month)
        else {
            continue;
        };
        if end < start {
            continue;
        }
        candidates.push(SchedulingWindow {
            quarter: Some(label.clone()),
            start,
            end,
            active,
        });
    }
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by_key(|w| w.start);

    // Quarter containing today, else the nearest upcoming one, else the most
    // recently ended one. A window always resolves when quarter data exists.
    if let Some(hit) = candidates
        .iter()
        .find(|w| w.start <= today && today <= w.end)
    {
        return Some(hit.clone());
    }
    if let Some(upcoming) = candidates.iter().filter(|w| w.start > today).min_by_key(|w| w.start) {
        return Some(upcoming.clone());
    }
    candidates
        .iter()
        .filter(|w| w.end < today)
        .max_by_key(|w| w.end)
        .cloned()
}

/// "2024-2025" -> (2024, 2025). Months June and later belong to the start
/// year, earlier months to the end year.
fn parse_school_year(raw: &str) -> Option<(i32, i32)> {
    let mut parts = raw.split(['-', '/']).map(str::trim);
    let start: i32 = parts.next()?.parse().ok()?;
    let end: i32 = parts.next()?.parse().ok()?;
    if end < start {
        return None;
    }
    Some((start, end))
}

fn quarter_year(month: u32, start_year: i32, end_year: i32) -> i32 {
    if month >= 6 {
        start_year
    } else {
        end_year
    }
}

fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let first = month_start(year, month)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.pred_opt().unwrap_or(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn quarter_table() -> WindowConfig {
        let mut quarters = BTreeMap::new();
        quarters.insert(
            "1st Quarter".to_string(),
            QuarterMonths {
                start_month: 8,
                end_month: 10,
            },
        );
        quarters.insert(
            "2nd Quarter".to_string(),
            QuarterMonths {
                start_month: 11,
                end_month: 1,
            },
        );
        quarters.insert(
            "3rd Quarter".to_string(),
            QuarterMonths {
                start_month: 2,
                end_month: 4,
            },
        );
        WindowConfig::QuarterTable {
            school_year: "2024-2025".to_string(),
            quarters,
            active: true,
        }
    }

    #[test]
    fn explicit_record_resolves_as_given() {
        let cfg = WindowConfig::Explicit {
            quarter: Some("3rd Quarter".to_string()),
            start_date: date(2025, 1, 6),
            end_date: date(2025, 1, 10),
            active: true,
        };
        let w = resolve_window(&cfg, date(2025, 1, 8)).expect("window");
        assert_eq!(w.start, date(2025, 1, 6));
        assert_eq!(w.end, date(2025, 1, 10));
        assert!(w.active);
    }

    #[test]
    fn explicit_record_with_inverted_dates_is_unusable() {
        let cfg = WindowConfig::Explicit {
            quarter: None,
            start_date: date(2025, 1, 10),
            end_date: date(2025, 1, 6),
            active: true,
        };
        assert!(resolve_window(&cfg, date(2025, 1, 8)).is_none());
    }

    #[test]
    fn quarter_containing_today_wins() {
        let w = resolve_window(&quarter_table(), date(2024, 9, 15)).expect("window");
        assert_eq!(w.quarter.as_deref(), Some("1st Quarter"));
        assert_eq!(w.start, date(2024, 8, 1));
        assert_eq!(w.end, date(2024, 10, 31));
    }

    #[test]
    fn year_boundary_quarter_spans_december_to_january() {
        let w = resolve_window(&quarter_table(), date(2024, 12, 20)).expect("window");
        assert_eq!(w.quarter.as_deref(), Some("2nd Quarter"));
        assert_eq!(w.start, date(2024, 11, 1));
        assert_eq!(w.end, date(2025, 1, 31));
    }

    #[test]
    fn gap_between_quarters_picks_nearest_upcoming() {
        // July sits before the 1st quarter opens.
        let w = resolve_window(&quarter_table(), date(2024, 7, 4)).expect("window");
        assert_eq!(w.quarter.as_deref(), Some("1st Quarter"));
    }

    #[test]
    fn after_all_quarters_picks_most_recently_ended() {
        let w = resolve_window(&quarter_table(), date(2025, 6, 1)).expect("window");
        assert_eq!(w.quarter.as_deref(), Some("3rd Quarter"));
        assert_eq!(w.end, date(2025, 4, 30));
    }

    #[test]
    fn empty_quarter_table_resolves_nothing() {
        let cfg = WindowConfig::QuarterTable {
            school_year: "2024-2025".to_string(),
            quarters: BTreeMap::new(),
            active: true,
        };
        assert!(resolve_window(&cfg, date(2024, 9, 1)).is_none());
    }

    #[test]
    fn status_derivation_covers_all_states() {
        let w = SchedulingWindow {
            quarter: None,
            start: date(2025, 1, 6),
            end: date(2025, 1, 10),
            active: true,
        };
        assert_eq!(window_status(Some(&w), date(2025, 1, 5)), WindowStatus::Upcoming);
        assert_eq!(window_status(Some(&w), date(2025, 1, 6)), WindowStatus::Active);
        assert_eq!(window_status(Some(&w), date(2025, 1, 10)), WindowStatus::Active);
        assert_eq!(window_status(Some(&w), date(2025, 1, 11)), WindowStatus::Completed);
        assert_eq!(window_status(None, date(2025, 1, 8)), WindowStatus::Inactive);

        let inactive = SchedulingWindow { active: false, ..w };
        assert_eq!(
            window_status(Some(&inactive), date(2025, 1, 8)),
            WindowStatus::Inactive
        );
    }
}
