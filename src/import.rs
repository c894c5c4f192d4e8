//! Bulk spreadsheet import. Parses a tabular file exported by whatever tool
//! the school uses, maps rows to candidate sessions, and reconciles them
//! against the existing collection. Rows are skipped with a recorded reason,
//! never aborting the batch; the import is purely additive.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::builder;
use crate::conflict;
use crate::eligibility;
use crate::model::{weekday_label, Activity, EngineError, PlanningSnapshot};
use crate::subjects;

const DATE_HEADERS: [&str; 5] = ["date", "day", "scheduledate", "sessiondate", "when"];
const TITLE_HEADERS: [&str; 6] = ["title", "activity", "activitytitle", "name", "session", "topic"];

/// Excel's day-serial epoch (1899-12-30; the off-by-two absorbs the 1900
/// leap-year bug for every serial in practical range).
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    pub row: usize,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub added: usize,
    pub skipped: Vec<SkippedRow>,
    pub sessions: Vec<Activity>,
}

/// Reads a CSV file (header row first) and reconciles its rows. The returned
/// sessions carry fresh ids and no status; the caller holds them as "pending
/// decision" until they are sent or declined.
pub fn import_file(
    path: &Path,
    snapshot: &PlanningSnapshot,
    existing: &[Activity],
) -> Result<ImportOutcome, EngineError> {
    let (headers, rows) =
        read_rows(path).map_err(|e| EngineError::new("file_read_failed", format!("{e:#}")))?;
    reconcile(&headers, &rows, snapshot, existing)
}

fn read_rows(path: &Path) -> anyhow::Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("read header row")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.context("read data row")?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

/// The reconciliation pipeline, separated from file access so it can run on
/// in-memory rows under test.
pub fn reconcile(
    headers: &[String],
    rows: &[Vec<String>],
    snapshot: &PlanningSnapshot,
    existing: &[Activity],
) -> Result<ImportOutcome, EngineError> {
    let date_col = find_column(headers, &DATE_HEADERS);
    let title_col = find_column(headers, &TITLE_HEADERS);
    let (Some(date_col), Some(title_col)) = (date_col, title_col) else {
        return Err(EngineError::new(
            "missing_columns",
            "the file needs a date column and a title column",
        ));
    };

    let mut signatures: HashSet<(NaiveDateTime, String, String)> = existing
        .iter()
        .map(|a| signature(a.start, &a.title, a.subject.as_deref()))
        .collect();

    let (start_time, end_time) = builder::session_times(snapshot);
    let mut next_id = builder::next_id(existing);
    let mut added: Vec<Activity> = Vec::new();
    let mut skipped: Vec<SkippedRow> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        // Row numbers are 1-based and count the header.
        let row_no = i + 2;
        let title = row.get(title_col).map(|c| c.trim()).unwrap_or("");

        if title.is_empty() {
            skipped.push(skip(row_no, "", "blank-title"));
            continue;
        }

        let date_cell = row.get(date_col).map(|c| c.trim()).unwrap_or("");
        let Some(date) = parse_date_cell(date_cell) else {
            skipped.push(skip(row_no, title, "bad-date"));
            continue;
        };

        if let Err(rejection) = eligibility::check_day(date, snapshot) {
            skipped.push(skip(row_no, title, rejection.code));
            continue;
        }

        let Some(subject) = subjects::sanitize_subject(None, snapshot.allowed_subjects) else {
            skipped.push(skip(row_no, title, "no-subject"));
            continue;
        };

        let start = date.and_time(start_time);
        let end = date.and_time(end_time);

        let sig = signature(start, title, Some(&subject));
        if signatures.contains(&sig) {
            skipped.push(skip(row_no, title, "duplicate"));
            continue;
        }

        if conflict::has_conflict(start, Some(&subject), snapshot.grade_level, existing) {
            skipped.push(skip(row_no, title, "approved-conflict"));
            continue;
        }

        signatures.insert(sig);
        added.push(Activity {
            id: next_id,
            title: title.to_string(),
            start,
            end,
            day: weekday_label(date.weekday()).to_string(),
            grade_level: snapshot.grade_level.map(str::to_string),
            subject: Some(subject),
            kind: "class".to_string(),
            room: None,
            description: None,
            status: None,
            week_ref: None,
            requested_by: None,
            requested_at: None,
            approved_by: None,
            approved_at: None,
            source: Some("import".to_string()),
        });
        next_id += 1;
    }

    Ok(ImportOutcome {
        added: added.len(),
        skipped,
        sessions: added,
    })
}

fn skip(row: usize, title: &str, reason: &str) -> SkippedRow {
    SkippedRow {
        row,
        title: title.to_string(),
        reason: reason.to_string(),
    }
}

fn signature(start: NaiveDateTime, title: &str, subject: Option<&str>) -> (NaiveDateTime, String, String) {
    (
        start,
        title.trim().to_lowercase(),
        subject.unwrap_or("").trim().to_lowercase(),
    )
}

/// Fuzzy header lookup: lowercase, alphanumerics only, so "Schedule Date",
/// "schedule_date" and "ScheduleDate" all hit the same candidate.
fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let key: String = h.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase();
        candidates.contains(&key.as_str())
    })
}

/// Date cells may be ISO strings, slash/dash forms, month-name forms, or
/// Excel day serials.
pub fn parse_date_cell(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }

    if let Some(date) = parse_excel_serial(cell) {
        return Some(date);
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(cell, fmt) {
            return Some(date);
        }
    }

    // Day-first forms only when the leading field cannot be a month.
    if let Some(first) = cell.split(['/', '-']).next().and_then(|f| f.trim().parse::<u32>().ok()) {
        if first > 12 {
            for fmt in ["%d/%m/%Y", "%d-%m-%Y"] {
                if let Ok(date) = NaiveDate::parse_from_str(cell, fmt) {
                    return Some(date);
                }
            }
        }
    }

    for fmt in ["%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y", "%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(cell, fmt) {
            return Some(date);
        }
    }

    None
}

fn parse_excel_serial(cell: &str) -> Option<NaiveDate> {
    let serial: f64 = cell.parse().ok()?;
    if !(1.0..=200_000.0).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as u64;
    NaiveDate::from_ymd_opt(EXCEL_EPOCH.0, EXCEL_EPOCH.1, EXCEL_EPOCH.2)?
        .checked_add_days(Days::new(days))
}
