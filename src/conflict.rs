//! Detects clashes against already-approved sessions. Approved sessions are
//! authoritative; new work must not silently land on top of them.

use chrono::NaiveDateTime;

use crate::approval;
use crate::model::Activity;
use crate::subjects;

/// True when an approved activity occupies the candidate's calendar day with
/// a matching subject and grade. A missing subject or grade on either side
/// matches anything; partial profile data must not hide real clashes.
pub fn has_conflict(
    candidate_start: NaiveDateTime,
    subject: Option<&str>,
    grade: Option<&str>,
    existing: &[Activity],
) -> bool {
    let day = candidate_start.date();
    let grade_norm = grade.and_then(subjects::normalize_grade);

    existing.iter().any(|a| {
        if !approval::is_locked(a) {
            return false;
        }
        if a.start.date() != day {
            return false;
        }
        let subject_match = match (subject, a.subject.as_deref()) {
            (Some(lhs), Some(rhs)) => lhs.eq_ignore_ascii_case(rhs),
            _ => true,
        };
        if !subject_match {
            return false;
        }
        match (&grade_norm, a.grade_level.as_deref().and_then(subjects::normalize_grade)) {
            (Some(lhs), Some(rhs)) => lhs.eq_ignore_ascii_case(&rhs),
            _ => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalStatus;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .expect("valid date")
            .and_hms_opt(h, 0, 0)
            .expect("valid time")
    }

    fn approved(day: u32, subject: Option<&str>, grade: Option<&str>) -> Activity {
        Activity {
            id: 1,
            title: "Existing".to_string(),
            start: at(2025, 1, day, 9),
            end: at(2025, 1, day, 10),
            day: "Monday".to_string(),
            grade_level: grade.map(str::to_string),
            subject: subject.map(str::to_string),
            kind: "class".to_string(),
            room: None,
            description: None,
            status: Some(ApprovalStatus::Approved),
            week_ref: None,
            requested_by: None,
            requested_at: None,
            approved_by: None,
            approved_at: None,
            source: None,
        }
    }

    #[test]
    fn approved_same_day_subject_grade_conflicts() {
        let existing = vec![approved(6, Some("English"), Some("Grade 3"))];
        assert!(has_conflict(
            at(2025, 1, 6, 14),
            Some("english"),
            Some("grade iii"),
            &existing
        ));
    }

    #[test]
    fn pending_sessions_never_conflict() {
        let mut a = approved(6, Some("English"), Some("Grade 3"));
        a.status = Some(ApprovalStatus::Pending);
        assert!(!has_conflict(
            at(2025, 1, 6, 9),
            Some("English"),
            Some("Grade 3"),
            &[a]
        ));
    }

    #[test]
    fn different_day_or_subject_or_grade_passes() {
        let existing = vec![approved(6, Some("English"), Some("Grade 3"))];
        assert!(!has_conflict(at(2025, 1, 7, 9), Some("English"), Some("Grade 3"), &existing));
        assert!(!has_conflict(at(2025, 1, 6, 9), Some("Math"), Some("Grade 3"), &existing));
        assert!(!has_conflict(at(2025, 1, 6, 9), Some("English"), Some("Grade 4"), &existing));
    }

    #[test]
    fn missing_subject_or_grade_acts_as_wildcard() {
        let existing = vec![approved(6, None, Some("Grade 3"))];
        assert!(has_conflict(at(2025, 1, 6, 9), Some("Math"), Some("Grade 3"), &existing));

        let existing = vec![approved(6, Some("English"), None)];
        assert!(has_conflict(at(2025, 1, 6, 9), Some("English"), Some("Grade 7"), &existing));

        let existing = vec![approved(6, Some("English"), Some("Grade 3"))];
        assert!(has_conflict(at(2025, 1, 6, 9), None, None, &existing));
    }
}
