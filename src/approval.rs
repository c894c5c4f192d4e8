//! Approval-workflow state. Status strings arrive from several backends with
//! inconsistent vocabularies; they are parsed once at the boundary into a
//! closed variant, and everything downstream works on that.

use chrono::NaiveDateTime;
use serde_json::json;

use crate::model::{Activity, EngineError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalStatus {
    Approved,
    Pending,
    Declined,
    /// Forward-compatibility with status strings we have not seen yet.
    Unknown(String),
}

impl ApprovalStatus {
    pub fn label(&self) -> &str {
        match self {
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Declined => "Declined",
            ApprovalStatus::Unknown(s) => s,
        }
    }
}

/// Maps an arbitrary status token to a variant. Blank input means "no status
/// yet" and yields None.
pub fn parse_status(raw: &str) -> Option<ApprovalStatus> {
    let token = raw.trim().to_lowercase();
    if token.is_empty() {
        return None;
    }
    let status = match token.as_str() {
        "approved" | "approve" | "accepted" | "granted" | "true" | "yes" | "1" => {
            ApprovalStatus::Approved
        }
        "pending" | "awaiting" | "submitted" | "waiting" | "sent" | "0" => ApprovalStatus::Pending,
        "declined" | "rejected" | "denied" | "cancelled" | "canceled" | "void" => {
            ApprovalStatus::Declined
        }
        _ => ApprovalStatus::Unknown(title_case_token(raw.trim())),
    };
    Some(status)
}

fn title_case_token(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// View-only lock. Normalized Approved locks; as a fallback for raw strings
/// the normalizer could not place, any token containing "approve" locks too.
pub fn is_locked(activity: &Activity) -> bool {
    match &activity.status {
        Some(ApprovalStatus::Approved) => true,
        Some(ApprovalStatus::Unknown(raw)) => raw.to_lowercase().contains("approve"),
        _ => false,
    }
}

/// One entry of the payload handed to the activity persistence service.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPayloadItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    pub date: NaiveDateTime,
    pub end: NaiveDateTime,
    pub day: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_ref: Option<String>,
}

/// Builds the sendable subset (everything not locked). The host owns the
/// actual network call; on its success it must come back with `confirm_send`.
pub fn prepare_send(activities: &[Activity]) -> Result<(Vec<i64>, Vec<SendPayloadItem>), EngineError> {
    let sendable: Vec<&Activity> = activities.iter().filter(|a| !is_locked(a)).collect();
    if sendable.is_empty() {
        return Err(EngineError::new(
            "nothing_to_send",
            "no sessions are awaiting approval",
        ));
    }
    let ids = sendable.iter().map(|a| a.id).collect();
    let payload = sendable
        .iter()
        .map(|a| SendPayloadItem {
            title: a.title.clone(),
            subject: a.subject.clone(),
            grade_level: a.grade_level.clone(),
            date: a.start,
            end: a.end,
            day: a.day.clone(),
            week_ref: a.week_ref.clone(),
        })
        .collect();
    Ok((ids, payload))
}

/// Marks the submitted ids Pending. Returns a new collection; the input is
/// untouched on any error so a failed confirm mutates nothing.
pub fn confirm_send(
    activities: &[Activity],
    ids: &[i64],
    now: NaiveDateTime,
) -> Result<Vec<Activity>, EngineError> {
    for id in ids {
        let Some(activity) = activities.iter().find(|a| a.id == *id) else {
            return Err(EngineError::new("not_found", "unknown activity id")
                .with_details(json!({ "id": id })));
        };
        if is_locked(activity) {
            return Err(EngineError::new("locked", "approved sessions cannot be re-sent")
                .with_details(json!({ "id": id })));
        }
    }
    let updated = activities
        .iter()
        .map(|a| {
            if ids.contains(&a.id) {
                let mut sent = a.clone();
                sent.status = Some(ApprovalStatus::Pending);
                sent.requested_at = Some(now);
                sent
            } else {
                a.clone()
            }
        })
        .collect();
    Ok(updated)
}

/// Discards imported sessions that were never sent. Approved ids refuse with
/// `locked`, already-sent (Pending) ids with `already_sent`; either refusal
/// leaves the collection untouched.
pub fn decline_import(activities: &[Activity], ids: &[i64]) -> Result<Vec<Activity>, EngineError> {
    for id in ids {
        let Some(activity) = activities.iter().find(|a| a.id == *id) else {
            return Err(EngineError::new("not_found", "unknown activity id")
                .with_details(json!({ "id": id })));
        };
        if is_locked(activity) {
            return Err(EngineError::new("locked", "approved sessions cannot be discarded")
                .with_details(json!({ "id": id })));
        }
        if matches!(activity.status, Some(ApprovalStatus::Pending)) {
            return Err(EngineError::new(
                "already_sent",
                "sessions already sent for approval cannot be discarded",
            )
            .with_details(json!({ "id": id })));
        }
    }
    Ok(activities
        .iter()
        .filter(|a| !ids.contains(&a.id))
        .cloned()
        .collect())
}

/// Serde shim for `Option<ApprovalStatus>` fields: statuses travel as plain
/// strings on the wire, blank meaning no status.
pub mod status_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{parse_status, ApprovalStatus};

    pub fn serialize<S>(value: &Option<ApprovalStatus>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(status) => serializer.serialize_str(status.label()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<ApprovalStatus>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, d)
            .expect("valid date")
            .and_hms_opt(h, 0, 0)
            .expect("valid time")
    }

    fn activity(id: i64, status: Option<ApprovalStatus>) -> Activity {
        Activity {
            id,
            title: format!("Session {}", id),
            start: at(6, 9),
            end: at(6, 10),
            day: "Monday".to_string(),
            grade_level: Some("Grade 3".to_string()),
            subject: Some("English".to_string()),
            kind: "class".to_string(),
            room: None,
            description: None,
            status,
            week_ref: None,
            requested_by: None,
            requested_at: None,
            approved_by: None,
            approved_at: None,
            source: None,
        }
    }

    #[test]
    fn synonyms_map_to_closed_variants() {
        for raw in ["approved", "Accepted", "GRANTED", "true", "yes", "1"] {
            assert_eq!(parse_status(raw), Some(ApprovalStatus::Approved));
        }
        for raw in ["pending", "awaiting", "Submitted", "waiting", "0"] {
            assert_eq!(parse_status(raw), Some(ApprovalStatus::Pending));
        }
        for raw in ["declined", "REJECTED", "denied", "cancelled", "void"] {
            assert_eq!(parse_status(raw), Some(ApprovalStatus::Declined));
        }
    }

    #[test]
    fn unknown_statuses_pass_through_title_cased() {
        assert_eq!(
            parse_status("under review"),
            Some(ApprovalStatus::Unknown("Under Review".to_string()))
        );
        assert_eq!(parse_status("   "), None);
    }

    #[test]
    fn lock_covers_normalized_and_raw_approve_tokens() {
        assert!(is_locked(&activity(1, Some(ApprovalStatus::Approved))));
        assert!(is_locked(&activity(
            2,
            Some(ApprovalStatus::Unknown("Pre-Approved".to_string()))
        )));
        assert!(!is_locked(&activity(3, Some(ApprovalStatus::Pending))));
        assert!(!is_locked(&activity(4, None)));
    }

    #[test]
    fn prepare_send_excludes_locked_and_reports_empty() {
        let activities = vec![
            activity(1, Some(ApprovalStatus::Pending)),
            activity(2, Some(ApprovalStatus::Approved)),
        ];
        let (ids, payload) = prepare_send(&activities).expect("sendable");
        assert_eq!(ids, vec![1]);
        assert_eq!(payload.len(), 1);
        assert_eq!(payload[0].title, "Session 1");

        let only_locked = vec![activity(2, Some(ApprovalStatus::Approved))];
        let e = prepare_send(&only_locked).expect_err("nothing to send");
        assert_eq!(e.code, "nothing_to_send");
    }

    #[test]
    fn confirm_send_transitions_only_the_given_ids() {
        let activities = vec![
            activity(1, None),
            activity(2, Some(ApprovalStatus::Approved)),
            activity(3, None),
        ];
        let updated = confirm_send(&activities, &[1], at(6, 12)).expect("confirm");
        assert_eq!(updated[0].status, Some(ApprovalStatus::Pending));
        assert!(updated[0].requested_at.is_some());
        assert_eq!(updated[1].status, Some(ApprovalStatus::Approved));
        assert_eq!(updated[2].status, None);
    }

    #[test]
    fn confirm_send_refuses_locked_without_mutating() {
        let activities = vec![activity(2, Some(ApprovalStatus::Approved))];
        let e = confirm_send(&activities, &[2], at(6, 12)).expect_err("locked");
        assert_eq!(e.code, "locked");
    }

    #[test]
    fn decline_import_removes_unsent_only() {
        let activities = vec![
            activity(1, None),
            activity(2, Some(ApprovalStatus::Pending)),
            activity(3, Some(ApprovalStatus::Approved)),
        ];
        let updated = decline_import(&activities, &[1]).expect("decline");
        assert_eq!(updated.len(), 2);

        let e = decline_import(&activities, &[2]).expect_err("sent");
        assert_eq!(e.code, "already_sent");
        let e = decline_import(&activities, &[3]).expect_err("locked");
        assert_eq!(e.code, "locked");
    }
}
