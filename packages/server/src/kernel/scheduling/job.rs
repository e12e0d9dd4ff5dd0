//! Job Record.
//!
//! A Job is one scheduled invocation of a helper for a specific user (or the
//! synthetic `internal` owner) at one timestamp. A Job Record is immutable
//! except for `status`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Sentinel owner for internal (user-less) helpers.
pub const INTERNAL_OWNER: &str = "internal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Success,
    Error,
    Expired,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Error | JobStatus::Expired | JobStatus::Cancelled
        )
    }

    fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
            JobStatus::Expired => "expired",
            JobStatus::Cancelled => "cancelled",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "queued" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "success" => JobStatus::Success,
            "error" => JobStatus::Error,
            "expired" => JobStatus::Expired,
            "cancelled" => JobStatus::Cancelled,
            _ => return None,
        })
    }
}

/// `score = executionTime*10 + (6 - priority)`. Priority 1 (highest) gets
/// the largest of the ten per-second slots. Computed and stored as an
/// integer so score comparisons admit a total order without floating-point
/// rounding (see DESIGN.md for the floating-point variant this deliberately
/// does not carry forward).
pub fn compute_score(execution_time: i64, priority: u8) -> i64 {
    execution_time * 10 + (6 - priority as i64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub execution_id: Uuid,
    /// User id, or the literal `internal` for system-owned Jobs.
    pub user_id: String,
    pub helper_id: String,
    pub execution_time: i64,
    pub execution_score: i64,
    pub priority: u8,
    pub execution_expiry: i64,
    pub status: JobStatus,
    /// Recorded cause/message on a terminal `error` status.
    pub error: Option<String>,
}

impl JobRecord {
    pub fn new(
        user_id: impl Into<String>,
        helper_id: impl Into<String>,
        execution_time: i64,
        priority: u8,
        execution_expiry: i64,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            user_id: user_id.into(),
            helper_id: helper_id.into(),
            execution_time,
            execution_score: compute_score(execution_time, priority),
            priority,
            execution_expiry,
            status: JobStatus::Queued,
            error: None,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.user_id == INTERNAL_OWNER
    }

    pub fn to_hash_fields(&self) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert("executionId".to_string(), self.execution_id.to_string());
        fields.insert("userId".to_string(), self.user_id.clone());
        fields.insert("helperId".to_string(), self.helper_id.clone());
        fields.insert("executionTime".to_string(), self.execution_time.to_string());
        fields.insert(
            "executionScore".to_string(),
            self.execution_score.to_string(),
        );
        fields.insert("priority".to_string(), self.priority.to_string());
        fields.insert(
            "executionExpiry".to_string(),
            self.execution_expiry.to_string(),
        );
        fields.insert("status".to_string(), self.status.as_str().to_string());
        if let Some(ref error) = self.error {
            fields.insert("error".to_string(), error.clone());
        }
        fields
    }

    pub fn from_hash_fields(fields: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            execution_id: Uuid::parse_str(fields.get("executionId")?).ok()?,
            user_id: fields.get("userId")?.clone(),
            helper_id: fields.get("helperId")?.clone(),
            execution_time: fields.get("executionTime")?.parse().ok()?,
            execution_score: fields.get("executionScore")?.parse().ok()?,
            priority: fields.get("priority")?.parse().ok()?,
            execution_expiry: fields.get("executionExpiry")?.parse().ok()?,
            status: JobStatus::parse(fields.get("status")?)?,
            error: fields.get("error").cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_law_combines_time_and_priority() {
        assert_eq!(compute_score(1_000_000, 2), 10_000_004);
        assert_eq!(compute_score(1_717_228_800, 3), 17_172_288_003);
    }

    #[test]
    fn hash_roundtrip_preserves_fields() {
        let job = JobRecord::new("u1", "daily", 1_717_228_800, 3, 600);
        let fields = job.to_hash_fields();
        let back = JobRecord::from_hash_fields(&fields).unwrap();
        assert_eq!(job, back);
    }

    #[test]
    fn error_status_roundtrips_cause() {
        let mut job = JobRecord::new("internal", "checkIn", 100, 2, 60);
        job.status = JobStatus::Error;
        job.error = Some("helper_missing".to_string());
        let fields = job.to_hash_fields();
        let back = JobRecord::from_hash_fields(&fields).unwrap();
        assert_eq!(back.error.as_deref(), Some("helper_missing"));
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Expired.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
