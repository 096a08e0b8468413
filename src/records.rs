//! Raw input records, as extracted from the annotation platform by the
//! caller. The engine never fetches these itself.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::table::Phase;

/// One platform task, all phases combined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    /// Account credited with the task; `None` for never-worked tasks.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Date the task is attributed to in per-date series; `None` while the
    /// task is still in progress.
    #[serde(default)]
    pub completed_date: Option<NaiveDate>,
    pub input_data_count: u64,
    pub annotation_count: u64,
    /// Tool-monitored hours spent on the task.
    pub worktime_hour: f64,
}

/// Per (task, user, phase) worktime with production attribution, derived
/// from task histories. Counts are fractional when several users share a
/// task's phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWorktimeRecord {
    pub task_id: String,
    pub account_id: String,
    pub phase: Phase,
    pub worktime_hour: f64,
    pub task_count: f64,
    pub input_data_count: f64,
    pub annotation_count: f64,
    /// Inspection comments pointed out against this user's annotation work.
    /// Meaningful on annotation-phase records.
    #[serde(default)]
    pub pointed_out_inspection_comment_count: u64,
    /// Times the task was sent back to this user from inspection/acceptance.
    /// Meaningful on annotation-phase records.
    #[serde(default)]
    pub rejected_count: u64,
}

/// Tool-monitored worktime for one (date, user, phase), independent of any
/// task filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyWorktimeRecord {
    pub date: NaiveDate,
    pub account_id: String,
    pub phase: Phase,
    pub worktime_hour: f64,
}

/// Externally reported (timesheet) worktime for one (date, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualWorktimeRecord {
    pub date: NaiveDate,
    pub account_id: String,
    pub worktime_hour: f64,
}

/// The user dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub account_id: String,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub biography: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_worktime_record_from_platform_json() {
        let json = r#"{
            "task_id": "t1",
            "account_id": "a1",
            "phase": "annotation",
            "worktime_hour": 0.5,
            "task_count": 0.5,
            "input_data_count": 5.0,
            "annotation_count": 20.0,
            "pointed_out_inspection_comment_count": 2,
            "rejected_count": 1
        }"#;
        let rec: TaskWorktimeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.phase, Phase::Annotation);
        assert_eq!(rec.task_count, 0.5);
        assert_eq!(rec.pointed_out_inspection_comment_count, 2);
    }

    #[test]
    fn test_quality_counts_default_to_zero() {
        let json = r#"{
            "task_id": "t2",
            "account_id": "a1",
            "phase": "inspection",
            "worktime_hour": 0.25,
            "task_count": 1.0,
            "input_data_count": 5.0,
            "annotation_count": 20.0
        }"#;
        let rec: TaskWorktimeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.pointed_out_inspection_comment_count, 0);
        assert_eq!(rec.rejected_count, 0);
    }

    #[test]
    fn test_task_record_with_nulls() {
        let json = r#"{
            "task_id": "t3",
            "account_id": null,
            "completed_date": null,
            "input_data_count": 10,
            "annotation_count": 42,
            "worktime_hour": 1.75
        }"#;
        let rec: TaskRecord = serde_json::from_str(json).unwrap();
        assert!(rec.account_id.is_none());
        assert!(rec.completed_date.is_none());
    }

    #[test]
    fn test_daily_worktime_record_date_format() {
        let json = r#"{
            "date": "2024-03-05",
            "account_id": "a9",
            "phase": "acceptance",
            "worktime_hour": 2.0
        }"#;
        let rec: DailyWorktimeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(rec.phase, Phase::Acceptance);
    }
}
