use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "task_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    InReview,
    Blocked,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::InReview,
        TaskStatus::Blocked,
        TaskStatus::Completed,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "priority", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub project_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A task is overdue iff it has a due date in the past and is not
    /// completed. `today` is the UTC calendar date, evaluated by the caller.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && self.status != TaskStatus::Completed,
            None => false,
        }
    }
}

/// Next `completed_at` value for a partial task update. An incoming
/// completed status stamps `now` unconditionally; any other incoming
/// status, or no status at all, preserves the existing value. Reopening a
/// completed task therefore keeps its old timestamp.
pub fn next_completed_at(
    existing: Option<DateTime<Utc>>,
    incoming: Option<TaskStatus>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match incoming {
        Some(TaskStatus::Completed) => Some(now),
        _ => existing,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task(due: Option<NaiveDate>, status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            description: None,
            status,
            priority: Priority::Medium,
            project_id: Uuid::new_v4(),
            assigned_to: None,
            created_by: Uuid::new_v4(),
            parent_task_id: None,
            start_date: None,
            due_date: due,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn overdue_requires_past_due_date() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

        assert!(task(Some(yesterday), TaskStatus::Todo).is_overdue(today));
        assert!(!task(Some(today), TaskStatus::Todo).is_overdue(today));
        assert!(!task(None, TaskStatus::Todo).is_overdue(today));
    }

    #[test]
    fn completed_tasks_are_never_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

        assert!(!task(Some(yesterday), TaskStatus::Completed).is_overdue(today));
    }

    #[test]
    fn completing_a_task_stamps_completed_at() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::days(5);

        assert_eq!(
            next_completed_at(None, Some(TaskStatus::Completed), now),
            Some(now)
        );
        // Re-completing overwrites the old stamp.
        assert_eq!(
            next_completed_at(Some(earlier), Some(TaskStatus::Completed), now),
            Some(now)
        );
    }

    #[test]
    fn non_completed_status_preserves_completed_at() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::days(5);

        assert_eq!(
            next_completed_at(Some(earlier), Some(TaskStatus::InProgress), now),
            Some(earlier)
        );
        assert_eq!(next_completed_at(None, Some(TaskStatus::Todo), now), None);
    }

    #[test]
    fn absent_status_preserves_completed_at() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::days(5);

        assert_eq!(next_completed_at(Some(earlier), None, now), Some(earlier));
        assert_eq!(next_completed_at(None, None, now), None);
    }
}
