//! Read-side aggregations over already-fetched task/project collections.
//!
//! Pure functions: the caller fixes the clock (UTC calendar date for the
//! overdue predicate, UTC instant for the workload windows), so every
//! computation here is deterministic and directly testable.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use taskhub_shared::{Priority, Project, Task, TaskStatus};

/// Status/priority breakdown shared by all dashboard scopes.
#[derive(Debug)]
pub struct TaskCollectionStats {
    pub total: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub overdue: i64,
    pub completion_rate: f64,
    pub by_status: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
}

fn enum_key<T: serde::Serialize>(value: &T) -> String {
    // Enums serialize to plain snake_case strings.
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

pub fn collect_task_stats(tasks: &[Task], today: NaiveDate) -> TaskCollectionStats {
    let total = tasks.len() as i64;

    // Every enum value is present in the breakdown, zero counts included.
    let mut by_status: BTreeMap<String, i64> = TaskStatus::ALL
        .iter()
        .map(|s| (enum_key(s), 0))
        .collect();
    let mut by_priority: BTreeMap<String, i64> = Priority::ALL
        .iter()
        .map(|p| (enum_key(p), 0))
        .collect();

    let mut overdue = 0i64;
    for task in tasks {
        *by_status.entry(enum_key(&task.status)).or_insert(0) += 1;
        *by_priority.entry(enum_key(&task.priority)).or_insert(0) += 1;
        if task.is_overdue(today) {
            overdue += 1;
        }
    }

    let todo = by_status[enum_key(&TaskStatus::Todo).as_str()];
    let in_progress = by_status[enum_key(&TaskStatus::InProgress).as_str()];
    let completed = by_status[enum_key(&TaskStatus::Completed).as_str()];

    TaskCollectionStats {
        total,
        todo,
        in_progress,
        completed,
        overdue,
        completion_rate: completion_rate(completed, total),
        by_status,
        by_priority,
    }
}

/// Percentage of completed tasks, rounded to 2 decimals. 0.0 for an empty
/// collection.
pub fn completion_rate(completed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = (completed as f64) * 100.0 / (total as f64);
    (rate * 100.0).round() / 100.0
}

/// Projects still in planning or in progress.
pub fn active_project_count(projects: &[Project]) -> i64 {
    projects.iter().filter(|p| p.status.is_active()).count() as i64
}

/// Tasks completed within the trailing window ending at `now`, judged by
/// `completed_at` (not due date).
pub fn completed_within(tasks: &[Task], now: DateTime<Utc>, days: i64) -> i64 {
    let cutoff = now - Duration::days(days);
    tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter(|t| t.completed_at.map(|at| at > cutoff).unwrap_or(false))
        .count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use taskhub_shared::ProjectStatus;
    use uuid::Uuid;

    fn task(status: TaskStatus, priority: Priority) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            description: None,
            status,
            priority,
            project_id: Uuid::new_v4(),
            assigned_to: None,
            created_by: Uuid::new_v4(),
            parent_task_id: None,
            start_date: None,
            due_date: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn project(status: ProjectStatus) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "p".to_string(),
            description: None,
            status,
            priority: Priority::Medium,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: None,
            owner_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn breakdown_sums_match_total() {
        let tasks = vec![
            task(TaskStatus::Todo, Priority::Low),
            task(TaskStatus::Todo, Priority::High),
            task(TaskStatus::InProgress, Priority::Medium),
            task(TaskStatus::Completed, Priority::Urgent),
            task(TaskStatus::Blocked, Priority::Medium),
        ];

        let stats = collect_task_stats(&tasks, today());
        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_status.values().sum::<i64>(), stats.total);
        assert_eq!(stats.by_priority.values().sum::<i64>(), stats.total);
    }

    #[test]
    fn breakdown_contains_every_enum_value() {
        let stats = collect_task_stats(&[], today());

        assert_eq!(stats.by_status.len(), TaskStatus::ALL.len());
        assert_eq!(stats.by_priority.len(), Priority::ALL.len());
        assert!(stats.by_status.values().all(|&c| c == 0));
        assert!(stats.by_priority.values().all(|&c| c == 0));
        assert_eq!(stats.by_status["in_review"], 0);
        assert_eq!(stats.by_priority["urgent"], 0);
    }

    #[test]
    fn empty_collection_has_zero_completion_rate() {
        let stats = collect_task_stats(&[], today());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn completion_rate_rounds_to_two_decimals() {
        // 1/3 -> 33.333...% -> 33.33
        assert_eq!(completion_rate(1, 3), 33.33);
        // 2/3 -> 66.666...% -> 66.67
        assert_eq!(completion_rate(2, 3), 66.67);
        assert_eq!(completion_rate(0, 10), 0.0);
        assert_eq!(completion_rate(10, 10), 100.0);
    }

    #[test]
    fn overdue_counts_past_due_incomplete_tasks_only() {
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();

        let mut late = task(TaskStatus::Todo, Priority::Medium);
        late.due_date = Some(yesterday);

        let mut late_done = task(TaskStatus::Completed, Priority::Medium);
        late_done.due_date = Some(yesterday);

        let mut upcoming = task(TaskStatus::Todo, Priority::Medium);
        upcoming.due_date = Some(tomorrow);

        let no_due = task(TaskStatus::Todo, Priority::Medium);

        let stats = collect_task_stats(&[late, late_done, upcoming, no_due], today());
        assert_eq!(stats.overdue, 1);
    }

    #[test]
    fn active_projects_are_planning_or_in_progress() {
        let projects = vec![
            project(ProjectStatus::Planning),
            project(ProjectStatus::InProgress),
            project(ProjectStatus::OnHold),
            project(ProjectStatus::Completed),
            project(ProjectStatus::Cancelled),
        ];
        assert_eq!(active_project_count(&projects), 2);
    }

    #[test]
    fn workload_windows_use_completed_at() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();

        let mut recent = task(TaskStatus::Completed, Priority::Medium);
        recent.completed_at = Some(now - Duration::days(3));

        let mut older = task(TaskStatus::Completed, Priority::Medium);
        older.completed_at = Some(now - Duration::days(20));

        let mut ancient = task(TaskStatus::Completed, Priority::Medium);
        ancient.completed_at = Some(now - Duration::days(45));

        // Completed status but no timestamp: never counted.
        let untimed = task(TaskStatus::Completed, Priority::Medium);

        // Timestamp inside the window but not completed: never counted.
        let mut reopened = task(TaskStatus::InProgress, Priority::Medium);
        reopened.completed_at = Some(now - Duration::days(1));

        let tasks = vec![recent, older, ancient, untimed, reopened];
        assert_eq!(completed_within(&tasks, now, 7), 1);
        assert_eq!(completed_within(&tasks, now, 30), 2);
    }
}
