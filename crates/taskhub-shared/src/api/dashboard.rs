use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stats over a task collection plus the project counts for the same scope.
/// Breakdown maps carry every enum value, zero counts included.
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardStatsResponse {
    pub total_tasks: i64,
    pub todo_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub completion_rate: f64,
    pub total_projects: i64,
    pub active_projects: i64,
    pub tasks_by_status: BTreeMap<String, i64>,
    pub tasks_by_priority: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectStatsResponse {
    pub project_id: Uuid,
    pub project_name: String,
    pub total_tasks: i64,
    pub todo_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub completion_rate: f64,
    pub tasks_by_status: BTreeMap<String, i64>,
    pub tasks_by_priority: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserWorkloadResponse {
    pub user_id: Uuid,
    pub username: String,
    pub total_assigned_tasks: i64,
    pub todo_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub completion_rate: f64,
    pub tasks_completed_this_week: i64,
    pub tasks_completed_this_month: i64,
}
