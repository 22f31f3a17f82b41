use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use taskhub_shared::{
    api::{DashboardStatsResponse, ProjectStatsResponse, UserWorkloadResponse},
    Priority, Project, ProjectStatus, Task, TaskStatus,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::authz::{authorize, Operation};
use crate::error::AppError;
use crate::identity;
use crate::routes::AppState;
use crate::stats;

type TaskRow = (
    Uuid,                  // id
    String,                // title
    Option<String>,        // description
    TaskStatus,            // status
    Priority,              // priority
    Uuid,                  // project_id
    Option<Uuid>,          // assigned_to
    Uuid,                  // created_by
    Option<Uuid>,          // parent_task_id
    Option<NaiveDate>,     // start_date
    Option<NaiveDate>,     // due_date
    Option<DateTime<Utc>>, // completed_at
    DateTime<Utc>,         // created_at
    DateTime<Utc>,         // updated_at
);

const TASK_COLUMNS: &str = r#"
    SELECT id, title, description, status, priority, project_id, assigned_to,
           created_by, parent_task_id, start_date, due_date, completed_at,
           created_at, updated_at
    FROM tasks
"#;

fn row_to_task(row: TaskRow) -> Task {
    Task {
        id: row.0,
        title: row.1,
        description: row.2,
        status: row.3,
        priority: row.4,
        project_id: row.5,
        assigned_to: row.6,
        created_by: row.7,
        parent_task_id: row.8,
        start_date: row.9,
        due_date: row.10,
        completed_at: row.11,
        created_at: row.12,
        updated_at: row.13,
    }
}

type ProjectRow = (
    Uuid,              // id
    String,            // name
    Option<String>,    // description
    ProjectStatus,     // status
    Priority,          // priority
    NaiveDate,         // start_date
    Option<NaiveDate>, // end_date
    Uuid,              // owner_id
    Uuid,              // created_by
    Option<Uuid>,      // updated_by
    DateTime<Utc>,     // created_at
    DateTime<Utc>,     // updated_at
);

const PROJECT_COLUMNS: &str = r#"
    SELECT id, name, description, status, priority, start_date, end_date,
           owner_id, created_by, updated_by, created_at, updated_at
    FROM projects
"#;

fn row_to_project(row: ProjectRow) -> Project {
    Project {
        id: row.0,
        name: row.1,
        description: row.2,
        status: row.3,
        priority: row.4,
        start_date: row.5,
        end_date: row.6,
        owner_id: row.7,
        created_by: row.8,
        updated_by: row.9,
        created_at: row.10,
        updated_at: row.11,
    }
}

async fn fetch_all_tasks(state: &AppState) -> Result<Vec<Task>, AppError> {
    let rows: Vec<TaskRow> = sqlx::query_as(TASK_COLUMNS).fetch_all(&state.db).await?;
    Ok(rows.into_iter().map(row_to_task).collect())
}

async fn fetch_assigned_tasks(state: &AppState, user_id: Uuid) -> Result<Vec<Task>, AppError> {
    let query = format!("{} WHERE assigned_to = $1", TASK_COLUMNS);
    let rows: Vec<TaskRow> = sqlx::query_as(&query)
        .bind(user_id)
        .fetch_all(&state.db)
        .await?;
    Ok(rows.into_iter().map(row_to_task).collect())
}

fn dashboard_response(
    task_stats: stats::TaskCollectionStats,
    projects: &[Project],
) -> DashboardStatsResponse {
    DashboardStatsResponse {
        total_tasks: task_stats.total,
        todo_tasks: task_stats.todo,
        in_progress_tasks: task_stats.in_progress,
        completed_tasks: task_stats.completed,
        overdue_tasks: task_stats.overdue,
        completion_rate: task_stats.completion_rate,
        total_projects: projects.len() as i64,
        active_projects: stats::active_project_count(projects),
        tasks_by_status: task_stats.by_status,
        tasks_by_priority: task_stats.by_priority,
    }
}

/// GET /api/v1/dashboard/stats
pub async fn get_overall_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DashboardStatsResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::DashboardOverall)?;

    let tasks = fetch_all_tasks(&state).await?;
    let rows: Vec<ProjectRow> = sqlx::query_as(PROJECT_COLUMNS).fetch_all(&state.db).await?;
    let projects: Vec<Project> = rows.into_iter().map(row_to_project).collect();

    let task_stats = stats::collect_task_stats(&tasks, Utc::now().date_naive());
    Ok(Json(dashboard_response(task_stats, &projects)))
}

/// GET /api/v1/dashboard/my-stats
///
/// Tasks assigned to the caller, projects owned by the caller.
pub async fn get_my_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DashboardStatsResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::DashboardMine)?;

    let tasks = fetch_assigned_tasks(&state, current.id()).await?;

    let query = format!("{} WHERE owner_id = $1", PROJECT_COLUMNS);
    let rows: Vec<ProjectRow> = sqlx::query_as(&query)
        .bind(current.id())
        .fetch_all(&state.db)
        .await?;
    let projects: Vec<Project> = rows.into_iter().map(row_to_project).collect();

    let task_stats = stats::collect_task_stats(&tasks, Utc::now().date_naive());
    Ok(Json(dashboard_response(task_stats, &projects)))
}

/// GET /api/v1/dashboard/projects/:project_id/stats
pub async fn get_project_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectStatsResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::DashboardProject)?;

    let project: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, name FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&state.db)
            .await?;
    let (project_id, project_name) =
        project.ok_or_else(|| AppError::not_found("Project not found"))?;

    let query = format!("{} WHERE project_id = $1", TASK_COLUMNS);
    let rows: Vec<TaskRow> = sqlx::query_as(&query)
        .bind(project_id)
        .fetch_all(&state.db)
        .await?;
    let tasks: Vec<Task> = rows.into_iter().map(row_to_task).collect();

    let task_stats = stats::collect_task_stats(&tasks, Utc::now().date_naive());

    Ok(Json(ProjectStatsResponse {
        project_id,
        project_name,
        total_tasks: task_stats.total,
        todo_tasks: task_stats.todo,
        in_progress_tasks: task_stats.in_progress,
        completed_tasks: task_stats.completed,
        overdue_tasks: task_stats.overdue,
        completion_rate: task_stats.completion_rate,
        tasks_by_status: task_stats.by_status,
        tasks_by_priority: task_stats.by_priority,
    }))
}

/// GET /api/v1/dashboard/my-workload
pub async fn get_my_workload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserWorkloadResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::WorkloadMine)?;

    let workload = user_workload(&state, current.id(), current.user.username.clone()).await?;
    Ok(Json(workload))
}

/// GET /api/v1/dashboard/users/:user_id/workload
pub async fn get_user_workload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserWorkloadResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::WorkloadUser)?;

    let user = identity::find_user(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let workload = user_workload(&state, user.id, user.username).await?;
    Ok(Json(workload))
}

async fn user_workload(
    state: &AppState,
    user_id: Uuid,
    username: String,
) -> Result<UserWorkloadResponse, AppError> {
    let tasks = fetch_assigned_tasks(state, user_id).await?;

    let now = Utc::now();
    let task_stats = stats::collect_task_stats(&tasks, now.date_naive());

    Ok(UserWorkloadResponse {
        user_id,
        username,
        total_assigned_tasks: task_stats.total,
        todo_tasks: task_stats.todo,
        in_progress_tasks: task_stats.in_progress,
        completed_tasks: task_stats.completed,
        overdue_tasks: task_stats.overdue,
        completion_rate: task_stats.completion_rate,
        tasks_completed_this_week: stats::completed_within(&tasks, now, 7),
        tasks_completed_this_month: stats::completed_within(&tasks, now, 30),
    })
}
