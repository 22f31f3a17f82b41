use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use taskhub_shared::{
    api::{
        page_offset, CreateTaskRequest, PageParams, PageResponse, ProjectShort, TaskFilterParams,
        TaskResponse, UpdateTaskRequest,
    },
    next_completed_at, Priority, Tag, TaskStatus, UserSummary,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::authz::{authorize, Operation};
use crate::error::AppError;
use crate::identity;
use crate::routes::AppState;

#[derive(Debug, sqlx::FromRow)]
struct TaskRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: Priority,
    project_id: Uuid,
    project_name: String,
    assigned_to: Option<Uuid>,
    assignee_username: Option<String>,
    assignee_email: Option<String>,
    created_by: Uuid,
    creator_username: String,
    creator_email: String,
    parent_task_id: Option<Uuid>,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const TASK_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.status, t.priority,
           t.project_id, p.name AS project_name,
           t.assigned_to, au.username AS assignee_username, au.email AS assignee_email,
           t.created_by, cu.username AS creator_username, cu.email AS creator_email,
           t.parent_task_id, t.start_date, t.due_date, t.completed_at,
           t.created_at, t.updated_at
    FROM tasks t
    JOIN projects p ON p.id = t.project_id
    JOIN users cu ON cu.id = t.created_by
    LEFT JOIN users au ON au.id = t.assigned_to
"#;

fn record_to_response(rec: TaskRecord, tags: Vec<Tag>) -> TaskResponse {
    let assigned_to = match (rec.assigned_to, rec.assignee_username, rec.assignee_email) {
        (Some(id), Some(username), Some(email)) => Some(UserSummary {
            id,
            username,
            email,
        }),
        _ => None,
    };

    TaskResponse {
        id: rec.id,
        title: rec.title,
        description: rec.description,
        status: rec.status,
        priority: rec.priority,
        project: ProjectShort {
            id: rec.project_id,
            name: rec.project_name,
        },
        assigned_to,
        created_by: UserSummary {
            id: rec.created_by,
            username: rec.creator_username,
            email: rec.creator_email,
        },
        parent_task_id: rec.parent_task_id,
        start_date: rec.start_date,
        due_date: rec.due_date,
        completed_at: rec.completed_at,
        tags,
        created_at: rec.created_at,
        updated_at: rec.updated_at,
    }
}

async fn fetch_task(state: &AppState, id: Uuid) -> Result<TaskRecord, AppError> {
    let query = format!("{} WHERE t.id = $1", TASK_SELECT);
    sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task not found with id: {}", id)))
}

async fn fetch_tags(state: &AppState, task_id: Uuid) -> Result<Vec<Tag>, AppError> {
    let rows: Vec<(Uuid, String, Option<String>)> = sqlx::query_as(
        r#"
        SELECT tg.id, tg.name, tg.color
        FROM tags tg
        JOIN task_tags tt ON tt.tag_id = tg.id
        WHERE tt.task_id = $1
        ORDER BY tg.name
        "#,
    )
    .bind(task_id)
    .fetch_all(&state.db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, color)| Tag { id, name, color })
        .collect())
}

/// One grouped tag lookup for a whole result set.
async fn records_to_responses(
    state: &AppState,
    recs: Vec<TaskRecord>,
) -> Result<Vec<TaskResponse>, AppError> {
    let ids: Vec<Uuid> = recs.iter().map(|r| r.id).collect();
    let rows: Vec<(Uuid, Uuid, String, Option<String>)> = sqlx::query_as(
        r#"
        SELECT tt.task_id, tg.id, tg.name, tg.color
        FROM tags tg
        JOIN task_tags tt ON tt.tag_id = tg.id
        WHERE tt.task_id = ANY($1)
        ORDER BY tg.name
        "#,
    )
    .bind(&ids)
    .fetch_all(&state.db)
    .await?;

    let mut by_task: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for (task_id, id, name, color) in rows {
        by_task
            .entry(task_id)
            .or_default()
            .push(Tag { id, name, color });
    }

    Ok(recs
        .into_iter()
        .map(|r| {
            let tags = by_task.remove(&r.id).unwrap_or_default();
            record_to_response(r, tags)
        })
        .collect())
}

fn order_clause(params: &PageParams) -> String {
    let order_by = match params.order_by.as_deref() {
        Some("title") => "t.title",
        Some("status") => "t.status",
        Some("priority") => "t.priority",
        Some("due_date") => "t.due_date",
        Some("updated_at") => "t.updated_at",
        _ => "t.created_at",
    };
    let order = match params.order.as_deref() {
        Some("desc") | Some("DESC") => "DESC",
        _ => "ASC",
    };
    format!("ORDER BY {} {}", order_by, order)
}

/// POST /api/v1/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskCreate)?;

    if req.title.trim().is_empty() {
        return Err(AppError::validation("Task title is required"));
    }

    let project: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM projects WHERE id = $1")
        .bind(req.project_id)
        .fetch_optional(&state.db)
        .await?;
    if project.is_none() {
        return Err(AppError::not_found("Project not found"));
    }

    if let Some(assignee_id) = req.assigned_to_id {
        identity::find_user(&state.db, assignee_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
    }

    if let Some(parent_id) = req.parent_task_id {
        let parent: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tasks WHERE id = $1")
            .bind(parent_id)
            .fetch_optional(&state.db)
            .await?;
        if parent.is_none() {
            return Err(AppError::not_found("Parent task not found"));
        }
    }

    let status = req.status.unwrap_or(TaskStatus::Todo);
    let priority = req.priority.unwrap_or(Priority::Medium);

    let id = Uuid::new_v4();
    let now = Utc::now();

    // Task row and tag links are one atomic unit.
    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO tasks (id, title, description, status, priority, project_id,
                           assigned_to, created_by, parent_task_id, start_date,
                           due_date, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
        "#,
    )
    .bind(id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(status)
    .bind(priority)
    .bind(req.project_id)
    .bind(req.assigned_to_id)
    .bind(current.id())
    .bind(req.parent_task_id)
    .bind(req.start_date)
    .bind(req.due_date)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for tag_id in &req.tag_ids {
        let tag: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = $1")
            .bind(tag_id)
            .fetch_optional(&mut *tx)
            .await?;
        if tag.is_none() {
            return Err(AppError::not_found(format!("Tag not found with id: {}", tag_id)));
        }

        sqlx::query("INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let rec = fetch_task(&state, id).await?;
    let tags = fetch_tags(&state, id).await?;
    Ok(Json(record_to_response(rec, tags)))
}

/// GET /api/v1/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskRead)?;

    let rec = fetch_task(&state, id).await?;
    let tags = fetch_tags(&state, id).await?;
    Ok(Json(record_to_response(rec, tags)))
}

/// GET /api/v1/tasks/project/:project_id
pub async fn get_project_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskRead)?;

    let query = format!("{} WHERE t.project_id = $1 ORDER BY t.created_at", TASK_SELECT);
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(project_id)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(records_to_responses(&state, recs).await?))
}

/// GET /api/v1/tasks/my-tasks
pub async fn get_my_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskRead)?;

    let query = format!("{} WHERE t.assigned_to = $1 ORDER BY t.created_at", TASK_SELECT);
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(current.id())
        .fetch_all(&state.db)
        .await?;

    Ok(Json(records_to_responses(&state, recs).await?))
}

/// PUT /api/v1/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskUpdate)?;

    let existing: Option<(TaskStatus, Option<DateTime<Utc>>)> =
        sqlx::query_as("SELECT status, completed_at FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    let (_, existing_completed_at) = existing
        .ok_or_else(|| AppError::not_found(format!("Task not found with id: {}", id)))?;

    if let Some(assignee_id) = req.assigned_to_id {
        identity::find_user(&state.db, assignee_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
    }

    let now = Utc::now();

    let completed_at = next_completed_at(existing_completed_at, req.status, now);

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            status = COALESCE($3, status),
            priority = COALESCE($4, priority),
            assigned_to = COALESCE($5, assigned_to),
            start_date = COALESCE($6, start_date),
            due_date = COALESCE($7, due_date),
            completed_at = $8,
            updated_at = $9
        WHERE id = $10
        "#,
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.status)
    .bind(req.priority)
    .bind(req.assigned_to_id)
    .bind(req.start_date)
    .bind(req.due_date)
    .bind(completed_at)
    .bind(now)
    .bind(id)
    .execute(&state.db)
    .await?;

    let rec = fetch_task(&state, id).await?;
    let tags = fetch_tags(&state, id).await?;
    Ok(Json(record_to_response(rec, tags)))
}

/// DELETE /api/v1/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskDelete)?;

    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Task not found with id: {}", id)));
    }

    Ok(Json(serde_json::json!({ "message": "Task deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
}

/// GET /api/v1/tasks/search?keyword=
pub async fn search_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskSearch)?;

    let query = format!("{} WHERE t.title ILIKE $1 ORDER BY t.created_at", TASK_SELECT);
    let pattern = format!("%{}%", params.keyword.unwrap_or_default());
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(pattern)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(records_to_responses(&state, recs).await?))
}

/// GET /api/v1/tasks/filter
///
/// Absent filters impose no constraint; the active ones AND together. An
/// empty keyword is treated as absent.
pub async fn filter_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<TaskFilterParams>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskSearch)?;

    let keyword = params.keyword.as_deref().filter(|k| !k.is_empty());

    let mut conditions: Vec<String> = Vec::new();
    let mut param_idx = 1;

    if params.project_id.is_some() {
        conditions.push(format!("t.project_id = ${}", param_idx));
        param_idx += 1;
    }
    if params.status.is_some() {
        conditions.push(format!("t.status = ${}", param_idx));
        param_idx += 1;
    }
    if params.priority.is_some() {
        conditions.push(format!("t.priority = ${}", param_idx));
        param_idx += 1;
    }
    if params.assigned_to_id.is_some() {
        conditions.push(format!("t.assigned_to = ${}", param_idx));
        param_idx += 1;
    }
    if keyword.is_some() {
        conditions.push(format!("t.title ILIKE ${}", param_idx));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let query = format!("{} {} ORDER BY t.created_at", TASK_SELECT, where_clause);
    let mut builder = sqlx::query_as::<_, TaskRecord>(&query);

    if let Some(project_id) = params.project_id {
        builder = builder.bind(project_id);
    }
    if let Some(status) = params.status {
        builder = builder.bind(status);
    }
    if let Some(priority) = params.priority {
        builder = builder.bind(priority);
    }
    if let Some(assigned_to_id) = params.assigned_to_id {
        builder = builder.bind(assigned_to_id);
    }
    if let Some(keyword) = keyword {
        builder = builder.bind(format!("%{}%", keyword));
    }

    let recs = builder.fetch_all(&state.db).await?;

    Ok(Json(records_to_responses(&state, recs).await?))
}

/// GET /api/v1/tasks/filter/status/:status
pub async fn filter_by_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(status): Path<TaskStatus>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskSearch)?;

    let query = format!("{} WHERE t.status = $1 ORDER BY t.created_at", TASK_SELECT);
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(status)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(records_to_responses(&state, recs).await?))
}

/// GET /api/v1/tasks/filter/priority/:priority
pub async fn filter_by_priority(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(priority): Path<Priority>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskSearch)?;

    let query = format!("{} WHERE t.priority = $1 ORDER BY t.created_at", TASK_SELECT);
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(priority)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(records_to_responses(&state, recs).await?))
}

/// GET /api/v1/tasks/overdue
///
/// Overdue: due date before today's UTC date and not completed.
pub async fn get_overdue_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskOverdueAll)?;

    let today = Utc::now().date_naive();
    let query = format!(
        "{} WHERE t.due_date < $1 AND t.status != $2 ORDER BY t.due_date",
        TASK_SELECT
    );
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(today)
        .bind(TaskStatus::Completed)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(records_to_responses(&state, recs).await?))
}

/// GET /api/v1/tasks/my-overdue
pub async fn get_my_overdue_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskOverdueMine)?;

    let today = Utc::now().date_naive();
    let query = format!(
        "{} WHERE t.assigned_to = $1 AND t.due_date < $2 AND t.status != $3 ORDER BY t.due_date",
        TASK_SELECT
    );
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(current.id())
        .bind(today)
        .bind(TaskStatus::Completed)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(records_to_responses(&state, recs).await?))
}

/// GET /api/v1/tasks
pub async fn list_tasks_paginated(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskListAll)?;

    let (page, limit) = params.bounds();
    let offset = page_offset(page, limit);

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
        .fetch_one(&state.db)
        .await?;

    let query = format!(
        "{} {} LIMIT $1 OFFSET $2",
        TASK_SELECT,
        order_clause(&params)
    );
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

    let items = records_to_responses(&state, recs).await?;
    Ok(Json(PageResponse::new(items, total, page, limit)))
}

/// GET /api/v1/tasks/paginated/project/:project_id
pub async fn get_project_tasks_paginated(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskRead)?;

    let (page, limit) = params.bounds();
    let offset = page_offset(page, limit);

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
        .bind(project_id)
        .fetch_one(&state.db)
        .await?;

    let query = format!(
        "{} WHERE t.project_id = $1 {} LIMIT $2 OFFSET $3",
        TASK_SELECT,
        order_clause(&params)
    );
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(project_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

    let items = records_to_responses(&state, recs).await?;
    Ok(Json(PageResponse::new(items, total, page, limit)))
}

/// GET /api/v1/tasks/paginated/my-tasks
pub async fn get_my_tasks_paginated(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskRead)?;

    let (page, limit) = params.bounds();
    let offset = page_offset(page, limit);

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE assigned_to = $1")
        .bind(current.id())
        .fetch_one(&state.db)
        .await?;

    let query = format!(
        "{} WHERE t.assigned_to = $1 {} LIMIT $2 OFFSET $3",
        TASK_SELECT,
        order_clause(&params)
    );
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(current.id())
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

    let items = records_to_responses(&state, recs).await?;
    Ok(Json(PageResponse::new(items, total, page, limit)))
}

// serde_urlencoded cannot flatten numeric fields, so the page params are
// spelled out here.
#[derive(Debug, Deserialize)]
pub struct PagedSearchParams {
    pub keyword: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub order_by: Option<String>,
    pub order: Option<String>,
}

/// GET /api/v1/tasks/paginated/search
pub async fn search_tasks_paginated(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<PagedSearchParams>,
) -> Result<Json<PageResponse<TaskResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TaskSearch)?;

    let page_params = PageParams {
        page: params.page,
        limit: params.limit,
        order_by: params.order_by,
        order: params.order,
    };
    let (page, limit) = page_params.bounds();
    let offset = page_offset(page, limit);
    let pattern = format!("%{}%", params.keyword);

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE title ILIKE $1")
        .bind(&pattern)
        .fetch_one(&state.db)
        .await?;

    let query = format!(
        "{} WHERE t.title ILIKE $1 {} LIMIT $2 OFFSET $3",
        TASK_SELECT,
        order_clause(&page_params)
    );
    let recs: Vec<TaskRecord> = sqlx::query_as(&query)
        .bind(&pattern)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

    let items = records_to_responses(&state, recs).await?;
    Ok(Json(PageResponse::new(items, total, page, limit)))
}
