use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use taskhub_shared::{
    api::{
        page_offset, AddTeamMemberRequest, CreateProjectRequest, PageParams, PageResponse,
        ProjectResponse, TeamMemberResponse, UpdateProjectRequest,
    },
    Priority, ProjectMember, ProjectStatus, Role, UserSummary,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::authz::{authorize, Operation};
use crate::error::AppError;
use crate::identity;
use crate::routes::AppState;

type ProjectRow = (
    Uuid,              // id
    String,            // name
    Option<String>,    // description
    ProjectStatus,     // status
    Priority,          // priority
    NaiveDate,         // start_date
    Option<NaiveDate>, // end_date
    Uuid,              // owner_id
    String,            // owner username
    String,            // owner email
    DateTime<Utc>,     // created_at
    DateTime<Utc>,     // updated_at
);

const PROJECT_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.status, p.priority,
           p.start_date, p.end_date, p.owner_id, u.username, u.email,
           p.created_at, p.updated_at
    FROM projects p
    JOIN users u ON u.id = p.owner_id
"#;

fn row_to_response(row: ProjectRow) -> ProjectResponse {
    ProjectResponse {
        id: row.0,
        name: row.1,
        description: row.2,
        status: row.3,
        priority: row.4,
        start_date: row.5,
        end_date: row.6,
        owner: UserSummary {
            id: row.7,
            username: row.8,
            email: row.9,
        },
        created_at: row.10,
        updated_at: row.11,
    }
}

async fn fetch_project(state: &AppState, id: Uuid) -> Result<ProjectRow, AppError> {
    let query = format!("{} WHERE p.id = $1", PROJECT_SELECT);
    sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Project not found with id: {}", id)))
}

fn order_clause(params: &PageParams) -> String {
    let order_by = match params.order_by.as_deref() {
        Some("name") => "p.name",
        Some("status") => "p.status",
        Some("priority") => "p.priority",
        Some("start_date") => "p.start_date",
        Some("updated_at") => "p.updated_at",
        _ => "p.created_at",
    };
    let order = match params.order.as_deref() {
        Some("desc") | Some("DESC") => "DESC",
        _ => "ASC",
    };
    format!("ORDER BY {} {}", order_by, order)
}

/// POST /api/v1/projects
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::ProjectCreate)?;

    if req.name.trim().is_empty() {
        return Err(AppError::validation("Project name is required"));
    }
    let start_date = req
        .start_date
        .ok_or_else(|| AppError::validation("Start date is required"))?;

    let status = req.status.unwrap_or(ProjectStatus::Planning);
    let priority = req.priority.unwrap_or(Priority::Medium);

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO projects (id, name, description, status, priority, start_date,
                              end_date, owner_id, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9, $9)
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(status)
    .bind(priority)
    .bind(start_date)
    .bind(req.end_date)
    .bind(current.id())
    .bind(now)
    .execute(&state.db)
    .await?;

    Ok(Json(ProjectResponse {
        id,
        name: req.name,
        description: req.description,
        status,
        priority,
        start_date,
        end_date: req.end_date,
        owner: UserSummary {
            id: current.id(),
            username: current.user.username,
            email: current.user.email,
        },
        created_at: now,
        updated_at: now,
    }))
}

/// GET /api/v1/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::ProjectRead)?;

    let row = fetch_project(&state, id).await?;
    Ok(Json(row_to_response(row)))
}

/// GET /api/v1/projects/my-projects
///
/// Owned projects only; membership-based listing is deliberately not
/// surfaced here.
pub async fn get_my_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ProjectResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::ProjectListMine)?;

    let query = format!("{} WHERE p.owner_id = $1 ORDER BY p.created_at", PROJECT_SELECT);
    let rows: Vec<ProjectRow> = sqlx::query_as(&query)
        .bind(current.id())
        .fetch_all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(row_to_response).collect()))
}

/// PUT /api/v1/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::ProjectUpdate)?;

    let row = fetch_project(&state, id).await?;
    if row.7 != current.id() {
        return Err(AppError::validation(
            "You don't have permission to update this project",
        ));
    }

    let now = Utc::now();

    // Present fields overwrite, absent fields stay.
    sqlx::query(
        r#"
        UPDATE projects
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            status = COALESCE($3, status),
            priority = COALESCE($4, priority),
            start_date = COALESCE($5, start_date),
            end_date = COALESCE($6, end_date),
            updated_by = $7,
            updated_at = $8
        WHERE id = $9
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.status)
    .bind(req.priority)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(current.id())
    .bind(now)
    .bind(id)
    .execute(&state.db)
    .await?;

    let row = fetch_project(&state, id).await?;
    Ok(Json(row_to_response(row)))
}

/// DELETE /api/v1/projects/:id
///
/// Owner may delete; an admin may delete any project. Dependent tasks go
/// with it via FK cascade.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::ProjectDelete)?;

    let row = fetch_project(&state, id).await?;
    if row.7 != current.id() && !current.has_role(Role::Admin) {
        return Err(AppError::validation(
            "You don't have permission to delete this project",
        ));
    }

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Project deleted" })))
}

/// GET /api/v1/projects
pub async fn list_projects_paginated(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<ProjectResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::ProjectListAll)?;

    let (page, limit) = params.bounds();
    let offset = page_offset(page, limit);

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
        .fetch_one(&state.db)
        .await?;

    let query = format!(
        "{} {} LIMIT $1 OFFSET $2",
        PROJECT_SELECT,
        order_clause(&params)
    );
    let rows: Vec<ProjectRow> = sqlx::query_as(&query)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

    let items = rows.into_iter().map(row_to_response).collect();
    Ok(Json(PageResponse::new(items, total, page, limit)))
}

/// GET /api/v1/projects/paginated/my-projects
pub async fn get_my_projects_paginated(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<ProjectResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::ProjectListMine)?;

    let (page, limit) = params.bounds();
    let offset = page_offset(page, limit);

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects WHERE owner_id = $1")
        .bind(current.id())
        .fetch_one(&state.db)
        .await?;

    let query = format!(
        "{} WHERE p.owner_id = $1 {} LIMIT $2 OFFSET $3",
        PROJECT_SELECT,
        order_clause(&params)
    );
    let rows: Vec<ProjectRow> = sqlx::query_as(&query)
        .bind(current.id())
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

    let items = rows.into_iter().map(row_to_response).collect();
    Ok(Json(PageResponse::new(items, total, page, limit)))
}

/// POST /api/v1/projects/:id/team
pub async fn add_team_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AddTeamMemberRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TeamMemberAdd)?;

    fetch_project(&state, project_id).await?;

    identity::find_user(&state.db, req.user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User not found with id: {}", req.user_id)))?;

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(req.user_id)
    .fetch_one(&state.db)
    .await?;

    if count > 0 {
        return Err(AppError::validation("User is already a team member"));
    }

    let membership = ProjectMember {
        project_id,
        user_id: req.user_id,
        role: req.role,
        joined_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id, role, joined_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(membership.project_id)
    .bind(membership.user_id)
    .bind(&membership.role)
    .bind(membership.joined_at)
    .execute(&state.db)
    .await?;

    Ok(Json(serde_json::json!({ "message": "Team member added" })))
}

/// DELETE /api/v1/projects/:id/team/:user_id
pub async fn remove_team_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TeamMemberRemove)?;

    let result = sqlx::query(
        "DELETE FROM project_members WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(user_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User is not a team member"));
    }

    Ok(Json(serde_json::json!({ "message": "Team member removed" })))
}

/// GET /api/v1/projects/:id/team
pub async fn get_project_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<TeamMemberResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::TeamRead)?;

    fetch_project(&state, project_id).await?;

    let rows: Vec<(Uuid, String, String, String, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT pm.user_id, u.username, u.email, pm.role, pm.joined_at
        FROM project_members pm
        JOIN users u ON u.id = pm.user_id
        WHERE pm.project_id = $1
        ORDER BY pm.joined_at
        "#,
    )
    .bind(project_id)
    .fetch_all(&state.db)
    .await?;

    let members = rows
        .into_iter()
        .map(|(user_id, username, email, role, joined_at)| TeamMemberResponse {
            user_id,
            username,
            email,
            role,
            joined_at,
        })
        .collect();

    Ok(Json(members))
}
