use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use taskhub_shared::{
    api::{CommentResponse, CreateCommentRequest, UpdateCommentRequest},
    Comment, UserSummary,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::authz::{authorize, Operation};
use crate::error::AppError;
use crate::identity;
use crate::routes::AppState;

type CommentRow = (
    Uuid,          // id
    Uuid,          // task_id
    Option<Uuid>,  // parent_comment_id
    String,        // content
    bool,          // is_edited
    Uuid,          // author_id
    String,        // author username
    String,        // author email
    DateTime<Utc>, // created_at
    DateTime<Utc>, // updated_at
);

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.task_id, c.parent_comment_id, c.content, c.is_edited,
           c.author_id, u.username, u.email, c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

fn row_to_response(row: CommentRow) -> CommentResponse {
    let comment = Comment {
        id: row.0,
        task_id: row.1,
        author_id: row.5,
        parent_comment_id: row.2,
        content: row.3,
        is_edited: row.4,
        created_at: row.8,
        updated_at: row.9,
    };
    let author = UserSummary {
        id: row.5,
        username: row.6,
        email: row.7,
    };
    CommentResponse::from_comment(comment, author)
}

async fn fetch_comment(state: &AppState, id: Uuid) -> Result<CommentRow, AppError> {
    let query = format!("{} WHERE c.id = $1", COMMENT_SELECT);
    sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))
}

/// POST /api/v1/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::CommentCreate)?;

    if req.content.trim().is_empty() {
        return Err(AppError::validation("Comment content is required"));
    }

    let task: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tasks WHERE id = $1")
        .bind(req.task_id)
        .fetch_optional(&state.db)
        .await?;
    if task.is_none() {
        return Err(AppError::not_found("Task not found"));
    }

    if let Some(parent_id) = req.parent_comment_id {
        let parent: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM comments WHERE id = $1")
            .bind(parent_id)
            .fetch_optional(&state.db)
            .await?;
        if parent.is_none() {
            return Err(AppError::not_found("Parent comment not found"));
        }
    }

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO comments (id, task_id, parent_comment_id, content, is_edited,
                              author_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, FALSE, $5, $6, $6)
        "#,
    )
    .bind(id)
    .bind(req.task_id)
    .bind(req.parent_comment_id)
    .bind(&req.content)
    .bind(current.id())
    .bind(now)
    .execute(&state.db)
    .await?;

    let comment = Comment {
        id,
        task_id: req.task_id,
        author_id: current.id(),
        parent_comment_id: req.parent_comment_id,
        content: req.content,
        is_edited: false,
        created_at: now,
        updated_at: now,
    };
    let author = UserSummary {
        id: current.id(),
        username: current.user.username,
        email: current.user.email,
    };
    Ok(Json(CommentResponse::from_comment(comment, author)))
}

/// GET /api/v1/comments/:id
pub async fn get_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommentResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::CommentRead)?;

    let row = fetch_comment(&state, id).await?;
    Ok(Json(row_to_response(row)))
}

/// GET /api/v1/comments/task/:task_id
///
/// Newest first.
pub async fn get_task_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::CommentRead)?;

    let query = format!(
        "{} WHERE c.task_id = $1 ORDER BY c.created_at DESC",
        COMMENT_SELECT
    );
    let rows: Vec<CommentRow> = sqlx::query_as(&query)
        .bind(task_id)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(row_to_response).collect()))
}

/// PUT /api/v1/comments/:id
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::CommentUpdate)?;

    if req.content.trim().is_empty() {
        return Err(AppError::validation("Comment content is required"));
    }

    let row = fetch_comment(&state, id).await?;
    if row.5 != current.id() {
        return Err(AppError::validation("You can only edit your own comments"));
    }

    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE comments
        SET content = $1, is_edited = TRUE, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(&req.content)
    .bind(now)
    .bind(id)
    .execute(&state.db)
    .await?;

    let row = fetch_comment(&state, id).await?;
    Ok(Json(row_to_response(row)))
}

/// DELETE /api/v1/comments/:id
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::CommentDelete)?;

    let row = fetch_comment(&state, id).await?;
    if row.5 != current.id() {
        return Err(AppError::validation("You can only delete your own comments"));
    }

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Comment deleted" })))
}
