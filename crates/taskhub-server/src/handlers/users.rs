use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use taskhub_shared::{api::UserResponse, User};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::authz::{authorize, Operation};
use crate::error::AppError;
use crate::identity;
use crate::routes::AppState;

type UserRow = (
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn row_to_user(row: UserRow) -> User {
    User {
        id: row.0,
        username: row.1,
        email: row.2,
        first_name: row.3,
        last_name: row.4,
        phone: row.5,
        is_active: row.6,
        is_verified: row.7,
        created_at: row.8,
        updated_at: row.9,
    }
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::UserList)?;

    let rows: Vec<UserRow> = sqlx::query_as(
        r#"
        SELECT id, username, email, first_name, last_name, phone,
               is_active, is_verified, created_at, updated_at
        FROM users
        ORDER BY created_at
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        let user = row_to_user(row);
        let roles = identity::load_roles(&state.db, user.id).await?;
        users.push(UserResponse { user, roles });
    }

    Ok(Json(users))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;
    authorize(&current, Operation::UserRead)?;

    let user = identity::find_user(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User not found with id: {}", user_id)))?;
    let roles = identity::load_roles(&state.db, user_id).await?;

    Ok(Json(UserResponse { user, roles }))
}
