use axum::{extract::State, Extension, Json};
use chrono::Utc;
use taskhub_shared::{
    api::{AuthResponse, LoginRequest, RegisterRequest, UserResponse},
    Role, User,
};
use uuid::Uuid;

use crate::auth::{create_access_token, hash_password, verify_password, AuthUser};
use crate::error::AppError;
use crate::identity;
use crate::routes::AppState;

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() {
        return Err(AppError::validation("Username and email are required"));
    }

    if req.password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = $1")
            .bind(&req.username)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();
    let now = Utc::now();

    // User insert and default role assignment are one atomic unit.
    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, first_name, last_name,
                           phone, is_active, is_verified, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, FALSE, $8, $8)
        "#,
    )
    .bind(user_id)
    .bind(&req.username)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.phone)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    // Every new account starts as a member.
    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role_id)
        SELECT $1, id FROM roles WHERE name = $2
        "#,
    )
    .bind(user_id)
    .bind(Role::Member.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let access_token = create_access_token(
        user_id,
        &req.username,
        &state.config.jwt_secret,
        state.config.jwt_expires_in,
    )?;

    let user = User {
        id: user_id,
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        is_active: true,
        is_verified: false,
        created_at: now,
        updated_at: now,
    };

    Ok(Json(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        user: UserResponse {
            user,
            roles: vec![Role::Member],
        },
    }))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let row: Option<(Uuid, String, String)> = sqlx::query_as(
        "SELECT id, username, password_hash FROM users WHERE username = $1 OR email = $1",
    )
    .bind(&req.username_or_email)
    .fetch_optional(&state.db)
    .await?;

    let (user_id, username, password_hash) = row.ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let access_token = create_access_token(
        user_id,
        &username,
        &state.config.jwt_secret,
        state.config.jwt_expires_in,
    )?;

    let user = identity::find_user(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Integrity(format!("user {} vanished during login", user_id)))?;
    let roles = identity::load_roles(&state.db, user_id).await?;

    Ok(Json(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        user: UserResponse { user, roles },
    }))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let current = identity::current_user(&state.db, &auth).await?;

    Ok(Json(UserResponse {
        user: current.user,
        roles: current.roles,
    }))
}
