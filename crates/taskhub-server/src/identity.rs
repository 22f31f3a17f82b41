use chrono::{DateTime, Utc};
use taskhub_shared::{Role, User};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::AppError;

/// Fully resolved principal: the user record plus its system-wide roles.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub roles: Vec<Role>,
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }
}

type UserRow = (
    Uuid,              // id
    String,            // username
    String,            // email
    Option<String>,    // first_name
    Option<String>,    // last_name
    Option<String>,    // phone
    bool,              // is_active
    bool,              // is_verified
    DateTime<Utc>,     // created_at
    DateTime<Utc>,     // updated_at
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

/// Resolve the authenticated principal to its user record and roles.
///
/// The token was already verified upstream, so a missing user row is an
/// integrity fault (surfaced as 500), not an auth failure.
pub async fn current_user(db: &DbPool, auth: &AuthUser) -> Result<CurrentUser, AppError> {
    let row: Option<UserRow> = sqlx::query_as(
        r#"
        SELECT id, username, email, first_name, last_name, phone,
               is_active, is_verified, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(auth.id)
    .fetch_optional(db)
    .await?;

    let user = row.map(row_to_user).ok_or_else(|| {
        AppError::Integrity(format!(
            "authenticated principal {} has no user record",
            auth.username
        ))
    })?;

    let roles = load_roles(db, user.id).await?;

    Ok(CurrentUser { user, roles })
}

pub async fn load_roles(db: &DbPool, user_id: Uuid) -> Result<Vec<Role>, AppError> {
    let names: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT r.name
        FROM roles r
        JOIN user_roles ur ON ur.role_id = r.id
        WHERE ur.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(names
        .into_iter()
        .filter_map(|(name,)| Role::from_name(&name))
        .collect())
}

/// Fetch an arbitrary user record, for assignee/member validation.
pub async fn find_user(db: &DbPool, user_id: Uuid) -> Result<Option<User>, AppError> {
    let row: Option<UserRow> = sqlx::query_as(
        r#"
        SELECT id, username, email, first_name, last_name, phone,
               is_active, is_verified, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(row_to_user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(roles: Vec<Role>) -> CurrentUser {
        CurrentUser {
            user: User {
                id: Uuid::new_v4(),
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                first_name: None,
                last_name: None,
                phone: None,
                is_active: true,
                is_verified: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            roles,
        }
    }

    #[test]
    fn has_role_checks_exact_membership() {
        let user = current(vec![Role::Manager]);
        assert!(user.has_role(Role::Manager));
        assert!(!user.has_role(Role::Admin));
    }

    #[test]
    fn is_any_matches_any_listed_role() {
        let user = current(vec![Role::Member]);
        assert!(user.is_any(&[Role::Admin, Role::Member]));
        assert!(!user.is_any(&[Role::Admin, Role::Manager]));
        assert!(!user.is_any(&[]));
    }
}
