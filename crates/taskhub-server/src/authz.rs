//! Role gate evaluated before each handler touches the store.
//!
//! Every gated operation maps to a static set of system-wide roles; a
//! caller holding none of them is rejected with 403. Ownership and
//! authorship rules are separate and live with the handlers, where they
//! surface as 400 (business-rule failures).

use taskhub_shared::Role;

use crate::error::AppError;
use crate::identity::CurrentUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    UserList,
    UserRead,

    ProjectCreate,
    ProjectRead,
    ProjectListAll,
    ProjectListMine,
    ProjectUpdate,
    ProjectDelete,
    TeamMemberAdd,
    TeamMemberRemove,
    TeamRead,

    TaskCreate,
    TaskRead,
    TaskListAll,
    TaskUpdate,
    TaskDelete,
    TaskSearch,
    TaskOverdueAll,
    TaskOverdueMine,

    CommentCreate,
    CommentRead,
    CommentUpdate,
    CommentDelete,

    DashboardOverall,
    DashboardMine,
    DashboardProject,
    WorkloadMine,
    WorkloadUser,
}

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const ADMIN_MANAGER: &[Role] = &[Role::Admin, Role::Manager];
const ANY_ROLE: &[Role] = &[Role::Admin, Role::Manager, Role::Member];

pub fn required_roles(op: Operation) -> &'static [Role] {
    use Operation::*;

    match op {
        UserList => ADMIN_ONLY,
        UserRead => ANY_ROLE,

        ProjectCreate => ADMIN_MANAGER,
        ProjectRead => ANY_ROLE,
        ProjectListAll => ADMIN_ONLY,
        ProjectListMine => ANY_ROLE,
        ProjectUpdate => ADMIN_MANAGER,
        ProjectDelete => ADMIN_MANAGER,
        TeamMemberAdd => ADMIN_MANAGER,
        TeamMemberRemove => ADMIN_MANAGER,
        TeamRead => ANY_ROLE,

        TaskCreate => ADMIN_MANAGER,
        TaskRead => ANY_ROLE,
        TaskListAll => ADMIN_ONLY,
        TaskUpdate => ANY_ROLE,
        TaskDelete => ADMIN_MANAGER,
        TaskSearch => ANY_ROLE,
        TaskOverdueAll => ADMIN_MANAGER,
        TaskOverdueMine => ANY_ROLE,

        CommentCreate => ANY_ROLE,
        CommentRead => ANY_ROLE,
        CommentUpdate => ANY_ROLE,
        CommentDelete => ANY_ROLE,

        DashboardOverall => ADMIN_ONLY,
        DashboardMine => ANY_ROLE,
        DashboardProject => ANY_ROLE,
        WorkloadMine => ANY_ROLE,
        WorkloadUser => ADMIN_MANAGER,
    }
}

pub fn authorize(user: &CurrentUser, op: Operation) -> Result<(), AppError> {
    if user.is_any(required_roles(op)) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taskhub_shared::User;
    use uuid::Uuid;

    fn user_with(roles: Vec<Role>) -> CurrentUser {
        CurrentUser {
            user: User {
                id: Uuid::new_v4(),
                username: "u".to_string(),
                email: "u@example.com".to_string(),
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
    fn member_cannot_create_projects_or_tasks() {
        let member = user_with(vec![Role::Member]);
        assert!(matches!(
            authorize(&member, Operation::ProjectCreate),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            authorize(&member, Operation::TaskCreate),
            Err(AppError::Forbidden)
        ));
        assert!(authorize(&member, Operation::TaskRead).is_ok());
    }

    #[test]
    fn overall_dashboard_is_admin_only() {
        let manager = user_with(vec![Role::Manager]);
        assert!(matches!(
            authorize(&manager, Operation::DashboardOverall),
            Err(AppError::Forbidden)
        ));

        let admin = user_with(vec![Role::Admin]);
        assert!(authorize(&admin, Operation::DashboardOverall).is_ok());
    }

    #[test]
    fn user_without_roles_is_denied_everywhere() {
        let nobody = user_with(vec![]);
        assert!(matches!(
            authorize(&nobody, Operation::TaskRead),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn every_operation_requires_at_least_one_role() {
        use Operation::*;
        let all = [
            UserList,
            UserRead,
            ProjectCreate,
            ProjectRead,
            ProjectListAll,
            ProjectListMine,
            ProjectUpdate,
            ProjectDelete,
            TeamMemberAdd,
            TeamMemberRemove,
            TeamRead,
            TaskCreate,
            TaskRead,
            TaskListAll,
            TaskUpdate,
            TaskDelete,
            TaskSearch,
            TaskOverdueAll,
            TaskOverdueMine,
            CommentCreate,
            CommentRead,
            CommentUpdate,
            CommentDelete,
            DashboardOverall,
            DashboardMine,
            DashboardProject,
            WorkloadMine,
            WorkloadUser,
        ];
        for op in all {
            assert!(!required_roles(op).is_empty());
        }
    }
}
