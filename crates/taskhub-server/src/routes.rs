use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::auth_middleware;
use crate::config::Config;
use crate::db::DbPool;
use crate::handlers::{
    auth as auth_handlers, comments as comment_handlers, dashboard as dashboard_handlers,
    projects as project_handlers, tasks as task_handlers, users as user_handlers,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
}

pub fn create_router(db: DbPool, config: Config) -> Router {
    let state = AppState { db, config };

    // Public auth routes (no middleware)
    let public_auth_routes = Router::new()
        .route("/register", post(auth_handlers::register))
        .route("/login", post(auth_handlers::login));

    // Protected auth routes (need auth)
    let protected_auth_routes = Router::new()
        .route("/me", get(auth_handlers::me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let auth_routes = Router::new()
        .merge(public_auth_routes)
        .merge(protected_auth_routes);

    let user_routes = Router::new()
        .route("/", get(user_handlers::list_users))
        .route("/:id", get(user_handlers::get_user));

    let project_routes = Router::new()
        .route("/", post(project_handlers::create_project))
        .route("/", get(project_handlers::list_projects_paginated))
        .route("/my-projects", get(project_handlers::get_my_projects))
        .route(
            "/paginated/my-projects",
            get(project_handlers::get_my_projects_paginated),
        )
        .route("/:id", get(project_handlers::get_project))
        .route("/:id", put(project_handlers::update_project))
        .route("/:id", delete(project_handlers::delete_project))
        .route("/:id/team", post(project_handlers::add_team_member))
        .route("/:id/team", get(project_handlers::get_project_team))
        .route(
            "/:id/team/:user_id",
            delete(project_handlers::remove_team_member),
        );

    let task_routes = Router::new()
        .route("/", post(task_handlers::create_task))
        .route("/", get(task_handlers::list_tasks_paginated))
        .route("/my-tasks", get(task_handlers::get_my_tasks))
        .route("/search", get(task_handlers::search_tasks))
        .route("/filter", get(task_handlers::filter_tasks))
        .route("/filter/status/:status", get(task_handlers::filter_by_status))
        .route(
            "/filter/priority/:priority",
            get(task_handlers::filter_by_priority),
        )
        .route("/overdue", get(task_handlers::get_overdue_tasks))
        .route("/my-overdue", get(task_handlers::get_my_overdue_tasks))
        .route(
            "/paginated/project/:project_id",
            get(task_handlers::get_project_tasks_paginated),
        )
        .route("/paginated/my-tasks", get(task_handlers::get_my_tasks_paginated))
        .route("/paginated/search", get(task_handlers::search_tasks_paginated))
        .route("/project/:project_id", get(task_handlers::get_project_tasks))
        .route("/:id", get(task_handlers::get_task))
        .route("/:id", put(task_handlers::update_task))
        .route("/:id", delete(task_handlers::delete_task));

    let comment_routes = Router::new()
        .route("/", post(comment_handlers::add_comment))
        .route("/task/:task_id", get(comment_handlers::get_task_comments))
        .route("/:id", get(comment_handlers::get_comment))
        .route("/:id", put(comment_handlers::update_comment))
        .route("/:id", delete(comment_handlers::delete_comment));

    let dashboard_routes = Router::new()
        .route("/stats", get(dashboard_handlers::get_overall_stats))
        .route("/my-stats", get(dashboard_handlers::get_my_stats))
        .route(
            "/projects/:project_id/stats",
            get(dashboard_handlers::get_project_stats),
        )
        .route("/my-workload", get(dashboard_handlers::get_my_workload))
        .route(
            "/users/:user_id/workload",
            get(dashboard_handlers::get_user_workload),
        );

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .nest("/dashboard", dashboard_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
