mod auth;
mod comments;
mod dashboard;
mod page;
mod projects;
mod tasks;

pub use auth::*;
pub use comments::*;
pub use dashboard::*;
pub use page::*;
pub use projects::*;
pub use tasks::*;
