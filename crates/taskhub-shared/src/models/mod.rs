mod comment;
mod project;
mod role;
mod task;
mod user;

pub use comment::*;
pub use project::*;
pub use role::*;
pub use task::*;
pub use user::*;
