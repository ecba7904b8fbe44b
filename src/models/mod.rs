// Data models for the task manager REST API

pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskPage, TaskStatus};
pub use user::User;
