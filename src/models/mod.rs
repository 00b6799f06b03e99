pub mod task;
pub mod user;

pub use task::{Task, TaskInput, TaskListQuery, TaskSort, TaskUpdate};
pub use user::{CreateUser, UpdateUser, User};
