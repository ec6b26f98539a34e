//! SQLite storage implementation for goal instances.

mod model;
mod repository;

pub use model::{UserGoalCmeGoalDB, UserGoalDB};
pub use repository::UserGoalRepository;
