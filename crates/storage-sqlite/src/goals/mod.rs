//! SQLite storage implementation for the goal catalog.

mod model;
mod repository;

pub use model::{CmeGoalDB, ExtensionDB, GoalDB, LicenseGoalDB, WellnessGoalDB};
pub use repository::GoalCatalogRepository;
