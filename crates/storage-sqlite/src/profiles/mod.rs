//! SQLite storage implementation for provider profiles.

mod model;
mod repository;

pub use model::{ProfileCmeTagDB, ProfileDB};
pub use repository::ProfileRepository;
