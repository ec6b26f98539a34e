//! SQLite storage implementation for licenses.

mod model;
mod repository;

pub use model::LicenseDB;
pub use repository::LicenseRepository;
