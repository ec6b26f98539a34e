//! CME Tracker Core - goal matching and compliance recomputation.
//!
//! This crate contains the goal engine: definitions, matching against
//! provider profiles, instance recompute and the services driving them.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod constants;
pub mod credits;
pub mod errors;
pub mod goals;
pub mod licenses;
pub mod profiles;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
