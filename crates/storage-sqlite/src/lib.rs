//! SQLite storage implementation for the compliance tracker.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `cmetrack-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for definitions, instances, licenses,
//!   profiles and the credit ledger
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! The core crate is database-agnostic and works with traits.
//!
//! ```text
//!   core (domain)        worker (batch jobs)
//!         │                     │
//!         └──────────┬──────────┘
//!                    │
//!                    ▼
//!          storage-sqlite (this crate)
//!                    │
//!                    ▼
//!                SQLite DB
//! ```
//!
//! Reads go through the r2d2 pool. Every write is a job on the single writer
//! actor and runs in its own immediate transaction.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod credits;
pub mod goals;
pub mod licenses;
pub mod profiles;
pub mod user_goals;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export repositories
pub use credits::CreditLedgerRepository;
pub use goals::GoalCatalogRepository;
pub use licenses::LicenseRepository;
pub use profiles::ProfileRepository;
pub use user_goals::UserGoalRepository;

// Re-export from cmetrack-core for convenience
pub use cmetrack_core::errors::{DatabaseError, Error, Result};
