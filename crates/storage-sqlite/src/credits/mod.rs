//! SQLite storage implementation for the credit ledger.

mod model;
mod repository;

pub use model::{CreditEntryDB, CreditEntryTagDB};
pub use repository::CreditLedgerRepository;
