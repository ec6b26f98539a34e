//! Credits module - ledger access and credit arithmetic.

mod credits_calculator;
mod credits_model;
mod credits_traits;

pub use credits_calculator::{
    compute_credits_owed, earned_window, nround, paced_credits_due, sum_earned_credits,
};
pub use credits_model::{CreditSource, NewCreditEntry};
pub use credits_traits::CreditLedgerTrait;
