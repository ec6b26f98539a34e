use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::credits::credits_model::CreditSource;
use crate::errors::Result;

/// Read access to the credit ledger.
pub trait CreditLedgerTrait: Send + Sync {
    /// Sums the credits of one source for a user with an activity date in
    /// `[start, end]` (inclusive). `tag = None` sums entries of every topic.
    fn sum_credits(
        &self,
        user_id: &str,
        source: CreditSource,
        tag: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal>;
}
