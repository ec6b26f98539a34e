use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The two kinds of ledger entries that earn credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditSource {
    /// Credits entered by the provider
    SelfReported,
    /// Credits earned by redeeming an article offer in the browser
    BrowserRedeemed,
}

impl CreditSource {
    pub const ALL: [CreditSource; 2] = [CreditSource::SelfReported, CreditSource::BrowserRedeemed];

    pub fn as_str(&self) -> &'static str {
        match self {
            CreditSource::SelfReported => "SELF_REPORTED",
            CreditSource::BrowserRedeemed => "BROWSER_REDEEMED",
        }
    }
}

impl std::fmt::Display for CreditSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A credit entry to record in the ledger. `tags` are the topics the credits
/// count toward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCreditEntry {
    pub user_id: String,
    pub source: CreditSource,
    pub credits: Decimal,
    pub activity_date: NaiveDate,
    pub tags: BTreeSet<String>,
}
