//! Credit arithmetic: earned sums, credits owed, rounding and pacing.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::constants::{ARTICLE_CREDIT, DAYS_PER_MONTH, DEFAULT_LOOKBACK_YEARS};
use crate::credits::credits_model::CreditSource;
use crate::credits::credits_traits::CreditLedgerTrait;
use crate::errors::Result;
use crate::goals::{CmeGoal, GoalError};
use crate::utils::years_to_duration;

/// Sums credits from every ledger source for a user, tag and inclusive date range.
pub fn sum_earned_credits(
    ledger: &dyn CreditLedgerTrait,
    user_id: &str,
    tag: Option<&str>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal> {
    let mut total = Decimal::ZERO;
    for source in CreditSource::ALL {
        total += ledger.sum_credits(user_id, source, tag, start, end)?;
    }
    Ok(total)
}

/// Rounds up to the next multiple of 0.5. Whole numbers are unchanged.
pub fn nround(x: Decimal) -> Decimal {
    let floor = x.floor();
    let remainder = x - floor;
    if remainder.is_zero() {
        floor
    } else if remainder <= dec!(0.5) {
        floor + dec!(0.5)
    } else {
        floor + Decimal::ONE
    }
}

/// Rounds half away from zero to a whole number.
fn round_whole(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Credits a user owes for one CME definition.
///
/// A tagged definition owes its full requirement. An untagged one is split
/// evenly across the user's specialties and rounded to whole credits.
pub fn compute_credits_owed(
    goal: &CmeGoal,
    num_profile_specialties: usize,
) -> std::result::Result<Decimal, GoalError> {
    if goal.cme_tag.is_some() {
        return Ok(goal.credits_required);
    }
    match num_profile_specialties {
        0 => Err(GoalError::NoProfileSpecialties {
            goal_id: goal.base.id.clone(),
        }),
        1 => Ok(goal.credits_required),
        n => Ok(round_whole(goal.credits_required / Decimal::from(n as u64))),
    }
}

/// Converts the credits left into a steady monthly amount, in whole articles.
pub fn paced_credits_due(credits_left: Decimal, days_left: i64) -> Decimal {
    let months_left = days_left / DAYS_PER_MONTH;
    if months_left <= 0 {
        return nround(credits_left);
    }
    let articles_left = credits_left / ARTICLE_CREDIT;
    let articles_per_month = round_whole(articles_left / Decimal::from(months_left));
    articles_per_month * ARTICLE_CREDIT
}

/// The inclusive activity-date window that counts toward a requirement due at
/// `due_date`, looking back `interval_years` (10 years if unset).
pub fn earned_window(
    due_date: DateTime<Utc>,
    interval_years: Option<Decimal>,
) -> (NaiveDate, NaiveDate) {
    let lookback = interval_years
        .filter(|years| years.is_sign_positive() && !years.is_zero())
        .unwrap_or_else(|| Decimal::from(DEFAULT_LOOKBACK_YEARS));
    let start = due_date - years_to_duration(lookback);
    (start.date_naive(), due_date.date_naive())
}
