use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Credits granted for a single redeemed article
pub const ARTICLE_CREDIT: Decimal = dec!(0.5);

/// Two consolidated CME requirements closer than this are treated as one deadline
pub const MAX_DUEDATE_DIFF_DAYS: i64 = 30;

/// Below this many days left, credits due are the full remainder instead of a monthly pace
pub const PACING_THRESHOLD_DAYS: i64 = 30;

/// Days per pacing month
pub const DAYS_PER_MONTH: i64 = 30;

/// Grace period for newly joined profiles on one-off and any-time goals
pub const NEW_PROFILE_GRACE_DAYS: i64 = 60;

/// Grace period given to enter a license expiration date
pub const LICENSE_GRACE_DAYS: i64 = 365;

/// Lookback window for earned credits when a goal has no interval
pub const DEFAULT_LOOKBACK_YEARS: i64 = 10;

/// Days per year when converting fractional intervals
pub const DAYS_PER_YEAR: i64 = 365;

/// Licenses expiring within this many days are reported as expiring
pub const EXPIRING_CUTOFF_DAYS: i64 = 90;

/// Wellness goals due within this many days are marginally compliant
pub const WELLNESS_WARNING_DAYS: i64 = 30;

/// Minimum credits a CME goal may require
pub const MIN_CME_CREDITS: Decimal = dec!(0.1);
