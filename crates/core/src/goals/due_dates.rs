//! Due date computation for goal instances.

use chrono::{DateTime, Duration, Utc};

use crate::constants::{LICENSE_GRACE_DAYS, NEW_PROFILE_GRACE_DAYS};
use crate::goals::goals_errors::GoalError;
use crate::goals::goals_model::{Compliance, DueDateType, GoalDefinition};
use crate::licenses::License;
use crate::profiles::Profile;
use crate::utils::{next_occurrence, MonthDay};

/// Recurrence policy of a validated definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDatePolicy {
    OneOff,
    AnyTimeInInterval,
    FixedDate(MonthDay),
    BirthDate,
    LicenseExpiry,
}

impl DueDatePolicy {
    pub fn for_definition(definition: &GoalDefinition) -> Result<Self, GoalError> {
        let month_day = match definition {
            GoalDefinition::License(_) => None,
            GoalDefinition::Cme(goal) => goal.due_month_day,
            GoalDefinition::Wellness(goal) => goal.due_month_day,
        };
        let base = definition.base();
        Self::new(&base.id, base.due_date_type, month_day)
    }

    pub fn new(
        goal_id: &str,
        due_date_type: DueDateType,
        month_day: Option<MonthDay>,
    ) -> Result<Self, GoalError> {
        match due_date_type {
            DueDateType::OneOff => Ok(DueDatePolicy::OneOff),
            DueDateType::RecurAnyTimeInInterval => Ok(DueDatePolicy::AnyTimeInInterval),
            DueDateType::RecurOnBirthDate => Ok(DueDatePolicy::BirthDate),
            DueDateType::RecurOnLicenseExpiry => Ok(DueDatePolicy::LicenseExpiry),
            DueDateType::RecurFixedDate => month_day
                .filter(MonthDay::is_valid)
                .map(DueDatePolicy::FixedDate)
                .ok_or_else(|| GoalError::invalid(goal_id, "fixed due date needs a month/day")),
        }
    }
}

/// Input a due date fell back on because the provider has not supplied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    License,
    BirthDate,
}

impl MissingInput {
    /// Compliance override for a goal whose due date depends on missing data.
    pub fn compliance(&self) -> Compliance {
        match self {
            MissingInput::License => Compliance::IncompleteLicense,
            MissingInput::BirthDate => Compliance::IncompleteProfile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDate {
    pub date: DateTime<Utc>,
    pub missing: Option<MissingInput>,
}

impl DueDate {
    fn known(date: DateTime<Utc>) -> Self {
        Self {
            date,
            missing: None,
        }
    }
}

/// Computes the next due date of a goal for the profile.
pub fn compute_due_date(
    policy: &DueDatePolicy,
    profile: &Profile,
    license: Option<&License>,
    now: DateTime<Utc>,
) -> DueDate {
    match policy {
        DueDatePolicy::OneOff | DueDatePolicy::AnyTimeInInterval => {
            let grace = Duration::days(NEW_PROFILE_GRACE_DAYS);
            if now - profile.joined_at < grace {
                DueDate::known(now + grace)
            } else {
                DueDate::known(now)
            }
        }
        DueDatePolicy::FixedDate(month_day) => DueDate::known(next_occurrence(*month_day, now)),
        DueDatePolicy::LicenseExpiry => match license.and_then(|l| l.expire_date) {
            Some(expire) => DueDate::known(expire),
            None => DueDate {
                date: now + Duration::days(LICENSE_GRACE_DAYS),
                missing: Some(MissingInput::License),
            },
        },
        DueDatePolicy::BirthDate => match profile.birth_date {
            Some(birth_date) => {
                DueDate::known(next_occurrence(MonthDay::from_date(birth_date), now))
            }
            None => DueDate {
                date: now,
                missing: Some(MissingInput::BirthDate),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::{BaseGoal, GoalType, Scope, WellnessGoal};
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn profile(joined_at: DateTime<Utc>, birth_date: Option<NaiveDate>) -> Profile {
        Profile {
            user_id: "u1".to_string(),
            degrees: BTreeSet::new(),
            specialties: BTreeSet::new(),
            sub_specialties: BTreeSet::new(),
            states: BTreeSet::new(),
            hospitals: BTreeSet::new(),
            cme_tags: Vec::new(),
            specialty_tags: BTreeSet::new(),
            sub_specialties_required: false,
            birth_date,
            country: None,
            joined_at,
            goals_enabled: true,
            compliance: None,
        }
    }

    fn license(expire: Option<DateTime<Utc>>) -> License {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap().naive_utc();
        License {
            id: "l1".to_string(),
            user_id: "u1".to_string(),
            state: "CA".to_string(),
            license_type: "Medical Board".to_string(),
            expire_date: expire,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_new_profile_gets_grace_period() {
        let p = profile(now() - Duration::days(10), None);
        let due = compute_due_date(&DueDatePolicy::OneOff, &p, None, now());
        assert_eq!(due.date, now() + Duration::days(60));
        assert_eq!(due.missing, None);

        let p = profile(now() - Duration::days(60), None);
        let due = compute_due_date(&DueDatePolicy::AnyTimeInInterval, &p, None, now());
        assert_eq!(due.date, now());
    }

    #[test]
    fn test_fixed_date_rolls_forward_when_passed() {
        let p = profile(now() - Duration::days(400), None);
        let june = DueDatePolicy::FixedDate(MonthDay::new(6, 30).unwrap());
        let due = compute_due_date(&june, &p, None, now());
        assert_eq!(due.date, Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap());

        let december = DueDatePolicy::FixedDate(MonthDay::new(12, 31).unwrap());
        let due = compute_due_date(&december, &p, None, now());
        assert_eq!(due.date, Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_fixed_feb_29_clamps_in_non_leap_year() {
        let p = profile(now() - Duration::days(400), None);
        let leap_day = DueDatePolicy::FixedDate(MonthDay::new(2, 29).unwrap());
        let due = compute_due_date(&leap_day, &p, None, now());
        assert_eq!(due.date, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_license_expiry() {
        let p = profile(now() - Duration::days(400), None);
        let expire = now() + Duration::days(200);
        let l = license(Some(expire));
        let due = compute_due_date(&DueDatePolicy::LicenseExpiry, &p, Some(&l), now());
        assert_eq!(due, DueDate::known(expire));

        let placeholder = license(None);
        for lic in [None, Some(&placeholder)] {
            let due = compute_due_date(&DueDatePolicy::LicenseExpiry, &p, lic, now());
            assert_eq!(due.date, now() + Duration::days(365));
            assert_eq!(due.missing, Some(MissingInput::License));
            assert_eq!(
                due.missing.map(|m| m.compliance()),
                Some(Compliance::IncompleteLicense)
            );
        }
    }

    #[test]
    fn test_birth_date() {
        let p = profile(now() - Duration::days(400), NaiveDate::from_ymd_opt(1980, 3, 2));
        let due = compute_due_date(&DueDatePolicy::BirthDate, &p, None, now());
        assert_eq!(due.date, Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap());

        let p = profile(now() - Duration::days(400), None);
        let due = compute_due_date(&DueDatePolicy::BirthDate, &p, None, now());
        assert_eq!(due.date, now());
        assert_eq!(due.missing, Some(MissingInput::BirthDate));
    }

    #[test]
    fn test_policy_requires_month_day_for_fixed_date() {
        let mut goal = WellnessGoal {
            base: BaseGoal {
                id: "w1".to_string(),
                goal_type: GoalType::Wellness,
                is_active: true,
                due_date_type: DueDateType::RecurFixedDate,
                interval_years: Some(dec!(1)),
                degrees: Scope::Any,
                specialties: Scope::Any,
                sub_specialties: Scope::Any,
                notes: String::new(),
            },
            hospital: "General".to_string(),
            title: "Flu shot".to_string(),
            due_month_day: None,
        };
        let result = DueDatePolicy::for_definition(&GoalDefinition::Wellness(goal.clone()));
        assert!(matches!(result, Err(GoalError::InvalidDefinition { .. })));

        goal.due_month_day = Some(MonthDay::new(10, 1).unwrap());
        let result = DueDatePolicy::for_definition(&GoalDefinition::Wellness(goal));
        assert_eq!(
            result.unwrap(),
            DueDatePolicy::FixedDate(MonthDay::new(10, 1).unwrap())
        );
    }
}
