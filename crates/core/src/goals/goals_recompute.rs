//! Status and compliance derivation for goal instances.
//!
//! Everything here is a pure function of already-loaded data (plus ledger
//! sums for CME goals). Persisting the results is left to the service.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::warn;
use rust_decimal::Decimal;

use crate::constants::{
    ARTICLE_CREDIT, MAX_DUEDATE_DIFF_DAYS, PACING_THRESHOLD_DAYS, WELLNESS_WARNING_DAYS,
};
use crate::credits::{
    compute_credits_owed, earned_window, nround, paced_credits_due, sum_earned_credits,
    CreditLedgerTrait,
};
use crate::errors::Result;
use crate::goals::due_dates::{compute_due_date, DueDatePolicy};
use crate::goals::goals_errors::GoalError;
use crate::goals::goals_model::{
    CmeGoal, Compliance, DueDateType, GoalType, LicenseGoal, Status, UserGoal,
};
use crate::licenses::License;
use crate::profiles::Profile;
use crate::utils::days_left;

/// Status of a license goal. "Completed" means the renewal is not urgent yet.
pub fn calc_license_status(
    expire_date: Option<DateTime<Utc>>,
    days_before_due: i64,
    now: DateTime<Utc>,
) -> Status {
    match expire_date {
        Some(expire) if expire >= now => {
            let cutoff = expire - Duration::days(days_before_due);
            if now < cutoff {
                Status::Completed
            } else {
                Status::InProgress
            }
        }
        _ => Status::PastDue,
    }
}

fn compliance_for_status(status: Status) -> Compliance {
    match status {
        Status::PastDue => Compliance::NonCompliant,
        Status::InProgress => Compliance::MarginalCompliant,
        Status::Completed => Compliance::Compliant,
    }
}

/// Recomputed state of a goal instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub status: Status,
    pub compliance: Compliance,
    pub due_date: DateTime<Utc>,
    pub credits_due: Option<Decimal>,
    pub credits_earned: Option<Decimal>,
    /// Definition the consolidated CME figures came from
    pub primary_goal_id: Option<String>,
}

impl Evaluation {
    /// Copies the evaluation onto the instance. Returns true if anything changed.
    pub fn apply_to(&self, user_goal: &mut UserGoal) -> bool {
        let mut changed = false;
        if let Some(goal_id) = &self.primary_goal_id {
            if &user_goal.goal_id != goal_id {
                user_goal.goal_id = goal_id.clone();
                changed = true;
            }
        }
        if user_goal.status != self.status {
            user_goal.status = self.status;
            changed = true;
        }
        if user_goal.compliance != self.compliance {
            user_goal.compliance = self.compliance;
            changed = true;
        }
        if user_goal.due_date != self.due_date {
            user_goal.due_date = self.due_date;
            changed = true;
        }
        if user_goal.credits_due != self.credits_due {
            user_goal.credits_due = self.credits_due;
            changed = true;
        }
        if user_goal.credits_earned != self.credits_earned {
            user_goal.credits_earned = self.credits_earned;
            changed = true;
        }
        changed
    }
}

/// Status, compliance and due date of a license goal whose license expires
/// at `expire_date`.
///
/// An uninitialized license is past due now and flagged as incomplete.
pub fn evaluate_license(
    goal: &LicenseGoal,
    expire_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (Status, Compliance, DateTime<Utc>) {
    match expire_date {
        None => (Status::PastDue, Compliance::IncompleteLicense, now),
        Some(expire) => {
            let status = calc_license_status(Some(expire), goal.days_before_due, now);
            (status, compliance_for_status(status), expire)
        }
    }
}

/// Recomputes a license goal instance in place. Returns true if it needs
/// saving.
///
/// An uninitialized license is due now, so its due date alone never counts
/// as a change.
pub fn recompute_license(
    user_goal: &mut UserGoal,
    goal: &LicenseGoal,
    license: &License,
    now: DateTime<Utc>,
) -> bool {
    let (status, compliance, due_date) = evaluate_license(goal, license.expire_date, now);
    let changed = user_goal.status != status
        || user_goal.compliance != compliance
        || (!license.is_uninitialized() && user_goal.due_date != due_date);
    if changed {
        user_goal.status = status;
        user_goal.compliance = compliance;
        user_goal.due_date = due_date;
    }
    changed
}

/// Everything a CME evaluation reads besides the definitions.
pub struct CmeContext<'a> {
    pub profile: &'a Profile,
    /// Tag of the instance; None sums credits of every topic
    pub tag: Option<&'a str>,
    /// License goal id to the license tracked by the user's instance of it
    pub licenses: &'a HashMap<String, Option<License>>,
    pub ledger: &'a dyn CreditLedgerTrait,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CmeSubResult {
    goal_id: String,
    due_date: DateTime<Utc>,
    credits_due: Decimal,
    credits_earned: Decimal,
    compliance: Compliance,
}

fn evaluate_cme_definition(goal: &CmeGoal, ctx: &CmeContext<'_>) -> Result<CmeSubResult> {
    let policy = DueDatePolicy::new(&goal.base.id, goal.base.due_date_type, goal.due_month_day)?;
    let license = if goal.base.due_date_type == DueDateType::RecurOnLicenseExpiry {
        let license_goal_id = goal
            .license_goal_id
            .as_deref()
            .ok_or_else(|| GoalError::invalid(&goal.base.id, "missing license goal"))?;
        match ctx.licenses.get(license_goal_id) {
            Some(license) => license.as_ref(),
            None => {
                return Err(GoalError::MissingLicenseMapping {
                    goal_id: goal.base.id.clone(),
                    license_goal_id: license_goal_id.to_string(),
                }
                .into())
            }
        }
    } else {
        None
    };

    let due = compute_due_date(&policy, ctx.profile, license, ctx.now);
    let num_specialties = if goal.fans_out() {
        ctx.profile.specialty_tags.len()
    } else {
        1
    };
    let owed = compute_credits_owed(goal, num_specialties)?;
    let (start, end) = earned_window(due.date, goal.base.interval_years);
    let earned = sum_earned_credits(ctx.ledger, &ctx.profile.user_id, ctx.tag, start, end)?;
    let credits_left = owed - earned;
    let remaining_days = days_left(due.date, ctx.now);

    let (credits_due, mut compliance) = if credits_left <= Decimal::ZERO {
        (Decimal::ZERO, Compliance::Compliant)
    } else if remaining_days <= PACING_THRESHOLD_DAYS {
        let compliance = if due.date < ctx.now {
            Compliance::NonCompliant
        } else {
            Compliance::MarginalCompliant
        };
        (nround(credits_left), compliance)
    } else {
        (
            paced_credits_due(credits_left, remaining_days),
            Compliance::Compliant,
        )
    };
    if let Some(missing) = due.missing {
        compliance = missing.compliance();
    }

    Ok(CmeSubResult {
        goal_id: goal.base.id.clone(),
        due_date: due.date,
        credits_due,
        credits_earned: earned,
        compliance,
    })
}

/// Evaluates a CME instance over its linked definitions.
///
/// The instance is due on the earliest due date. When the next requirement
/// falls within `MAX_DUEDATE_DIFF_DAYS` of it, the larger of the two credit
/// figures is used. Compliance is the most severe of all definitions.
pub fn evaluate_cme(goals: &[&CmeGoal], ctx: &CmeContext<'_>) -> Result<Evaluation> {
    let mut results = goals
        .iter()
        .map(|goal| evaluate_cme_definition(goal, ctx))
        .collect::<Result<Vec<_>>>()?;
    results.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.credits_due.cmp(&b.credits_due))
    });

    let Some(first) = results.first() else {
        return Err(GoalError::invalid("", "CME goal instance has no linked definitions").into());
    };
    let due_date = first.due_date;
    let mut chosen = first;
    if let Some(second) = results.get(1) {
        let gap = (second.due_date - first.due_date).num_days();
        if gap < MAX_DUEDATE_DIFF_DAYS && second.credits_due > first.credits_due {
            chosen = second;
        }
    }

    let status = if chosen.credits_due.is_zero() {
        Status::Completed
    } else if days_left(due_date, ctx.now) == 0 || chosen.credits_earned.is_zero() {
        Status::PastDue
    } else {
        Status::InProgress
    };
    let compliance = results
        .iter()
        .map(|r| r.compliance)
        .min()
        .unwrap_or(Compliance::Compliant);

    Ok(Evaluation {
        status,
        compliance,
        due_date,
        credits_due: Some(chosen.credits_due),
        credits_earned: Some(chosen.credits_earned),
        primary_goal_id: Some(chosen.goal_id.clone()),
    })
}

/// Status and compliance of an open wellness goal due at `due_date`.
pub fn wellness_levels(due_date: DateTime<Utc>, now: DateTime<Utc>) -> (Status, Compliance) {
    if due_date <= now {
        (Status::PastDue, Compliance::NonCompliant)
    } else if days_left(due_date, now) <= WELLNESS_WARNING_DAYS {
        (Status::InProgress, Compliance::MarginalCompliant)
    } else {
        (Status::InProgress, Compliance::Compliant)
    }
}

/// Recomputes a wellness instance in place. Completed instances are left
/// alone. Returns true if it needs saving.
pub fn recompute_wellness(user_goal: &mut UserGoal, now: DateTime<Utc>) -> bool {
    if user_goal.status == Status::Completed {
        return false;
    }
    let (status, compliance) = wellness_levels(user_goal.due_date, now);
    let changed = user_goal.status != status || user_goal.compliance != compliance;
    user_goal.status = status;
    user_goal.compliance = compliance;
    changed
}

/// Applies one redeemed article to a CME instance.
pub fn apply_redeem_offer(user_goal: &mut UserGoal) {
    let due = user_goal.credits_due.unwrap_or(Decimal::ZERO);
    let remaining = (due - ARTICLE_CREDIT).max(Decimal::ZERO);
    let earned = user_goal.credits_earned.unwrap_or(Decimal::ZERO) + ARTICLE_CREDIT;
    user_goal.credits_due = Some(remaining);
    user_goal.credits_earned = Some(earned);
    if remaining > Decimal::ZERO {
        user_goal.status = Status::InProgress;
    }
}

/// Aggregate compliance of a user: the most severe level among license and
/// CME instances, downgraded to `IncompleteProfile` for incomplete profiles.
pub fn aggregate_compliance(user_goals: &[UserGoal], profile: &Profile) -> Compliance {
    let worst = user_goals
        .iter()
        .filter(|ug| matches!(ug.goal_type, GoalType::License | GoalType::Cme))
        .map(|ug| ug.compliance)
        .min();
    match worst {
        None => {
            warn!(
                "No compliance level found for user {}, using {}",
                profile.user_id,
                Compliance::IncompleteProfile.label()
            );
            Compliance::IncompleteProfile
        }
        Some(Compliance::Compliant) if !profile.is_complete_for_goals() => {
            Compliance::IncompleteProfile
        }
        Some(level) => level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::CreditSource;
    use crate::goals::{BaseGoal, CmeEntity, Scope};
    use crate::utils::MonthDay;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    struct FixedLedger(Decimal);

    impl CreditLedgerTrait for FixedLedger {
        fn sum_credits(
            &self,
            _user_id: &str,
            source: CreditSource,
            _tag: Option<&str>,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Decimal> {
            match source {
                CreditSource::SelfReported => Ok(self.0),
                CreditSource::BrowserRedeemed => Ok(Decimal::ZERO),
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()
    }

    fn profile() -> Profile {
        Profile {
            user_id: "u1".to_string(),
            degrees: BTreeSet::from(["MD".to_string()]),
            specialties: BTreeSet::from(["Radiology".to_string()]),
            sub_specialties: BTreeSet::new(),
            states: BTreeSet::from(["CA".to_string()]),
            hospitals: BTreeSet::from(["General".to_string()]),
            cme_tags: Vec::new(),
            specialty_tags: BTreeSet::from(["Radiology".to_string()]),
            sub_specialties_required: false,
            birth_date: NaiveDate::from_ymd_opt(1980, 5, 4),
            country: Some("USA".to_string()),
            joined_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            goals_enabled: true,
            compliance: None,
        }
    }

    fn cme(id: &str, month_day: MonthDay, credits: Decimal) -> CmeGoal {
        CmeGoal {
            base: BaseGoal {
                id: id.to_string(),
                goal_type: GoalType::Cme,
                is_active: true,
                due_date_type: DueDateType::RecurFixedDate,
                interval_years: Some(dec!(1)),
                degrees: Scope::Any,
                specialties: Scope::Any,
                sub_specialties: Scope::Any,
                notes: String::new(),
            },
            entity: CmeEntity::Board("ABR".to_string()),
            cme_tag: Some("Radiology".to_string()),
            map_null_tag_to_specialty: false,
            license_goal_id: None,
            credits_required: credits,
            due_month_day: Some(month_day),
            eligible_credit_types: BTreeSet::new(),
        }
    }

    fn license_goal() -> LicenseGoal {
        LicenseGoal {
            base: BaseGoal {
                id: "lg1".to_string(),
                goal_type: GoalType::License,
                is_active: true,
                due_date_type: DueDateType::RecurOnLicenseExpiry,
                interval_years: Some(dec!(2)),
                degrees: Scope::Any,
                specialties: Scope::Any,
                sub_specialties: Scope::Any,
                notes: String::new(),
            },
            title: "CA License".to_string(),
            state: "CA".to_string(),
            license_type: "Medical Board".to_string(),
            cme_tag_restriction: None,
            days_before_due: 90,
        }
    }

    fn license(expire: Option<DateTime<Utc>>) -> License {
        License {
            id: "l1".to_string(),
            user_id: "u1".to_string(),
            state: "CA".to_string(),
            license_type: "Medical Board".to_string(),
            expire_date: expire,
            created_at: now().naive_utc(),
            updated_at: now().naive_utc(),
        }
    }

    fn user_goal(goal_type: GoalType, status: Status, compliance: Compliance) -> UserGoal {
        UserGoal {
            id: "ug1".to_string(),
            user_id: "u1".to_string(),
            goal_id: "g1".to_string(),
            goal_type,
            cme_tag: None,
            license_id: None,
            status,
            compliance,
            due_date: now(),
            credits_due: None,
            credits_earned: None,
            cme_goal_ids: BTreeSet::new(),
            created_at: now().naive_utc(),
            updated_at: now().naive_utc(),
        }
    }

    fn ctx<'a>(
        profile: &'a Profile,
        licenses: &'a HashMap<String, Option<License>>,
        ledger: &'a dyn CreditLedgerTrait,
    ) -> CmeContext<'a> {
        CmeContext {
            profile,
            tag: Some("Radiology"),
            licenses,
            ledger,
            now: now(),
        }
    }

    #[test]
    fn test_calc_license_status() {
        let now = now();
        assert_eq!(calc_license_status(None, 90, now), Status::PastDue);
        assert_eq!(
            calc_license_status(Some(now - Duration::days(1)), 90, now),
            Status::PastDue
        );
        assert_eq!(
            calc_license_status(Some(now + Duration::days(400)), 90, now),
            Status::Completed
        );
        assert_eq!(
            calc_license_status(Some(now + Duration::days(60)), 90, now),
            Status::InProgress
        );
    }

    #[test]
    fn test_license_400_days_out_is_completed_and_compliant() {
        let expire = now() + Duration::days(400);
        let mut ug = user_goal(GoalType::License, Status::PastDue, Compliance::NonCompliant);
        assert!(recompute_license(&mut ug, &license_goal(), &license(Some(expire)), now()));
        assert_eq!(ug.status, Status::Completed);
        assert_eq!(ug.compliance, Compliance::Compliant);
        assert_eq!(ug.due_date, expire);
        // second pass is a no-op
        assert!(!recompute_license(&mut ug, &license_goal(), &license(Some(expire)), now()));
    }

    #[test]
    fn test_uninitialized_license_is_incomplete() {
        let mut ug = user_goal(GoalType::License, Status::PastDue, Compliance::NonCompliant);
        let lic = license(None);
        assert!(recompute_license(&mut ug, &license_goal(), &lic, now()));
        assert_eq!(ug.status, Status::PastDue);
        assert_eq!(ug.compliance, Compliance::IncompleteLicense);
        let later = now() + Duration::days(1);
        assert!(!recompute_license(&mut ug, &license_goal(), &lic, later));
    }

    #[test]
    fn test_credits_left_zero_is_completed_and_compliant() {
        let p = profile();
        let licenses = HashMap::new();
        let ledger = FixedLedger(dec!(10));
        let goal = cme("c1", MonthDay::new(1, 20).unwrap(), dec!(10));
        let eval = evaluate_cme(&[&goal], &ctx(&p, &licenses, &ledger)).unwrap();
        assert_eq!(eval.credits_due, Some(dec!(0)));
        assert_eq!(eval.status, Status::Completed);
        assert_eq!(eval.compliance, Compliance::Compliant);
    }

    #[test]
    fn test_near_due_date_owes_rounded_remainder() {
        let p = profile();
        let licenses = HashMap::new();
        let ledger = FixedLedger(dec!(6.8));
        // due in 10 days
        let goal = cme("c1", MonthDay::new(1, 20).unwrap(), dec!(10));
        let eval = evaluate_cme(&[&goal], &ctx(&p, &licenses, &ledger)).unwrap();
        assert_eq!(eval.credits_due, Some(dec!(3.5)));
        assert_eq!(eval.credits_earned, Some(dec!(6.8)));
        assert_eq!(eval.status, Status::InProgress);
        assert_eq!(eval.compliance, Compliance::MarginalCompliant);
    }

    #[test]
    fn test_far_due_date_is_paced_and_compliant() {
        let p = profile();
        let licenses = HashMap::new();
        let ledger = FixedLedger(Decimal::ZERO);
        // due Dec 31, 356 days away -> 11 months, 20 articles -> 2 per month
        let goal = cme("c1", MonthDay::new(12, 31).unwrap(), dec!(10));
        let eval = evaluate_cme(&[&goal], &ctx(&p, &licenses, &ledger)).unwrap();
        assert_eq!(eval.credits_due, Some(dec!(1.0)));
        assert_eq!(eval.compliance, Compliance::Compliant);
        // nothing earned yet
        assert_eq!(eval.status, Status::PastDue);
    }

    #[test]
    fn test_consolidation_takes_larger_credits_within_30_days() {
        let p = profile();
        let licenses = HashMap::new();
        let ledger = FixedLedger(dec!(1));
        // due in 10 and 20 days: credits due 3 and 5
        let first = cme("c1", MonthDay::new(1, 20).unwrap(), dec!(4));
        let second = cme("c2", MonthDay::new(1, 30).unwrap(), dec!(6));
        let eval = evaluate_cme(&[&second, &first], &ctx(&p, &licenses, &ledger)).unwrap();
        assert_eq!(eval.credits_due, Some(dec!(5)));
        assert_eq!(eval.primary_goal_id.as_deref(), Some("c2"));
        assert_eq!(eval.due_date, Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_consolidation_keeps_earliest_when_far_apart() {
        let p = profile();
        let licenses = HashMap::new();
        let ledger = FixedLedger(dec!(1));
        let first = cme("c1", MonthDay::new(1, 20).unwrap(), dec!(4));
        let second = cme("c2", MonthDay::new(6, 30).unwrap(), dec!(40));
        let eval = evaluate_cme(&[&first, &second], &ctx(&p, &licenses, &ledger)).unwrap();
        assert_eq!(eval.credits_due, Some(dec!(3)));
        assert_eq!(eval.primary_goal_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_license_dependent_cme() {
        let p = profile();
        let ledger = FixedLedger(dec!(1));
        let mut goal = cme("c1", MonthDay::new(1, 20).unwrap(), dec!(10));
        goal.base.due_date_type = DueDateType::RecurOnLicenseExpiry;
        goal.due_month_day = None;
        goal.license_goal_id = Some("lg1".to_string());

        let empty = HashMap::new();
        let err = evaluate_cme(&[&goal], &ctx(&p, &empty, &ledger)).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Goal(GoalError::MissingLicenseMapping { .. })
        ));

        let placeholder = HashMap::from([("lg1".to_string(), Some(license(None)))]);
        let eval = evaluate_cme(&[&goal], &ctx(&p, &placeholder, &ledger)).unwrap();
        assert_eq!(eval.compliance, Compliance::IncompleteLicense);
        assert_eq!(eval.due_date, now() + Duration::days(365));
    }

    #[test]
    fn test_recompute_wellness() {
        let mut ug = user_goal(GoalType::Wellness, Status::InProgress, Compliance::Compliant);
        ug.due_date = now() + Duration::days(90);
        assert!(!recompute_wellness(&mut ug, now()));
        ug.due_date = now() + Duration::days(10);
        assert!(recompute_wellness(&mut ug, now()));
        assert_eq!(ug.compliance, Compliance::MarginalCompliant);
        ug.due_date = now() - Duration::days(1);
        assert!(recompute_wellness(&mut ug, now()));
        assert_eq!(ug.status, Status::PastDue);
        assert_eq!(ug.compliance, Compliance::NonCompliant);

        ug.status = Status::Completed;
        assert!(!recompute_wellness(&mut ug, now()));
    }

    #[test]
    fn test_apply_redeem_offer() {
        let mut ug = user_goal(GoalType::Cme, Status::PastDue, Compliance::Compliant);
        ug.credits_due = Some(dec!(1));
        ug.credits_earned = Some(dec!(0));
        apply_redeem_offer(&mut ug);
        assert_eq!(ug.credits_due, Some(dec!(0.5)));
        assert_eq!(ug.credits_earned, Some(dec!(0.5)));
        assert_eq!(ug.status, Status::InProgress);

        ug.status = Status::PastDue;
        ug.credits_due = Some(dec!(0.3));
        apply_redeem_offer(&mut ug);
        assert_eq!(ug.credits_due, Some(dec!(0)));
        assert_eq!(ug.status, Status::PastDue);
    }

    #[test]
    fn test_aggregate_compliance() {
        let mut p = profile();
        let goals = vec![
            user_goal(GoalType::License, Status::Completed, Compliance::Compliant),
            user_goal(GoalType::Cme, Status::InProgress, Compliance::IncompleteLicense),
            user_goal(GoalType::Wellness, Status::PastDue, Compliance::NonCompliant),
        ];
        assert_eq!(aggregate_compliance(&goals, &p), Compliance::IncompleteLicense);
        assert_eq!(aggregate_compliance(&[], &p), Compliance::IncompleteProfile);

        let compliant = vec![user_goal(
            GoalType::License,
            Status::Completed,
            Compliance::Compliant,
        )];
        assert_eq!(aggregate_compliance(&compliant, &p), Compliance::Compliant);
        p.birth_date = None;
        assert_eq!(
            aggregate_compliance(&compliant, &p),
            Compliance::IncompleteProfile
        );
    }
}
