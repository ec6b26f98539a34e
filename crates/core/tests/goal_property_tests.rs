//! Property-based integration tests for the goal engine.
//!
//! These tests verify that universal properties hold across all valid inputs,
//! using the `proptest` crate for random test case generation.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use cmetrack_core::credits::nround;
use cmetrack_core::goals::{
    aggregate_compliance, matches, BaseGoal, Compliance, DueDateType, GoalDefinition, GoalType,
    LicenseGoal, Scope, Status, UserGoal,
};
use cmetrack_core::profiles::Profile;
use cmetrack_core::utils::{next_occurrence, MonthDay};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;

// =============================================================================
// Generators
// =============================================================================

/// Generates a non-negative credit amount with up to two decimals.
fn arb_credits() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Generates a valid month/day pair, Feb 29 included.
fn arb_month_day() -> impl Strategy<Value = MonthDay> {
    (1u32..=12, 1u32..=31).prop_filter_map("invalid day for month", |(m, d)| {
        MonthDay::new(m, d).ok()
    })
}

/// Generates an instant between 2000 and 2040.
fn arb_now() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..(40 * 365 * 24 * 3600)).prop_map(|secs| {
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    })
}

/// Generates a small set drawn from a fixed vocabulary.
fn arb_set(vocabulary: &'static [&'static str]) -> impl Strategy<Value = BTreeSet<String>> {
    proptest::sample::subsequence(vocabulary, 0..=vocabulary.len())
        .prop_map(|values| values.into_iter().map(str::to_string).collect())
}

const DEGREES: &[&str] = &["MD", "DO", "NP", "PA"];
const SPECIALTIES: &[&str] = &["Radiology", "Cardiology", "Pediatrics"];
const SUB_SPECIALTIES: &[&str] = &["Neuroradiology", "Interventional"];

fn arb_profile() -> impl Strategy<Value = Profile> {
    (arb_set(DEGREES), arb_set(SPECIALTIES), arb_set(SUB_SPECIALTIES)).prop_map(
        |(degrees, specialties, sub_specialties)| Profile {
            user_id: "u1".to_string(),
            degrees,
            specialties: specialties.clone(),
            sub_specialties,
            states: BTreeSet::from(["CA".to_string()]),
            hospitals: BTreeSet::new(),
            cme_tags: Vec::new(),
            specialty_tags: specialties,
            sub_specialties_required: false,
            birth_date: NaiveDate::from_ymd_opt(1970, 1, 1),
            country: Some("USA".to_string()),
            joined_at: Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
            goals_enabled: true,
            compliance: None,
        },
    )
}

fn arb_scope(vocabulary: &'static [&'static str]) -> impl Strategy<Value = Scope<String>> {
    prop_oneof![
        Just(Scope::Any),
        arb_set(vocabulary).prop_map(|values| Scope::restricted(values)),
    ]
}

fn license_goal(degrees: Scope<String>, specialties: Scope<String>, subs: Scope<String>) -> GoalDefinition {
    GoalDefinition::License(LicenseGoal {
        base: BaseGoal {
            id: "lg1".to_string(),
            goal_type: GoalType::License,
            is_active: true,
            due_date_type: DueDateType::RecurOnLicenseExpiry,
            interval_years: Some(dec!(2)),
            degrees,
            specialties,
            sub_specialties: subs,
            notes: String::new(),
        },
        title: "CA License".to_string(),
        state: "CA".to_string(),
        license_type: "Medical Board".to_string(),
        cme_tag_restriction: None,
        days_before_due: 90,
    })
}

fn arb_compliance() -> impl Strategy<Value = Compliance> {
    proptest::sample::select(Compliance::ALL.to_vec())
}

fn arb_goal_type() -> impl Strategy<Value = GoalType> {
    prop_oneof![
        Just(GoalType::License),
        Just(GoalType::Cme),
        Just(GoalType::Wellness),
    ]
}

fn arb_user_goals() -> impl Strategy<Value = Vec<UserGoal>> {
    proptest::collection::vec((arb_goal_type(), arb_compliance()), 0..8).prop_map(|items| {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        items
            .into_iter()
            .enumerate()
            .map(|(i, (goal_type, compliance))| UserGoal {
                id: format!("ug{}", i),
                user_id: "u1".to_string(),
                goal_id: format!("g{}", i),
                goal_type,
                cme_tag: None,
                license_id: None,
                status: Status::InProgress,
                compliance,
                due_date: ts,
                credits_due: None,
                credits_earned: None,
                cme_goal_ids: BTreeSet::new(),
                created_at: ts.naive_utc(),
                updated_at: ts.naive_utc(),
            })
            .collect()
    })
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// nround lands on the nearest multiple of 0.5 at or above its input.
    #[test]
    fn prop_nround_is_smallest_half_step_above(x in arb_credits()) {
        let rounded = nround(x);
        prop_assert!(rounded >= x);
        prop_assert!(rounded - x < dec!(0.5));
        prop_assert!((rounded * dec!(2)).fract().is_zero());
    }

    /// A fixed annual date is never in the past and at most a year ahead.
    #[test]
    fn prop_next_occurrence_within_a_year(month_day in arb_month_day(), now in arb_now()) {
        let due = next_occurrence(month_day, now);
        prop_assert!(due >= now);
        prop_assert!(due - now <= Duration::days(366));
        prop_assert_eq!(due.month(), month_day.month());
        prop_assert!(due.year() == now.year() || due.year() == now.year() + 1);
    }

    /// Widening any scope to Any never turns a match into a non-match.
    #[test]
    fn prop_wildcard_scope_is_monotonic(
        profile in arb_profile(),
        degrees in arb_scope(DEGREES),
        specialties in arb_scope(SPECIALTIES),
        subs in arb_scope(SUB_SPECIALTIES),
    ) {
        let restricted = license_goal(degrees.clone(), specialties.clone(), subs.clone());
        if matches(&restricted, &profile) {
            prop_assert!(matches(&license_goal(Scope::Any, specialties.clone(), subs.clone()), &profile));
            prop_assert!(matches(&license_goal(degrees.clone(), Scope::Any, subs), &profile));
            prop_assert!(matches(&license_goal(degrees, specialties, Scope::Any), &profile));
        }
        prop_assert!(matches(&license_goal(Scope::Any, Scope::Any, Scope::Any), &profile));
    }

    /// The aggregate is never better than any license or CME instance.
    #[test]
    fn prop_aggregate_is_most_severe(profile in arb_profile(), user_goals in arb_user_goals()) {
        let aggregate = aggregate_compliance(&user_goals, &profile);
        for user_goal in user_goals
            .iter()
            .filter(|ug| ug.goal_type != GoalType::Wellness)
        {
            prop_assert!(aggregate <= user_goal.compliance);
        }
    }
}
