use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;

use super::due_dates::{compute_due_date, DueDatePolicy};
use super::goals_errors::GoalError;
use super::goals_matcher::{covers_tag, group_goals_by_tag, matches, matching_definitions};
use super::goals_model::{
    CmeGoal, Compliance, DueDateType, GoalDefinition, GoalType, LicenseRef, NewUserGoal,
    RematchOutcome, Status, UserGoal,
};
use super::goals_recompute::{
    aggregate_compliance, apply_redeem_offer, evaluate_cme, evaluate_license, recompute_license,
    recompute_wellness, wellness_levels, CmeContext, Evaluation,
};
use super::goals_traits::{GoalCatalogRepositoryTrait, GoalServiceTrait, UserGoalRepositoryTrait};
use super::user_locks::UserLocks;
use crate::credits::CreditLedgerTrait;
use crate::errors::{Error, Result, ValidationError};
use crate::licenses::{select_license, License, LicenseRepositoryTrait, NewLicense};
use crate::profiles::{Profile, ProfileRepositoryTrait};

/// Result of recomputing all goal instances of one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecomputeSummary {
    pub user_id: String,
    /// Instances whose stored state changed
    pub updated: usize,
    /// Compliance levels of the license and CME instances
    pub compliance_counts: BTreeMap<Compliance, usize>,
    pub aggregate: Compliance,
    /// True if the aggregate stored on the profile changed
    pub aggregate_changed: bool,
}

/// Service assigning goals to users and keeping their instances current.
pub struct GoalService {
    catalog: Arc<dyn GoalCatalogRepositoryTrait>,
    user_goals: Arc<dyn UserGoalRepositoryTrait>,
    profiles: Arc<dyn ProfileRepositoryTrait>,
    licenses: Arc<dyn LicenseRepositoryTrait>,
    ledger: Arc<dyn CreditLedgerTrait>,
    locks: UserLocks,
}

impl GoalService {
    pub fn new(
        catalog: Arc<dyn GoalCatalogRepositoryTrait>,
        user_goals: Arc<dyn UserGoalRepositoryTrait>,
        profiles: Arc<dyn ProfileRepositoryTrait>,
        licenses: Arc<dyn LicenseRepositoryTrait>,
        ledger: Arc<dyn CreditLedgerTrait>,
    ) -> Self {
        Self {
            catalog,
            user_goals,
            profiles,
            licenses,
            ledger,
            locks: UserLocks::new(),
        }
    }

    fn load_profile(&self, user_id: &str) -> Result<Profile> {
        self.profiles
            .get_profile(user_id)?
            .ok_or_else(|| GoalError::ProfileNotFound(user_id.to_string()).into())
    }

    async fn assign_locked(
        &self,
        profile: &Profile,
        definitions: &[GoalDefinition],
        now: DateTime<Utc>,
    ) -> Result<RematchOutcome> {
        let matched = matching_definitions(definitions, profile);
        debug!(
            "User {} matches {} of {} goal definitions",
            profile.user_id,
            matched.len(),
            definitions.len()
        );
        // CME goals following a license date need the license instances first
        let mut outcome = self.assign_license_goals(profile, &matched, now).await?;
        outcome.merge(self.assign_wellness_goals(profile, &matched, now).await?);
        outcome.merge(self.assign_cme_goals(profile, &matched, now).await?);
        Ok(outcome)
    }

    /// Finds or creates the license and license goal instance for every
    /// matched license definition.
    async fn assign_license_goals(
        &self,
        profile: &Profile,
        matched: &[&GoalDefinition],
        now: DateTime<Utc>,
    ) -> Result<RematchOutcome> {
        let mut outcome = RematchOutcome::default();
        let user_id = profile.user_id.as_str();
        let mut licenses = self.licenses.list_licenses_for_user(user_id)?;
        let user_goals = self.user_goals.list_user_goals(user_id)?;

        for goal in matched.iter().filter_map(|d| d.as_license()) {
            let selected = select_license(&licenses, &goal.state, &goal.license_type).cloned();

            if let Some(license) = &selected {
                let existing = user_goals.iter().find(|ug| {
                    ug.goal_id == goal.base.id && ug.license_id.as_deref() == Some(&license.id)
                });
                if let Some(existing) = existing {
                    let mut user_goal = existing.clone();
                    if recompute_license(&mut user_goal, goal, license, now) {
                        self.user_goals.update_user_goal(user_goal).await?;
                        outcome.updated += 1;
                    } else {
                        debug!(
                            "License goal {} for user {} already up to date",
                            goal.base.id, user_id
                        );
                    }
                    continue;
                }
            }

            let (status, compliance, due_date) =
                evaluate_license(goal, selected.as_ref().and_then(|l| l.expire_date), now);
            let license_ref = match &selected {
                Some(license) => LicenseRef::Existing(license.id.clone()),
                None => {
                    info!(
                        "Creating uninitialized {} license ({}) for user {}",
                        goal.license_type, goal.state, user_id
                    );
                    LicenseRef::New(NewLicense::uninitialized(
                        user_id,
                        &goal.state,
                        &goal.license_type,
                    ))
                }
            };
            let created_license = matches!(license_ref, LicenseRef::New(_));
            let new_goal = NewUserGoal {
                user_id: user_id.to_string(),
                goal_id: goal.base.id.clone(),
                goal_type: GoalType::License,
                cme_tag: None,
                license_id: None,
                status,
                compliance,
                due_date,
                credits_due: None,
                credits_earned: None,
                cme_goal_ids: BTreeSet::new(),
            };
            let user_goal = self
                .user_goals
                .insert_license_user_goal(license_ref, new_goal)
                .await?;
            info!(
                "Created license goal instance {} ({}) for user {}",
                user_goal.id, goal.title, user_id
            );
            outcome.created.push(user_goal);

            if created_license {
                licenses = self.licenses.list_licenses_for_user(user_id)?;
            }
        }
        Ok(outcome)
    }

    /// Creates wellness instances: one-off goals at most once, recurring goals
    /// once per due date.
    async fn assign_wellness_goals(
        &self,
        profile: &Profile,
        matched: &[&GoalDefinition],
        now: DateTime<Utc>,
    ) -> Result<RematchOutcome> {
        let mut outcome = RematchOutcome::default();
        let user_id = profile.user_id.as_str();
        let user_goals = self.user_goals.list_user_goals(user_id)?;

        for goal in matched.iter().filter_map(|d| d.as_wellness()) {
            let (due_date, status, compliance) = match goal.base.due_date_type {
                DueDateType::OneOff => {
                    if user_goals.iter().any(|ug| ug.goal_id == goal.base.id) {
                        debug!("One-off wellness goal {} exists for user {}", goal.title, user_id);
                        continue;
                    }
                    (now, Status::PastDue, Compliance::NonCompliant)
                }
                due_date_type => {
                    let policy =
                        match DueDatePolicy::new(&goal.base.id, due_date_type, goal.due_month_day) {
                            Ok(policy) => policy,
                            Err(e) => {
                                error!("Skipping wellness goal for user {}: {}", user_id, e);
                                continue;
                            }
                        };
                    let due = compute_due_date(&policy, profile, None, now);
                    if due.missing.is_some() {
                        warn!(
                            "Wellness goal {} needs a birth date from user {}",
                            goal.base.id, user_id
                        );
                        continue;
                    }
                    if user_goals
                        .iter()
                        .any(|ug| ug.goal_id == goal.base.id && ug.due_date == due.date)
                    {
                        debug!(
                            "Wellness goal {} due {} exists for user {}",
                            goal.title,
                            due.date.format("%Y-%m-%d"),
                            user_id
                        );
                        continue;
                    }
                    let (status, compliance) = wellness_levels(due.date, now);
                    (due.date, status, compliance)
                }
            };

            let user_goal = self
                .user_goals
                .insert_user_goal(NewUserGoal {
                    user_id: user_id.to_string(),
                    goal_id: goal.base.id.clone(),
                    goal_type: GoalType::Wellness,
                    cme_tag: None,
                    license_id: None,
                    status,
                    compliance,
                    due_date,
                    credits_due: None,
                    credits_earned: None,
                    cme_goal_ids: BTreeSet::new(),
                })
                .await?;
            info!(
                "Created wellness goal instance {} ({}) for user {}",
                user_goal.id, goal.title, user_id
            );
            outcome.created.push(user_goal);
        }
        Ok(outcome)
    }

    /// Creates or updates one CME instance per tag group.
    async fn assign_cme_goals(
        &self,
        profile: &Profile,
        matched: &[&GoalDefinition],
        now: DateTime<Utc>,
    ) -> Result<RematchOutcome> {
        let mut outcome = RematchOutcome::default();
        let cme_goals: Vec<&CmeGoal> = matched.iter().filter_map(|d| d.as_cme()).collect();
        let grouped = group_goals_by_tag(profile, &cme_goals);
        if grouped.is_empty() {
            return Ok(outcome);
        }

        let user_id = profile.user_id.as_str();
        let user_goals = self.user_goals.list_user_goals(user_id)?;
        let licenses = self.licenses.list_licenses_for_user(user_id)?;
        let license_map = license_map(&user_goals, &licenses);

        for (tag, goals) in grouped {
            let Some(first) = goals.first() else {
                continue;
            };
            let linked: BTreeSet<String> = goals.iter().map(|g| g.base.id.clone()).collect();
            let ctx = CmeContext {
                profile,
                tag: tag.as_deref(),
                licenses: &license_map,
                ledger: self.ledger.as_ref(),
                now,
            };
            let evaluation = skip_on_goal_error(evaluate_cme(&goals, &ctx), user_id, &tag)?;
            let primary = evaluation
                .as_ref()
                .and_then(|e| e.primary_goal_id.clone())
                .unwrap_or_else(|| first.base.id.clone());

            let existing = user_goals
                .iter()
                .find(|ug| ug.goal_type == GoalType::Cme && ug.cme_tag == tag);
            match existing {
                Some(existing) => {
                    let mut user_goal = existing.clone();
                    if !user_goal.check_update(&primary, &linked) {
                        debug!(
                            "CME goal {} for user {} tag {} unchanged",
                            user_goal.id,
                            user_id,
                            tag_label(&tag)
                        );
                        continue;
                    }
                    if let Some(evaluation) = &evaluation {
                        evaluation.apply_to(&mut user_goal);
                    }
                    let user_goal = self.user_goals.update_user_goal(user_goal).await?;
                    info!(
                        "Updated CME goal {} for user {} tag {}",
                        user_goal.id,
                        user_id,
                        tag_label(&tag)
                    );
                    outcome.updated += 1;
                }
                None => {
                    let new_goal = NewUserGoal {
                        user_id: user_id.to_string(),
                        goal_id: primary,
                        goal_type: GoalType::Cme,
                        cme_tag: tag.clone(),
                        license_id: None,
                        status: Status::PastDue,
                        compliance: Compliance::NonCompliant,
                        due_date: evaluation.as_ref().map_or(now, |e| e.due_date),
                        credits_due: Some(Decimal::ZERO),
                        credits_earned: Some(Decimal::ZERO),
                        cme_goal_ids: linked,
                    };
                    let mut user_goal = self.user_goals.insert_user_goal(new_goal).await?;
                    if let Some(evaluation) = &evaluation {
                        if evaluation.apply_to(&mut user_goal) {
                            user_goal = self.user_goals.update_user_goal(user_goal).await?;
                        }
                    }
                    info!(
                        "Created CME goal {} for user {} tag {}",
                        user_goal.id,
                        user_id,
                        tag_label(&tag)
                    );
                    outcome.created.push(user_goal);
                }
            }
        }
        Ok(outcome)
    }

    async fn rematch_locked(&self, user_id: &str, now: DateTime<Utc>) -> Result<RematchOutcome> {
        let profile = self.load_profile(user_id)?;
        let definitions = self.catalog.list_definitions()?;
        let by_id = definitions_by_id(&definitions);
        let still_matches = |goal_id: &str| {
            by_id
                .get(goal_id)
                .is_some_and(|definition| matches(definition, &profile))
        };

        // A CME instance survives while one linked definition still matches
        // and still groups under its tag.
        let still_covers = |goal_id: &str, tag: Option<&str>| {
            by_id.get(goal_id).is_some_and(|definition| {
                matches(definition, &profile)
                    && definition
                        .as_cme()
                        .is_some_and(|goal| covers_tag(goal, &profile, tag))
            })
        };

        // License rows stay; only the instances go.
        let stale: Vec<String> = self
            .user_goals
            .list_user_goals(user_id)?
            .into_iter()
            .filter(|ug| match ug.goal_type {
                GoalType::License | GoalType::Wellness => !still_matches(&ug.goal_id),
                GoalType::Cme => !ug
                    .cme_goal_ids
                    .iter()
                    .any(|id| still_covers(id, ug.cme_tag.as_deref())),
            })
            .map(|ug| ug.id)
            .collect();
        let removed = if stale.is_empty() {
            0
        } else {
            let removed = self.user_goals.delete_user_goals(stale).await?;
            info!("Removed {} unmatched goal instances of user {}", removed, user_id);
            removed
        };

        let mut outcome = self.assign_locked(&profile, &definitions, now).await?;
        outcome.removed = removed;
        Ok(outcome)
    }

    async fn recompute_locked(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecomputeSummary> {
        let profile = self.load_profile(user_id)?;
        let definitions = self.catalog.list_definitions()?;
        let by_id = definitions_by_id(&definitions);
        let licenses = self.licenses.list_licenses_for_user(user_id)?;
        let mut user_goals = self.user_goals.list_user_goals(user_id)?;
        let license_map = license_map(&user_goals, &licenses);

        user_goals.sort_by_key(|ug| match ug.goal_type {
            GoalType::License => 0,
            GoalType::Cme => 1,
            GoalType::Wellness => 2,
        });

        let mut updated = 0;
        let mut current = Vec::with_capacity(user_goals.len());
        for mut user_goal in user_goals {
            let changed = match user_goal.goal_type {
                GoalType::License => recompute_license_instance(&mut user_goal, &by_id, &licenses, now),
                GoalType::Cme => {
                    let goals: Vec<&CmeGoal> = user_goal
                        .cme_goal_ids
                        .iter()
                        .filter_map(|id| by_id.get(id.as_str()).and_then(|d| d.as_cme()))
                        .collect();
                    if goals.is_empty() {
                        warn!(
                            "CME goal {} of user {} has no linked definitions",
                            user_goal.id, user_id
                        );
                        false
                    } else {
                        let ctx = CmeContext {
                            profile: &profile,
                            tag: user_goal.cme_tag.as_deref(),
                            licenses: &license_map,
                            ledger: self.ledger.as_ref(),
                            now,
                        };
                        let evaluation =
                            skip_on_goal_error(evaluate_cme(&goals, &ctx), user_id, &user_goal.cme_tag)?;
                        match evaluation {
                            Some(evaluation) => evaluation.apply_to(&mut user_goal),
                            None => false,
                        }
                    }
                }
                GoalType::Wellness => recompute_wellness(&mut user_goal, now),
            };
            if changed {
                user_goal = self.user_goals.update_user_goal(user_goal).await?;
                updated += 1;
            }
            current.push(user_goal);
        }

        let mut compliance_counts = BTreeMap::new();
        for user_goal in current
            .iter()
            .filter(|ug| matches!(ug.goal_type, GoalType::License | GoalType::Cme))
        {
            *compliance_counts.entry(user_goal.compliance).or_insert(0) += 1;
        }
        let aggregate = aggregate_compliance(&current, &profile);
        let aggregate_changed = if profile.compliance == Some(aggregate) {
            false
        } else {
            self.profiles.update_compliance(user_id, aggregate).await?
        };
        debug!(
            "Recomputed {} goals of user {} ({} updated), compliance {}",
            current.len(),
            user_id,
            updated,
            aggregate.label()
        );

        Ok(UserRecomputeSummary {
            user_id: user_id.to_string(),
            updated,
            compliance_counts,
            aggregate,
            aggregate_changed,
        })
    }
}

#[async_trait]
impl GoalServiceTrait for GoalService {
    fn list_user_goals(&self, user_id: &str) -> Result<Vec<UserGoal>> {
        self.user_goals.list_user_goals(user_id)
    }

    async fn assign_goals(&self, user_id: &str, now: DateTime<Utc>) -> Result<RematchOutcome> {
        let _guard = self.locks.lock(user_id).await;
        let profile = self.load_profile(user_id)?;
        let definitions = self.catalog.list_definitions()?;
        self.assign_locked(&profile, &definitions, now).await
    }

    async fn rematch_goals(&self, user_id: &str, now: DateTime<Utc>) -> Result<RematchOutcome> {
        let _guard = self.locks.lock(user_id).await;
        self.rematch_locked(user_id, now).await
    }

    async fn recompute_user_goals(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecomputeSummary> {
        let _guard = self.locks.lock(user_id).await;
        self.recompute_locked(user_id, now).await
    }

    async fn handle_redeem_offer(&self, user_goal_id: &str) -> Result<UserGoal> {
        let owner = self
            .user_goals
            .get_user_goal(user_goal_id)?
            .ok_or_else(|| GoalError::UserGoalNotFound(user_goal_id.to_string()))?
            .user_id;
        let _guard = self.locks.lock(&owner).await;

        let mut user_goal = self
            .user_goals
            .get_user_goal(user_goal_id)?
            .ok_or_else(|| GoalError::UserGoalNotFound(user_goal_id.to_string()))?;
        if user_goal.goal_type != GoalType::Cme {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "goal {} is not a CME goal",
                user_goal_id
            ))));
        }
        apply_redeem_offer(&mut user_goal);
        self.user_goals.update_user_goal(user_goal).await
    }

    async fn handle_redeem_offer_for_user(
        &self,
        user_id: &str,
        tags: &BTreeSet<String>,
    ) -> Result<usize> {
        let _guard = self.locks.lock(user_id).await;
        let open_goals: Vec<UserGoal> = self
            .user_goals
            .list_user_goals(user_id)?
            .into_iter()
            .filter(|ug| {
                ug.goal_type == GoalType::Cme
                    && ug.is_open()
                    && ug.cme_tag.as_ref().is_some_and(|tag| tags.contains(tag))
            })
            .collect();

        let mut updated = 0;
        for mut user_goal in open_goals {
            apply_redeem_offer(&mut user_goal);
            self.user_goals.update_user_goal(user_goal).await?;
            updated += 1;
        }
        Ok(updated)
    }

    async fn on_profile_saved(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RematchOutcome>> {
        let _guard = self.locks.lock(user_id).await;
        let profile = self.load_profile(user_id)?;
        if !profile.goals_enabled {
            debug!("Goals not enabled for user {}, skipping rematch", user_id);
            return Ok(None);
        }
        let outcome = self.rematch_locked(user_id, now).await?;
        info!(
            "Profile saved for user {}: {} goals created, {} updated, {} removed",
            user_id,
            outcome.created.len(),
            outcome.updated,
            outcome.removed
        );
        Ok(Some(outcome))
    }
}

fn definitions_by_id(definitions: &[GoalDefinition]) -> HashMap<&str, &GoalDefinition> {
    definitions.iter().map(|d| (d.id(), d)).collect()
}

/// Maps each license goal to the license its user instance tracks. When a
/// license goal has several instances the latest-expiring license wins.
fn license_map(user_goals: &[UserGoal], licenses: &[License]) -> HashMap<String, Option<License>> {
    let mut map: HashMap<String, Option<License>> = HashMap::new();
    for user_goal in user_goals
        .iter()
        .filter(|ug| ug.goal_type == GoalType::License)
    {
        let license = user_goal
            .license_id
            .as_deref()
            .and_then(|id| licenses.iter().find(|l| l.id == id))
            .cloned();
        let expire = license.as_ref().and_then(|l| l.expire_date);
        let keep_current = map
            .get(&user_goal.goal_id)
            .is_some_and(|current| current.as_ref().and_then(|l| l.expire_date) >= expire);
        if !keep_current {
            map.insert(user_goal.goal_id.clone(), license);
        }
    }
    map
}

fn recompute_license_instance(
    user_goal: &mut UserGoal,
    by_id: &HashMap<&str, &GoalDefinition>,
    licenses: &[License],
    now: DateTime<Utc>,
) -> bool {
    let Some(goal) = by_id
        .get(user_goal.goal_id.as_str())
        .and_then(|d| d.as_license())
    else {
        error!(
            "License goal instance {} references unknown definition {}",
            user_goal.id, user_goal.goal_id
        );
        return false;
    };
    let license = user_goal
        .license_id
        .as_deref()
        .and_then(|id| licenses.iter().find(|l| l.id == id));
    match license {
        Some(license) => recompute_license(user_goal, goal, license, now),
        None => {
            error!(
                "License goal instance {} of user {} has no license",
                user_goal.id, user_goal.user_id
            );
            false
        }
    }
}

/// Goal data errors abort the evaluation of one instance and leave it as is.
/// Storage errors are propagated.
fn skip_on_goal_error(
    result: Result<Evaluation>,
    user_id: &str,
    tag: &Option<String>,
) -> Result<Option<Evaluation>> {
    match result {
        Ok(evaluation) => Ok(Some(evaluation)),
        Err(Error::Goal(e)) => {
            error!(
                "Skipping CME recompute for user {} tag {}: {}",
                user_id,
                tag_label(tag),
                e
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn tag_label(tag: &Option<String>) -> &str {
    tag.as_deref().unwrap_or("(any topic)")
}
