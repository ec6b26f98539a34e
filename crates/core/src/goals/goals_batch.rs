//! Batch runs over every user, used by the scheduled worker.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{error, info};
use serde::Serialize;

use super::goals_model::Compliance;
use super::goals_traits::{GoalServiceTrait, UserGoalRepositoryTrait};
use crate::errors::Result;
use crate::profiles::ProfileRepositoryTrait;

/// Totals of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub users: usize,
    pub failed_users: Vec<String>,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Users per aggregate compliance level, recompute runs only
    pub compliance_counts: BTreeMap<Compliance, usize>,
    pub aggregates_changed: usize,
}

/// Runs rematch and recompute for all users with bounded concurrency.
///
/// Each user is still serialized by the goal service's per-user lock, so
/// overlapping runs are safe.
pub struct GoalBatchRunner {
    goals: Arc<dyn GoalServiceTrait>,
    user_goals: Arc<dyn UserGoalRepositoryTrait>,
    profiles: Arc<dyn ProfileRepositoryTrait>,
    concurrency: usize,
}

impl GoalBatchRunner {
    pub fn new(
        goals: Arc<dyn GoalServiceTrait>,
        user_goals: Arc<dyn UserGoalRepositoryTrait>,
        profiles: Arc<dyn ProfileRepositoryTrait>,
        concurrency: usize,
    ) -> Self {
        Self {
            goals,
            user_goals,
            profiles,
            concurrency: concurrency.max(1),
        }
    }

    /// Rematches every user whose organization has goals enabled.
    pub async fn rematch_all(&self, now: DateTime<Utc>) -> Result<BatchSummary> {
        let user_ids = self.profiles.list_goal_enabled_user_ids()?;
        info!("Rematching goals for {} users", user_ids.len());

        let results: Vec<_> = stream::iter(user_ids)
            .map(|user_id| async move {
                let result = self.goals.rematch_goals(&user_id, now).await;
                (user_id, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for (user_id, result) in results {
            summary.users += 1;
            match result {
                Ok(outcome) => {
                    summary.created += outcome.created.len();
                    summary.updated += outcome.updated;
                    summary.removed += outcome.removed;
                }
                Err(e) => {
                    error!("Rematch failed for user {}: {}", user_id, e);
                    summary.failed_users.push(user_id);
                }
            }
        }
        info!(
            "Rematch finished: {} users, {} created, {} updated, {} removed, {} failed",
            summary.users,
            summary.created,
            summary.updated,
            summary.removed,
            summary.failed_users.len()
        );
        Ok(summary)
    }

    /// Recomputes every user holding at least one goal instance.
    pub async fn recompute_all(&self, now: DateTime<Utc>) -> Result<BatchSummary> {
        let user_ids = self.user_goals.list_user_ids_with_goals()?;
        info!("Recomputing goals for {} users", user_ids.len());

        let results: Vec<_> = stream::iter(user_ids)
            .map(|user_id| async move {
                let result = self.goals.recompute_user_goals(&user_id, now).await;
                (user_id, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for (user_id, result) in results {
            summary.users += 1;
            match result {
                Ok(user_summary) => {
                    summary.updated += user_summary.updated;
                    *summary
                        .compliance_counts
                        .entry(user_summary.aggregate)
                        .or_insert(0) += 1;
                    if user_summary.aggregate_changed {
                        summary.aggregates_changed += 1;
                    }
                }
                Err(e) => {
                    error!("Recompute failed for user {}: {}", user_id, e);
                    summary.failed_users.push(user_id);
                }
            }
        }
        for (level, count) in &summary.compliance_counts {
            info!("{}: {} users", level.label(), count);
        }
        info!(
            "Recompute finished: {} users, {} goals updated, {} aggregates changed, {} failed",
            summary.users,
            summary.updated,
            summary.aggregates_changed,
            summary.failed_users.len()
        );
        Ok(summary)
    }
}
