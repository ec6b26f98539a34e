//! Database models for goal instances.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::collections::BTreeSet;

use cmetrack_core::goals::{Compliance, NewUserGoal, Status, UserGoal};

use crate::errors::StorageError;
use crate::utils::decode_optional_decimal;

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::user_goals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct UserGoalDB {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub goal_type: String,
    pub cme_tag: Option<String>,
    pub license_id: Option<String>,
    pub status: i16,
    pub compliance: i16,
    pub due_date: NaiveDateTime,
    pub credits_due: Option<String>,
    pub credits_earned: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::user_goal_cme_goals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserGoalCmeGoalDB {
    pub user_goal_id: String,
    pub goal_id: String,
}

impl UserGoalDB {
    pub fn from_new(id: String, new_goal: &NewUserGoal, now: NaiveDateTime) -> Self {
        UserGoalDB {
            id,
            user_id: new_goal.user_id.clone(),
            goal_id: new_goal.goal_id.clone(),
            goal_type: new_goal.goal_type.as_str().to_string(),
            cme_tag: new_goal.cme_tag.clone(),
            license_id: new_goal.license_id.clone(),
            status: new_goal.status.as_i16(),
            compliance: new_goal.compliance.as_i16(),
            due_date: new_goal.due_date.naive_utc(),
            credits_due: new_goal.credits_due.map(|c| c.to_string()),
            credits_earned: new_goal.credits_earned.map(|c| c.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_domain(user_goal: &UserGoal) -> Self {
        UserGoalDB {
            id: user_goal.id.clone(),
            user_id: user_goal.user_id.clone(),
            goal_id: user_goal.goal_id.clone(),
            goal_type: user_goal.goal_type.as_str().to_string(),
            cme_tag: user_goal.cme_tag.clone(),
            license_id: user_goal.license_id.clone(),
            status: user_goal.status.as_i16(),
            compliance: user_goal.compliance.as_i16(),
            due_date: user_goal.due_date.naive_utc(),
            credits_due: user_goal.credits_due.map(|c| c.to_string()),
            credits_earned: user_goal.credits_earned.map(|c| c.to_string()),
            created_at: user_goal.created_at,
            updated_at: user_goal.updated_at,
        }
    }

    pub fn into_domain(self, cme_goal_ids: BTreeSet<String>) -> Result<UserGoal, StorageError> {
        Ok(UserGoal {
            goal_type: self
                .goal_type
                .parse()
                .map_err(|e| StorageError::corrupt("goal_type", e))?,
            status: Status::try_from(self.status).map_err(|e| StorageError::corrupt("status", e))?,
            compliance: Compliance::try_from(self.compliance)
                .map_err(|e| StorageError::corrupt("compliance", e))?,
            due_date: self.due_date.and_utc(),
            credits_due: decode_optional_decimal("credits_due", self.credits_due.as_deref())?,
            credits_earned: decode_optional_decimal(
                "credits_earned",
                self.credits_earned.as_deref(),
            )?,
            cme_goal_ids,
            id: self.id,
            user_id: self.user_id,
            goal_id: self.goal_id,
            cme_tag: self.cme_tag,
            license_id: self.license_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Link rows for an instance. CME instances always link their primary goal.
pub fn link_rows(user_goal_id: &str, cme_goal_ids: &BTreeSet<String>) -> Vec<UserGoalCmeGoalDB> {
    cme_goal_ids
        .iter()
        .map(|goal_id| UserGoalCmeGoalDB {
            user_goal_id: user_goal_id.to_string(),
            goal_id: goal_id.clone(),
        })
        .collect()
}
