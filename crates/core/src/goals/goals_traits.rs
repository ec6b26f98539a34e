use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::goals::goals_model::{
    GoalDefinition, LicenseGoal, LicenseRef, NewUserGoal, RematchOutcome, UserGoal,
};
use crate::goals::goals_service::UserRecomputeSummary;

/// Trait for goal definition repository operations
#[async_trait]
pub trait GoalCatalogRepositoryTrait: Send + Sync {
    /// All definitions, active or not
    fn list_definitions(&self) -> Result<Vec<GoalDefinition>>;
    fn get_definition(&self, goal_id: &str) -> Result<Option<GoalDefinition>>;
    fn find_license_goal(
        &self,
        state: &str,
        license_type: &str,
        title: &str,
    ) -> Result<Option<LicenseGoal>>;
    async fn insert_definition(&self, definition: GoalDefinition) -> Result<GoalDefinition>;
    async fn update_definition(&self, definition: GoalDefinition) -> Result<GoalDefinition>;
    async fn set_definition_active(&self, goal_id: &str, is_active: bool) -> Result<()>;
}

/// Trait for goal instance repository operations
#[async_trait]
pub trait UserGoalRepositoryTrait: Send + Sync {
    fn list_user_goals(&self, user_id: &str) -> Result<Vec<UserGoal>>;
    fn get_user_goal(&self, user_goal_id: &str) -> Result<Option<UserGoal>>;
    fn list_user_ids_with_goals(&self) -> Result<Vec<String>>;

    /// Inserts an instance together with its linked CME definitions.
    async fn insert_user_goal(&self, new_goal: NewUserGoal) -> Result<UserGoal>;

    /// Inserts a license goal instance, creating the license first when
    /// `license` is new. Both rows are written in one transaction.
    async fn insert_license_user_goal(
        &self,
        license: LicenseRef,
        new_goal: NewUserGoal,
    ) -> Result<UserGoal>;

    /// Saves an instance, replacing its linked CME definitions.
    async fn update_user_goal(&self, user_goal: UserGoal) -> Result<UserGoal>;
    async fn delete_user_goals(&self, user_goal_ids: Vec<String>) -> Result<usize>;
}

/// Trait for goal assignment and recompute operations.
///
/// Every mutating operation is serialized per user.
#[async_trait]
pub trait GoalServiceTrait: Send + Sync {
    fn list_user_goals(&self, user_id: &str) -> Result<Vec<UserGoal>>;

    /// Assigns license, wellness and CME goals for the user's current profile.
    async fn assign_goals(&self, user_id: &str, now: DateTime<Utc>) -> Result<RematchOutcome>;

    /// Removes instances the profile no longer matches, then assigns goals.
    async fn rematch_goals(&self, user_id: &str, now: DateTime<Utc>) -> Result<RematchOutcome>;

    /// Recomputes every instance of the user and stores the aggregate
    /// compliance on the profile.
    async fn recompute_user_goals(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecomputeSummary>;

    /// Applies one redeemed article to a CME instance.
    async fn handle_redeem_offer(&self, user_goal_id: &str) -> Result<UserGoal>;

    /// Applies one redeemed article to each open CME instance of the user
    /// tracking one of `tags`. Returns the number of instances updated.
    async fn handle_redeem_offer_for_user(
        &self,
        user_id: &str,
        tags: &BTreeSet<String>,
    ) -> Result<usize>;

    /// Rematches after a profile save when the user has goals enabled.
    async fn on_profile_saved(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RematchOutcome>>;
}

/// Trait for goal catalog administration
#[async_trait]
pub trait GoalCatalogServiceTrait: Send + Sync {
    fn list_definitions(&self) -> Result<Vec<GoalDefinition>>;
    fn get_definition(&self, goal_id: &str) -> Result<GoalDefinition>;
    async fn create_definition(&self, definition: GoalDefinition) -> Result<GoalDefinition>;
    async fn update_definition(&self, definition: GoalDefinition) -> Result<GoalDefinition>;
    async fn deactivate_definition(&self, goal_id: &str) -> Result<()>;
}
