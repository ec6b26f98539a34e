use async_trait::async_trait;

use crate::errors::Result;
use crate::goals::Compliance;
use crate::profiles::profiles_model::Profile;

/// Trait for profile repository operations
#[async_trait]
pub trait ProfileRepositoryTrait: Send + Sync {
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Users whose organization has activated goals
    fn list_goal_enabled_user_ids(&self) -> Result<Vec<String>>;

    /// Stores the aggregate compliance for a user. Returns false if the stored
    /// value was already equal.
    async fn update_compliance(&self, user_id: &str, compliance: Compliance) -> Result<bool>;
}
