use crate::errors::Result;
use crate::licenses::licenses_model::License;

/// Trait for license repository operations.
///
/// Licenses are created together with the goal that needs them, see
/// `UserGoalRepositoryTrait::insert_license_user_goal`.
pub trait LicenseRepositoryTrait: Send + Sync {
    fn list_licenses_for_user(&self, user_id: &str) -> Result<Vec<License>>;
    fn get_license(&self, license_id: &str) -> Result<Option<License>>;
}
