//! Goal engine error types.

use thiserror::Error;

/// Errors raised while matching, assigning or recomputing goals.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GoalError {
    /// An untagged CME goal was split across a profile with no specialties.
    #[error("Goal '{goal_id}' needs at least one profile specialty to split credits")]
    NoProfileSpecialties { goal_id: String },

    /// A definition is missing data its due-date type requires.
    #[error("Goal '{goal_id}' is invalid: {message}")]
    InvalidDefinition { goal_id: String, message: String },

    /// A license-dependent CME goal has no license goal instance to read the
    /// expiration date from.
    #[error("No license mapped for license goal '{license_goal_id}' (CME goal '{goal_id}')")]
    MissingLicenseMapping {
        goal_id: String,
        license_goal_id: String,
    },

    /// A goal instance references a definition that is no longer in the catalog.
    #[error("Definition '{0}' not found")]
    DefinitionNotFound(String),

    /// A goal instance was not found.
    #[error("User goal '{0}' not found")]
    UserGoalNotFound(String),

    /// No profile exists for the user.
    #[error("Profile not found for user '{0}'")]
    ProfileNotFound(String),

    /// A license goal with the same (state, license type, title) already exists.
    #[error("License goal '{title}' for {license_type} ({state}) already exists")]
    DuplicateLicenseGoal {
        state: String,
        license_type: String,
        title: String,
    },
}

impl GoalError {
    /// Creates an InvalidDefinition error.
    pub fn invalid(goal_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            goal_id: goal_id.into(),
            message: message.into(),
        }
    }
}
