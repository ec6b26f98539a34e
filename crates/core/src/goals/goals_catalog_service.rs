use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use uuid::Uuid;

use super::goals_errors::GoalError;
use super::goals_model::{GoalDefinition, GoalType};
use super::goals_traits::{GoalCatalogRepositoryTrait, GoalCatalogServiceTrait};
use crate::errors::{Result, ValidationError};

/// Service for administering goal definitions.
pub struct GoalCatalogService {
    repository: Arc<dyn GoalCatalogRepositoryTrait>,
}

impl GoalCatalogService {
    pub fn new(repository: Arc<dyn GoalCatalogRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Normalizes and validates a definition before it is written.
    fn prepare(&self, definition: GoalDefinition) -> Result<GoalDefinition> {
        let definition = match definition {
            GoalDefinition::License(goal) => GoalDefinition::License(goal.with_default_title()),
            other => other,
        };
        definition.validate()?;

        match &definition {
            GoalDefinition::License(goal) => {
                let duplicate = self
                    .repository
                    .find_license_goal(&goal.state, &goal.license_type, &goal.title)?
                    .filter(|existing| existing.base.id != goal.base.id);
                if duplicate.is_some() {
                    return Err(GoalError::DuplicateLicenseGoal {
                        state: goal.state.clone(),
                        license_type: goal.license_type.clone(),
                        title: goal.title.clone(),
                    }
                    .into());
                }
            }
            GoalDefinition::Cme(goal) => {
                if let Some(license_goal_id) = &goal.license_goal_id {
                    let target = self.repository.get_definition(license_goal_id)?;
                    match target.map(|d| d.goal_type()) {
                        Some(GoalType::License) => {}
                        Some(other) => {
                            return Err(ValidationError::invalid_field(
                                "licenseGoalId",
                                format!("'{}' is a {} goal", license_goal_id, other),
                            )
                            .into())
                        }
                        None => {
                            return Err(GoalError::DefinitionNotFound(license_goal_id.clone()).into())
                        }
                    }
                }
            }
            GoalDefinition::Wellness(_) => {}
        }
        Ok(definition)
    }
}

#[async_trait]
impl GoalCatalogServiceTrait for GoalCatalogService {
    fn list_definitions(&self) -> Result<Vec<GoalDefinition>> {
        self.repository.list_definitions()
    }

    fn get_definition(&self, goal_id: &str) -> Result<GoalDefinition> {
        self.repository
            .get_definition(goal_id)?
            .ok_or_else(|| GoalError::DefinitionNotFound(goal_id.to_string()).into())
    }

    async fn create_definition(&self, definition: GoalDefinition) -> Result<GoalDefinition> {
        let mut definition = definition;
        if definition.id().is_empty() {
            definition.base_mut().id = Uuid::new_v4().to_string();
        }
        let definition = self.prepare(definition)?;
        let created = self.repository.insert_definition(definition).await?;
        info!(
            "Created {} goal definition {}",
            created.goal_type(),
            created.id()
        );
        Ok(created)
    }

    async fn update_definition(&self, definition: GoalDefinition) -> Result<GoalDefinition> {
        let existing = self.get_definition(definition.id())?;
        if existing.goal_type() != definition.goal_type() {
            return Err(ValidationError::invalid_field(
                "category",
                format!(
                    "cannot change a {} goal into a {} goal",
                    existing.goal_type(),
                    definition.goal_type()
                ),
            )
            .into());
        }
        let definition = self.prepare(definition)?;
        debug!("Updating goal definition {}", definition.id());
        self.repository.update_definition(definition).await
    }

    async fn deactivate_definition(&self, goal_id: &str) -> Result<()> {
        self.get_definition(goal_id)?;
        self.repository.set_definition_active(goal_id, false).await?;
        info!("Deactivated goal definition {}", goal_id);
        Ok(())
    }
}
