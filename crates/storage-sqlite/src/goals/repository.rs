use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::collections::HashMap;
use std::sync::Arc;

use cmetrack_core::goals::{GoalCatalogRepositoryTrait, GoalDefinition, GoalType, LicenseGoal};
use cmetrack_core::Result;

use super::model::{
    from_rows, to_rows, CmeGoalDB, ExtensionDB, GoalDB, LicenseGoalDB, WellnessGoalDB,
};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{cme_goals, goals, license_goals, wellness_goals};

pub struct GoalCatalogRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl GoalCatalogRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        GoalCatalogRepository { pool, writer }
    }
}

fn load_extension(conn: &mut SqliteConnection, goal: &GoalDB) -> Result<ExtensionDB> {
    let extension = match goal.parsed_goal_type()? {
        GoalType::License => license_goals::table
            .find(&goal.id)
            .first::<LicenseGoalDB>(conn)
            .map(ExtensionDB::License),
        GoalType::Cme => cme_goals::table
            .find(&goal.id)
            .first::<CmeGoalDB>(conn)
            .map(ExtensionDB::Cme),
        GoalType::Wellness => wellness_goals::table
            .find(&goal.id)
            .first::<WellnessGoalDB>(conn)
            .map(ExtensionDB::Wellness),
    };
    extension.into_core()
}

fn load_definition(conn: &mut SqliteConnection, goal_id: &str) -> Result<Option<GoalDefinition>> {
    let goal = goals::table
        .find(goal_id)
        .first::<GoalDB>(conn)
        .optional()
        .into_core()?;
    match goal {
        Some(goal) => {
            let extension = load_extension(conn, &goal)?;
            Ok(Some(from_rows(goal, extension)?))
        }
        None => Ok(None),
    }
}

fn insert_extension(conn: &mut SqliteConnection, extension: &ExtensionDB) -> Result<()> {
    let inserted = match extension {
        ExtensionDB::License(row) => diesel::insert_into(license_goals::table)
            .values(row)
            .execute(conn),
        ExtensionDB::Cme(row) => diesel::insert_into(cme_goals::table)
            .values(row)
            .execute(conn),
        ExtensionDB::Wellness(row) => diesel::insert_into(wellness_goals::table)
            .values(row)
            .execute(conn),
    };
    inserted.into_core()?;
    Ok(())
}

fn update_extension(conn: &mut SqliteConnection, extension: &ExtensionDB) -> Result<usize> {
    let updated = match extension {
        ExtensionDB::License(row) => diesel::update(license_goals::table.find(&row.goal_id))
            .set(row)
            .execute(conn),
        ExtensionDB::Cme(row) => diesel::update(cme_goals::table.find(&row.goal_id))
            .set(row)
            .execute(conn),
        ExtensionDB::Wellness(row) => diesel::update(wellness_goals::table.find(&row.goal_id))
            .set(row)
            .execute(conn),
    };
    updated.into_core()
}

#[async_trait]
impl GoalCatalogRepositoryTrait for GoalCatalogRepository {
    fn list_definitions(&self) -> Result<Vec<GoalDefinition>> {
        let mut conn = get_connection(&self.pool)?;

        let goal_rows = goals::table
            .order(goals::created_at.asc())
            .load::<GoalDB>(&mut conn)
            .into_core()?;
        let mut licenses: HashMap<String, LicenseGoalDB> = license_goals::table
            .load::<LicenseGoalDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(|row| (row.goal_id.clone(), row))
            .collect();
        let mut cmes: HashMap<String, CmeGoalDB> = cme_goals::table
            .load::<CmeGoalDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(|row| (row.goal_id.clone(), row))
            .collect();
        let mut wellness: HashMap<String, WellnessGoalDB> = wellness_goals::table
            .load::<WellnessGoalDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(|row| (row.goal_id.clone(), row))
            .collect();

        goal_rows
            .into_iter()
            .map(|goal| -> Result<GoalDefinition> {
                let extension = match goal.parsed_goal_type()? {
                    GoalType::License => licenses.remove(&goal.id).map(ExtensionDB::License),
                    GoalType::Cme => cmes.remove(&goal.id).map(ExtensionDB::Cme),
                    GoalType::Wellness => wellness.remove(&goal.id).map(ExtensionDB::Wellness),
                }
                .ok_or_else(|| {
                    StorageError::corrupt("goal_type", format!("no category row for {}", goal.id))
                })?;
                Ok(from_rows(goal, extension)?)
            })
            .collect()
    }

    fn get_definition(&self, goal_id: &str) -> Result<Option<GoalDefinition>> {
        let mut conn = get_connection(&self.pool)?;
        load_definition(&mut conn, goal_id)
    }

    fn find_license_goal(
        &self,
        state: &str,
        license_type: &str,
        title: &str,
    ) -> Result<Option<LicenseGoal>> {
        let mut conn = get_connection(&self.pool)?;

        let found = goals::table
            .inner_join(license_goals::table)
            .filter(license_goals::state.eq(state))
            .filter(license_goals::license_type.eq(license_type))
            .filter(license_goals::title.eq(title))
            .select((GoalDB::as_select(), LicenseGoalDB::as_select()))
            .first::<(GoalDB, LicenseGoalDB)>(&mut conn)
            .optional()
            .into_core()?;

        match found {
            Some((goal, row)) => match from_rows(goal, ExtensionDB::License(row))? {
                GoalDefinition::License(license_goal) => Ok(Some(license_goal)),
                other => Err(StorageError::corrupt(
                    "goal_type",
                    format!("{} is not a license goal", other.id()),
                )
                .into()),
            },
            None => Ok(None),
        }
    }

    async fn insert_definition(&self, definition: GoalDefinition) -> Result<GoalDefinition> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<GoalDefinition> {
                let now = Utc::now().naive_utc();
                let (goal, extension) = to_rows(&definition, now, now)?;

                diesel::insert_into(goals::table)
                    .values(&goal)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                insert_extension(conn, &extension)?;

                Ok(definition)
            })
            .await
    }

    async fn update_definition(&self, definition: GoalDefinition) -> Result<GoalDefinition> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<GoalDefinition> {
                let created_at = goals::table
                    .find(definition.id())
                    .select(goals::created_at)
                    .first(conn)
                    .map_err(StorageError::from)?;
                let (goal, extension) = to_rows(&definition, created_at, Utc::now().naive_utc())?;

                diesel::update(goals::table.find(&goal.id))
                    .set(&goal)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                update_extension(conn, &extension)?;

                load_definition(conn, &goal.id)?.ok_or_else(|| {
                    StorageError::QueryFailed(diesel::result::Error::NotFound).into()
                })
            })
            .await
    }

    async fn set_definition_active(&self, goal_id: &str, is_active: bool) -> Result<()> {
        let goal_id = goal_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(goals::table.find(goal_id))
                    .set((
                        goals::is_active.eq(is_active),
                        goals::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
