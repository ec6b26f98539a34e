use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use cmetrack_core::goals::{LicenseRef, NewUserGoal, UserGoal, UserGoalRepositoryTrait};
use cmetrack_core::Result;

use super::model::{link_rows, UserGoalCmeGoalDB, UserGoalDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::licenses::LicenseDB;
use crate::schema::{licenses, user_goal_cme_goals, user_goals};
use crate::utils::chunk_for_sqlite;

pub struct UserGoalRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl UserGoalRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        UserGoalRepository { pool, writer }
    }
}

/// Loads the linked definitions of the given instances, keyed by instance id.
fn load_links(
    conn: &mut SqliteConnection,
    user_goal_ids: &[String],
) -> Result<HashMap<String, BTreeSet<String>>> {
    let mut links: HashMap<String, BTreeSet<String>> = HashMap::new();
    for chunk in chunk_for_sqlite(user_goal_ids) {
        let rows = user_goal_cme_goals::table
            .filter(user_goal_cme_goals::user_goal_id.eq_any(chunk))
            .load::<UserGoalCmeGoalDB>(conn)
            .into_core()?;
        for row in rows {
            links.entry(row.user_goal_id).or_default().insert(row.goal_id);
        }
    }
    Ok(links)
}

fn with_links(conn: &mut SqliteConnection, rows: Vec<UserGoalDB>) -> Result<Vec<UserGoal>> {
    let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
    let mut links = load_links(conn, &ids)?;
    rows.into_iter()
        .map(|row| -> Result<UserGoal> {
            let linked = links.remove(&row.id).unwrap_or_default();
            Ok(row.into_domain(linked)?)
        })
        .collect()
}

fn insert_instance(conn: &mut SqliteConnection, new_goal: NewUserGoal) -> Result<UserGoal> {
    let row = UserGoalDB::from_new(
        Uuid::new_v4().to_string(),
        &new_goal,
        Utc::now().naive_utc(),
    );
    diesel::insert_into(user_goals::table)
        .values(&row)
        .execute(conn)
        .map_err(StorageError::from)?;

    let links = link_rows(&row.id, &new_goal.cme_goal_ids);
    if !links.is_empty() {
        diesel::insert_into(user_goal_cme_goals::table)
            .values(&links)
            .execute(conn)
            .map_err(StorageError::from)?;
    }

    Ok(row.into_domain(new_goal.cme_goal_ids)?)
}

#[async_trait]
impl UserGoalRepositoryTrait for UserGoalRepository {
    fn list_user_goals(&self, user_id: &str) -> Result<Vec<UserGoal>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = user_goals::table
            .filter(user_goals::user_id.eq(user_id))
            .order((user_goals::due_date.asc(), user_goals::id.asc()))
            .load::<UserGoalDB>(&mut conn)
            .into_core()?;
        with_links(&mut conn, rows)
    }

    fn get_user_goal(&self, user_goal_id: &str) -> Result<Option<UserGoal>> {
        let mut conn = get_connection(&self.pool)?;
        let row = user_goals::table
            .find(user_goal_id)
            .first::<UserGoalDB>(&mut conn)
            .optional()
            .into_core()?;
        match row {
            Some(row) => Ok(with_links(&mut conn, vec![row])?.pop()),
            None => Ok(None),
        }
    }

    fn list_user_ids_with_goals(&self) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        user_goals::table
            .select(user_goals::user_id)
            .distinct()
            .order(user_goals::user_id.asc())
            .load::<String>(&mut conn)
            .into_core()
    }

    async fn insert_user_goal(&self, new_goal: NewUserGoal) -> Result<UserGoal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<UserGoal> {
                insert_instance(conn, new_goal)
            })
            .await
    }

    async fn insert_license_user_goal(
        &self,
        license: LicenseRef,
        mut new_goal: NewUserGoal,
    ) -> Result<UserGoal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<UserGoal> {
                let license_id = match license {
                    LicenseRef::Existing(license_id) => license_id,
                    LicenseRef::New(new_license) => {
                        let row = LicenseDB::from_new(
                            Uuid::new_v4().to_string(),
                            new_license,
                            Utc::now().naive_utc(),
                        );
                        diesel::insert_into(licenses::table)
                            .values(&row)
                            .execute(conn)
                            .map_err(StorageError::from)?;
                        row.id
                    }
                };
                new_goal.license_id = Some(license_id);
                insert_instance(conn, new_goal)
            })
            .await
    }

    async fn update_user_goal(&self, mut user_goal: UserGoal) -> Result<UserGoal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<UserGoal> {
                user_goal.updated_at = Utc::now().naive_utc();
                let row = UserGoalDB::from_domain(&user_goal);

                let updated = diesel::update(user_goals::table.find(&row.id))
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if updated == 0 {
                    return Err(StorageError::QueryFailed(diesel::result::Error::NotFound).into());
                }

                diesel::delete(
                    user_goal_cme_goals::table.filter(user_goal_cme_goals::user_goal_id.eq(&row.id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                let links = link_rows(&row.id, &user_goal.cme_goal_ids);
                if !links.is_empty() {
                    diesel::insert_into(user_goal_cme_goals::table)
                        .values(&links)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }

                Ok(user_goal)
            })
            .await
    }

    async fn delete_user_goals(&self, user_goal_ids: Vec<String>) -> Result<usize> {
        if user_goal_ids.is_empty() {
            return Ok(0);
        }
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut deleted = 0;
                for chunk in chunk_for_sqlite(&user_goal_ids) {
                    deleted += diesel::delete(user_goals::table.filter(user_goals::id.eq_any(chunk)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(deleted)
            })
            .await
    }
}
