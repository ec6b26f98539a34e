use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use cmetrack_core::goals::Compliance;
use cmetrack_core::profiles::{Profile, ProfileRepositoryTrait};
use cmetrack_core::Result;

use super::model::{ProfileCmeTagDB, ProfileDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{profile_cme_tags, profiles};

pub struct ProfileRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ProfileRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        ProfileRepository { pool, writer }
    }

    /// Inserts or replaces a profile together with its tag links.
    pub async fn upsert_profile(&self, profile: Profile) -> Result<Profile> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Profile> {
                let row = ProfileDB::from_domain(&profile, Utc::now().naive_utc())?;
                diesel::insert_into(profiles::table)
                    .values(&row)
                    .on_conflict(profiles::user_id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                diesel::delete(
                    profile_cme_tags::table.filter(profile_cme_tags::user_id.eq(&row.user_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                let tags: Vec<ProfileCmeTagDB> = profile
                    .cme_tags
                    .iter()
                    .map(|t| ProfileCmeTagDB {
                        user_id: row.user_id.clone(),
                        tag: t.tag.clone(),
                        is_active: t.is_active,
                    })
                    .collect();
                if !tags.is_empty() {
                    diesel::insert_into(profile_cme_tags::table)
                        .values(&tags)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }

                Ok(profile)
            })
            .await
    }
}

#[async_trait]
impl ProfileRepositoryTrait for ProfileRepository {
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let mut conn = get_connection(&self.pool)?;
        let row = profiles::table
            .find(user_id)
            .first::<ProfileDB>(&mut conn)
            .optional()
            .into_core()?;
        let Some(row) = row else {
            return Ok(None);
        };

        let tags = profile_cme_tags::table
            .filter(profile_cme_tags::user_id.eq(user_id))
            .order(profile_cme_tags::tag.asc())
            .load::<ProfileCmeTagDB>(&mut conn)
            .into_core()?;
        Ok(Some(row.into_domain(tags)?))
    }

    fn list_goal_enabled_user_ids(&self) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        profiles::table
            .filter(profiles::goals_enabled.eq(true))
            .select(profiles::user_id)
            .order(profiles::user_id.asc())
            .load::<String>(&mut conn)
            .into_core()
    }

    async fn update_compliance(&self, user_id: &str, compliance: Compliance) -> Result<bool> {
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let stored: Option<i16> = profiles::table
                    .find(&user_id)
                    .select(profiles::compliance)
                    .first(conn)
                    .map_err(StorageError::from)?;
                if stored == Some(compliance.as_i16()) {
                    return Ok(false);
                }

                diesel::update(profiles::table.find(&user_id))
                    .set((
                        profiles::compliance.eq(Some(compliance.as_i16())),
                        profiles::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                debug!("Stored compliance {} for user {}", compliance.label(), user_id);
                Ok(true)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use chrono::{NaiveDate, TimeZone};
    use cmetrack_core::profiles::ProfileCmeTag;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    async fn create_test_repository() -> (ProfileRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (ProfileRepository::new(pool, writer), temp_dir)
    }

    fn profile(user_id: &str, goals_enabled: bool) -> Profile {
        Profile {
            user_id: user_id.to_string(),
            degrees: BTreeSet::from(["DO".to_string()]),
            specialties: BTreeSet::from(["Family Medicine".to_string()]),
            sub_specialties: BTreeSet::new(),
            states: BTreeSet::from(["TX".to_string(), "OK".to_string()]),
            hospitals: BTreeSet::new(),
            cme_tags: vec![
                ProfileCmeTag {
                    tag: "Ethics".to_string(),
                    is_active: false,
                },
                ProfileCmeTag {
                    tag: "Opioids".to_string(),
                    is_active: true,
                },
            ],
            specialty_tags: BTreeSet::from(["Family Medicine".to_string()]),
            sub_specialties_required: false,
            birth_date: NaiveDate::from_ymd_opt(1980, 2, 29),
            country: Some("USA".to_string()),
            joined_at: Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap(),
            goals_enabled,
            compliance: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_load_profile() {
        let (repo, _temp_dir) = create_test_repository().await;
        let saved = repo.upsert_profile(profile("u1", true)).await.unwrap();
        assert_eq!(repo.get_profile("u1").unwrap(), Some(saved));

        let mut edited = profile("u1", true);
        edited.cme_tags.truncate(1);
        edited.states.remove("OK");
        repo.upsert_profile(edited.clone()).await.unwrap();
        assert_eq!(repo.get_profile("u1").unwrap(), Some(edited));
        assert_eq!(repo.get_profile("missing").unwrap(), None);
    }

    #[tokio::test]
    async fn test_compliance_written_only_on_change() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.upsert_profile(profile("u1", true)).await.unwrap();
        repo.upsert_profile(profile("u2", false)).await.unwrap();

        assert!(repo.update_compliance("u1", Compliance::NonCompliant).await.unwrap());
        assert!(!repo.update_compliance("u1", Compliance::NonCompliant).await.unwrap());
        assert!(repo.update_compliance("u1", Compliance::Compliant).await.unwrap());

        let stored = repo.get_profile("u1").unwrap().unwrap();
        assert_eq!(stored.compliance, Some(Compliance::Compliant));
        assert_eq!(repo.list_goal_enabled_user_ids().unwrap(), vec!["u1".to_string()]);
    }
}
