use diesel::prelude::*;
use std::sync::Arc;

use cmetrack_core::licenses::{License, LicenseRepositoryTrait};
use cmetrack_core::Result;

use super::model::LicenseDB;
use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;
use crate::schema::licenses::dsl::*;

/// Read side of the license table. Licenses are written together with the
/// goal instance that needs them, see `UserGoalRepository`.
pub struct LicenseRepository {
    pool: Arc<DbPool>,
}

impl LicenseRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        LicenseRepository { pool }
    }
}

impl LicenseRepositoryTrait for LicenseRepository {
    fn list_licenses_for_user(&self, user: &str) -> Result<Vec<License>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = licenses
            .filter(user_id.eq(user))
            .order(created_at.asc())
            .load::<LicenseDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(License::from).collect())
    }

    fn get_license(&self, license_id: &str) -> Result<Option<License>> {
        let mut conn = get_connection(&self.pool)?;
        let row = licenses
            .find(license_id)
            .first::<LicenseDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.map(License::from))
    }
}
