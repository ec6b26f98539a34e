use chrono::NaiveDateTime;
use diesel::prelude::*;

use cmetrack_core::licenses::{License, NewLicense};

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::licenses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LicenseDB {
    pub id: String,
    pub user_id: String,
    pub state: String,
    pub license_type: String,
    pub expire_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl LicenseDB {
    pub fn from_new(id: String, new_license: NewLicense, now: NaiveDateTime) -> Self {
        LicenseDB {
            id,
            user_id: new_license.user_id,
            state: new_license.state,
            license_type: new_license.license_type,
            expire_date: new_license.expire_date.map(|d| d.naive_utc()),
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<LicenseDB> for License {
    fn from(db: LicenseDB) -> Self {
        License {
            id: db.id,
            user_id: db.user_id,
            state: db.state,
            license_type: db.license_type,
            expire_date: db.expire_date.map(|d| d.and_utc()),
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
