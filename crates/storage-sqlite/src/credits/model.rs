use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use cmetrack_core::credits::NewCreditEntry;

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::credit_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CreditEntryDB {
    pub id: String,
    pub user_id: String,
    pub source: String,
    pub credits: String,
    pub activity_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::credit_entry_tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CreditEntryTagDB {
    pub entry_id: String,
    pub tag: String,
}

impl CreditEntryDB {
    pub fn from_new(id: String, entry: &NewCreditEntry, now: NaiveDateTime) -> Self {
        CreditEntryDB {
            id,
            user_id: entry.user_id.clone(),
            source: entry.source.as_str().to_string(),
            credits: entry.credits.to_string(),
            activity_date: entry.activity_date,
            created_at: now,
        }
    }
}
