use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use cmetrack_core::credits::{CreditLedgerTrait, CreditSource, NewCreditEntry};
use cmetrack_core::Result;

use super::model::{CreditEntryDB, CreditEntryTagDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{credit_entries, credit_entry_tags};
use crate::utils::decode_decimal;

pub struct CreditLedgerRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CreditLedgerRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        CreditLedgerRepository { pool, writer }
    }

    /// Records one ledger entry with its topic tags.
    pub async fn record_credits(&self, entry: NewCreditEntry) -> Result<String> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<String> {
                let row =
                    CreditEntryDB::from_new(Uuid::new_v4().to_string(), &entry, Utc::now().naive_utc());
                diesel::insert_into(credit_entries::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let tags: Vec<CreditEntryTagDB> = entry
                    .tags
                    .iter()
                    .map(|tag| CreditEntryTagDB {
                        entry_id: row.id.clone(),
                        tag: tag.clone(),
                    })
                    .collect();
                if !tags.is_empty() {
                    diesel::insert_into(credit_entry_tags::table)
                        .values(&tags)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(row.id)
            })
            .await
    }
}

impl CreditLedgerTrait for CreditLedgerRepository {
    fn sum_credits(
        &self,
        user_id: &str,
        source: CreditSource,
        tag: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = credit_entries::table
            .filter(credit_entries::user_id.eq(user_id))
            .filter(credit_entries::source.eq(source.as_str()))
            .filter(credit_entries::activity_date.between(start, end))
            .select(credit_entries::credits)
            .into_boxed();
        if let Some(tag) = tag {
            query = query.filter(
                credit_entries::id.eq_any(
                    credit_entry_tags::table
                        .filter(credit_entry_tags::tag.eq(tag.to_string()))
                        .select(credit_entry_tags::entry_id),
                ),
            );
        }

        // Stored as text, summed here to keep decimal precision.
        let amounts = query.load::<String>(&mut conn).into_core()?;
        amounts
            .iter()
            .try_fold(Decimal::ZERO, |total, raw| -> Result<Decimal> {
                Ok(total + decode_decimal("credits", raw)?)
            })
    }
}
