//! Column encoding helpers shared by the repositories.

use std::collections::BTreeSet;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::errors::StorageError;

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite limits the number of bound parameters per statement (usually 999),
/// so long id lists are split with `chunk_for_sqlite`.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice into slices of at most `SQLITE_MAX_PARAMS_CHUNK` items.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Encodes a string set as a JSON array.
pub fn encode_set(values: &BTreeSet<String>) -> Result<String, StorageError> {
    serde_json::to_string(values).map_err(|e| StorageError::corrupt("json set", e))
}

pub fn decode_set(column: &'static str, raw: &str) -> Result<BTreeSet<String>, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::corrupt(column, e))
}

pub fn decode_decimal(column: &'static str, raw: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(raw).map_err(|e| StorageError::corrupt(column, e))
}

pub fn decode_optional_decimal(
    column: &'static str,
    raw: Option<&str>,
) -> Result<Option<Decimal>, StorageError> {
    raw.map(|value| decode_decimal(column, value)).transpose()
}
