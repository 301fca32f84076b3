use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;

/// Tables that share the `(key, value, updated_at)` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvTable {
    /// Card branding and period defaults.
    Settings,
    /// Opaque JSON blobs, the local-storage equivalent.
    Storage,
}

impl KvTable {
    fn name(self) -> &'static str {
        match self {
            KvTable::Settings => "app_settings",
            KvTable::Storage => "kv_store",
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyValueRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for KeyValueRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            key: row.get("key")?,
            value: row.get("value")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct KeyValueRepository;

impl KeyValueRepository {
    pub fn get(conn: &Connection, table: KvTable, key: &str) -> AppResult<Option<KeyValueRow>> {
        let sql = format!(
            "SELECT key, value, updated_at FROM {} WHERE key = ?1",
            table.name()
        );
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row([key], |row| KeyValueRow::try_from(row))
            .optional()?;

        Ok(row)
    }

    pub fn list(conn: &Connection, table: KvTable) -> AppResult<Vec<KeyValueRow>> {
        let sql = format!(
            "SELECT key, value, updated_at FROM {} ORDER BY key ASC",
            table.name()
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map([], |row| KeyValueRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn upsert(conn: &Connection, table: KvTable, key: &str, value: &str) -> AppResult<()> {
        let sql = format!(
            r#"
                INSERT INTO {} (key, value)
                VALUES (:key, :value)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = CURRENT_TIMESTAMP
            "#,
            table.name()
        );
        conn.execute(&sql, named_params! {":key": key, ":value": value})?;

        Ok(())
    }

    /// Returns `true` when a row was removed.
    pub fn delete(conn: &Connection, table: KvTable, key: &str) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", table.name());
        let affected = conn.execute(&sql, [key])?;
        Ok(affected > 0)
    }
}
