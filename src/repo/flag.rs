use rusqlite::{Connection, OptionalExtension};
use crate::models::{FlagEvent, FlagRecord};
use crate::store::parse_flag_value;
use anyhow::{Context, Result};

/// Flag repository for database operations
///
/// Manages the `flags` table and its append-only `flag_history` log:
/// - Reading raw and boolean flag values
/// - Upserting and removing flags (each write is logged)
/// - Listing current values and past writes
///
/// Values are stored as text. Anything other than a recognised boolean
/// spelling reads back as `None`.
///
/// # Example
///
/// ```no_run
/// use ontrack::db::DbConnection;
/// use ontrack::repo::FlagRepo;
///
/// let conn = DbConnection::connect_in_memory().unwrap();
/// FlagRepo::set(&conn, "companyProfileDone", true).unwrap();
/// assert_eq!(FlagRepo::get(&conn, "companyProfileDone").unwrap(), Some(true));
/// ```
pub struct FlagRepo;

impl FlagRepo {
    /// Get the raw stored text for a key
    pub fn get_raw(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM flags WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to read flag '{}'", key))
    }

    /// Get a flag as a boolean
    pub fn get(conn: &Connection, key: &str) -> Result<Option<bool>> {
        Ok(Self::get_raw(conn, key)?.as_deref().and_then(parse_flag_value))
    }

    /// Store raw text for a key (bypasses boolean normalisation)
    pub fn set_raw(conn: &Connection, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO flags (key, value, modified_ts) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, modified_ts = excluded.modified_ts",
            rusqlite::params![key, value, now],
        )
        .with_context(|| format!("Failed to write flag '{}'", key))?;
        tx.execute(
            "INSERT INTO flag_history (key, value, ts) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn set(conn: &Connection, key: &str, value: bool) -> Result<()> {
        Self::set_raw(conn, key, if value { "true" } else { "false" })
    }

    /// Remove a flag. Returns whether a row was removed.
    pub fn remove(conn: &Connection, key: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let tx = conn.unchecked_transaction()?;
        let removed = tx
            .execute("DELETE FROM flags WHERE key = ?1", [key])
            .with_context(|| format!("Failed to remove flag '{}'", key))?;
        if removed > 0 {
            tx.execute(
                "INSERT INTO flag_history (key, value, ts) VALUES (?1, NULL, ?2)",
                rusqlite::params![key, now],
            )?;
        }
        tx.commit()?;
        Ok(removed > 0)
    }

    /// List all stored flags ordered by key
    pub fn list(conn: &Connection) -> Result<Vec<FlagRecord>> {
        let mut stmt = conn.prepare(
            "SELECT key, value, modified_ts FROM flags ORDER BY key"
        )?;

        let rows = stmt.query_map([], |row| {
            let value: String = row.get(1)?;
            Ok(FlagRecord {
                key: row.get(0)?,
                value: parse_flag_value(&value),
                modified_ts: Some(row.get(2)?),
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// History entries newer than `after_id`, oldest first
    pub fn history_since(conn: &Connection, after_id: i64) -> Result<Vec<FlagEvent>> {
        let mut stmt = conn.prepare(
            "SELECT id, key, value, ts FROM flag_history WHERE id > ?1 ORDER BY id ASC"
        )?;
        let rows = stmt.query_map([after_id], |row| {
            let value: Option<String> = row.get(2)?;
            Ok(FlagEvent {
                id: row.get(0)?,
                key: row.get(1)?,
                value: value.as_deref().and_then(parse_flag_value),
                ts: row.get(3)?,
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Full history, optionally for one key, oldest first
    pub fn history(conn: &Connection, key: Option<&str>) -> Result<Vec<FlagEvent>> {
        let events = Self::history_since(conn, 0)?;
        Ok(match key {
            Some(key) => events.into_iter().filter(|e| e.key == key).collect(),
            None => events,
        })
    }

    /// Highest history id, 0 when empty
    pub fn last_history_id(conn: &Connection) -> Result<i64> {
        conn.query_row(
            "SELECT COALESCE(MAX(id), 0) FROM flag_history",
            [],
            |row| row.get(0),
        )
        .context("Failed to read flag history")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    #[test]
    fn test_set_and_get() {
        let conn = DbConnection::connect_in_memory().unwrap();
        assert_eq!(FlagRepo::get(&conn, "entityCreated").unwrap(), None);

        FlagRepo::set(&conn, "entityCreated", true).unwrap();
        assert_eq!(FlagRepo::get(&conn, "entityCreated").unwrap(), Some(true));

        FlagRepo::set(&conn, "entityCreated", false).unwrap();
        assert_eq!(FlagRepo::get(&conn, "entityCreated").unwrap(), Some(false));
    }

    #[test]
    fn test_non_boolean_reads_as_none() {
        let conn = DbConnection::connect_in_memory().unwrap();
        FlagRepo::set_raw(&conn, "entityVerified", "maybe").unwrap();
        assert_eq!(FlagRepo::get_raw(&conn, "entityVerified").unwrap().as_deref(), Some("maybe"));
        assert_eq!(FlagRepo::get(&conn, "entityVerified").unwrap(), None);
    }

    #[test]
    fn test_remove() {
        let conn = DbConnection::connect_in_memory().unwrap();
        FlagRepo::set(&conn, "companyProfileDone", true).unwrap();

        assert!(FlagRepo::remove(&conn, "companyProfileDone").unwrap());
        assert!(!FlagRepo::remove(&conn, "companyProfileDone").unwrap());
        assert_eq!(FlagRepo::get(&conn, "companyProfileDone").unwrap(), None);
    }

    #[test]
    fn test_history_records_writes_and_removals() {
        let conn = DbConnection::connect_in_memory().unwrap();
        FlagRepo::set(&conn, "companyProfileDone", true).unwrap();
        FlagRepo::set(&conn, "entityCreated", true).unwrap();
        FlagRepo::remove(&conn, "companyProfileDone").unwrap();

        let all = FlagRepo::history(&conn, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].value, None);

        let profile = FlagRepo::history(&conn, Some("companyProfileDone")).unwrap();
        assert_eq!(profile.len(), 2);
        assert_eq!(profile[0].value, Some(true));

        let since = FlagRepo::history_since(&conn, all[0].id).unwrap();
        assert_eq!(since.len(), 2);
        assert_eq!(FlagRepo::last_history_id(&conn).unwrap(), all[2].id);
    }

    #[test]
    fn test_list_ordered_by_key() {
        let conn = DbConnection::connect_in_memory().unwrap();
        FlagRepo::set(&conn, "entityVerified", false).unwrap();
        FlagRepo::set(&conn, "companyProfileDone", true).unwrap();

        let records = FlagRepo::list(&conn).unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["companyProfileDone", "entityVerified"]);
        assert_eq!(records[0].value, Some(true));
    }
}
