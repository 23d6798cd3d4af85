//! Key/value operations on the local storage table.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};

impl Database {
    /// Read a stored value.
    pub fn get_item(&self, key: &str) -> DbResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace a value.
    pub fn set_item(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a value. Returns whether it existed.
    pub fn remove_item(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM local_storage WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }

    /// Number of stored keys.
    pub fn item_count(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM local_storage", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_item() {
        let db = Database::open_in_memory().unwrap();
        db.set_item("token", "abc").unwrap();
        assert_eq!(db.get_item("token").unwrap(), Some("abc".to_string()));
        assert_eq!(db.get_item("user").unwrap(), None);
    }

    #[test]
    fn test_set_item_overwrites() {
        let db = Database::open_in_memory().unwrap();
        db.set_item("token", "abc").unwrap();
        db.set_item("token", "def").unwrap();
        assert_eq!(db.get_item("token").unwrap(), Some("def".to_string()));
        assert_eq!(db.item_count().unwrap(), 1);
    }

    #[test]
    fn test_remove_item() {
        let db = Database::open_in_memory().unwrap();
        db.set_item("token", "abc").unwrap();
        assert!(db.remove_item("token").unwrap());
        assert!(!db.remove_item("token").unwrap());
        assert_eq!(db.item_count().unwrap(), 0);
    }
}
