use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;

/// Commons page id, used as the image identifier everywhere.
pub type PageId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Normal,
    Favorite,
}

impl Status {
    pub fn code(self) -> i64 {
        match self {
            Status::Normal => 0,
            Status::Favorite => 1,
        }
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_i64()? {
            0 => Ok(Status::Normal),
            1 => Ok(Status::Favorite),
            other => Err(FromSqlError::OutOfRange(other)),
        }
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: PageId,
    pub current: bool,
    pub status: Status,
    /// `None` when the image was never shown (stored as 0).
    pub last_shown: Option<DateTime<Utc>>,
}

impl ImageRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let last_shown: i64 = row.get(3)?;
        Ok(ImageRecord {
            id: row.get(0)?,
            current: row.get(1)?,
            status: row.get(2)?,
            last_shown: match last_shown {
                0 => None,
                ts => DateTime::from_timestamp(ts, 0),
            },
        })
    }
}

/// Single-table store of known page ids and their display state.
pub struct IdStore {
    conn: Connection,
}

impl IdStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        info!("Using SQLite database at: {:?}", db_path);
        let store = IdStore { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = IdStore {
            conn: Connection::open_in_memory()?,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                id          INTEGER UNIQUE,
                current     BOOLEAN,
                status      INTEGER,
                last_shown  INTEGER
            )",
            [],
        )?;
        Ok(())
    }

    /// Insert a fresh record. Returns `false` when the id was already known.
    pub fn insert_if_absent(&self, id: PageId) -> Result<bool> {
        match self.conn.execute(
            "INSERT INTO images (id, current, status, last_shown) VALUES (?1, 0, ?2, 0)",
            params![id, Status::Normal],
        ) {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                debug!("Id {} already in store", id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, id: PageId) -> Result<Option<ImageRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, current, status, last_shown FROM images WHERE id = ?1",
                [id],
                ImageRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn status(&self, id: PageId) -> Result<Option<Status>> {
        Ok(self.get(id)?.map(|record| record.status))
    }

    pub fn get_current(&self) -> Result<Option<PageId>> {
        let id = self
            .conn
            .query_row("SELECT id FROM images WHERE current = 1 LIMIT 1", [], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    /// Make `id` the only current record.
    pub fn set_current(&mut self, id: PageId) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("UPDATE images SET current = 0 WHERE current = 1 AND id != ?1", [id])?;
        tx.execute("UPDATE images SET current = 1 WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(())
    }

    /// Clear the current flag and stamp the time it stopped being shown.
    pub fn mark_shown(&self, id: PageId, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE images SET current = 0, last_shown = ?1 WHERE id = ?2",
            params![at.timestamp(), id],
        )?;
        Ok(())
    }

    pub fn set_status(&self, id: PageId, status: Status) -> Result<()> {
        self.conn.execute(
            "UPDATE images SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        Ok(())
    }

    /// Favorites and never-shown ids.
    pub fn preferred_ids(&self) -> Result<Vec<PageId>> {
        self.query_ids(
            "SELECT id FROM images WHERE status = 1 OR last_shown = 0 ORDER BY id",
        )
    }

    pub fn all_ids(&self) -> Result<Vec<PageId>> {
        self.query_ids("SELECT id FROM images ORDER BY id")
    }

    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count)
    }

    fn query_ids(&self, sql: &str) -> Result<Vec<PageId>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<PageId>>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(ids: &[PageId]) -> IdStore {
        let store = IdStore::open_in_memory().unwrap();
        for id in ids {
            assert!(store.insert_if_absent(*id).unwrap());
        }
        store
    }

    #[test]
    fn test_duplicate_insert_keeps_one_record() {
        let store = IdStore::open_in_memory().unwrap();
        assert!(store.insert_if_absent(42).unwrap());
        assert!(!store.insert_if_absent(42).unwrap());
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.all_ids().unwrap(), vec![42]);
    }

    #[test]
    fn test_new_record_defaults() {
        let store = store_with(&[7]);
        let record = store.get(7).unwrap().unwrap();
        assert!(!record.current);
        assert_eq!(record.status, Status::Normal);
        assert_eq!(record.last_shown, None);
        assert!(store.get(8).unwrap().is_none());
    }

    #[test]
    fn test_set_current_leaves_exactly_one() {
        let mut store = store_with(&[1, 2, 3]);
        assert_eq!(store.get_current().unwrap(), None);

        store.set_current(1).unwrap();
        store.set_current(3).unwrap();

        assert_eq!(store.get_current().unwrap(), Some(3));
        let current: Vec<_> = store
            .all_ids()
            .unwrap()
            .into_iter()
            .filter(|id| store.get(*id).unwrap().unwrap().current)
            .collect();
        assert_eq!(current, vec![3]);
    }

    #[test]
    fn test_mark_shown_clears_current_and_stamps_time() {
        let mut store = store_with(&[5]);
        store.set_current(5).unwrap();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        store.mark_shown(5, at).unwrap();

        let record = store.get(5).unwrap().unwrap();
        assert!(!record.current);
        assert_eq!(record.last_shown, Some(at));
        assert_eq!(store.get_current().unwrap(), None);
    }

    #[test]
    fn test_preferred_ids_are_favorites_or_unshown() {
        let store = store_with(&[1, 2, 3]);
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        store.mark_shown(1, at).unwrap();
        store.mark_shown(2, at).unwrap();
        store.set_status(2, Status::Favorite).unwrap();

        assert_eq!(store.preferred_ids().unwrap(), vec![2, 3]);
        assert_eq!(store.status(2).unwrap(), Some(Status::Favorite));

        store.set_status(2, Status::Normal).unwrap();
        assert_eq!(store.preferred_ids().unwrap(), vec![3]);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("images.db");
        {
            let store = IdStore::open(&path).unwrap();
            store.insert_if_absent(11).unwrap();
        }
        let store = IdStore::open(&path).unwrap();
        assert_eq!(store.all_ids().unwrap(), vec![11]);
    }
}
