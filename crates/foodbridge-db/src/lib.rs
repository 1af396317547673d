pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::{Result, bail};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the store at `path`. The schema is left untouched; call
    /// [`Database::migrate`] from the deployment step.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fresh, already migrated in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn migrate(&self) -> Result<i64> {
        self.with_conn(|conn| {
            migrations::run(conn)?;
            migrations::current_version(conn)
        })
    }

    /// Fails unless every migration has been applied.
    pub fn ensure_current(&self) -> Result<()> {
        let version = self.with_conn(migrations::current_version)?;
        if version < migrations::LATEST_VERSION {
            bail!(
                "database schema is at version {} but {} is required; run `foodbridge migrate` first",
                version,
                migrations::LATEST_VERSION
            );
        }
        Ok(())
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run `f` inside one transaction. Nothing is committed if `f` fails.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmigrated_file_is_refused() {
        let dir = std::env::temp_dir().join(format!("foodbridge-db-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("unmigrated.db");
        let _ = std::fs::remove_file(&path);

        let db = Database::open(&path).unwrap();
        assert!(db.ensure_current().is_err());

        assert_eq!(db.migrate().unwrap(), migrations::LATEST_VERSION);
        db.ensure_current().unwrap();

        drop(db);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
