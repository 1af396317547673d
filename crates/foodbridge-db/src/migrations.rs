use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 1;

pub fn current_version(conn: &Connection) -> Result<i64> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
        [],
        |r| r.get(0),
    )?;
    if !exists {
        return Ok(0);
    }

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;
    Ok(version)
}

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version = current_version(conn)?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL CHECK (role IN ('donor', 'ngo')),
                phone       TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE donations (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                donor_id         INTEGER NOT NULL REFERENCES users(id),
                org_name         TEXT NOT NULL,
                food_item        TEXT NOT NULL,
                quantity         TEXT NOT NULL,
                expiry_datetime  TEXT NOT NULL,
                status           TEXT NOT NULL DEFAULT 'Active' CHECK (status IN ('Active', 'Claimed')),
                claimed_by       INTEGER REFERENCES users(id),
                created_at       TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK ((status = 'Claimed') = (claimed_by IS NOT NULL))
            );

            CREATE INDEX idx_donations_donor ON donations(donor_id);
            CREATE INDEX idx_donations_status ON donations(status);
            CREATE INDEX idx_donations_claimed_by ON donations(claimed_by);

            CREATE TABLE notifications (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                message     TEXT NOT NULL,
                type        TEXT NOT NULL,
                related_id  INTEGER NOT NULL REFERENCES donations(id),
                is_read     INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_notifications_user ON notifications(user_id, is_read);

            CREATE TABLE messages (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                donation_id  INTEGER NOT NULL REFERENCES donations(id),
                sender_id    INTEGER NOT NULL REFERENCES users(id),
                text         TEXT NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_messages_donation ON messages(donation_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);

        run(&conn).unwrap();
        run(&conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn claimed_by_must_follow_status() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (username, password, role) VALUES ('d', 'x', 'donor')",
            [],
        )
        .unwrap();

        let claimed_without_ngo = conn.execute(
            "INSERT INTO donations (donor_id, org_name, food_item, quantity, expiry_datetime, status)
             VALUES (1, 'o', 'f', 'q', '2026-01-01T10:00', 'Claimed')",
            [],
        );
        assert!(claimed_without_ngo.is_err());
    }
}
