use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

use crate::error::AppResult;
use crate::models::{DeliveryStatus, Recipient};

const DB_FILE: &str = "recipients.db";

/// SQLite-backed recipient queue. Every state change is written through
/// immediately, so a crash mid-batch loses at most the in-flight send.
pub struct RecipientDb {
    path: PathBuf,
}

impl RecipientDb {
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn open_default() -> Result<Self, String> {
        Ok(Self::at(super::data_dir()?.join(DB_FILE)))
    }

    fn connect(&self) -> AppResult<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    pub fn init(&self) -> AppResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS recipients (
                username TEXT PRIMARY KEY,
                status TEXT NOT NULL DEFAULT 'active',
                message_count INTEGER NOT NULL DEFAULT 0,
                last_message_at INTEGER,
                imported_at INTEGER NOT NULL
            )",
            [],
        )?;
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_recipients_status ON recipients(status)",
            [],
        );
        Ok(())
    }

    /// Bulk-import usernames as `active` recipients. Existing rows are left
    /// untouched; returns how many were new.
    pub fn import_usernames(&self, usernames: &[String]) -> AppResult<usize> {
        let mut conn = self.connect()?;
        let now = chrono::Utc::now().timestamp();
        let tx = conn.transaction()?;
        let mut added = 0;
        for username in usernames {
            let username = username.trim();
            if username.is_empty() {
                continue;
            }
            added += tx.execute(
                "INSERT OR IGNORE INTO recipients (username, status, imported_at)
                 VALUES (?1, 'active', ?2)",
                params![username, now],
            )?;
        }
        tx.commit()?;
        Ok(added)
    }

    /// The next `limit` recipients eligible for dispatch, in stable import
    /// order. Already-messaged recipients never reappear here, which is what
    /// makes interrupted cycles safe to re-run.
    pub fn find_active(&self, limit: usize) -> AppResult<Vec<Recipient>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT username, status, message_count, last_message_at, imported_at
             FROM recipients WHERE status = 'active'
             ORDER BY imported_at, username
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_recipient)?;
        let mut recipients = Vec::new();
        for row in rows {
            recipients.push(row?);
        }
        Ok(recipients)
    }

    pub fn get(&self, username: &str) -> AppResult<Option<Recipient>> {
        let conn = self.connect()?;
        let recipient = conn
            .query_row(
                "SELECT username, status, message_count, last_message_at, imported_at
                 FROM recipients WHERE username = ?1",
                params![username],
                row_to_recipient,
            )
            .optional()?;
        Ok(recipient)
    }

    pub fn mark_messaged(&self, username: &str) -> AppResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE recipients
             SET status = 'messaged', message_count = message_count + 1, last_message_at = ?2
             WHERE username = ?1",
            params![username, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn set_status(&self, username: &str, status: DeliveryStatus) -> AppResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE recipients SET status = ?2 WHERE username = ?1",
            params![username, status.as_str()],
        )?;
        Ok(())
    }

    pub fn count_by_status(&self, status: DeliveryStatus) -> AppResult<i64> {
        let conn = self.connect()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM recipients WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_recipient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recipient> {
    let status: String = row.get(1)?;
    Ok(Recipient {
        username: row.get(0)?,
        // Unknown status strings are treated as invalid rather than failing
        // the whole query.
        status: DeliveryStatus::parse(&status).unwrap_or(DeliveryStatus::Invalid),
        message_count: row.get(2)?,
        last_message_at: row.get(3)?,
        imported_at: row.get(4)?,
    })
}
