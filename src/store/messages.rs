use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Store;

impl Store {
    /// Append one inbound message to the log.
    pub async fn log_message(&self, text: &str, received_at: DateTime<Utc>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO messages (id, text, received_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![&id, text, received_at.to_rfc3339()],
        )
        .context("Failed to log message")?;
        Ok(id)
    }

    /// Logged texts, oldest first.
    #[cfg(test)]
    pub async fn logged_messages(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT text FROM messages ORDER BY received_at ASC, rowid ASC")?;
        let texts = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .context("Failed to load messages")?;
        Ok(texts)
    }
}
