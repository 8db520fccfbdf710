use anyhow::{Context, Result};
use rusqlite::OptionalExtension;

use super::Store;

impl Store {
    /// Previously stored share link for `(category, key)`.
    pub async fn image_link(&self, category: &str, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT link FROM image_links WHERE category = ?1 AND key = ?2",
            rusqlite::params![category, key],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to look up image link")
    }

    /// Store a share link. A second write for the same key replaces the first.
    pub async fn store_image_link(&self, category: &str, key: &str, link: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO image_links (category, key, link) VALUES (?1, ?2, ?3)
             ON CONFLICT(category, key) DO UPDATE SET link = excluded.link",
            rusqlite::params![category, key, link],
        )
        .context("Failed to store image link")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_link_is_none() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.image_link("radar", "202610181000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_links_keyed_by_category_and_key() {
        let store = Store::open_in_memory().unwrap();
        store
            .store_image_link("radar", "2026101810", "https://i.imgur.com/a.png")
            .await
            .unwrap();
        store
            .store_image_link("forecast", "2026101810", "https://i.imgur.com/b.png")
            .await
            .unwrap();

        assert_eq!(
            store.image_link("radar", "2026101810").await.unwrap().as_deref(),
            Some("https://i.imgur.com/a.png")
        );
        assert_eq!(
            store.image_link("forecast", "2026101810").await.unwrap().as_deref(),
            Some("https://i.imgur.com/b.png")
        );
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = Store::open_in_memory().unwrap();
        store.store_image_link("satellite", "k", "first").await.unwrap();
        store.store_image_link("satellite", "k", "second").await.unwrap();
        assert_eq!(
            store.image_link("satellite", "k").await.unwrap().as_deref(),
            Some("second")
        );
    }
}
