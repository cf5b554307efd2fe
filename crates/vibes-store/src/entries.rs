use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use vibes_shared::urls::scheme_variants;
use vibes_shared::{EntryId, EntryPatch, NewEntry, ThumbnailSource, UserId, WebsiteEntry};

use crate::database::Database;
use crate::error::{Result, StoreError};

const SELECT_COLUMNS: &str =
    "SELECT id, url, thumbnail, description, created_by, user_id, user_name, created_at FROM websites";

impl Database {
    /// Insert a new entry and return it with its assigned id.
    pub fn insert_entry(&self, new: &NewEntry) -> Result<WebsiteEntry> {
        let id = EntryId(Uuid::new_v4().to_string());
        self.insert_entry_with_id(&id, new)?;
        Ok(WebsiteEntry::from_new(id, new.clone()))
    }

    pub(crate) fn insert_entry_with_id(&self, id: &EntryId, new: &NewEntry) -> Result<usize> {
        let thumbnail = serde_json::to_string(&new.thumbnail)?;
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO websites
                 (id, url, thumbnail, description, created_by, user_id, user_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.as_str(),
                new.url,
                thumbnail,
                new.description,
                new.created_by,
                new.user_id.as_str(),
                new.user_name,
                new.created_at,
            ],
        )?;
        Ok(affected)
    }

    /// All entries, newest first.
    pub fn list_entries(&self) -> Result<Vec<WebsiteEntry>> {
        self.query_entries(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC"), params![])
    }

    pub fn get_entry(&self, id: &EntryId) -> Result<WebsiteEntry> {
        self.conn()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id.as_str()],
                row_to_entry,
            )
            .optional()?
            .ok_or(StoreError::NotFound)
    }

    /// Entries whose URL equals `url` exactly.
    pub fn find_entries_by_url(&self, url: &str) -> Result<Vec<WebsiteEntry>> {
        self.query_entries(
            &format!("{SELECT_COLUMNS} WHERE url = ?1 ORDER BY created_at DESC"),
            params![url],
        )
    }

    pub fn find_entries_by_user(&self, user_id: &UserId) -> Result<Vec<WebsiteEntry>> {
        self.query_entries(
            &format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC"),
            params![user_id.as_str()],
        )
    }

    /// Whether the URL is already taken under either scheme.
    pub fn url_exists(&self, url: &str) -> Result<bool> {
        let (http, https) = scheme_variants(url);
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM websites WHERE url = ?1 OR url = ?2",
            params![http, https],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Apply a partial update. Returns `false` if the entry does not exist.
    pub fn update_entry(&self, id: &EntryId, patch: &EntryPatch) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE websites SET
                 description = COALESCE(?2, description),
                 created_by  = COALESCE(?3, created_by),
                 user_name   = COALESCE(?4, user_name)
             WHERE id = ?1",
            params![
                id.as_str(),
                patch.description,
                patch.created_by,
                patch.user_name,
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn delete_entry(&self, id: &EntryId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM websites WHERE id = ?1", params![id.as_str()])?;
        Ok(affected > 0)
    }

    fn query_entries<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<WebsiteEntry>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(params, row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<WebsiteEntry> {
    let id: String = row.get(0)?;
    let url: String = row.get(1)?;
    let thumbnail_json: String = row.get(2)?;
    let description: Option<String> = row.get(3)?;
    let created_by: String = row.get(4)?;
    let user_id: String = row.get(5)?;
    let user_name: String = row.get(6)?;
    let created_at: i64 = row.get(7)?;

    let thumbnail: ThumbnailSource = serde_json::from_str(&thumbnail_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(WebsiteEntry {
        id: EntryId(id),
        url,
        thumbnail,
        description,
        created_by,
        user_id: UserId(user_id),
        user_name,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry(url: &str, user: &str, created_at: i64) -> NewEntry {
        NewEntry {
            url: url.to_string(),
            thumbnail: ThumbnailSource::generated_for(url),
            description: Some("A site".into()),
            created_by: "Alice".into(),
            user_id: UserId::new(user),
            user_name: "Alice".into(),
            created_at,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let created = db.insert_entry(&new_entry("https://a.com", "u1", 1)).unwrap();

        let fetched = db.get_entry(&created.id).unwrap();
        assert_eq!(fetched, created);
        assert!(matches!(
            db.get_entry(&EntryId::new("missing")),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_list_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.insert_entry(&new_entry("https://a.com", "u1", 100)).unwrap();
        db.insert_entry(&new_entry("https://b.com", "u1", 200)).unwrap();
        db.insert_entry(&new_entry("https://c.com", "u2", 150)).unwrap();

        let urls: Vec<String> = db.list_entries().unwrap().into_iter().map(|e| e.url).collect();
        assert_eq!(urls, ["https://b.com", "https://c.com", "https://a.com"]);
    }

    #[test]
    fn test_url_exists_checks_both_schemes() {
        let db = Database::open_in_memory().unwrap();
        db.insert_entry(&new_entry("https://example.com/x", "u1", 1)).unwrap();

        assert!(db.url_exists("http://example.com/x").unwrap());
        assert!(db.url_exists("https://example.com/x").unwrap());
        assert!(!db.url_exists("https://example.com/y").unwrap());
    }

    #[test]
    fn test_partial_update() {
        let db = Database::open_in_memory().unwrap();
        let created = db.insert_entry(&new_entry("https://a.com", "u1", 1)).unwrap();

        let patch = EntryPatch {
            description: Some("Updated".into()),
            ..Default::default()
        };
        assert!(db.update_entry(&created.id, &patch).unwrap());

        let fetched = db.get_entry(&created.id).unwrap();
        assert_eq!(fetched.description.as_deref(), Some("Updated"));
        assert_eq!(fetched.created_by, "Alice");

        assert!(!db.update_entry(&EntryId::new("missing"), &patch).unwrap());
    }

    #[test]
    fn test_find_by_user_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_entry(&new_entry("https://a.com", "u1", 1)).unwrap();
        db.insert_entry(&new_entry("https://b.com", "u2", 2)).unwrap();

        assert_eq!(db.find_entries_by_user(&UserId::new("u1")).unwrap().len(), 1);

        assert!(db.delete_entry(&a.id).unwrap());
        assert!(!db.delete_entry(&a.id).unwrap());
        assert!(db.find_entries_by_user(&UserId::new("u1")).unwrap().is_empty());
    }

    #[test]
    fn test_inline_thumbnail_survives_storage() {
        let db = Database::open_in_memory().unwrap();
        let mut new = new_entry("https://a.com", "u1", 1);
        new.thumbnail = ThumbnailSource::inline("image/png", vec![9, 8, 7], 1024).unwrap();

        let created = db.insert_entry(&new).unwrap();
        assert_eq!(db.get_entry(&created.id).unwrap().thumbnail, new.thumbnail);
    }
}
