//! Import of website documents exported from the previous gallery, where
//! the thumbnail was a plain `thumbnailUrl` string.

use serde::{Deserialize, Serialize};

use vibes_shared::{EntryId, NewEntry, ThumbnailSource, UserId};

use crate::database::Database;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyWebsite {
    pub id: String,
    pub url: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Older documents predate `createdBy`; the uploader name stands in.
    #[serde(default)]
    pub created_by: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub created_at: i64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
}

impl Database {
    /// Import legacy documents, keeping their ids. Existing ids are left
    /// untouched (INSERT OR IGNORE); malformed thumbnails are skipped.
    pub fn import_legacy(&self, websites: &[LegacyWebsite]) -> Result<ImportStats> {
        let mut stats = ImportStats::default();

        for site in websites {
            let thumbnail = match ThumbnailSource::from_legacy(&site.thumbnail_url) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(id = %site.id, error = %e, "skipping legacy website");
                    stats.skipped += 1;
                    continue;
                }
            };

            let new = NewEntry {
                url: site.url.clone(),
                thumbnail,
                description: site.description.clone(),
                created_by: site
                    .created_by
                    .clone()
                    .unwrap_or_else(|| site.user_name.clone()),
                user_id: UserId(site.user_id.clone()),
                user_name: site.user_name.clone(),
                created_at: site.created_at,
            };

            match self.insert_entry_with_id(&EntryId(site.id.clone()), &new)? {
                1 => stats.imported += 1,
                _ => stats.skipped += 1,
            }
        }

        tracing::info!(
            imported = stats.imported,
            skipped = stats.skipped,
            "legacy import finished"
        );
        Ok(stats)
    }
}
