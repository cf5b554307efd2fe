//! Submitting new entries.

use tracing::{info, warn};

use vibes_shared::constants::ANONYMOUS_NAME;
use vibes_shared::urls::{normalize_url, scheme_variants};
use vibes_shared::{gradient_for, NewEntry, ThumbnailSource, UserId, ValidationError, WebsiteEntry};

use crate::error::{GalleryError, RemoteError};
use crate::events::GalleryEvent;
use crate::gallery::{resolve_created_by, Gallery, Result};

/// An image picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailUpload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    /// As typed; a missing scheme becomes `https://`.
    pub url: String,
    pub description: String,
    /// Without one the screenshot proxy supplies the thumbnail.
    pub thumbnail: Option<ThumbnailUpload>,
    /// Creator credit typed by a guest. Ignored when signed in.
    pub created_by: String,
}

/// Trim and bound a description.
pub fn validate_description(
    text: &str,
    max_len: usize,
) -> std::result::Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingDescription);
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::DescriptionTooLong { max: max_len });
    }
    Ok(trimmed.to_string())
}

impl Gallery {
    /// Validate, de-duplicate and store a new entry, then insert it into
    /// the local list.
    pub async fn upload(&self, request: UploadRequest) -> Result<WebsiteEntry> {
        self.ensure_alive()?;
        let new = self
            .prepare_upload(request)
            .map_err(|e| self.report("upload", e))?;

        if self
            .url_taken(&new.url)
            .await
            .map_err(|e| self.report("upload", e))?
        {
            warn!(url = %new.url, "Rejecting duplicate URL");
            return Err(self.report("upload", GalleryError::DuplicateUrl(new.url)));
        }

        let id = match self.entries.create_entry(&new).await {
            Ok(id) => id,
            Err(RemoteError::Conflict(reason)) => {
                warn!(url = %new.url, %reason, "Store rejected duplicate URL");
                return Err(self.report("upload", GalleryError::DuplicateUrl(new.url)));
            }
            Err(e) => return Err(self.report("upload", e.into())),
        };

        if !self.is_alive() {
            return Err(GalleryError::Disposed);
        }

        let entry = WebsiteEntry::from_new(id, new);
        let gradient = gradient_for(&entry.url, self.config.palette);
        self.lock_state().insert_sorted(entry.clone(), gradient);

        info!(id = %entry.id, url = %entry.url, "Entry added");
        self.emit(GalleryEvent::EntryAdded {
            id: entry.id.clone(),
        });
        Ok(entry)
    }

    /// Build the document without touching the network.
    fn prepare_upload(&self, request: UploadRequest) -> Result<NewEntry> {
        let identity = self.identity.current();
        if identity.is_none() && !self.config.allow_guest_uploads {
            return Err(GalleryError::NotSignedIn);
        }

        let url = normalize_url(&request.url)?;
        let description = validate_description(&request.description, self.config.max_description_len)?;

        let thumbnail = match request.thumbnail {
            Some(upload) => {
                ThumbnailSource::inline(&upload.mime, upload.bytes, self.config.max_thumbnail_bytes)?
            }
            None => ThumbnailSource::generated_for(&url),
        };

        let created_by = resolve_created_by(identity.as_ref(), &request.created_by);
        let (user_id, user_name) = match identity {
            Some(identity) => {
                let name = identity.name_or_anonymous();
                (identity.uid, name)
            }
            None => (UserId::guest(), ANONYMOUS_NAME.to_string()),
        };

        Ok(NewEntry {
            url,
            thumbnail,
            description: Some(description),
            created_by,
            user_id,
            user_name,
            created_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Whether the URL is stored under either scheme.
    async fn url_taken(&self, url: &str) -> Result<bool> {
        let (http, https) = scheme_variants(url);
        let (a, b) = futures::try_join!(
            self.entries.find_by_url(&http),
            self.entries.find_by_url(&https)
        )?;
        Ok(!a.is_empty() || !b.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Op;
    use crate::test_support::*;
    use crate::GalleryConfig;

    fn request(url: &str) -> UploadRequest {
        UploadRequest {
            url: url.into(),
            description: "A nice site".into(),
            ..UploadRequest::default()
        }
    }

    #[tokio::test]
    async fn test_upload_normalizes_and_inserts() {
        let (gallery, backend, _) = gallery_as(Some(alice()));
        backend.seed_entry(entry("old", "https://old.com", "u2", "Bob", 1));
        gallery.load().await.unwrap();

        let added = gallery.upload(request("  example.com/page ")).await.unwrap();
        assert_eq!(added.url, "https://example.com/page");
        assert_eq!(added.user_id, UserId::new("u1"));
        assert_eq!(added.user_name, "Alice");
        assert_eq!(added.created_by, "Alice");
        assert_eq!(
            added.thumbnail,
            ThumbnailSource::generated_for("https://example.com/page")
        );

        let entries = gallery.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, added.id);
        assert!(gallery.gradient(&added.id).is_some());
        assert_eq!(backend.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_rejects_duplicate_across_schemes() {
        let (gallery, backend, _) = gallery_as(Some(alice()));
        backend.seed_entry(entry("e1", "http://example.com", "u2", "Bob", 1));

        let result = gallery.upload(request("https://example.com")).await;
        assert_eq!(
            result,
            Err(GalleryError::DuplicateUrl("https://example.com".into()))
        );
        assert_eq!(backend.calls(Op::FindByUrl), 2);
        assert_eq!(backend.calls(Op::Create), 0);
    }

    #[tokio::test]
    async fn test_upload_store_conflict_reports_duplicate() {
        let (gallery, backend, _) = gallery_as(Some(alice()));
        backend.fail_with(
            Op::Create,
            RemoteError::Conflict("https://a.com is already listed".into()),
        );

        let err = gallery.upload(request("a.com")).await.unwrap_err();
        assert_eq!(err, GalleryError::DuplicateUrl("https://a.com".into()));
        assert_eq!(
            err.user_message(),
            "This website URL already exists in the gallery. Please add a different URL."
        );
        assert!(gallery.entries().is_empty());

        backend.heal(Op::Create);
        let added = gallery.upload(request("b.com")).await.unwrap();
        assert_eq!(gallery.entries()[0].id, added.id);
    }

    #[tokio::test]
    async fn test_upload_validation_before_network() {
        let (gallery, backend, _) = gallery_as(Some(alice()));

        let mut missing = request("  ");
        assert_eq!(
            gallery.upload(missing.clone()).await,
            Err(GalleryError::Validation(ValidationError::MissingUrl))
        );
        missing.url = "a.com".into();
        missing.description = " ".into();
        assert_eq!(
            gallery.upload(missing).await,
            Err(GalleryError::Validation(ValidationError::MissingDescription))
        );

        let mut not_image = request("a.com");
        not_image.thumbnail = Some(ThumbnailUpload {
            mime: "text/plain".into(),
            bytes: vec![1, 2, 3],
        });
        assert_eq!(
            gallery.upload(not_image).await,
            Err(GalleryError::Validation(ValidationError::NotAnImage))
        );

        let mut too_big = request("a.com");
        too_big.thumbnail = Some(ThumbnailUpload {
            mime: "image/png".into(),
            bytes: vec![0; 2 * 1024 * 1024 + 1],
        });
        assert!(matches!(
            gallery.upload(too_big).await,
            Err(GalleryError::Validation(ValidationError::ThumbnailTooLarge { .. }))
        ));

        assert_eq!(backend.calls(Op::FindByUrl), 0);
        assert_eq!(backend.calls(Op::Create), 0);
    }

    #[tokio::test]
    async fn test_upload_inline_thumbnail() {
        let (gallery, _, _) = gallery_as(Some(alice()));
        let mut req = request("inline.com");
        req.thumbnail = Some(ThumbnailUpload {
            mime: "image/png".into(),
            bytes: solid_png([1, 2, 3]),
        });
        let added = gallery.upload(req).await.unwrap();
        assert!(added.thumbnail.is_inline());
    }

    #[tokio::test]
    async fn test_guest_upload_depends_on_config() {
        let (gallery, backend, _) = gallery_as(None);
        assert_eq!(
            gallery.upload(request("a.com")).await,
            Err(GalleryError::NotSignedIn)
        );
        assert_eq!(backend.calls(Op::Create), 0);

        let config = GalleryConfig {
            allow_guest_uploads: true,
            ..GalleryConfig::default()
        };
        let (gallery, _, _) = gallery_with(None, config);
        let mut req = request("a.com");
        req.created_by = "Pat".into();
        let added = gallery.upload(req).await.unwrap();
        assert!(added.user_id.is_guest());
        assert_eq!(added.user_name, "Anonymous");
        assert_eq!(added.created_by, "Pat");
    }

    #[test]
    fn test_validate_description_counts_chars() {
        let exactly = "é".repeat(100);
        assert_eq!(validate_description(&exactly, 100), Ok(exactly.clone()));
        assert!(validate_description(&format!("{exactly}é"), 100).is_err());
    }
}
