//! Profile editing and the display-name fan-out.

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use vibes_shared::{EntryPatch, UserProfile, ValidationError};

use crate::error::GalleryError;
use crate::events::GalleryEvent;
use crate::gallery::{Gallery, Result};

/// Where the UI should go after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Navigation {
    Home,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub display_name: String,
    pub entries_updated: usize,
    pub navigate_to: Navigation,
}

impl Gallery {
    /// Name to prefill the profile form with: the stored profile name,
    /// falling back to the account's display name.
    pub async fn current_display_name(&self) -> Result<String> {
        let identity = self.identity.current().ok_or(GalleryError::NotSignedIn)?;
        let stored = self.profiles.get_profile(&identity.uid).await?;
        Ok(stored
            .map(|p| p.display_name)
            .filter(|n| !n.trim().is_empty())
            .or(identity.display_name)
            .unwrap_or_default())
    }

    /// Save a new display name and rewrite the author fields of every
    /// entry the account owns.
    pub async fn rename(&self, new_name: &str) -> Result<RenameOutcome> {
        self.ensure_alive()?;
        let identity = self
            .identity
            .current()
            .ok_or(GalleryError::NotSignedIn)
            .map_err(|e| self.report("rename", e))?;

        let name = new_name.trim();
        if name.is_empty() {
            return Err(self.report("rename", ValidationError::MissingDisplayName.into()));
        }

        let mut profile = UserProfile::new(identity.uid.clone(), name);
        profile.email = identity.email.clone();
        self.profiles
            .put_profile(&profile)
            .await
            .map_err(|e| self.report("rename", e.into()))?;
        self.identity
            .set_display_name(name)
            .await
            .map_err(|e| self.report("rename", e.into()))?;

        let owned = self
            .entries
            .find_by_user(&identity.uid)
            .await
            .map_err(|e| self.report("rename", e.into()))?;

        let patch = EntryPatch::rename(name);
        let results = join_all(
            owned
                .iter()
                .map(|entry| self.entries.update_entry(&entry.id, &patch)),
        )
        .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        let updated = results.len() - failed;

        if !self.is_alive() {
            return Err(GalleryError::Disposed);
        }

        if failed > 0 {
            warn!(uid = %identity.uid, updated, failed, "Rename fan-out incomplete, refreshing");
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Refresh after partial rename failed");
            }
            return Err(self.report(
                "rename",
                GalleryError::PartialFanOut { updated, failed },
            ));
        }

        self.lock_state().rename_user(&identity.uid, &patch);

        info!(uid = %identity.uid, entries = updated, "Display name updated");
        self.emit(GalleryEvent::Renamed {
            user_id: identity.uid,
            display_name: name.to_string(),
            entries: updated,
        });

        Ok(RenameOutcome {
            display_name: name.to_string(),
            entries_updated: updated,
            navigate_to: Navigation::Home,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Op;
    use crate::remote::IdentityProvider;
    use crate::test_support::*;
    use vibes_shared::{EntryId, UserId};

    #[tokio::test]
    async fn test_rename_fans_out_to_owned_entries() {
        let (gallery, backend, session) = gallery_as(Some(alice()));
        backend.seed_entry(entry("e1", "https://a.com", "u1", "Alice", 3));
        backend.seed_entry(entry("e2", "https://b.com", "u1", "Alice", 2));
        backend.seed_entry(entry("e3", "https://c.com", "u2", "Bob", 1));
        gallery.load().await.unwrap();

        let outcome = gallery.rename("  Alicia ").await.unwrap();
        assert_eq!(
            outcome,
            RenameOutcome {
                display_name: "Alicia".into(),
                entries_updated: 2,
                navigate_to: Navigation::Home,
            }
        );

        for e in backend.entries() {
            if e.user_id == UserId::new("u1") {
                assert_eq!(e.user_name, "Alicia");
                assert_eq!(e.created_by, "Alicia");
            } else {
                assert_eq!(e.user_name, "Bob");
            }
        }
        let local = gallery.entry(&EntryId::new("e1")).unwrap();
        assert_eq!(local.user_name, "Alicia");
        assert_eq!(
            backend.profile(&UserId::new("u1")).map(|p| p.display_name),
            Some("Alicia".to_string())
        );
        assert_eq!(
            session.current().and_then(|i| i.display_name),
            Some("Alicia".to_string())
        );
        assert_eq!(backend.calls(Op::Update), 2);
    }

    #[tokio::test]
    async fn test_rename_with_no_entries_still_navigates_home() {
        let (gallery, _, _) = gallery_as(Some(alice()));
        let outcome = gallery.rename("Alicia").await.unwrap();
        assert_eq!(outcome.entries_updated, 0);
        assert_eq!(outcome.navigate_to, Navigation::Home);
    }

    #[tokio::test]
    async fn test_rename_partial_failure_reports_counts() {
        let (gallery, backend, _) = gallery_as(Some(alice()));
        backend.seed_entry(entry("e1", "https://a.com", "u1", "Alice", 2));
        backend.seed_entry(entry("e2", "https://b.com", "u1", "Alice", 1));
        backend.fail_update(&EntryId::new("e2"));
        gallery.load().await.unwrap();

        let result = gallery.rename("Alicia").await;
        assert_eq!(
            result,
            Err(GalleryError::PartialFanOut {
                updated: 1,
                failed: 1
            })
        );
        // refreshed from the store, which holds the mixed result
        let e1 = gallery.entry(&EntryId::new("e1")).unwrap();
        let e2 = gallery.entry(&EntryId::new("e2")).unwrap();
        assert_eq!(e1.created_by, "Alicia");
        assert_eq!(e2.created_by, "Alice");
        assert_eq!(backend.calls(Op::List), 2);
    }

    #[tokio::test]
    async fn test_rename_requires_name_and_identity() {
        let (gallery, backend, _) = gallery_as(Some(alice()));
        assert_eq!(
            gallery.rename("   ").await,
            Err(GalleryError::Validation(ValidationError::MissingDisplayName))
        );
        assert_eq!(backend.calls(Op::PutProfile), 0);

        let (signed_out, _, _) = gallery_as(None);
        assert_eq!(
            signed_out.rename("Name").await,
            Err(GalleryError::NotSignedIn)
        );
    }

    #[tokio::test]
    async fn test_current_display_name_prefers_profile() {
        let (gallery, backend, _) = gallery_as(Some(alice()));
        assert_eq!(gallery.current_display_name().await.unwrap(), "Alice");

        backend.seed_profile(UserProfile::new(UserId::new("u1"), "Stored"));
        assert_eq!(gallery.current_display_name().await.unwrap(), "Stored");
    }
}
