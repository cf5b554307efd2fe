use thiserror::Error;

use vibes_shared::{EntryId, ValidationError};

/// Failure reported by a remote collaborator (store, profile directory,
/// image host, identity provider).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unexpected response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Protocol(e.to_string())
        } else {
            RemoteError::Network(e.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Only the uploader can change this entry")]
    NotOwner,

    #[error("URL already in the gallery: {0}")]
    DuplicateUrl(String),

    #[error("Entry not found: {0}")]
    NotFound(EntryId),

    #[error("Remote operation failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Gallery was disposed")]
    Disposed,

    #[error("Renamed {updated} entries, {failed} failed")]
    PartialFanOut { updated: usize, failed: usize },
}

impl GalleryError {
    /// Short message for the inline error banner.
    pub fn user_message(&self) -> String {
        match self {
            GalleryError::Validation(e) => e.to_string(),
            GalleryError::NotSignedIn => "You must be logged in to do that.".into(),
            GalleryError::NotOwner => "You can only change websites you added.".into(),
            GalleryError::DuplicateUrl(_) => {
                "This website URL already exists in the gallery. Please add a different URL."
                    .into()
            }
            GalleryError::NotFound(_) => "That website no longer exists.".into(),
            GalleryError::Remote(RemoteError::PermissionDenied(_)) => {
                "You don't have permission to do that.".into()
            }
            GalleryError::Remote(_) => "Something went wrong. Please try again.".into(),
            GalleryError::Disposed => String::new(),
            GalleryError::PartialFanOut { failed, .. } => format!(
                "Profile saved, but {failed} of your websites still show the old name. Please try again."
            ),
        }
    }
}
