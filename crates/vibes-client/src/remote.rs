//! Contracts for the services the gallery depends on.
//!
//! The gallery never reaches these services directly; it is handed
//! implementations at construction time (see [`crate::http::HttpBackend`],
//! [`crate::memory::MemoryBackend`] and [`crate::session::LocalSession`]).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use vibes_shared::{EntryId, EntryPatch, Identity, NewEntry, UserId, UserProfile, WebsiteEntry};

use crate::error::RemoteError;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// The signed-in account, if any. The gallery only reads it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Identity>;

    /// Receives every sign-in, sign-out and profile change.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    async fn sign_in(&self) -> RemoteResult<Identity>;

    async fn sign_out(&self) -> RemoteResult<()>;

    /// Update the account's display name at the provider.
    async fn set_display_name(&self, name: &str) -> RemoteResult<()>;
}

/// The `websites` collection.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn list_entries(&self) -> RemoteResult<Vec<WebsiteEntry>>;

    async fn get_entry(&self, id: &EntryId) -> RemoteResult<Option<WebsiteEntry>>;

    /// Store a new document and return its assigned id.
    async fn create_entry(&self, entry: &NewEntry) -> RemoteResult<EntryId>;

    async fn update_entry(&self, id: &EntryId, patch: &EntryPatch) -> RemoteResult<()>;

    async fn delete_entry(&self, id: &EntryId) -> RemoteResult<()>;

    /// Equality query on `url`.
    async fn find_by_url(&self, url: &str) -> RemoteResult<Vec<WebsiteEntry>>;

    /// Equality query on `userId`.
    async fn find_by_user(&self, user_id: &UserId) -> RemoteResult<Vec<WebsiteEntry>>;
}

/// The `users` collection.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_profile(&self, user_id: &UserId) -> RemoteResult<Option<UserProfile>>;

    /// Merge-write a profile document.
    async fn put_profile(&self, profile: &UserProfile) -> RemoteResult<()>;
}

/// Fetches thumbnail bytes for color sampling.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load_image(&self, url: &str) -> RemoteResult<Vec<u8>>;
}

/// Everything a [`crate::Gallery`] talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub entries: Arc<dyn EntryStore>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub images: Arc<dyn ImageLoader>,
}

impl Collaborators {
    /// Use one backend for the store, profiles and images.
    pub fn from_backend<B>(identity: Arc<dyn IdentityProvider>, backend: Arc<B>) -> Self
    where
        B: EntryStore + ProfileDirectory + ImageLoader + 'static,
    {
        Self {
            identity,
            entries: backend.clone(),
            profiles: backend.clone(),
            images: backend,
        }
    }
}
