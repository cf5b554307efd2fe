//! In-process backend for tests and offline demos.
//!
//! Implements every collaborator trait over plain collections, counts
//! calls per operation and can be told to fail specific operations.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use vibes_shared::{EntryId, EntryPatch, NewEntry, UserId, UserProfile, WebsiteEntry};

use crate::error::RemoteError;
use crate::remote::{EntryStore, ImageLoader, ProfileDirectory, RemoteResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Get,
    Create,
    Update,
    Delete,
    FindByUrl,
    FindByUser,
    GetProfile,
    PutProfile,
    LoadImage,
}

#[derive(Default)]
struct Inner {
    entries: Vec<WebsiteEntry>,
    profiles: HashMap<UserId, UserProfile>,
    images: HashMap<String, Vec<u8>>,
    next_id: u64,
    calls: HashMap<Op, usize>,
    failing: HashMap<Op, RemoteError>,
    failing_profiles: HashSet<UserId>,
    failing_updates: HashSet<EntryId>,
}

#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and fail it if requested.
    fn enter(&self, op: Op) -> RemoteResult<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        *inner.calls.entry(op).or_default() += 1;
        if let Some(err) = inner.failing.get(&op) {
            return Err(err.clone());
        }
        Ok(inner)
    }

    pub fn seed_entry(&self, entry: WebsiteEntry) {
        self.lock().entries.push(entry);
    }

    pub fn seed_profile(&self, profile: UserProfile) {
        self.lock().profiles.insert(profile.uid.clone(), profile);
    }

    pub fn seed_image(&self, url: impl Into<String>, bytes: Vec<u8>) {
        self.lock().images.insert(url.into(), bytes);
    }

    pub fn fail(&self, op: Op) {
        self.fail_with(op, RemoteError::Network(format!("{op:?} unavailable")));
    }

    /// Fail every call of `op` with a specific error until healed.
    pub fn fail_with(&self, op: Op, err: RemoteError) {
        self.lock().failing.insert(op, err);
    }

    pub fn heal(&self, op: Op) {
        self.lock().failing.remove(&op);
    }

    /// Make profile lookups for one user fail.
    pub fn fail_profile(&self, uid: &UserId) {
        self.lock().failing_profiles.insert(uid.clone());
    }

    /// Make updates of one entry fail.
    pub fn fail_update(&self, id: &EntryId) {
        self.lock().failing_updates.insert(id.clone());
    }

    pub fn calls(&self, op: Op) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> Vec<WebsiteEntry> {
        self.lock().entries.clone()
    }

    pub fn profile(&self, uid: &UserId) -> Option<UserProfile> {
        self.lock().profiles.get(uid).cloned()
    }
}

#[async_trait]
impl EntryStore for MemoryBackend {
    async fn list_entries(&self) -> RemoteResult<Vec<WebsiteEntry>> {
        let inner = self.enter(Op::List)?;
        Ok(inner.entries.clone())
    }

    async fn get_entry(&self, id: &EntryId) -> RemoteResult<Option<WebsiteEntry>> {
        let inner = self.enter(Op::Get)?;
        Ok(inner.entries.iter().find(|e| &e.id == id).cloned())
    }

    async fn create_entry(&self, entry: &NewEntry) -> RemoteResult<EntryId> {
        let mut inner = self.enter(Op::Create)?;
        inner.next_id += 1;
        let id = EntryId(format!("mem-{}", inner.next_id));
        inner
            .entries
            .push(WebsiteEntry::from_new(id.clone(), entry.clone()));
        Ok(id)
    }

    async fn update_entry(&self, id: &EntryId, patch: &EntryPatch) -> RemoteResult<()> {
        let mut inner = self.enter(Op::Update)?;
        if inner.failing_updates.contains(id) {
            return Err(RemoteError::Network(format!("update of {id} failed")));
        }
        let entry = inner
            .entries
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or(RemoteError::NotFound)?;
        entry.apply_patch(patch);
        Ok(())
    }

    async fn delete_entry(&self, id: &EntryId) -> RemoteResult<()> {
        let mut inner = self.enter(Op::Delete)?;
        let before = inner.entries.len();
        inner.entries.retain(|e| &e.id != id);
        if inner.entries.len() == before {
            return Err(RemoteError::NotFound);
        }
        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> RemoteResult<Vec<WebsiteEntry>> {
        let inner = self.enter(Op::FindByUrl)?;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.url == url)
            .cloned()
            .collect())
    }

    async fn find_by_user(&self, user_id: &UserId) -> RemoteResult<Vec<WebsiteEntry>> {
        let inner = self.enter(Op::FindByUser)?;
        Ok(inner
            .entries
            .iter()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProfileDirectory for MemoryBackend {
    async fn get_profile(&self, user_id: &UserId) -> RemoteResult<Option<UserProfile>> {
        let inner = self.enter(Op::GetProfile)?;
        if inner.failing_profiles.contains(user_id) {
            return Err(RemoteError::PermissionDenied(format!(
                "profile {user_id} unreadable"
            )));
        }
        Ok(inner.profiles.get(user_id).cloned())
    }

    async fn put_profile(&self, profile: &UserProfile) -> RemoteResult<()> {
        let mut inner = self.enter(Op::PutProfile)?;
        let merged = match inner.profiles.remove(&profile.uid) {
            Some(existing) => UserProfile {
                uid: profile.uid.clone(),
                display_name: profile.display_name.clone(),
                email: profile.email.clone().or(existing.email),
                photo_url: profile.photo_url.clone().or(existing.photo_url),
                is_admin: profile.is_admin || existing.is_admin,
            },
            None => profile.clone(),
        };
        inner.profiles.insert(merged.uid.clone(), merged);
        Ok(())
    }
}

#[async_trait]
impl ImageLoader for MemoryBackend {
    async fn load_image(&self, url: &str) -> RemoteResult<Vec<u8>> {
        let inner = self.enter(Op::LoadImage)?;
        inner.images.get(url).cloned().ok_or(RemoteError::NotFound)
    }
}
