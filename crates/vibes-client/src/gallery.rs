//! The gallery reconciler.
//!
//! A [`Gallery`] keeps a local list of website entries in step with the
//! remote store. Loading fetches the collection, resolves uploader names
//! concurrently and assigns each entry a deterministic overlay gradient.
//! Deletes and edits are confirmed remotely before the local list changes.
//!
//! Once [`Gallery::dispose`] has been called, no in-flight operation will
//! write to the state again.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use futures::stream::{self, BoxStream, FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use vibes_shared::color::sample_gradient;
use vibes_shared::constants::ANONYMOUS_NAME;
use vibes_shared::{
    gradient_for, EntryId, EntryPatch, Gradient, Identity, UserId, WebsiteEntry,
};

use crate::config::GalleryConfig;
use crate::error::GalleryError;
use crate::events::{emit_event, GalleryEvent, EVENT_CHANNEL_CAPACITY};
use crate::remote::{Collaborators, EntryStore, IdentityProvider, ImageLoader, ProfileDirectory};
use crate::state::{GalleryState, Snapshot};
use crate::upload::validate_description;

pub type Result<T> = std::result::Result<T, GalleryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The confirmation callback declined.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryFilter {
    #[default]
    All,
    /// Entries uploaded by the signed-in account.
    Mine,
}

impl EntryFilter {
    pub fn matches(self, entry: &WebsiteEntry, identity: Option<&Identity>) -> bool {
        match self {
            EntryFilter::All => true,
            EntryFilter::Mine => identity.is_some_and(|id| entry.is_owned_by(&id.uid)),
        }
    }
}

/// Everything a card needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: EntryId,
    pub url: String,
    pub display_url: String,
    pub thumbnail_src: String,
    pub inline_thumbnail: bool,
    pub description: Option<String>,
    pub created_by: String,
    pub author: String,
    pub gradient: Gradient,
    /// Show edit and delete controls.
    pub can_manage: bool,
    /// A delete or edit is in flight.
    pub busy: bool,
}

#[derive(Clone)]
pub struct Gallery {
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) entries: Arc<dyn EntryStore>,
    pub(crate) profiles: Arc<dyn ProfileDirectory>,
    pub(crate) images: Arc<dyn ImageLoader>,
    pub(crate) config: GalleryConfig,
    state: Arc<Mutex<GalleryState>>,
    alive: Arc<AtomicBool>,
    events: broadcast::Sender<GalleryEvent>,
}

impl Gallery {
    pub fn new(collaborators: Collaborators, config: GalleryConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            identity: collaborators.identity,
            entries: collaborators.entries,
            profiles: collaborators.profiles,
            images: collaborators.images,
            config,
            state: Arc::new(Mutex::new(GalleryState::new())),
            alive: Arc::new(AtomicBool::new(true)),
            events,
        }
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GalleryEvent> {
        self.events.subscribe()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.current()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Stop applying results. Pending operations finish remotely but their
    /// outcomes are discarded.
    pub fn dispose(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("Gallery disposed");
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(GalleryError::Disposed)
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, GalleryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn emit(&self, event: GalleryEvent) {
        emit_event(&self.events, event);
    }

    /// Log a failure and surface it as an inline notice.
    pub(crate) fn report(&self, operation: &str, err: GalleryError) -> GalleryError {
        if err != GalleryError::Disposed {
            error!(operation, error = %err, "Gallery operation failed");
            self.emit(GalleryEvent::Notice {
                message: err.user_message(),
            });
        }
        err
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub fn is_loading(&self) -> bool {
        self.lock_state().loading
    }

    pub fn is_loaded(&self) -> bool {
        self.lock_state().loaded
    }

    /// Current entries, newest first.
    pub fn entries(&self) -> Vec<WebsiteEntry> {
        self.lock_state().entries.clone()
    }

    pub fn entry(&self, id: &EntryId) -> Option<WebsiteEntry> {
        self.lock_state().get(id).cloned()
    }

    pub fn gradient(&self, id: &EntryId) -> Option<Gradient> {
        self.lock_state().gradients.get(id).copied()
    }

    pub fn user_name(&self, uid: &UserId) -> Option<String> {
        self.lock_state().user_names.get(uid).cloned()
    }

    /// Entries matching an arbitrary predicate, newest first.
    pub fn filter<F>(&self, predicate: F) -> Vec<WebsiteEntry>
    where
        F: Fn(&WebsiteEntry) -> bool,
    {
        self.lock_state()
            .entries
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    pub fn visible(&self, filter: EntryFilter) -> Vec<WebsiteEntry> {
        let identity = self.identity.current();
        self.filter(|e| filter.matches(e, identity.as_ref()))
    }

    pub fn cards(&self, filter: EntryFilter) -> Vec<CardView> {
        let identity = self.identity.current();
        let state = self.lock_state();
        state
            .entries
            .iter()
            .filter(|e| filter.matches(e, identity.as_ref()))
            .map(|e| CardView {
                id: e.id.clone(),
                url: e.url.clone(),
                display_url: e.display_url().to_string(),
                thumbnail_src: e.thumbnail.display_src(),
                inline_thumbnail: e.thumbnail.is_inline(),
                description: e.description.clone(),
                created_by: e.created_by.clone(),
                author: if e.user_name.trim().is_empty() {
                    ANONYMOUS_NAME.to_string()
                } else {
                    e.user_name.clone()
                },
                gradient: state
                    .gradients
                    .get(&e.id)
                    .copied()
                    .unwrap_or_else(|| gradient_for(&e.url, self.config.palette)),
                can_manage: identity.as_ref().is_some_and(|id| e.is_owned_by(&id.uid)),
                busy: state.pending.contains(&e.id),
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------------

    /// Fetch the full collection and replace the local state.
    /// Returns the number of entries loaded.
    pub async fn load(&self) -> Result<usize> {
        self.ensure_alive()?;
        self.lock_state().loading = true;

        let result = self.fetch_snapshot().await;

        if !self.is_alive() {
            self.lock_state().loading = false;
            return Err(GalleryError::Disposed);
        }

        let mut state = self.lock_state();
        state.loading = false;
        match result {
            Ok(snapshot) => {
                let count = snapshot.entries.len();
                state.replace(snapshot);
                drop(state);
                info!(count, "Gallery loaded");
                self.emit(GalleryEvent::Loaded { count });
                Ok(count)
            }
            Err(e) => {
                drop(state);
                Err(self.report("load", e))
            }
        }
    }

    /// Same as [`Gallery::load`]; used after a partial failure.
    pub async fn refresh(&self) -> Result<usize> {
        self.load().await
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let mut entries = self.entries.list_entries().await?;

        let uploaders: BTreeSet<UserId> = entries
            .iter()
            .map(|e| e.user_id.clone())
            .filter(|uid| !uid.is_guest())
            .collect();

        let lookups = uploaders.into_iter().map(|uid| async move {
            let result = self.profiles.get_profile(&uid).await;
            (uid, result)
        });

        let mut user_names = HashMap::new();
        for (uid, result) in join_all(lookups).await {
            match result {
                Ok(Some(profile)) if !profile.display_name.trim().is_empty() => {
                    user_names.insert(uid, profile.display_name);
                }
                Ok(_) => {}
                Err(e) => warn!(uid = %uid, error = %e, "Profile lookup failed, keeping stored name"),
            }
        }

        for entry in entries.iter_mut() {
            match user_names.get(&entry.user_id) {
                Some(name) => entry.user_name = name.clone(),
                None => {
                    user_names.insert(entry.user_id.clone(), entry.user_name.clone());
                }
            }
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let gradients = entries
            .iter()
            .map(|e| (e.id.clone(), gradient_for(&e.url, self.config.palette)))
            .collect();

        Ok(Snapshot {
            entries,
            user_names,
            gradients,
        })
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Look up an entry and check that the signed-in account owns it.
    fn owned_entry(&self, id: &EntryId) -> Result<(Identity, WebsiteEntry)> {
        let identity = self.identity.current().ok_or(GalleryError::NotSignedIn)?;
        let entry = self
            .entry(id)
            .ok_or_else(|| GalleryError::NotFound(id.clone()))?;
        if !entry.is_owned_by(&identity.uid) {
            warn!(id = %id, uid = %identity.uid, "Refusing to modify entry owned by another user");
            return Err(GalleryError::NotOwner);
        }
        Ok((identity, entry))
    }

    /// Delete an entry after `confirm` approves it. The local list only
    /// changes once the store has confirmed the delete.
    pub async fn delete<C>(&self, id: &EntryId, confirm: C) -> Result<DeleteOutcome>
    where
        C: FnOnce(&WebsiteEntry) -> bool,
    {
        self.ensure_alive()?;
        let (_, entry) = self
            .owned_entry(id)
            .map_err(|e| self.report("delete", e))?;

        if !confirm(&entry) {
            debug!(id = %id, "Delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        self.lock_state().pending.insert(id.clone());
        let result = self.entries.delete_entry(id).await;

        if !self.is_alive() {
            return Err(GalleryError::Disposed);
        }

        let mut state = self.lock_state();
        state.pending.remove(id);
        match result {
            Ok(()) => {
                state.remove(id);
                drop(state);
                info!(id = %id, "Entry deleted");
                self.emit(GalleryEvent::EntryRemoved { id: id.clone() });
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                drop(state);
                Err(self.report("delete", e.into()))
            }
        }
    }

    /// Change the description and credited creator of an owned entry.
    pub async fn edit(
        &self,
        id: &EntryId,
        description: &str,
        created_by: &str,
    ) -> Result<WebsiteEntry> {
        self.ensure_alive()?;
        let (identity, _) = self.owned_entry(id).map_err(|e| self.report("edit", e))?;

        let description = validate_description(description, self.config.max_description_len)
            .map_err(|e| self.report("edit", e.into()))?;
        let created_by = resolve_created_by(Some(&identity), created_by);

        let patch = EntryPatch {
            description: Some(description),
            created_by: Some(created_by),
            user_name: None,
        };

        self.lock_state().pending.insert(id.clone());
        let result = self.entries.update_entry(id, &patch).await;

        if !self.is_alive() {
            return Err(GalleryError::Disposed);
        }

        let mut state = self.lock_state();
        state.pending.remove(id);
        match result {
            Ok(()) => {
                state.patch(id, &patch);
                let updated = state
                    .get(id)
                    .cloned()
                    .ok_or_else(|| GalleryError::NotFound(id.clone()));
                drop(state);
                info!(id = %id, "Entry updated");
                self.emit(GalleryEvent::EntryUpdated { id: id.clone() });
                updated
            }
            Err(e) => {
                drop(state);
                Err(self.report("edit", e.into()))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Gradient refinement
    // ------------------------------------------------------------------------

    /// Sample each entry's thumbnail and replace its hash gradient with a
    /// color-derived one. Inline thumbnails are skipped. Failures keep the
    /// hash gradient. Returns how many gradients were replaced.
    pub async fn refine_gradients(&self) -> usize {
        if !self.is_alive() {
            return 0;
        }

        let targets: Vec<(EntryId, String)> = self
            .lock_state()
            .entries
            .iter()
            .filter_map(|e| e.thumbnail.fetch_url().map(|url| (e.id.clone(), url)))
            .collect();

        let palette = self.config.palette;
        let work = targets.into_iter().map(|(id, url)| {
            let images = self.images.clone();
            async move {
                let outcome = match images.load_image(&url).await {
                    Ok(bytes) => sample_gradient(&bytes, palette).map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                (id, outcome)
            }
        });

        let mut results: BoxStream<'_, (EntryId, std::result::Result<Gradient, String>)> =
            match self.config.refine_concurrency {
                Some(limit) if limit > 0 => stream::iter(work).buffer_unordered(limit).boxed(),
                _ => work.collect::<FuturesUnordered<_>>().boxed(),
            };

        let mut refined = 0;
        while let Some((id, outcome)) = results.next().await {
            if !self.is_alive() {
                return refined;
            }
            match outcome {
                Ok(gradient) => {
                    let mut state = self.lock_state();
                    if !state.contains(&id) {
                        continue;
                    }
                    state.gradients.insert(id.clone(), gradient);
                    drop(state);
                    refined += 1;
                    self.emit(GalleryEvent::GradientRefined { id, gradient });
                }
                Err(e) => debug!(id = %id, error = %e, "Keeping hash gradient"),
            }
        }
        refined
    }
}

/// Creator credit: the signed-in account's name, or the typed value for
/// guests.
pub fn resolve_created_by(identity: Option<&Identity>, requested: &str) -> String {
    match identity {
        Some(identity) => identity.name_or_anonymous(),
        None => {
            let trimmed = requested.trim();
            if trimmed.is_empty() {
                ANONYMOUS_NAME.to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}
