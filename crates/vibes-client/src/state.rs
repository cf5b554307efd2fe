//! In-memory view of the gallery.
//!
//! [`GalleryState`] sits behind a `std::sync::Mutex` inside
//! [`crate::Gallery`]. It is only touched between awaits; remote calls
//! never run with the lock held.

use std::collections::{HashMap, HashSet};

use vibes_shared::{EntryId, EntryPatch, Gradient, UserId, WebsiteEntry};

#[derive(Debug, Default)]
pub struct GalleryState {
    /// Entries newest first.
    pub entries: Vec<WebsiteEntry>,

    /// Resolved display names keyed by uploader id.
    pub user_names: HashMap<UserId, String>,

    /// Overlay gradient per entry. Starts as the URL hash and may be
    /// replaced once a thumbnail has been sampled.
    pub gradients: HashMap<EntryId, Gradient>,

    /// Entries with a delete or edit in flight.
    pub pending: HashSet<EntryId>,

    pub loading: bool,

    /// Set after the first successful load.
    pub loaded: bool,
}

/// Result of one load, built off-lock and swapped in whole.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub entries: Vec<WebsiteEntry>,
    pub user_names: HashMap<UserId, String>,
    pub gradients: HashMap<EntryId, Gradient>,
}

impl GalleryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, snapshot: Snapshot) {
        self.entries = snapshot.entries;
        self.user_names = snapshot.user_names;
        self.gradients = snapshot.gradients;
        self.pending.retain(|id| self.gradients.contains_key(id));
        self.loaded = true;
    }

    pub fn get(&self, id: &EntryId) -> Option<&WebsiteEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.gradients.contains_key(id)
    }

    pub fn remove(&mut self, id: &EntryId) -> Option<WebsiteEntry> {
        let pos = self.entries.iter().position(|e| &e.id == id)?;
        self.gradients.remove(id);
        self.pending.remove(id);
        Some(self.entries.remove(pos))
    }

    /// Apply a patch to the local copy. Returns false if the entry is gone.
    pub fn patch(&mut self, id: &EntryId, patch: &EntryPatch) -> bool {
        match self.entries.iter_mut().find(|e| &e.id == id) {
            Some(entry) => {
                entry.apply_patch(patch);
                true
            }
            None => false,
        }
    }

    /// Insert keeping newest-first order.
    pub fn insert_sorted(&mut self, entry: WebsiteEntry, gradient: Gradient) {
        let pos = self
            .entries
            .iter()
            .position(|e| e.created_at < entry.created_at)
            .unwrap_or(self.entries.len());
        self.gradients.insert(entry.id.clone(), gradient);
        self.entries.insert(pos, entry);
    }

    /// Rewrite the author fields of every entry owned by `user_id`.
    pub fn rename_user(&mut self, user_id: &UserId, patch: &EntryPatch) -> usize {
        if let Some(ref name) = patch.user_name {
            self.user_names.insert(user_id.clone(), name.clone());
        }
        let mut touched = 0;
        for entry in self.entries.iter_mut().filter(|e| &e.user_id == user_id) {
            entry.apply_patch(patch);
            touched += 1;
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibes_shared::{gradient_for, Palette, ThumbnailSource};

    fn entry(id: &str, user: &str, created_at: i64) -> WebsiteEntry {
        let url = format!("https://{id}.com");
        WebsiteEntry {
            id: EntryId::new(id),
            thumbnail: ThumbnailSource::generated_for(&url),
            url,
            description: None,
            created_by: user.into(),
            user_id: UserId::new(user),
            user_name: user.into(),
            created_at,
        }
    }

    fn grad(e: &WebsiteEntry) -> Gradient {
        gradient_for(&e.url, Palette::Dark)
    }

    #[test]
    fn test_insert_sorted_keeps_newest_first() {
        let mut state = GalleryState::new();
        for (id, ts) in [("a", 300), ("b", 100), ("c", 200)] {
            let e = entry(id, "u1", ts);
            let g = grad(&e);
            state.insert_sorted(e, g);
        }
        let order: Vec<_> = state.entries.iter().map(|e| e.created_at).collect();
        assert_eq!(order, vec![300, 200, 100]);
        assert_eq!(state.gradients.len(), 3);
    }

    #[test]
    fn test_remove_drops_gradient() {
        let mut state = GalleryState::new();
        let e = entry("a", "u1", 1);
        let g = grad(&e);
        state.insert_sorted(e, g);

        assert!(state.remove(&EntryId::new("a")).is_some());
        assert!(state.entries.is_empty());
        assert!(!state.contains(&EntryId::new("a")));
        assert!(state.remove(&EntryId::new("a")).is_none());
    }

    #[test]
    fn test_rename_user_only_touches_owner() {
        let mut state = GalleryState::new();
        for e in [entry("a", "u1", 2), entry("b", "u2", 1)] {
            let g = grad(&e);
            state.insert_sorted(e, g);
        }
        let touched = state.rename_user(&UserId::new("u1"), &EntryPatch::rename("Zed"));
        assert_eq!(touched, 1);
        assert_eq!(state.entries[0].user_name, "Zed");
        assert_eq!(state.entries[0].created_by, "Zed");
        assert_eq!(state.entries[1].user_name, "u2");
        assert_eq!(state.user_names[&UserId::new("u1")], "Zed");
    }
}
