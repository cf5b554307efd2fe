use serde::Serialize;
use tokio::sync::broadcast;

use vibes_shared::{EntryId, Gradient, UserId};

pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notifications for whatever renders the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GalleryEvent {
    #[serde(rename_all = "camelCase")]
    Loaded { count: usize },
    EntryAdded { id: EntryId },
    EntryRemoved { id: EntryId },
    EntryUpdated { id: EntryId },
    GradientRefined { id: EntryId, gradient: Gradient },
    #[serde(rename_all = "camelCase")]
    Renamed {
        user_id: UserId,
        display_name: String,
        entries: usize,
    },
    /// Inline error banner text.
    Notice { message: String },
}

pub fn emit_event(tx: &broadcast::Sender<GalleryEvent>, event: GalleryEvent) {
    if let Err(e) = tx.send(event) {
        tracing::trace!(event = ?e.0, "No gallery event subscribers");
    }
}
