//! Client side of the gallery: the reconciler that keeps a local list of
//! website entries in step with the document store, plus the upload and
//! profile flows built on it.

pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod http;
pub mod memory;
pub mod profile;
pub mod remote;
pub mod session;
pub mod state;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use config::GalleryConfig;
pub use error::{GalleryError, RemoteError};
pub use events::GalleryEvent;
pub use gallery::{CardView, DeleteOutcome, EntryFilter, Gallery};
pub use http::HttpBackend;
pub use memory::MemoryBackend;
pub use profile::{Navigation, RenameOutcome};
pub use remote::{Collaborators, EntryStore, IdentityProvider, ImageLoader, ProfileDirectory};
pub use session::LocalSession;
pub use upload::{ThumbnailUpload, UploadRequest};

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call twice.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vibes_client=debug")),
        )
        .try_init();
}
