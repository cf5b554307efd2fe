use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use vibes_shared::{EntryId, EntryPatch, Identity, NewEntry, ThumbnailSource, UserId, WebsiteEntry};

use crate::memory::{MemoryBackend, Op};
use crate::remote::{Collaborators, EntryStore, RemoteResult};
use crate::session::LocalSession;
use crate::{Gallery, GalleryConfig};

pub fn alice() -> Identity {
    Identity::new("u1", "Alice")
}

pub fn entry(id: &str, url: &str, user: &str, name: &str, created_at: i64) -> WebsiteEntry {
    WebsiteEntry {
        id: EntryId::new(id),
        url: url.into(),
        thumbnail: ThumbnailSource::generated_for(url),
        description: None,
        created_by: name.into(),
        user_id: UserId::new(user),
        user_name: name.into(),
        created_at,
    }
}

pub fn gallery_with(
    identity: Option<Identity>,
    config: GalleryConfig,
) -> (Gallery, Arc<MemoryBackend>, Arc<LocalSession>) {
    let backend = Arc::new(MemoryBackend::new());
    let session = Arc::new(match identity {
        Some(identity) => LocalSession::signed_in(identity),
        None => LocalSession::signed_out(None),
    });
    let gallery = Gallery::new(
        Collaborators::from_backend(session.clone(), backend.clone()),
        config,
    );
    (gallery, backend, session)
}

pub fn gallery_as(identity: Option<Identity>) -> (Gallery, Arc<MemoryBackend>, Arc<LocalSession>) {
    gallery_with(identity, GalleryConfig::default())
}

pub fn solid_png(rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([rgb[0], rgb[1], rgb[2], 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Entry store whose `op` calls park until released, for racing
/// disposal against in-flight work.
pub struct GatedStore {
    inner: Arc<MemoryBackend>,
    op: Op,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedStore {
    pub fn new(inner: Arc<MemoryBackend>, op: Op) -> Self {
        Self {
            inner,
            op,
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    async fn pass(&self, op: Op) {
        if op == self.op {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl EntryStore for GatedStore {
    async fn list_entries(&self) -> RemoteResult<Vec<WebsiteEntry>> {
        self.pass(Op::List).await;
        self.inner.list_entries().await
    }

    async fn get_entry(&self, id: &EntryId) -> RemoteResult<Option<WebsiteEntry>> {
        self.pass(Op::Get).await;
        self.inner.get_entry(id).await
    }

    async fn create_entry(&self, entry: &NewEntry) -> RemoteResult<EntryId> {
        self.pass(Op::Create).await;
        self.inner.create_entry(entry).await
    }

    async fn update_entry(&self, id: &EntryId, patch: &EntryPatch) -> RemoteResult<()> {
        self.pass(Op::Update).await;
        self.inner.update_entry(id, patch).await
    }

    async fn delete_entry(&self, id: &EntryId) -> RemoteResult<()> {
        self.pass(Op::Delete).await;
        self.inner.delete_entry(id).await
    }

    async fn find_by_url(&self, url: &str) -> RemoteResult<Vec<WebsiteEntry>> {
        self.pass(Op::FindByUrl).await;
        self.inner.find_by_url(url).await
    }

    async fn find_by_user(&self, user_id: &UserId) -> RemoteResult<Vec<WebsiteEntry>> {
        self.pass(Op::FindByUser).await;
        self.inner.find_by_user(user_id).await
    }
}

/// Gallery signed in as `identity` whose store gates `op`.
pub fn gated_gallery(
    identity: Identity,
    op: Op,
) -> (Gallery, Arc<MemoryBackend>, Arc<GatedStore>) {
    let backend = Arc::new(MemoryBackend::new());
    let gated = Arc::new(GatedStore::new(backend.clone(), op));
    let collaborators = Collaborators {
        identity: Arc::new(LocalSession::signed_in(identity)),
        entries: gated.clone(),
        profiles: backend.clone(),
        images: backend.clone(),
    };
    (
        Gallery::new(collaborators, GalleryConfig::default()),
        backend,
        gated,
    )
}
