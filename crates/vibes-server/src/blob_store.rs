//! Uploaded files on local disk, addressed by relative path
//! (e.g. `thumbnails/<uid>/<name>.png`).

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::ServerError;

/// Resolve `key` under `base`, rejecting anything that could climb out.
fn resolve_key(base: &Path, key: &str) -> Result<PathBuf, ServerError> {
    let key = key.trim_start_matches('/');
    if key.is_empty() || key.contains('\\') || key.contains('\0') {
        return Err(ServerError::BadRequest(format!("Invalid file path: {key:?}")));
    }

    let mut resolved = base.to_path_buf();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(segment) => resolved.push(segment),
            Component::CurDir => {}
            _ => {
                return Err(ServerError::BadRequest(
                    "Path traversal detected".to_string(),
                ))
            }
        }
    }
    if resolved == base {
        return Err(ServerError::BadRequest(format!("Invalid file path: {key:?}")));
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    max_size: usize,
}

impl BlobStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::BlobStorage(format!(
                "Failed to create file directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Write `data` at `key`, replacing any previous file. Returns the
    /// normalized key.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<String, ServerError> {
        if data.is_empty() {
            return Err(ServerError::BadRequest("Empty file".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::PayloadTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let path = resolve_key(&self.base_path, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ServerError::BlobStorage(format!("Failed to create directory for {key}: {e}"))
            })?;
        }
        fs::write(&path, data)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to write {key}: {e}")))?;

        let normalized = key.trim_start_matches('/').to_string();
        debug!(key = %normalized, size = data.len(), "Stored file");
        Ok(normalized)
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>, ServerError> {
        let path = resolve_key(&self.base_path, key)?;
        match fs::read(&path).await {
            Ok(data) => {
                debug!(key, size = data.len(), "Read file");
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ServerError::NotFound(format!("file {key}")))
            }
            Err(e) => Err(ServerError::BlobStorage(format!("Failed to read {key}: {e}"))),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), ServerError> {
        let path = resolve_key(&self.base_path, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ServerError::NotFound(format!("file {key}")))
            }
            Err(e) => Err(ServerError::BlobStorage(format!("Failed to delete {key}: {e}"))),
        }
    }
}
