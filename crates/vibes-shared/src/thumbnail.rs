//! Thumbnail sources.
//!
//! A card's image comes from one of three places, fixed when the entry is
//! written:
//! - **Inline**: bytes uploaded by the user, embedded in the document
//! - **Generated**: the server's screenshot proxy, parameterized by the site URL
//! - **External**: any other image URL
//!
//! Older records stored a bare string; [`ThumbnailSource::from_legacy`]
//! classifies those once at import time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_THUMBNAIL_SIZE, THUMBNAIL_PROXY_PATH};
use crate::error::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ThumbnailSource {
    Inline {
        mime: String,
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Generated { source_url: String },
    External { url: String },
}

impl ThumbnailSource {
    pub fn generated_for(url: &str) -> Self {
        Self::Generated {
            source_url: url.to_string(),
        }
    }

    /// Validate an uploaded image and wrap it as an inline thumbnail.
    pub fn inline(mime: &str, bytes: Vec<u8>, max_size: usize) -> Result<Self, ValidationError> {
        if !mime.starts_with("image/") {
            return Err(ValidationError::NotAnImage);
        }
        if bytes.len() > max_size {
            return Err(ValidationError::ThumbnailTooLarge { max: max_size });
        }
        Ok(Self::Inline {
            mime: mime.to_string(),
            bytes,
        })
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }

    /// What an `<img src>` would receive.
    pub fn display_src(&self) -> String {
        match self {
            Self::Inline { mime, bytes } => format!("data:{};base64,{}", mime, STANDARD.encode(bytes)),
            Self::Generated { source_url } => proxy_path(source_url),
            Self::External { url } => url.clone(),
        }
    }

    /// URL worth fetching for color sampling. Inline payloads are skipped.
    pub fn fetch_url(&self) -> Option<String> {
        match self {
            Self::Inline { .. } => None,
            other => Some(other.display_src()),
        }
    }

    /// Classify a legacy `thumbnailUrl` string.
    pub fn from_legacy(raw: &str) -> Result<Self, ValidationError> {
        if let Some(data) = raw.strip_prefix("data:") {
            let (header, payload) = data
                .split_once(',')
                .ok_or_else(|| ValidationError::MalformedThumbnail("missing ','".into()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| ValidationError::MalformedThumbnail("not base64".into()))?;
            let bytes = STANDARD
                .decode(payload)
                .map_err(|e| ValidationError::MalformedThumbnail(e.to_string()))?;
            return Self::inline(mime, bytes, MAX_THUMBNAIL_SIZE);
        }

        let proxy_prefix = format!("{THUMBNAIL_PROXY_PATH}?url=");
        if let Some(encoded) = raw.strip_prefix(&proxy_prefix) {
            let source_url = urlencoding::decode(encoded)
                .map_err(|e| ValidationError::MalformedThumbnail(e.to_string()))?;
            return Ok(Self::generated_for(&source_url));
        }

        Ok(Self::External {
            url: raw.to_string(),
        })
    }
}

/// Relative proxy path for a site URL.
pub fn proxy_path(source_url: &str) -> String {
    format!(
        "{}?url={}",
        THUMBNAIL_PROXY_PATH,
        urlencoding::encode(source_url)
    )
}

/// Best-effort content type from magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Gif) => "image/gif",
        _ => "application/octet-stream",
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
