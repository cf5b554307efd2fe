//! Screenshot proxy.
//!
//! Forwards `/api/thumbnail?url=` to the configured screenshot service so
//! the API key never reaches the browser, and marks the response cacheable
//! for a day.

use axum::body::Bytes;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use vibes_shared::constants::THUMBNAIL_WIDTH;

use crate::error::ServerError;

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug)]
pub struct Screenshot {
    pub content_type: String,
    pub bytes: Bytes,
}

pub struct ThumbnailProxy {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl ThumbnailProxy {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key,
        }
    }

    /// Upstream request URL for `site_url`.
    pub fn upstream_url(&self, api_key: &str, site_url: &str) -> String {
        format!(
            "{}/{}/thumbnail/get?url={}&width={}&refresh=true",
            self.api_base,
            api_key,
            urlencoding::encode(site_url),
            THUMBNAIL_WIDTH
        )
    }

    pub async fn fetch(&self, site_url: &str) -> Result<Screenshot, ServerError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ServerError::Upstream("Screenshot service not configured".into()))?;

        let resp = self
            .client
            .get(self.upstream_url(api_key, site_url))
            .send()
            .await
            .map_err(|e| {
                warn!(url = %site_url, error = %e, "Screenshot request failed");
                ServerError::Upstream("Failed to generate thumbnail".into())
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(url = %site_url, %status, "Screenshot service returned an error");
            return Err(ServerError::Upstream(format!(
                "Screenshot service responded with {status}"
            )));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ServerError::Upstream(format!("Failed to read screenshot: {e}")))?;

        debug!(url = %site_url, size = bytes.len(), content_type = %content_type, "Screenshot fetched");
        Ok(Screenshot {
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_url_encodes_site() {
        let proxy = ThumbnailProxy::new(reqwest::Client::new(), "https://shots.test/api", None);
        assert_eq!(
            proxy.upstream_url("KEY", "https://example.com/a?b=c"),
            "https://shots.test/api/KEY/thumbnail/get?url=https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc&width=800&refresh=true"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_upstream_error() {
        let proxy = ThumbnailProxy::new(reqwest::Client::new(), "https://shots.test/api", None);
        assert!(matches!(
            proxy.fetch("https://example.com").await,
            Err(ServerError::Upstream(_))
        ));
    }
}
