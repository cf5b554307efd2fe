//! Backend that talks to a `vibes-server` instance over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use vibes_shared::constants::USER_HEADER;
use vibes_shared::{EntryId, EntryPatch, NewEntry, UserId, UserProfile, WebsiteEntry};

use crate::error::RemoteError;
use crate::remote::{EntryStore, IdentityProvider, ImageLoader, ProfileDirectory, RemoteResult};

#[derive(Deserialize)]
struct CreatedResponse {
    id: EntryId,
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    session: Arc<dyn IdentityProvider>,
}

impl HttpBackend {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    /// Mutations carry the session's uid in the user header.
    pub fn new(base_url: impl Into<String>, session: Arc<dyn IdentityProvider>) -> Self {
        Self::with_client(Client::new(), base_url, session)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        session: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Absolute URLs pass through; paths are joined onto the server root.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    fn website_url(&self, id: &EntryId) -> String {
        format!(
            "{}/websites/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        )
    }

    fn user_url(&self, uid: &UserId) -> String {
        format!("{}/users/{}", self.base_url, urlencoding::encode(uid.as_str()))
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match self.session.current() {
            Some(identity) => req.header(USER_HEADER, identity.uid.as_str()),
            None => req,
        }
    }
}

async fn check(resp: Response) -> RemoteResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    debug!(%status, body = %body, "Server returned an error");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::PermissionDenied(body),
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        StatusCode::CONFLICT => RemoteError::Conflict(body),
        _ => RemoteError::Protocol(format!("HTTP {status}: {body}")),
    })
}

/// Like [`check`] but maps 404 to `None`.
async fn check_optional(resp: Response) -> RemoteResult<Option<Response>> {
    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    check(resp).await.map(Some)
}

#[async_trait]
impl EntryStore for HttpBackend {
    async fn list_entries(&self) -> RemoteResult<Vec<WebsiteEntry>> {
        let resp = self
            .client
            .get(format!("{}/websites", self.base_url))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn get_entry(&self, id: &EntryId) -> RemoteResult<Option<WebsiteEntry>> {
        let resp = self.client.get(self.website_url(id)).send().await?;
        match check_optional(resp).await? {
            Some(resp) => Ok(Some(resp.json().await?)),
            None => Ok(None),
        }
    }

    async fn create_entry(&self, entry: &NewEntry) -> RemoteResult<EntryId> {
        let req = self
            .client
            .post(format!("{}/websites", self.base_url))
            .json(entry);
        let resp = self.authed(req).send().await?;
        let created: CreatedResponse = check(resp).await?.json().await?;
        Ok(created.id)
    }

    async fn update_entry(&self, id: &EntryId, patch: &EntryPatch) -> RemoteResult<()> {
        let req = self.client.patch(self.website_url(id)).json(patch);
        check(self.authed(req).send().await?).await?;
        Ok(())
    }

    async fn delete_entry(&self, id: &EntryId) -> RemoteResult<()> {
        let req = self.client.delete(self.website_url(id));
        check(self.authed(req).send().await?).await?;
        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> RemoteResult<Vec<WebsiteEntry>> {
        let resp = self
            .client
            .get(format!("{}/websites", self.base_url))
            .query(&[("url", url)])
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn find_by_user(&self, user_id: &UserId) -> RemoteResult<Vec<WebsiteEntry>> {
        let resp = self
            .client
            .get(format!("{}/websites", self.base_url))
            .query(&[("userId", user_id.as_str())])
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }
}

#[async_trait]
impl ProfileDirectory for HttpBackend {
    async fn get_profile(&self, user_id: &UserId) -> RemoteResult<Option<UserProfile>> {
        let resp = self.client.get(self.user_url(user_id)).send().await?;
        match check_optional(resp).await? {
            Some(resp) => Ok(Some(resp.json().await?)),
            None => Ok(None),
        }
    }

    async fn put_profile(&self, profile: &UserProfile) -> RemoteResult<()> {
        let req = self.client.put(self.user_url(&profile.uid)).json(profile);
        check(self.authed(req).send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageLoader for HttpBackend {
    async fn load_image(&self, url: &str) -> RemoteResult<Vec<u8>> {
        let resp = self.client.get(self.resolve(url)).send().await?;
        let bytes = check(resp).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use axum::extract::{Path, Query, State};
    use axum::http::HeaderMap;
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use crate::session::LocalSession;
    use crate::test_support::{alice, entry};
    use vibes_shared::ThumbnailSource;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(base, Arc::new(LocalSession::signed_out(None)))
    }

    /// What the stub server saw: `METHOD path user-header` per request.
    type Seen = Arc<Mutex<Vec<String>>>;

    fn record(seen: &Seen, line: String) {
        seen.lock().unwrap().push(line);
    }

    fn user_of(headers: &HeaderMap) -> String {
        headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string()
    }

    async fn list(
        State(seen): State<Seen>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Vec<WebsiteEntry>> {
        let mut keys: Vec<_> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        keys.sort();
        record(&seen, format!("GET /websites {}", keys.join("&")));
        let found = match (query.get("url"), query.get("userId")) {
            (Some(url), _) if url == "https://listed.com" => {
                vec![entry("w9", url, "u2", "Bob", 1)]
            }
            (_, Some(uid)) => vec![entry("w7", "https://mine.com", uid, "Alice", 1)],
            _ => Vec::new(),
        };
        Json(found)
    }

    async fn create(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<NewEntry>,
    ) -> AxumResponse {
        record(&seen, format!("POST /websites {}", user_of(&headers)));
        if headers.get(USER_HEADER).is_none() {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "sign in"}))).into_response();
        }
        if body.url == "https://taken.com" {
            let error = format!("{} is already listed", body.url);
            return (StatusCode::CONFLICT, Json(json!({ "error": error }))).into_response();
        }
        (StatusCode::CREATED, Json(json!({"id": "w1"}))).into_response()
    }

    async fn get_one(Path(id): Path<String>) -> AxumResponse {
        if id == "w1" {
            Json(entry("w1", "https://a.com", "u1", "Alice", 1)).into_response()
        } else {
            (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
        }
    }

    async fn delete_one(
        State(seen): State<Seen>,
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> AxumResponse {
        record(&seen, format!("DELETE /websites/{id} {}", user_of(&headers)));
        if id == "w1" {
            StatusCode::NO_CONTENT.into_response()
        } else {
            (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
        }
    }

    async fn get_user(Path(uid): Path<String>) -> AxumResponse {
        if uid == "u1" {
            Json(UserProfile::new(UserId::new("u1"), "Alice")).into_response()
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    }

    /// Serve a stub of the website API on loopback.
    async fn stub_server() -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/websites", get(list).post(create))
            .route("/websites/:id", get(get_one).delete(delete_one))
            .route("/users/:id", get(get_user))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn signed_in(base: &str) -> HttpBackend {
        HttpBackend::new(base, Arc::new(LocalSession::signed_in(alice())))
    }

    fn new_entry(url: &str) -> NewEntry {
        NewEntry {
            url: url.into(),
            thumbnail: ThumbnailSource::generated_for(url),
            description: Some("A site".into()),
            created_by: "Alice".into(),
            user_id: UserId::new("u1"),
            user_name: "Alice".into(),
            created_at: 1,
        }
    }

    #[tokio::test]
    async fn test_create_sends_user_header_and_reads_id() {
        let (base, seen) = stub_server().await;
        let http = signed_in(&base);

        let id = http.create_entry(&new_entry("https://a.com")).await.unwrap();
        assert_eq!(id, EntryId::new("w1"));
        assert_eq!(seen.lock().unwrap().as_slice(), ["POST /websites u1"]);
    }

    #[tokio::test]
    async fn test_create_status_mapping() {
        let (base, _) = stub_server().await;

        let conflict = signed_in(&base)
            .create_entry(&new_entry("https://taken.com"))
            .await;
        assert!(matches!(
            conflict,
            Err(RemoteError::Conflict(body)) if body.contains("already listed")
        ));

        let anonymous = backend(&base).create_entry(&new_entry("https://a.com")).await;
        assert!(matches!(anonymous, Err(RemoteError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_find_queries_use_filters() {
        let (base, seen) = stub_server().await;
        let http = backend(&base);

        let hits = http.find_by_url("https://listed.com").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://listed.com");
        assert!(http.find_by_url("https://free.com").await.unwrap().is_empty());

        let mine = http.find_by_user(&UserId::new("u1")).await.unwrap();
        assert_eq!(mine[0].user_id, UserId::new("u1"));

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            [
                "GET /websites url=https://listed.com",
                "GET /websites url=https://free.com",
                "GET /websites userId=u1",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_documents() {
        let (base, seen) = stub_server().await;
        let http = signed_in(&base);

        assert!(http.get_entry(&EntryId::new("w1")).await.unwrap().is_some());
        assert_eq!(http.get_entry(&EntryId::new("gone")).await, Ok(None));
        assert_eq!(http.get_profile(&UserId::new("u2")).await, Ok(None));
        assert_eq!(
            http.get_profile(&UserId::new("u1"))
                .await
                .unwrap()
                .map(|p| p.display_name),
            Some("Alice".to_string())
        );

        assert_eq!(http.delete_entry(&EntryId::new("w1")).await, Ok(()));
        assert_eq!(
            http.delete_entry(&EntryId::new("gone")).await,
            Err(RemoteError::NotFound)
        );
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            ["DELETE /websites/w1 u1", "DELETE /websites/gone u1"]
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let http = backend("http://localhost:8080/");
        assert_eq!(
            http.resolve("/api/thumbnail?url=x"),
            "http://localhost:8080/api/thumbnail?url=x"
        );
        assert_eq!(
            http.resolve("files/a.png"),
            "http://localhost:8080/files/a.png"
        );
        assert_eq!(
            http.resolve("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn test_ids_are_path_encoded() {
        let http = backend("http://h");
        assert_eq!(
            http.website_url(&EntryId::new("a/b")),
            "http://h/websites/a%2Fb"
        );
    }
}
