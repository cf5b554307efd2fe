use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use vibes_shared::constants::{
    MAX_DESCRIPTION_LEN, MAX_THUMBNAIL_SIZE, THUMBNAIL_CACHE_SECS, USER_HEADER,
};
use vibes_shared::thumbnail::sniff_mime;
use vibes_shared::{EntryId, EntryPatch, NewEntry, ThumbnailSource, UserId, UserProfile, WebsiteEntry};
use vibes_store::Database;

use crate::blob_store::BlobStore;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{throttle, RateLimiter};
use crate::thumbnail::ThumbnailProxy;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub blob_store: Arc<BlobStore>,
    pub thumbnails: Arc<ThumbnailProxy>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    // base64 inflates inline thumbnails by a third
    let body_limit = state.config.max_blob_size * 2;

    Router::new()
        .route("/health", get(health_check))
        .route("/websites", get(list_websites).post(create_website))
        .route(
            "/websites/:id",
            get(get_website).patch(update_website).delete(delete_website),
        )
        .route("/users/:id", get(get_user).put(put_user))
        .route("/admin/users", post(admin_create_user))
        .route("/api/thumbnail", get(thumbnail))
        .route("/files/*path", get(get_file).put(put_file).delete(delete_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            throttle,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn with_db<T>(
    state: &AppState,
    f: impl FnOnce(&Database) -> vibes_store::Result<T>,
) -> Result<T, ServerError> {
    let db = state
        .db
        .lock()
        .map_err(|e| ServerError::Internal(format!("Lock poisoned: {e}")))?;
    Ok(f(&db)?)
}

/// The acting account, from the user header.
fn acting_user(headers: &HeaderMap) -> Result<UserId, ServerError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(UserId::new)
        .ok_or(ServerError::Unauthorized)
}

/// Guest-owned documents belong to nobody.
fn require_owner(acting: &UserId, owner: &UserId) -> Result<(), ServerError> {
    if owner.is_guest() || acting != owner {
        return Err(ServerError::Forbidden(format!(
            "{acting} does not own this document"
        )));
    }
    Ok(())
}

fn validate_new_entry(entry: &NewEntry) -> Result<(), ServerError> {
    let url = entry.url.trim();
    if url.is_empty() {
        return Err(ServerError::BadRequest("URL is required".into()));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ServerError::BadRequest(format!("URL must include a scheme: {url}")));
    }
    if let Some(ref description) = entry.description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ServerError::BadRequest(format!(
                "Description must be {MAX_DESCRIPTION_LEN} characters or less"
            )));
        }
    }
    if let ThumbnailSource::Inline { ref mime, ref bytes } = entry.thumbnail {
        if !mime.starts_with("image/") {
            return Err(ServerError::BadRequest(format!("Not an image type: {mime}")));
        }
        if bytes.len() > MAX_THUMBNAIL_SIZE {
            return Err(ServerError::PayloadTooLarge {
                size: bytes.len(),
                max: MAX_THUMBNAIL_SIZE,
            });
        }
    }
    Ok(())
}

/// Uploaded files live under `thumbnails/<uid>/...`; returns `<uid>`.
fn file_owner(key: &str) -> Result<UserId, ServerError> {
    let mut segments = key.trim_start_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some("thumbnails"), Some(uid), Some(name)) if !uid.is_empty() && !name.is_empty() => {
            Ok(UserId::new(uid))
        }
        _ => Err(ServerError::BadRequest(format!(
            "File paths must look like thumbnails/<uid>/<name>: {key}"
        ))),
    }
}

// ----------------------------------------------------------------------------
// Health
// ----------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    name: String,
    version: &'static str,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ----------------------------------------------------------------------------
// Websites
// ----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct WebsiteQuery {
    url: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Serialize)]
struct CreatedResponse {
    id: EntryId,
}

async fn list_websites(
    State(state): State<AppState>,
    Query(query): Query<WebsiteQuery>,
) -> Result<Json<Vec<WebsiteEntry>>, ServerError> {
    let entries = match (query.url, query.user_id) {
        (Some(url), _) => with_db(&state, |db| db.find_entries_by_url(&url))?,
        (None, Some(uid)) => with_db(&state, |db| db.find_entries_by_user(&UserId::new(uid)))?,
        (None, None) => with_db(&state, |db| db.list_entries())?,
    };
    debug!(count = entries.len(), "Listed websites");
    Ok(Json(entries))
}

async fn create_website(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(new): Json<NewEntry>,
) -> Result<(StatusCode, Json<CreatedResponse>), ServerError> {
    if !new.user_id.is_guest() {
        let acting = acting_user(&headers)?;
        if acting != new.user_id {
            return Err(ServerError::Forbidden(format!(
                "{acting} cannot create documents for {}",
                new.user_id
            )));
        }
    }
    validate_new_entry(&new)?;

    if with_db(&state, |db| db.url_exists(&new.url))? {
        return Err(ServerError::Conflict(format!("{} is already listed", new.url)));
    }

    let entry = with_db(&state, |db| db.insert_entry(&new))?;
    info!(id = %entry.id, url = %entry.url, user = %entry.user_id, "Website created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: entry.id })))
}

async fn get_website(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WebsiteEntry>, ServerError> {
    let id = EntryId::new(id);
    Ok(Json(with_db(&state, |db| db.get_entry(&id))?))
}

async fn update_website(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<WebsiteEntry>, ServerError> {
    let acting = acting_user(&headers)?;
    let id = EntryId::new(id);
    if patch.is_empty() {
        return Err(ServerError::BadRequest("Nothing to update".into()));
    }
    if let Some(ref description) = patch.description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ServerError::BadRequest(format!(
                "Description must be {MAX_DESCRIPTION_LEN} characters or less"
            )));
        }
    }

    let existing = with_db(&state, |db| db.get_entry(&id))?;
    require_owner(&acting, &existing.user_id)?;

    let updated = with_db(&state, |db| {
        db.update_entry(&id, &patch)?;
        db.get_entry(&id)
    })?;
    info!(id = %id, user = %acting, "Website updated");
    Ok(Json(updated))
}

async fn delete_website(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let acting = acting_user(&headers)?;
    let id = EntryId::new(id);

    let existing = with_db(&state, |db| db.get_entry(&id))?;
    require_owner(&acting, &existing.user_id)?;

    if !with_db(&state, |db| db.delete_entry(&id))? {
        return Err(ServerError::NotFound(format!("website {id}")));
    }
    info!(id = %id, user = %acting, "Website deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ----------------------------------------------------------------------------
// Users
// ----------------------------------------------------------------------------

async fn get_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<UserProfile>, ServerError> {
    let uid = UserId::new(uid);
    with_db(&state, |db| db.get_profile(&uid))?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("user {uid}")))
}

async fn put_user(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(mut profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, ServerError> {
    let acting = acting_user(&headers)?;
    let uid = UserId::new(uid);
    if profile.uid != uid {
        return Err(ServerError::BadRequest("Profile uid does not match path".into()));
    }
    if acting != uid {
        return Err(ServerError::Forbidden(format!("{acting} cannot edit {uid}")));
    }
    if profile.display_name.trim().is_empty() {
        return Err(ServerError::BadRequest("Display name is required".into()));
    }
    // admin rights are granted through /admin/users only
    profile.is_admin = false;

    let stored = with_db(&state, |db| {
        db.upsert_profile(&profile)?;
        db.get_profile(&uid)
    })?
    .ok_or_else(|| ServerError::Internal(format!("profile {uid} vanished after write")))?;
    info!(uid = %uid, "Profile saved");
    Ok(Json(stored))
}

// ----------------------------------------------------------------------------
// Admin
// ----------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminUserRequest {
    uid: String,
    display_name: String,
    #[serde(default)]
    email: Option<String>,
}

fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    use subtle::ConstantTimeEq;
    let matches = token.len() == expected.len()
        && bool::from(token.as_bytes().ct_eq(expected.as_bytes()));
    if !matches {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }
    Ok(())
}

async fn admin_create_user(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<AdminUserRequest>,
) -> Result<Json<UserProfile>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    if req.uid.trim().is_empty() || req.display_name.trim().is_empty() {
        return Err(ServerError::BadRequest("uid and displayName are required".into()));
    }

    let uid = UserId::new(req.uid.trim());
    let mut profile = UserProfile::new(uid.clone(), req.display_name.trim());
    profile.email = req.email;
    profile.is_admin = true;

    let stored = with_db(&state, |db| {
        db.upsert_profile(&profile)?;
        db.get_profile(&uid)
    })?
    .ok_or_else(|| ServerError::Internal(format!("profile {uid} vanished after write")))?;
    info!(uid = %uid, "Admin user created");
    Ok(Json(stored))
}

// ----------------------------------------------------------------------------
// Thumbnail proxy
// ----------------------------------------------------------------------------

#[derive(Deserialize)]
struct ThumbnailQuery {
    url: Option<String>,
}

async fn thumbnail(
    State(state): State<AppState>,
    Query(query): Query<ThumbnailQuery>,
) -> Result<Response, ServerError> {
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("URL parameter is required".into()))?;

    let shot = state.thumbnails.fetch(&url).await?;
    Ok((
        [
            (header::CONTENT_TYPE, shot.content_type),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={THUMBNAIL_CACHE_SECS}"),
            ),
        ],
        shot.bytes,
    )
        .into_response())
}

// ----------------------------------------------------------------------------
// Files
// ----------------------------------------------------------------------------

#[derive(Serialize)]
struct FileResponse {
    url: String,
}

async fn put_file(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<Json<FileResponse>, ServerError> {
    let acting = acting_user(&headers)?;
    require_owner(&acting, &file_owner(&path)?)?;

    let key = state.blob_store.put(&path, &body).await?;
    info!(key = %key, size = body.len(), user = %acting, "File uploaded");
    Ok(Json(FileResponse {
        url: format!("/files/{key}"),
    }))
}

async fn get_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ServerError> {
    let data = state.blob_store.get(&path).await?;
    let mime = sniff_mime(&data);
    Ok(([(header::CONTENT_TYPE, mime)], data).into_response())
}

async fn delete_file(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let acting = acting_user(&headers)?;
    require_owner(&acting, &file_owner(&path)?)?;

    state.blob_store.delete(&path).await?;
    info!(key = %path, user = %acting, "File deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
