use serde::{Deserialize, Serialize};

use crate::constants::{ANONYMOUS_NAME, GUEST_USER_ID};
use crate::thumbnail::ThumbnailSource;
use crate::urls::strip_scheme;

// Account id issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn guest() -> Self {
        Self(GUEST_USER_ID.to_string())
    }

    pub fn is_guest(&self) -> bool {
        self.0 == GUEST_USER_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Opaque document id assigned by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signed-in account as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uid: UserId::new(uid),
            display_name: Some(display_name.into()),
            email: None,
        }
    }

    /// Display name, or `"Anonymous"` when the account has none.
    pub fn name_or_anonymous(&self) -> String {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS_NAME)
            .to_string()
    }
}

/// Stored profile document for an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: UserId,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl UserProfile {
    pub fn new(uid: UserId, display_name: impl Into<String>) -> Self {
        Self {
            uid,
            display_name: display_name.into(),
            email: None,
            photo_url: None,
            is_admin: false,
        }
    }
}

/// One submitted website, as held by the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteEntry {
    pub id: EntryId,
    /// Normalized absolute URL, scheme included.
    pub url: String,
    pub thumbnail: ThumbnailSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name credited as creator; editable independently of `user_name`.
    pub created_by: String,
    pub user_id: UserId,
    /// Snapshot of the uploader's display name.
    pub user_name: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl WebsiteEntry {
    pub fn from_new(id: EntryId, new: NewEntry) -> Self {
        Self {
            id,
            url: new.url,
            thumbnail: new.thumbnail,
            description: new.description,
            created_by: new.created_by,
            user_id: new.user_id,
            user_name: new.user_name,
            created_at: new.created_at,
        }
    }

    pub fn is_owned_by(&self, uid: &UserId) -> bool {
        !self.user_id.is_guest() && &self.user_id == uid
    }

    pub fn apply_patch(&mut self, patch: &EntryPatch) {
        if let Some(ref description) = patch.description {
            self.description = Some(description.clone());
        }
        if let Some(ref created_by) = patch.created_by {
            self.created_by = created_by.clone();
        }
        if let Some(ref user_name) = patch.user_name {
            self.user_name = user_name.clone();
        }
    }

    /// URL without its scheme, as shown under the card.
    pub fn display_url(&self) -> &str {
        strip_scheme(&self.url)
    }
}

/// Payload for creating an entry; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub url: String,
    pub thumbnail: ThumbnailSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: String,
    pub user_id: UserId,
    pub user_name: String,
    pub created_at: i64,
}

/// Partial update; `None` fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.created_by.is_none() && self.user_name.is_none()
    }

    /// Patch used by the rename fan-out.
    pub fn rename(display_name: &str) -> Self {
        Self {
            description: None,
            created_by: Some(display_name.to_string()),
            user_name: Some(display_name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: &str) -> WebsiteEntry {
        WebsiteEntry {
            id: EntryId::new("e1"),
            url: "https://example.com/x".into(),
            thumbnail: ThumbnailSource::generated_for("https://example.com/x"),
            description: Some("desc".into()),
            created_by: "Alice".into(),
            user_id: UserId::new(user),
            user_name: "Alice".into(),
            created_at: 100,
        }
    }

    #[test]
    fn test_guest_entries_have_no_owner() {
        let guest = entry("guest");
        assert!(!guest.is_owned_by(&UserId::guest()));
        assert!(entry("u1").is_owned_by(&UserId::new("u1")));
        assert!(!entry("u1").is_owned_by(&UserId::new("u2")));
    }

    #[test]
    fn test_apply_patch_leaves_missing_fields() {
        let mut e = entry("u1");
        e.apply_patch(&EntryPatch {
            description: Some("new".into()),
            ..Default::default()
        });
        assert_eq!(e.description.as_deref(), Some("new"));
        assert_eq!(e.created_by, "Alice");
        assert_eq!(e.user_name, "Alice");
    }

    #[test]
    fn test_entry_wire_format_is_camel_case() {
        let json = serde_json::to_value(entry("u1")).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["createdAt"], 100);
        assert_eq!(json["thumbnail"]["kind"], "generated");
    }

    #[test]
    fn test_name_or_anonymous() {
        let mut id = Identity::new("u1", "  ");
        assert_eq!(id.name_or_anonymous(), "Anonymous");
        id.display_name = Some("Bob".into());
        assert_eq!(id.name_or_anonymous(), "Bob");
    }
}
