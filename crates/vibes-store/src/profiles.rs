use rusqlite::{params, OptionalExtension};

use vibes_shared::{UserId, UserProfile};

use crate::database::Database;
use crate::error::Result;

impl Database {
    pub fn get_profile(&self, uid: &UserId) -> Result<Option<UserProfile>> {
        let profile = self
            .conn()
            .query_row(
                "SELECT uid, display_name, email, photo_url, is_admin FROM users WHERE uid = ?1",
                params![uid.as_str()],
                |row| {
                    let uid: String = row.get(0)?;
                    let is_admin: i32 = row.get(4)?;
                    Ok(UserProfile {
                        uid: UserId(uid),
                        display_name: row.get(1)?,
                        email: row.get(2)?,
                        photo_url: row.get(3)?,
                        is_admin: is_admin != 0,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    /// Create or merge a profile.
    ///
    /// The display name is always replaced. Email and photo are only
    /// overwritten when provided, and the admin flag is never cleared here.
    pub fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (uid, display_name, email, photo_url, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(uid) DO UPDATE SET
                 display_name = excluded.display_name,
                 email        = COALESCE(excluded.email, users.email),
                 photo_url    = COALESCE(excluded.photo_url, users.photo_url),
                 is_admin     = MAX(users.is_admin, excluded.is_admin)",
            params![
                profile.uid.as_str(),
                profile.display_name,
                profile.email,
                profile.photo_url,
                profile.is_admin as i32,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;

        tracing::debug!(uid = %profile.uid, "profile upserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_profile_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_profile(&UserId::new("nobody")).unwrap().is_none());
    }

    #[test]
    fn test_upsert_merges() {
        let db = Database::open_in_memory().unwrap();
        let uid = UserId::new("u1");

        let mut admin = UserProfile::new(uid.clone(), "Alice");
        admin.email = Some("alice@example.com".into());
        admin.is_admin = true;
        db.upsert_profile(&admin).unwrap();

        db.upsert_profile(&UserProfile::new(uid.clone(), "Alicia")).unwrap();

        let stored = db.get_profile(&uid).unwrap().unwrap();
        assert_eq!(stored.display_name, "Alicia");
        assert_eq!(stored.email.as_deref(), Some("alice@example.com"));
        assert!(stored.is_admin);
    }
}
