//! # vibes-store
//!
//! Document storage for the gallery, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for website
//! entries and user profiles.  Ordering beyond `created_at DESC` and
//! multi-document transactions are not part of the contract; each call is
//! atomic for the single document it touches.

pub mod database;
pub mod entries;
pub mod legacy;
pub mod migrations;
pub mod profiles;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use legacy::{ImportStats, LegacyWebsite};
