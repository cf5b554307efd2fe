//! # vibes-shared
//!
//! Types and pure logic shared by the gallery server and client: the
//! website entry data model, URL normalization, and the gradient engine
//! (URL hashing plus thumbnail color sampling).

pub mod color;
pub mod constants;
pub mod error;
pub mod gradient;
pub mod thumbnail;
pub mod types;
pub mod urls;

pub use error::{ColorError, ValidationError};
pub use gradient::{gradient_for, Gradient, Palette};
pub use thumbnail::ThumbnailSource;
pub use types::*;
