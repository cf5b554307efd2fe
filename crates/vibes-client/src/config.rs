//! Client-side gallery settings.

use serde::{Deserialize, Serialize};

use vibes_shared::constants::{MAX_DESCRIPTION_LEN, MAX_THUMBNAIL_SIZE};
use vibes_shared::Palette;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryConfig {
    /// Overlay palette; `dark` suits white card text.
    pub palette: Palette,
    pub max_description_len: usize,
    pub max_thumbnail_bytes: usize,
    /// Let signed-out visitors submit entries under the guest owner id.
    pub allow_guest_uploads: bool,
    /// Cap on concurrent thumbnail fetches during refinement.
    /// `None` fetches everything at once.
    pub refine_concurrency: Option<usize>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            palette: Palette::Dark,
            max_description_len: MAX_DESCRIPTION_LEN,
            max_thumbnail_bytes: MAX_THUMBNAIL_SIZE,
            allow_guest_uploads: false,
            refine_concurrency: None,
        }
    }
}
