/// Application name
pub const APP_NAME: &str = "GoodVibes Gallery";

/// Owner id stamped on entries created without a signed-in account
pub const GUEST_USER_ID: &str = "guest";

/// Fallback display name when an account has none
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Maximum description length in characters
pub const MAX_DESCRIPTION_LEN: usize = 100;

/// Maximum uploaded thumbnail size in bytes (2 MiB)
pub const MAX_THUMBNAIL_SIZE: usize = 2 * 1024 * 1024;

/// Path of the server-side thumbnail proxy
pub const THUMBNAIL_PROXY_PATH: &str = "/api/thumbnail";

/// Width requested from the upstream screenshot service
pub const THUMBNAIL_WIDTH: u32 = 800;

/// Cache lifetime for proxied thumbnails (24 hours)
pub const THUMBNAIL_CACHE_SECS: u64 = 86_400;

/// Header carrying the acting account id on mutating requests
pub const USER_HEADER: &str = "x-vibes-user";

/// Side length of the canvas used to sample thumbnail colors
pub const SAMPLE_SIZE: u32 = 50;

/// Pixels at or below this alpha are ignored when sampling
pub const SAMPLE_ALPHA_THRESHOLD: u8 = 125;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
