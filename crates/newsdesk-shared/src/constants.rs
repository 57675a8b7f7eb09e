/// Application name reported by the health endpoint
pub const APP_NAME: &str = "newsdesk";

/// Route prefix of the versioned API
pub const API_PREFIX: &str = "/api/v1";

/// Default page size for paginated listings
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page size a client may request
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Maximum number of device tokens per push gateway request
pub const MAX_TOKENS_PER_BATCH: usize = 500;

/// Maximum media upload size in bytes (10 MiB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// MIME types accepted by the media upload endpoint
pub const ALLOWED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Object storage bucket for uploaded media
pub const MEDIA_BUCKET: &str = "media";

/// Substrings marking device tokens registered by test clients
pub const TEST_TOKEN_MARKERS: &[&str] = &["test", "mock", "fake", "demo"];

/// Display name shown when an author's profile row is missing
pub const ANONYMOUS_DISPLAY_NAME: &str = "Anonymous";

/// Channel assigned to authors whose profile has none
pub const DEFAULT_CHANNEL_ID: i64 = 1;

/// Minimum password length for invited users
pub const MIN_PASSWORD_LEN: usize = 6;

/// Deep link opened by the mobile app to finish an invitation
pub const DEFAULT_DEEP_LINK_BASE: &str = "newsapp://auth/invite";

/// Ban length applied by the admin ban action (roughly 100 years)
pub const BAN_DURATION: &str = "876000h";
