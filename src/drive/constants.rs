// Transient provider failures eligible for another attempt.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

// Drive marks folders with a dedicated MIME type instead of a flag.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

// Content updates that do not derive a type fall back to this.
pub const GENERIC_MIME_TYPE: &str = "application/octet-stream";

// Metadata fields requested for every file resource.
pub const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,parents,webViewLink";

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
