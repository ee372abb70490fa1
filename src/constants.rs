// src/constants.rs
//! Crate-wide constants.

/// Notion API version header value.
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// Base URL for all Notion API requests.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

/// Maximum page size accepted by paginated Notion endpoints.
pub const NOTION_API_PAGE_SIZE: u32 = 100;

/// Average request rate the Notion API allows.
pub const NOTION_REQUESTS_PER_SECOND: f64 = 3.0;

/// Maximum retry attempts for transient API failures.
pub const MAX_API_RETRIES: u32 = 3;

/// Multiplier for exponential retry backoff.
pub const RETRY_BACKOFF_FACTOR: f64 = 2.0;

/// Schema version of the on-disk backup state file.
pub const STATE_SCHEMA_VERSION: u64 = 1;

/// Name of the state file inside the state directory.
pub const STATE_FILE_NAME: &str = "checksums.json";

/// Title used when a document has no resolvable title property.
pub const UNTITLED: &str = "Untitled";
