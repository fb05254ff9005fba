//! HTTP plumbing for the chunk downloader: a minimal client abstraction,
//! the CDN origin pool, retry backoff, and the launcher-service
//! collaborators (OAuth bearer acquisition and catalog retrieval).

pub use self::cdn::{download_chunk, CdnPool, DEFAULT_CDN_URL};
pub use self::epic::{LauncherClient, MANIFEST_ARCHIVE_URL};
pub use self::error::{FetchError, Result};
pub use self::http::{HttpClient, ReqwestClient};
pub use self::retry::retry_delay;

mod cdn;
mod epic;
mod error;
mod http;
mod retry;
