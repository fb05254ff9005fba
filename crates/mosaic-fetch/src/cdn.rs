use bytes::Bytes;
use mosaic_manifest::Chunk;
use rand::Rng;

use crate::error::Result;
use crate::http::HttpClient;

/// Default Akamai origin used when no `--url` is given.
pub const DEFAULT_CDN_URL: &str = "http://epicgames-download1.akamaized.net";

/// The configured CDN origins; every download picks one uniformly at
/// random.
#[derive(Debug, Clone)]
pub struct CdnPool {
    origins: Vec<String>,
}

impl CdnPool {
    /// Build a pool from the configured origin list. Empty entries are
    /// dropped; an empty list falls back to the default origin.
    pub fn new(origins: Vec<String>) -> Self {
        let mut origins: Vec<String> = origins.into_iter().filter(|u| !u.is_empty()).collect();
        if origins.is_empty() {
            origins.push(DEFAULT_CDN_URL.to_string());
        }
        Self { origins }
    }

    /// A randomly chosen origin.
    pub fn pick(&self) -> &str {
        let i = rand::thread_rng().gen_range(0..self.origins.len());
        &self.origins[i]
    }

    /// CDN object URL for `chunk`, rooted at a randomly chosen origin.
    pub fn chunk_url(&self, chunk: &Chunk) -> String {
        Self::chunk_url_at(self.pick(), chunk)
    }

    /// CDN object URL for `chunk` under a specific origin.
    pub fn chunk_url_at(origin: &str, chunk: &Chunk) -> String {
        format!(
            "{}/Builds/Fortnite/CloudDir/ChunksV3/{:02}/{}_{}.chunk",
            origin, chunk.data_group, chunk.hash, chunk.guid
        )
    }
}

/// Download a chunk object from a randomly chosen origin. The caller
/// requeues on failure.
pub async fn download_chunk<C: HttpClient>(
    client: &C,
    pool: &CdnPool,
    chunk: &Chunk,
) -> Result<Bytes> {
    client.get(&pool.chunk_url(chunk)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    fn chunk() -> Chunk {
        Chunk {
            guid: "0123456789ABCDEF0123456789ABCDEF".to_string(),
            hash: "1122334455667788".to_string(),
            sha: String::new(),
            data_group: 7,
            file_size: 0,
        }
    }

    #[test]
    fn chunk_url_shape() {
        assert_eq!(
            CdnPool::chunk_url_at("http://cdn.test", &chunk()),
            "http://cdn.test/Builds/Fortnite/CloudDir/ChunksV3/07/1122334455667788_0123456789ABCDEF0123456789ABCDEF.chunk"
        );
    }

    #[test]
    fn data_group_is_zero_padded() {
        let mut c = chunk();
        c.data_group = 0;
        assert!(CdnPool::chunk_url_at("http://cdn.test", &c).contains("/ChunksV3/00/"));
        c.data_group = 42;
        assert!(CdnPool::chunk_url_at("http://cdn.test", &c).contains("/ChunksV3/42/"));
    }

    #[test]
    fn pick_stays_within_the_pool() {
        let origins = vec!["http://a".to_string(), "http://b".to_string()];
        let pool = CdnPool::new(origins.clone());
        for _ in 0..64 {
            assert!(origins.iter().any(|o| o == pool.pick()));
        }
    }

    #[test]
    fn empty_pool_falls_back_to_default() {
        let pool = CdnPool::new(vec![String::new()]);
        assert_eq!(pool.pick(), DEFAULT_CDN_URL);
    }

    #[tokio::test]
    async fn download_propagates_http_errors() {
        struct FailingClient;
        impl HttpClient for FailingClient {
            async fn get(&self, url: &str) -> Result<Bytes> {
                Err(FetchError::Http {
                    status: 503,
                    url: url.to_string(),
                })
            }
        }

        let pool = CdnPool::new(vec!["http://cdn.test".to_string()]);
        let err = download_chunk(&FailingClient, &pool, &chunk())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 503, .. }));
    }
}
