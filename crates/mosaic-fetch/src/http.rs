use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{FetchError, Result};

/// Minimal asynchronous HTTP surface the download pipeline needs.
///
/// The production implementation is [`ReqwestClient`]; tests provide
/// scripted mocks.
pub trait HttpClient: Send + Sync {
    /// Fetch `url` and return the full response body. Any status other
    /// than 200 is an error.
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Production client backed by a process-wide `reqwest::Client`.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Build a client applying `timeout` to every request.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Http {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?)
    }
}
