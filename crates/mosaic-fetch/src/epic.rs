//! Launcher-service collaborators: OAuth-style bearer acquisition and
//! catalog retrieval. The pipeline treats both as opaque byte fetches.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::error::{FetchError, Result};

const ACCOUNT_SERVICE_URL: &str = "https://account-public-service-prod03.ol.epicgames.com";
const LAUNCHER_SERVICE_URL: &str = "https://launcher-public-service-prod06.ol.epicgames.com";

const LAUNCHER_USER_AGENT: &str =
    "UELauncher/14.2.4-22208432+++Portal+Release-Live Windows/10.0.22000.1.256.64bit";
// Public launcher client id/secret pair, base64-encoded for basic auth.
const LAUNCHER_CREDENTIALS: &str =
    "MzRhMDJjZjhmNDQxNGUyOWIxNTkyMTg3NmRhMzZmOWE6ZGFhZmJjY2M3Mzc3NDUwMzlkZmZlNTNkOTRmYzc2Y2Y=";

/// Manifest archive origin backing `--manifest <id>` fetches.
pub const MANIFEST_ARCHIVE_URL: &str =
    "https://github.com/VastBlast/FortniteManifestArchive/raw/main/Fortnite/Windows";

/// Client for the account and launcher services. The bearer token is
/// acquired lazily and cached for the lifetime of the client.
pub struct LauncherClient {
    client: reqwest::Client,
    token: Mutex<Option<String>>,
}

impl LauncherClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(LAUNCHER_USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            client,
            token: Mutex::new(None),
        })
    }

    /// OAuth client-credentials grant against the account service.
    async fn bearer_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref() {
            return Ok(cached.clone());
        }

        let url = format!("{ACCOUNT_SERVICE_URL}/account/api/oauth/token");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("basic {LAUNCHER_CREDENTIALS}"))
            .form(&[("grant_type", "client_credentials"), ("token_type", "eg1")])
            .send()
            .await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Http { status, url });
        }

        let body: serde_json::Value = serde_json::from_slice(&response.bytes().await?)
            .map_err(|e| FetchError::Auth(e.to_string()))?;
        let access = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Auth("token response missing access_token".to_string()))?;

        *token = Some(access.to_string());
        Ok(access.to_string())
    }

    /// Fetch the launcher catalog for `platform`. The response is raw
    /// JSON; the caller decodes it.
    pub async fn fetch_catalog(
        &self,
        platform: &str,
        namespace: &str,
        item: &str,
        app: &str,
        label: &str,
    ) -> Result<Bytes> {
        let bearer = self.bearer_token().await?;
        let url = format!(
            "{LAUNCHER_SERVICE_URL}/launcher/api/public/assets/v2/platform/{platform}/namespace/{namespace}/catalogItem/{item}/app/{app}/label/{label}"
        );
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("bearer {bearer}"))
            .send()
            .await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Http { status, url });
        }
        Ok(response.bytes().await?)
    }
}
