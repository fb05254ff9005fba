//! Launcher catalog response. The driver only needs the first element's
//! manifest list; everything else is carried through untouched.

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub elements: Vec<CatalogElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogElement {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub label_name: String,
    #[serde(default)]
    pub build_version: String,
    #[serde(default)]
    pub manifests: Vec<CatalogManifest>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogManifest {
    pub uri: String,
    #[serde(rename = "queryParams", default)]
    pub query_params: Vec<QueryParam>,
}

#[derive(Debug, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: String,
}

impl Catalog {
    pub fn parse(data: &[u8]) -> Result<Catalog> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Pick a usable manifest URL from the first element: unsigned URIs
    /// are taken verbatim, single-query-param URIs joined directly, and
    /// entries with more than one param skipped.
    pub fn manifest_url(&self) -> Option<String> {
        let element = self.elements.first()?;
        for manifest in &element.manifests {
            if manifest.query_params.is_empty() {
                return Some(manifest.uri.clone());
            }
            if manifest.query_params.len() > 1 {
                continue;
            }
            let param = &manifest.query_params[0];
            return Some(format!("{}?{}={}", manifest.uri, param.name, param.value));
        }
        None
    }
}
