//! Microsoft Graph HTTP client

use crate::auth::TokenCache;
use crate::config::AzureConfig;
use crate::error::{AzureError, Result};
use galactic_rest::RestClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const PATH_ROOT: &str = "https://graph.microsoft.com/";

/// Relative Graph path with every segment percent-encoded, so ids cannot
/// add segments or a query
pub fn graph_path(segments: &[&str]) -> Result<String> {
    if let Some(bad) = segments
        .iter()
        .find(|s| s.is_empty() || **s == "." || **s == "..")
    {
        return Err(AzureError::InvalidId(bad.to_string()));
    }
    let mut url = Url::parse(PATH_ROOT).map_err(|e| AzureError::config(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| AzureError::config("Graph path root cannot hold segments"))?
        .clear()
        .extend(segments);
    Ok(url.path().trim_start_matches('/').to_string())
}

/// One page of a Graph collection
#[derive(Debug, Deserialize)]
pub struct ODataPage<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Graph requests with token injection, OData errors and paging
#[derive(Debug, Clone)]
pub struct GraphClient {
    rest: RestClient,
    base_url: String,
}

impl GraphClient {
    pub fn new(config: &AzureConfig, tokens: Arc<TokenCache>) -> Result<Self> {
        let base_url = config.graph_base_url();
        let rest = RestClient::builder(base_url.clone())
            .token_provider(tokens)
            .timeout(Duration::from_secs(config.timeout_secs))
            // Required for $count and advanced $filter queries
            .header("ConsistencyLevel", "eventual")
            .build()?;
        Ok(Self { rest, base_url })
    }

    /// Versioned Graph root without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path with URL-encoded query parameters
    pub fn with_query(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let mut url = self.rest.url(path)?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
        }
        Ok(url.to_string())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Ok(self.rest.get(path).await?)
    }

    /// Every item of a collection, following `@odata.nextLink`
    pub async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(path.to_string());
        let mut pages = 0;
        while let Some(url) = next {
            let page: ODataPage<T> = self.rest.get(&url).await?;
            pages += 1;
            items.extend(page.value);
            next = page.next_link;
        }
        debug!(pages, items = items.len(), "Fetched Graph collection");
        Ok(items)
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        Ok(self.rest.post(path, body).await?)
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let _: Option<serde_json::Value> = self.rest.patch(path, body).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        Ok(self.rest.delete(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_path_encodes_segments() {
        assert_eq!(
            graph_path(&["groups", "g-1", "members", "$ref"]).unwrap(),
            "groups/g-1/members/$ref"
        );
        assert_eq!(
            graph_path(&["users", "a/b?c=d#e"]).unwrap(),
            "users/a%2Fb%3Fc=d%23e"
        );
        assert_eq!(graph_path(&["users", "100%"]).unwrap(), "users/100%25");
    }

    #[test]
    fn test_graph_path_rejects_relative_segments() {
        assert!(matches!(graph_path(&["users", ""]), Err(AzureError::InvalidId(_))));
        assert!(matches!(graph_path(&["users", ".."]), Err(AzureError::InvalidId(_))));
    }
}
