use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::settings::InstallerSettings;

pub trait HttpFetcher {
    fn get_json(&mut self, url: &str, query: &[(&str, &str)]) -> Result<Value>;
    fn download(&mut self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking client shared by the release lookups and artifact downloads. No retries.
pub struct ReqwestFetcher {
    client: Client,
    user_agent: String,
}

impl ReqwestFetcher {
    pub fn new(settings: &InstallerSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.http_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            user_agent: settings.user_agent.clone(),
        })
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn get_json(&mut self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        debug!(url, ?query, "fetching json");
        let response = self
            .client
            .get(url)
            .header("User-Agent", self.user_agent.clone())
            .header("Accept", "application/json")
            .query(query)
            .send()
            .with_context(|| format!("failed to call {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("request to {url} failed with HTTP {status}");
        }
        response
            .json()
            .with_context(|| format!("failed to decode JSON from {url}"))
    }

    fn download(&mut self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "downloading");
        let response = self
            .client
            .get(url)
            .header("User-Agent", self.user_agent.clone())
            .send()
            .with_context(|| format!("failed to download {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("download of {url} failed with HTTP {status}");
        }
        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read body of {url}"))?;
        debug!(url, bytes = bytes.len(), "downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;

    use anyhow::{Result, anyhow};
    use serde_json::Value;

    use super::HttpFetcher;

    /// Canned responses keyed by URL; records every request.
    #[derive(Default)]
    pub(crate) struct MockFetcher {
        pub json: HashMap<String, Value>,
        pub files: HashMap<String, Vec<u8>>,
        pub requests: Vec<String>,
    }

    impl HttpFetcher for MockFetcher {
        fn get_json(&mut self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
            let rendered = query
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join("&");
            self.requests.push(format!("GET {url}?{rendered}"));
            self.json
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("unexpected request to {url}"))
        }

        fn download(&mut self, url: &str) -> Result<Vec<u8>> {
            self.requests.push(format!("DOWNLOAD {url}"));
            self.files
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("unexpected download of {url}"))
        }
    }
}
