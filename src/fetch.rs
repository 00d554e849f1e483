//! Diff retrieval from the source-control API.
//!
//! The changed-files listing is paginated; the fetcher follows pagination to
//! completion before returning and rebuilds one combined unified diff, each
//! file's patch under its own header so every line stays attributable to its
//! origin file. Any page failing aborts the whole fetch.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SourceConfig;
use crate::error::FetchError;

/// Retrieval of the full content to analyze for one pull request.
#[async_trait]
pub trait DiffFetcher: Send + Sync {
    async fn fetch_diff(&self, owner: &str, repo: &str, number: u64)
        -> Result<String, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ChangedFile {
    filename: String,
    #[serde(default)]
    patch: Option<String>,
}

const PER_PAGE: usize = 100;

/// Fetcher backed by the GitHub-style REST API.
pub struct HttpDiffFetcher {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl HttpDiffFetcher {
    pub fn new(cfg: &SourceConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vetgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        }
    }

    async fn list_page(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        page: usize,
    ) -> Result<Vec<ChangedFile>, FetchError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/files",
            self.api_base, owner, repo, number
        );
        let mut req = self
            .client
            .get(&url)
            .header("accept", "application/vnd.github+json")
            .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl DiffFetcher for HttpDiffFetcher {
    async fn fetch_diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<String, FetchError> {
        let mut all_files = Vec::new();
        let mut page = 1;
        loop {
            let files = self.list_page(owner, repo, number, page).await?;
            let count = files.len();
            all_files.extend(files);
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        let diff = build_unified_diff(&all_files);
        tracing::info!(
            files = all_files.len(),
            bytes = diff.len(),
            pr = number,
            "fetched pull request diff"
        );
        Ok(diff)
    }
}

fn build_unified_diff(files: &[ChangedFile]) -> String {
    let mut diff = String::new();
    for file in files {
        if let Some(patch) = &file.patch {
            diff.push_str(&format!(
                "diff --git a/{name} b/{name}\n--- a/{name}\n+++ b/{name}\n",
                name = file.filename
            ));
            diff.push_str(patch);
            diff.push('\n');
        }
    }
    diff
}
