//! GitHub REST client
//!
//! Implements [`HostingClient`] over the v3 REST API using `reqwest`.
//! Status codes are folded into the [`HostingError`] taxonomy:
//! 404 → `NotFound`, 409/422 → `Conflict`, anything else → `Upstream`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::client::*;
use crate::error::HostingError;

const PER_PAGE: usize = 100;
// The platform stops listing pull-request files after 3000 entries.
const MAX_FILE_PAGES: usize = 30;

/// Connection settings for the GitHub API.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API base URL (default: "https://api.github.com")
    pub api_url: String,
    /// Token with contents:write and pull-requests:write
    pub token: String,
    pub owner: String,
    pub repo: String,
}

impl GitHubConfig {
    /// Create a configuration for `owner/repo` on github.com
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Point at a GitHub Enterprise API endpoint
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - GITHUB_TOKEN (required)
    /// - GITHUB_REPOSITORY (required, "owner/repo")
    /// - GITHUB_API_URL (optional, default: "https://api.github.com")
    pub fn from_env() -> Result<Self, HostingError> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| HostingError::Config("GITHUB_TOKEN not set".to_string()))?;
        let repository = std::env::var("GITHUB_REPOSITORY")
            .map_err(|_| HostingError::Config("GITHUB_REPOSITORY not set".to_string()))?;
        let (owner, repo) = repository.split_once('/').ok_or_else(|| {
            HostingError::Config(format!(
                "GITHUB_REPOSITORY must be owner/repo, got {repository}"
            ))
        })?;
        let mut config = Self::new(owner, repo, token);
        if let Ok(api_url) = std::env::var("GITHUB_API_URL") {
            config = config.with_api_url(api_url);
        }
        Ok(config)
    }
}

/// GitHub-backed hosting client
pub struct GitHubClient {
    config: GitHubConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    target: Option<String>,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Deserialize)]
struct WriteResponse {
    commit: CommitRef,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    parents: Vec<CommitRef>,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    mode: String,
    sha: String,
}

#[derive(Deserialize)]
struct PullFile {
    filename: String,
    status: ChangeStatus,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    previous_filename: Option<String>,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self, HostingError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("intent-layer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self, HostingError> {
        Self::new(GitHubConfig::from_env()?)
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.config.api_url, self.config.owner, self.config.repo, suffix
        )
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        self.repo_url(&format!("contents/{}", encoded.join("/")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> HostingResult<Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        debug!(%status, resource, "GitHub request failed");
        Err(match status {
            StatusCode::NOT_FOUND => HostingError::not_found(resource),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                HostingError::conflict(resource, message)
            }
            _ => HostingError::Upstream {
                status: status.as_u16(),
                message,
            },
        })
    }

    fn decode_content(raw: &str) -> HostingResult<String> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD.decode(compact)?;
        String::from_utf8(bytes).map_err(|e| HostingError::Decode(e.to_string()))
    }
}

#[async_trait]
impl HostingClient for GitHubClient {
    #[instrument(skip(self))]
    async fn get_content(&self, path: &str, git_ref: &str) -> HostingResult<Option<FileContent>> {
        let request = self
            .http
            .get(self.contents_url(path))
            .query(&[("ref", git_ref)]);
        let response = match self.send(request, &format!("{path}@{git_ref}")).await {
            Ok(response) => response,
            Err(HostingError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let value: serde_json::Value = response.json().await?;
        if value.is_array() {
            // A directory listing, not a file.
            return Ok(None);
        }
        let body: ContentResponse = serde_json::from_value(value)?;
        match body.kind.as_str() {
            "symlink" => Ok(Some(FileContent {
                path: body.path,
                content: String::new(),
                sha: body.sha,
                symlink_target: body.target,
            })),
            "file" => {
                let content = Self::decode_content(body.content.as_deref().unwrap_or_default())?;
                Ok(Some(FileContent {
                    path: body.path,
                    content,
                    sha: body.sha,
                    symlink_target: None,
                }))
            }
            _ => Ok(None),
        }
    }

    #[instrument(skip(self, content, message))]
    async fn create_or_update_content(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
        prior_sha: Option<&str>,
    ) -> HostingResult<String> {
        let mut payload = json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = prior_sha {
            payload["sha"] = json!(sha);
        }
        let request = self.http.put(self.contents_url(path)).json(&payload);
        let body: WriteResponse = self.send(request, path).await?.json().await?;
        Ok(body.commit.sha)
    }

    #[instrument(skip(self, message))]
    async fn delete_content(
        &self,
        path: &str,
        message: &str,
        branch: &str,
        prior_sha: &str,
    ) -> HostingResult<String> {
        let payload = json!({
            "message": message,
            "sha": prior_sha,
            "branch": branch,
        });
        let request = self.http.delete(self.contents_url(path)).json(&payload);
        let body: WriteResponse = self.send(request, path).await?.json().await?;
        Ok(body.commit.sha)
    }

    async fn get_commit(&self, sha: &str) -> HostingResult<CommitInfo> {
        let request = self.http.get(self.repo_url(&format!("commits/{sha}")));
        let body: CommitResponse = self
            .send(request, &format!("commit {sha}"))
            .await?
            .json()
            .await?;
        Ok(CommitInfo {
            sha: body.sha,
            parents: body.parents.into_iter().map(|p| p.sha).collect(),
        })
    }

    async fn list_tree(&self, git_ref: &str) -> HostingResult<Vec<TreeEntry>> {
        let request = self
            .http
            .get(self.repo_url(&format!("git/trees/{}", urlencoding::encode(git_ref))))
            .query(&[("recursive", "1")]);
        let body: TreeResponse = self
            .send(request, &format!("tree {git_ref}"))
            .await?
            .json()
            .await?;
        if body.truncated {
            tracing::warn!(git_ref, "tree listing truncated by the platform");
        }
        Ok(body
            .tree
            .into_iter()
            .map(|item| TreeEntry {
                kind: TreeEntryKind::from_mode(&item.mode),
                path: item.path,
                sha: item.sha,
            })
            .filter(|entry| {
                matches!(entry.kind, TreeEntryKind::File | TreeEntryKind::Symlink)
            })
            .collect())
    }

    async fn list_pull_request_files(&self, pr_number: u64) -> HostingResult<Vec<DiffEntry>> {
        let mut entries = Vec::new();
        for page in 1..=MAX_FILE_PAGES {
            let request = self
                .http
                .get(self.repo_url(&format!("pulls/{pr_number}/files")))
                .query(&[("per_page", PER_PAGE), ("page", page)]);
            let files: Vec<PullFile> = self
                .send(request, &format!("pull request #{pr_number}"))
                .await?
                .json()
                .await?;
            let count = files.len();
            entries.extend(files.into_iter().map(|f| DiffEntry {
                path: f.filename,
                status: f.status,
                additions: f.additions,
                deletions: f.deletions,
                previous_path: f.previous_filename,
            }));
            if count < PER_PAGE {
                break;
            }
        }
        Ok(entries)
    }

    async fn list_comments(&self, pr_number: u64) -> HostingResult<Vec<Comment>> {
        let mut comments = Vec::new();
        let mut page = 1usize;
        loop {
            let request = self
                .http
                .get(self.repo_url(&format!("issues/{pr_number}/comments")))
                .query(&[("per_page", PER_PAGE), ("page", page)]);
            let batch: Vec<Comment> = self
                .send(request, &format!("comments on #{pr_number}"))
                .await?
                .json()
                .await?;
            let count = batch.len();
            comments.extend(batch);
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(comments)
    }

    async fn get_comment(&self, comment_id: u64) -> HostingResult<Comment> {
        let request = self
            .http
            .get(self.repo_url(&format!("issues/comments/{comment_id}")));
        Ok(self
            .send(request, &format!("comment {comment_id}"))
            .await?
            .json()
            .await?)
    }

    async fn create_comment(&self, pr_number: u64, body: &str) -> HostingResult<Comment> {
        let request = self
            .http
            .post(self.repo_url(&format!("issues/{pr_number}/comments")))
            .json(&json!({ "body": body }));
        Ok(self
            .send(request, &format!("comments on #{pr_number}"))
            .await?
            .json()
            .await?)
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> HostingResult<Comment> {
        let request = self
            .http
            .patch(self.repo_url(&format!("issues/comments/{comment_id}")))
            .json(&json!({ "body": body }));
        Ok(self
            .send(request, &format!("comment {comment_id}"))
            .await?
            .json()
            .await?)
    }
}
