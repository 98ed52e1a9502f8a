//! In-memory fake for the hosting client (testing only)
//!
//! `MemoryHosting` keeps a tiny commit graph per branch plus a comment store,
//! and enforces the same conditional-write rules as the real platform. It
//! also counts reads and writes so tests can assert that a code path made
//! no network call at all.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::client::*;
use crate::error::HostingError;

#[derive(Debug, Clone)]
struct StoredFile {
    content: String,
    symlink_target: Option<String>,
}

impl StoredFile {
    fn sha(&self) -> String {
        match &self.symlink_target {
            Some(target) => blob_sha(target),
            None => blob_sha(&self.content),
        }
    }
}

#[derive(Debug, Clone)]
struct CommitState {
    parents: Vec<String>,
    files: BTreeMap<String, StoredFile>,
}

#[derive(Debug, Clone)]
struct StoredComment {
    pr_number: u64,
    comment: Comment,
}

#[derive(Debug, Default)]
struct State {
    commits: HashMap<String, CommitState>,
    branches: HashMap<String, String>,
    comments: BTreeMap<u64, StoredComment>,
    pr_files: HashMap<u64, Vec<DiffEntry>>,
    failing_paths: HashSet<String>,
    /// (branch, path) -> content committed right after the next read
    racing_edits: HashMap<(String, String), String>,
    next_comment_id: u64,
    commit_counter: u64,
    reads: usize,
    writes: usize,
}

impl State {
    fn resolve(&self, git_ref: &str) -> Option<&CommitState> {
        let sha = self.branches.get(git_ref).map(String::as_str).unwrap_or(git_ref);
        self.commits.get(sha)
    }

    fn head(&self, branch: &str) -> Result<(String, CommitState), HostingError> {
        let sha = self
            .branches
            .get(branch)
            .ok_or_else(|| HostingError::not_found(format!("branch {branch}")))?;
        let commit = self
            .commits
            .get(sha)
            .ok_or_else(|| HostingError::not_found(format!("commit {sha}")))?;
        Ok((sha.clone(), commit.clone()))
    }

    fn commit(&mut self, branch: &str, parent: String, files: BTreeMap<String, StoredFile>) -> String {
        self.commit_counter += 1;
        let sha = commit_sha(&parent, self.commit_counter);
        self.commits.insert(
            sha.clone(),
            CommitState {
                parents: vec![parent],
                files,
            },
        );
        self.branches.insert(branch.to_string(), sha.clone());
        sha
    }
}

fn blob_sha(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())[..40].to_string()
}

fn commit_sha(parent: &str, counter: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent.as_bytes());
    hasher.update(counter.to_le_bytes());
    hex::encode(hasher.finalize())[..40].to_string()
}

/// In-memory hosting platform with a single repository.
#[derive(Debug)]
pub struct MemoryHosting {
    state: Mutex<State>,
}

impl Default for MemoryHosting {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHosting {
    /// Create a repository whose `main` branch points at an empty root commit.
    pub fn new() -> Self {
        let mut state = State {
            next_comment_id: 1,
            ..State::default()
        };
        let root = commit_sha("", 0);
        state.commits.insert(
            root.clone(),
            CommitState {
                parents: Vec::new(),
                files: BTreeMap::new(),
            },
        );
        state.branches.insert("main".to_string(), root);
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Commit a regular file to a branch without counting a write.
    pub fn seed_file(&self, branch: &str, path: &str, content: &str) -> String {
        self.seed(branch, path, StoredFile {
            content: content.to_string(),
            symlink_target: None,
        })
    }

    /// Commit a symlink to a branch without counting a write.
    pub fn seed_symlink(&self, branch: &str, path: &str, target: &str) -> String {
        self.seed(branch, path, StoredFile {
            content: String::new(),
            symlink_target: Some(target.to_string()),
        })
    }

    fn seed(&self, branch: &str, path: &str, file: StoredFile) -> String {
        let mut state = self.state();
        let (parent, mut files) = match state.head(branch) {
            Ok((sha, commit)) => (sha, commit.files),
            Err(_) => {
                let main = state.branches.get("main").cloned().unwrap_or_default();
                let files = state
                    .commits
                    .get(&main)
                    .map(|c| c.files.clone())
                    .unwrap_or_default();
                (main, files)
            }
        };
        files.insert(path.to_string(), file);
        state.commit(branch, parent, files)
    }

    /// Post a comment without counting a write.
    pub fn seed_comment(&self, pr_number: u64, body: &str) -> u64 {
        let mut state = self.state();
        let id = state.next_comment_id;
        state.next_comment_id += 1;
        state.comments.insert(
            id,
            StoredComment {
                pr_number,
                comment: Comment {
                    id,
                    body: body.to_string(),
                    updated_at: Some(Utc::now()),
                },
            },
        );
        id
    }

    /// Simulate a user editing a comment outside the automation.
    pub fn edit_comment(&self, comment_id: u64, body: &str) {
        if let Some(stored) = self.state().comments.get_mut(&comment_id) {
            stored.comment.body = body.to_string();
            stored.comment.updated_at = Some(Utc::now());
        }
    }

    /// Remove a file behind the automation's back.
    pub fn remove_file(&self, branch: &str, path: &str) {
        let mut state = self.state();
        if let Ok((parent, mut commit)) = state.head(branch) {
            commit.files.remove(path);
            state.commit(branch, parent, commit.files);
        }
    }

    /// Register the changed-file list of a pull request.
    pub fn set_pull_request_files(&self, pr_number: u64, files: Vec<DiffEntry>) {
        self.state().pr_files.insert(pr_number, files);
    }

    /// Make every content write to `path` fail with an upstream error.
    pub fn fail_writes_to(&self, path: &str) {
        self.state().failing_paths.insert(path.to_string());
    }

    /// Let another writer commit `content` to `path` right after the next
    /// read of it on `branch`, so the reader's SHA goes stale.
    pub fn race_next_read(&self, branch: &str, path: &str, content: &str) {
        self.state()
            .racing_edits
            .insert((branch.to_string(), path.to_string()), content.to_string());
    }

    /// Current content of a regular file on a branch.
    pub fn file(&self, branch: &str, path: &str) -> Option<String> {
        let state = self.state();
        state
            .resolve(branch)
            .and_then(|c| c.files.get(path))
            .filter(|f| f.symlink_target.is_none())
            .map(|f| f.content.clone())
    }

    /// Head commit SHA of a branch.
    pub fn head(&self, branch: &str) -> Option<String> {
        self.state().branches.get(branch).cloned()
    }

    /// Current body of a comment.
    pub fn comment_body(&self, comment_id: u64) -> Option<String> {
        self.state()
            .comments
            .get(&comment_id)
            .map(|c| c.comment.body.clone())
    }

    /// Number of comments on a pull request.
    pub fn comment_count(&self, pr_number: u64) -> usize {
        self.state()
            .comments
            .values()
            .filter(|c| c.pr_number == pr_number)
            .count()
    }

    /// Number of read calls made through the trait.
    pub fn read_count(&self) -> usize {
        self.state().reads
    }

    /// Number of write calls made through the trait.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Total calls made through the trait.
    pub fn call_count(&self) -> usize {
        let state = self.state();
        state.reads + state.writes
    }
}

#[async_trait]
impl HostingClient for MemoryHosting {
    async fn get_content(&self, path: &str, git_ref: &str) -> HostingResult<Option<FileContent>> {
        let mut state = self.state();
        state.reads += 1;
        let commit = state
            .resolve(git_ref)
            .ok_or_else(|| HostingError::not_found(format!("ref {git_ref}")))?;
        let found = commit.files.get(path).map(|f| FileContent {
            path: path.to_string(),
            content: f.content.clone(),
            sha: f.sha(),
            symlink_target: f.symlink_target.clone(),
        });

        let key = (git_ref.to_string(), path.to_string());
        if let Some(content) = state.racing_edits.remove(&key) {
            let (parent, mut commit) = state.head(git_ref)?;
            commit.files.insert(
                path.to_string(),
                StoredFile {
                    content,
                    symlink_target: None,
                },
            );
            state.commit(git_ref, parent, commit.files);
        }
        Ok(found)
    }

    async fn create_or_update_content(
        &self,
        path: &str,
        content: &str,
        _message: &str,
        branch: &str,
        prior_sha: Option<&str>,
    ) -> HostingResult<String> {
        let mut state = self.state();
        state.writes += 1;
        if state.failing_paths.contains(path) {
            return Err(HostingError::Upstream {
                status: 502,
                message: format!("injected failure for {path}"),
            });
        }
        let (parent, mut commit) = state.head(branch)?;
        match (commit.files.get(path), prior_sha) {
            (Some(_), None) => {
                return Err(HostingError::conflict(path, "file exists and no sha was supplied"));
            }
            (Some(existing), Some(sha)) if existing.sha() != sha => {
                return Err(HostingError::conflict(
                    path,
                    format!("sha {sha} does not match {}", existing.sha()),
                ));
            }
            (None, Some(_)) => return Err(HostingError::not_found(path)),
            _ => {}
        }
        commit.files.insert(
            path.to_string(),
            StoredFile {
                content: content.to_string(),
                symlink_target: None,
            },
        );
        Ok(state.commit(branch, parent, commit.files))
    }

    async fn delete_content(
        &self,
        path: &str,
        _message: &str,
        branch: &str,
        prior_sha: &str,
    ) -> HostingResult<String> {
        let mut state = self.state();
        state.writes += 1;
        if state.failing_paths.contains(path) {
            return Err(HostingError::Upstream {
                status: 502,
                message: format!("injected failure for {path}"),
            });
        }
        let (parent, mut commit) = state.head(branch)?;
        let existing = commit
            .files
            .get(path)
            .ok_or_else(|| HostingError::not_found(path))?;
        if existing.sha() != prior_sha {
            return Err(HostingError::conflict(
                path,
                format!("sha {prior_sha} does not match {}", existing.sha()),
            ));
        }
        commit.files.remove(path);
        Ok(state.commit(branch, parent, commit.files))
    }

    async fn get_commit(&self, sha: &str) -> HostingResult<CommitInfo> {
        let mut state = self.state();
        state.reads += 1;
        let commit = state
            .commits
            .get(sha)
            .ok_or_else(|| HostingError::not_found(format!("commit {sha}")))?;
        Ok(CommitInfo {
            sha: sha.to_string(),
            parents: commit.parents.clone(),
        })
    }

    async fn list_tree(&self, git_ref: &str) -> HostingResult<Vec<TreeEntry>> {
        let mut state = self.state();
        state.reads += 1;
        let commit = state
            .resolve(git_ref)
            .ok_or_else(|| HostingError::not_found(format!("ref {git_ref}")))?;
        Ok(commit
            .files
            .iter()
            .map(|(path, file)| TreeEntry {
                path: path.clone(),
                kind: if file.symlink_target.is_some() {
                    TreeEntryKind::Symlink
                } else {
                    TreeEntryKind::File
                },
                sha: file.sha(),
            })
            .collect())
    }

    async fn list_pull_request_files(&self, pr_number: u64) -> HostingResult<Vec<DiffEntry>> {
        let mut state = self.state();
        state.reads += 1;
        state
            .pr_files
            .get(&pr_number)
            .cloned()
            .ok_or_else(|| HostingError::not_found(format!("pull request #{pr_number}")))
    }

    async fn list_comments(&self, pr_number: u64) -> HostingResult<Vec<Comment>> {
        let mut state = self.state();
        state.reads += 1;
        Ok(state
            .comments
            .values()
            .filter(|c| c.pr_number == pr_number)
            .map(|c| c.comment.clone())
            .collect())
    }

    async fn get_comment(&self, comment_id: u64) -> HostingResult<Comment> {
        let mut state = self.state();
        state.reads += 1;
        state
            .comments
            .get(&comment_id)
            .map(|c| c.comment.clone())
            .ok_or_else(|| HostingError::not_found(format!("comment {comment_id}")))
    }

    async fn create_comment(&self, pr_number: u64, body: &str) -> HostingResult<Comment> {
        let mut state = self.state();
        state.writes += 1;
        let id = state.next_comment_id;
        state.next_comment_id += 1;
        let comment = Comment {
            id,
            body: body.to_string(),
            updated_at: Some(Utc::now()),
        };
        state.comments.insert(
            id,
            StoredComment {
                pr_number,
                comment: comment.clone(),
            },
        );
        Ok(comment)
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> HostingResult<Comment> {
        let mut state = self.state();
        state.writes += 1;
        let stored = state
            .comments
            .get_mut(&comment_id)
            .ok_or_else(|| HostingError::not_found(format!("comment {comment_id}")))?;
        stored.comment.body = body.to_string();
        stored.comment.updated_at = Some(Utc::now());
        Ok(stored.comment.clone())
    }
}
