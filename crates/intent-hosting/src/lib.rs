//! Intent-Hosting: hosting-platform seam for Intent Layer
//!
//! Everything the core needs from the platform that stores the repository
//! and its pull-request conversation goes through [`HostingClient`].
//!
//! ## Key Components
//!
//! - `HostingClient`: async trait over contents, commits, trees and comments
//! - `GitHubClient`: REST implementation for GitHub / GitHub Enterprise
//! - `fakes::MemoryHosting`: in-memory implementation for tests

pub mod client;
mod error;
pub mod fakes;
pub mod github;

pub use client::{
    ChangeStatus, Comment, CommitInfo, DiffEntry, FileContent, HostingClient, HostingResult,
    TreeEntry, TreeEntryKind,
};
pub use error::HostingError;
pub use github::{GitHubClient, GitHubConfig};
