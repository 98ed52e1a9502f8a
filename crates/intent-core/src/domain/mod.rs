//! Domain models for Intent Layer.
//!
//! - `IntentFileKind` / `IntentFile`: detected documentation files
//! - `IntentError`: the NotFound / Conflict / MalformedInput / Upstream taxonomy
//! - path helpers shared by the hierarchy and the resolvers

pub mod error;
pub mod node;

pub use error::{ErrorClass, IntentError, IntentResult};
pub use intent_hosting::{ChangeStatus, DiffEntry};
pub use node::{
    file_name, is_strict_ancestor_dir, join_path, parent_dir, path_depth, FileSelection,
    IntentFile, IntentFileKind,
};
