//! Intent hierarchy construction and coverage resolution.

pub mod coverage;
pub mod tree;

pub use coverage::resolve_coverage;
pub use tree::{IntentHierarchy, IntentNode, NodeId};
