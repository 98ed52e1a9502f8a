//! Proposal lifecycle on the hosting platform: publish, apply, revert.

pub mod batch;
pub mod orchestrator;
pub mod publish;

pub use batch::{BatchItem, BatchItemStatus, BatchMode, BatchReport};
pub use orchestrator::{
    ApplyOptions, ApplyResult, CheckboxEvent, CheckboxOutcome, PathChange, RevertResult,
    SecondaryResult, SkipReason, SyncOrchestrator,
};
pub use publish::{publish_proposals, PublishReport};
