//! Comment-marker protocol.
//!
//! A proposal comment is the only persistence layer: the marker carries the
//! durable state, the checkbox is the human control, and the status line
//! reports what happened.

pub mod checkbox;
pub mod codec;
pub mod comment;
mod fence;

pub use checkbox::{checkbox_state, remove_checkbox, set_checkbox, CheckboxState};
pub use codec::{decode_marker, encode_marker, replace_marker, MarkerData};
pub use comment::{
    comment_status, parse_proposal_comment, render_proposal_comment, set_status, CommentStatus,
    ProposalContent,
};
