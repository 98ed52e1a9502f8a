//! Posting proposals as pull-request comments.

use std::collections::HashMap;

use intent_hosting::HostingClient;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::IntentConfig;
use crate::domain::IntentResult;
use crate::marker::{decode_marker, render_proposal_comment, MarkerData};
use crate::proposal::IntentUpdate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub created: Vec<u64>,
    pub updated: Vec<u64>,
    /// Node paths left alone, with the reason
    pub skipped: Vec<(String, String)>,
}

/// Post one comment per proposal for `head_sha`.
///
/// A comment already carrying a marker for the same node and head commit
/// is edited in place instead of duplicated, unless it has been applied.
pub async fn publish_proposals<C>(
    client: &C,
    pr_number: u64,
    head_sha: &str,
    updates: &[IntentUpdate],
    config: &IntentConfig,
) -> IntentResult<PublishReport>
where
    C: HostingClient + ?Sized,
{
    let existing: HashMap<(String, String), (u64, String, MarkerData)> = client
        .list_comments(pr_number)
        .await?
        .into_iter()
        .filter_map(|c| {
            let marker = decode_marker(&c.body)?;
            Some((
                (marker.node_path.clone(), marker.head_sha.clone()),
                (c.id, c.body, marker),
            ))
        })
        .collect();

    let mut report = PublishReport::default();
    for update in updates {
        if let Err(err) = update.validate() {
            warn!(node = %update.node_path, error = %err, "not publishing invalid proposal");
            report.skipped.push((update.node_path.clone(), err.to_string()));
            continue;
        }

        let mut marker = MarkerData::new(&update.node_path, head_sha);
        marker.other_node_path = update.other_node_path.clone();
        let body = render_proposal_comment(update, &marker, config.checkbox);

        match existing.get(&(update.node_path.clone(), head_sha.to_string())) {
            Some((_, _, current)) if current.is_applied() => {
                debug!(node = %update.node_path, "proposal already applied; leaving comment");
                report
                    .skipped
                    .push((update.node_path.clone(), "already applied".to_string()));
            }
            Some((id, current_body, _)) if *current_body == body => {
                debug!(node = %update.node_path, comment = id, "proposal unchanged");
                report
                    .skipped
                    .push((update.node_path.clone(), "unchanged".to_string()));
            }
            Some((id, _, _)) => {
                client.update_comment(*id, &body).await?;
                report.updated.push(*id);
            }
            None => {
                let comment = client.create_comment(pr_number, &body).await?;
                report.created.push(comment.id);
            }
        }
    }

    info!(
        pr = pr_number,
        created = report.created.len(),
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        "published proposals"
    );
    Ok(report)
}
