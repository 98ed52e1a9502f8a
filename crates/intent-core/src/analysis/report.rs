//! Decision bundle and the diff-to-candidates pipeline.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use intent_hosting::{FileContent, HostingClient};
use serde::Serialize;
use tracing::{debug, info};

use super::aggregate::{aggregate_changes, CoverageMap, CoverageSummary};
use super::candidates::{
    direct_candidates, parent_review_candidates, NodeUpdateCandidate, ParentReviewCandidate,
};
use super::new_nodes::{new_node_candidates, NewNodeCandidate};
use crate::config::IntentConfig;
use crate::domain::{DiffEntry, IntentResult};
use crate::hierarchy::IntentHierarchy;
use crate::ignore_filter::IgnoreMatcher;

/// The three candidate lists for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateDecision {
    pub direct: Vec<NodeUpdateCandidate>,
    pub parent_review: Vec<ParentReviewCandidate>,
    /// Empty unless new-node creation is enabled
    pub new_nodes: Vec<NewNodeCandidate>,
}

impl UpdateDecision {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.parent_review.is_empty() && self.new_nodes.is_empty()
    }

    /// Parent reviews that crossed a threshold.
    pub fn recommended_parents(&self) -> impl Iterator<Item = &ParentReviewCandidate> {
        self.parent_review.iter().filter(|p| p.recommend_update)
    }
}

/// Derive every candidate list from an aggregated mapping.
///
/// Pure: the same inputs always give the same lists in the same order.
pub fn decide_updates(
    map: &CoverageMap,
    hierarchy: &IntentHierarchy,
    config: &IntentConfig,
) -> UpdateDecision {
    let direct = direct_candidates(map, hierarchy);
    let parent_review = parent_review_candidates(&direct, hierarchy, &config.parent_review);
    let new_nodes = if config.new_nodes {
        new_node_candidates(map, hierarchy, config.primary_kind())
    } else {
        Vec::new()
    };
    UpdateDecision {
        direct,
        parent_review,
        new_nodes,
    }
}

/// Serialisable outcome of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub summary: CoverageSummary,
    pub ignored_files: Vec<String>,
    pub uncovered_files: Vec<String>,
    #[serde(flatten)]
    pub decision: UpdateDecision,
}

/// Aggregate a diff and decide which nodes need attention.
pub fn analyze(
    entries: &[DiffEntry],
    hierarchy: &IntentHierarchy,
    ignore: Option<&dyn IgnoreMatcher>,
    config: &IntentConfig,
) -> AnalysisReport {
    let map = aggregate_changes(entries, hierarchy, ignore);
    let decision = decide_updates(&map, hierarchy, config);

    info!(
        changed = map.summary.total_changed_files,
        uncovered = map.summary.uncovered_files,
        ignored = map.summary.ignored_files,
        direct = decision.direct.len(),
        parents = decision.parent_review.len(),
        new_nodes = decision.new_nodes.len(),
        "analysis complete"
    );

    AnalysisReport {
        summary: map.summary,
        ignored_files: map
            .files
            .iter()
            .filter(|f| f.is_ignored)
            .map(|f| f.path().to_string())
            .collect(),
        uncovered_files: map.uncovered().iter().map(|f| f.path().to_string()).collect(),
        decision,
    }
}

/// Read the current content of every node path on `git_ref`, concurrently.
///
/// Absent files map to `None`. The first failed read fails the whole call.
pub async fn fetch_current_contents<C>(
    client: &C,
    git_ref: &str,
    node_paths: &[String],
) -> IntentResult<BTreeMap<String, Option<FileContent>>>
where
    C: HostingClient + ?Sized,
{
    let reads = node_paths.iter().map(|path| async move {
        let content = client.get_content(path, git_ref).await?;
        debug!(node = %path, present = content.is_some(), "fetched node content");
        Ok::<_, crate::domain::IntentError>((path.clone(), content))
    });
    Ok(try_join_all(reads).await?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeStatus, IntentFile};
    use intent_hosting::fakes::MemoryHosting;

    fn hierarchy(paths: &[&str]) -> IntentHierarchy {
        IntentHierarchy::build(paths.iter().filter_map(|p| IntentFile::new(*p)))
    }

    fn sample() -> (IntentHierarchy, Vec<DiffEntry>) {
        let h = hierarchy(&["AGENTS.md", "src/AGENTS.md", "src/api/AGENTS.md"]);
        let entries = vec![
            DiffEntry::new("src/api/routes.rs", ChangeStatus::Added),
            DiffEntry::new("src/lib.rs", ChangeStatus::Modified),
            DiffEntry::new("Cargo.lock", ChangeStatus::Modified),
        ];
        (h, entries)
    }

    #[test]
    fn decide_updates_is_idempotent() {
        let (h, entries) = sample();
        let map = aggregate_changes(&entries, &h, None);
        let config = IntentConfig::default();
        assert_eq!(
            decide_updates(&map, &h, &config),
            decide_updates(&map, &h, &config)
        );
    }

    #[test]
    fn new_nodes_respect_config() {
        let h = hierarchy(&["src/AGENTS.md"]);
        let entries = [DiffEntry::new("tools/x.py", ChangeStatus::Added)];
        let map = aggregate_changes(&entries, &h, None);

        let on = decide_updates(&map, &h, &IntentConfig::default());
        assert_eq!(on.new_nodes.len(), 1);

        let off = IntentConfig {
            new_nodes: false,
            ..IntentConfig::default()
        };
        assert!(decide_updates(&map, &h, &off).new_nodes.is_empty());
    }

    #[test]
    fn analyze_reports_ignored_and_serializes() {
        let (h, entries) = sample();
        let ignore = |p: &str| p.ends_with(".lock");
        let report = analyze(&entries, &h, Some(&ignore), &IntentConfig::default());

        assert_eq!(report.ignored_files, vec!["Cargo.lock"]);
        let direct: Vec<_> = report.decision.direct.iter().map(|c| c.node_path.as_str()).collect();
        assert_eq!(direct, vec!["src/AGENTS.md", "src/api/AGENTS.md"]);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["direct"].is_array());
        assert_eq!(json["summary"]["total_changed_files"], 3);
    }

    #[tokio::test]
    async fn fetch_current_contents_reads_all_paths() {
        let hosting = MemoryHosting::new();
        hosting.seed_file("main", "src/AGENTS.md", "# src\n");
        let paths = vec!["src/AGENTS.md".to_string(), "lib/AGENTS.md".to_string()];

        let contents = fetch_current_contents(&hosting, "main", &paths).await.unwrap();
        assert_eq!(contents["src/AGENTS.md"].as_ref().unwrap().content, "# src\n");
        assert!(contents["lib/AGENTS.md"].is_none());
        assert_eq!(hosting.read_count(), 2);
    }
}
