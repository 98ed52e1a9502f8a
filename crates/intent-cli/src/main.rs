//! Intent Layer CLI
//!
//! The `intent-layer` command drives the core against a local checkout or
//! the GitHub API.
//!
//! ## Commands
//!
//! - `analyze`: decide which intent nodes a diff touches
//! - `validate-symlinks`: check symlink pairing of intent files
//! - `marker`: encode or decode comment markers
//! - `publish`: post proposals as pull-request comments
//! - `apply`: write a batch of proposals to a branch
//! - `checkbox`: handle a comment-edit event

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, Level};

use intent_core::{
    analyze, decode_marker, detect_local, encode_marker, parse_proposals, publish_proposals,
    validate_symlinks, ApplyOptions, BatchMode, BatchReport, CheckboxEvent, IgnoreFilter,
    IgnoreMatcher, IntentConfig, IntentHierarchy, MarkerData, RejectedProposal, SyncOrchestrator,
};
use intent_hosting::{DiffEntry, GitHubClient};

#[derive(Parser)]
#[command(name = "intent-layer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Keep AGENTS.md / CLAUDE.md files in step with pull requests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file (INTENT_* variables still override it)
    #[arg(short, long, global = true, env = "INTENT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a diff onto the intent hierarchy of a local checkout
    Analyze {
        /// Repository root
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Changed files as JSON (GitHub PR-files format)
        #[arg(long)]
        diff: PathBuf,

        /// Ignore file, overriding the configured one
        #[arg(long)]
        ignore_file: Option<PathBuf>,
    },

    /// Check that every dual-file directory is a proper symlink pair
    ValidateSymlinks {
        /// Repository root
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },

    /// Encode or decode comment markers
    Marker {
        #[command(subcommand)]
        action: MarkerAction,
    },

    /// Post proposals as pull-request comments
    Publish {
        /// Proposals JSON (`{"updates": [...]}` or a bare array)
        #[arg(long)]
        proposals: PathBuf,

        /// Pull request number
        #[arg(long)]
        pr: u64,

        /// Head commit the proposals were computed against
        #[arg(long)]
        head_sha: String,
    },

    /// Write a batch of proposals to a branch
    Apply {
        /// Proposals JSON (`{"updates": [...]}` or a bare array)
        #[arg(long)]
        proposals: PathBuf,

        /// Branch to commit to
        #[arg(short, long)]
        branch: String,

        /// Stop at the first failed proposal
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Apply or revert a proposal from a comment-edit event
    Checkbox {
        /// Event JSON: `{"comment_id", "body"}` or a webhook payload
        #[arg(long)]
        event: PathBuf,

        /// Branch to commit to
        #[arg(short, long)]
        branch: String,
    },
}

#[derive(Subcommand)]
enum MarkerAction {
    /// Print the marker line for a node
    Encode {
        /// Node path
        #[arg(long)]
        node: String,

        /// Head SHA the proposal was computed against
        #[arg(long)]
        head_sha: String,

        /// Companion file path
        #[arg(long)]
        other_node: Option<String>,

        /// Commit that applied the proposal
        #[arg(long)]
        applied_commit: Option<String>,
    },
    /// Extract the marker from a comment body
    Decode {
        /// File holding the comment body (stdin when omitted)
        body: Option<PathBuf>,
    },
}

/// Webhook payload shape for `issue_comment` events.
#[derive(Deserialize)]
struct CommentPayload {
    comment: PayloadComment,
}

#[derive(Deserialize)]
struct PayloadComment {
    id: u64,
    body: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventInput {
    Event(CheckboxEvent),
    Webhook(CommentPayload),
}

impl From<EventInput> for CheckboxEvent {
    fn from(input: EventInput) -> Self {
        match input {
            EventInput::Event(event) => event,
            EventInput::Webhook(payload) => CheckboxEvent {
                comment_id: payload.comment.id,
                body: payload.comment.body,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    intent_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            repo,
            diff,
            ignore_file,
        } => cmd_analyze(&config, &repo, &diff, ignore_file.as_deref()),
        Commands::ValidateSymlinks { repo } => cmd_validate_symlinks(&config, &repo),
        Commands::Marker { action } => match action {
            MarkerAction::Encode {
                node,
                head_sha,
                other_node,
                applied_commit,
            } => cmd_marker_encode(node, head_sha, other_node, applied_commit),
            MarkerAction::Decode { body } => cmd_marker_decode(body.as_deref()),
        },
        Commands::Publish {
            proposals,
            pr,
            head_sha,
        } => cmd_publish(&config, &proposals, pr, &head_sha).await,
        Commands::Apply {
            proposals,
            branch,
            stop_on_error,
        } => cmd_apply(&config, &proposals, &branch, stop_on_error).await,
        Commands::Checkbox { event, branch } => cmd_checkbox(&config, &event, &branch).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<IntentConfig> {
    let config = match path {
        Some(path) => IntentConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env(),
        None => IntentConfig::from_env(),
    };
    config.context("Invalid INTENT_* environment")
}

fn github_client() -> Result<GitHubClient> {
    GitHubClient::from_env().context("Failed to configure GitHub client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn read_text(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => std::io::read_to_string(std::io::stdin()).context("Failed to read stdin"),
    }
}

/// Scan a checkout and build the hierarchy the config asks for.
fn local_hierarchy(config: &IntentConfig, repo: &Path) -> Result<IntentHierarchy> {
    let files = detect_local(repo, config.files)
        .with_context(|| format!("Failed to scan {}", repo.display()))?;
    Ok(IntentHierarchy::build_with_primary(
        files,
        config.primary_kind(),
    ))
}

fn cmd_analyze(
    config: &IntentConfig,
    repo: &Path,
    diff: &Path,
    ignore_file: Option<&Path>,
) -> Result<()> {
    let entries: Vec<DiffEntry> = read_json_file(diff)?;
    let hierarchy = local_hierarchy(config, repo)?;

    let ignore_path = match ignore_file {
        Some(path) => path.to_path_buf(),
        None => repo.join(&config.ignore_file),
    };
    let filter = IgnoreFilter::from_file(&ignore_path)
        .with_context(|| format!("Failed to load ignore file {}", ignore_path.display()))?;
    let matcher: Option<&dyn IgnoreMatcher> = if filter.is_empty() {
        None
    } else {
        Some(&filter)
    };

    let report = analyze(&entries, &hierarchy, matcher, config);
    print_json(&report)
}

fn cmd_validate_symlinks(config: &IntentConfig, repo: &Path) -> Result<()> {
    let files = detect_local(repo, config.files)
        .with_context(|| format!("Failed to scan {}", repo.display()))?;
    let result = validate_symlinks(&files, config.symlink);
    print_json(&result)?;
    if !result.valid {
        bail!(
            "symlink conflicts in: {}",
            result.conflicting_directories().join(", ")
        );
    }
    Ok(())
}

fn cmd_marker_encode(
    node: String,
    head_sha: String,
    other_node: Option<String>,
    applied_commit: Option<String>,
) -> Result<()> {
    let mut marker = MarkerData::new(node, head_sha).with_applied_commit(applied_commit);
    if let Some(other) = other_node {
        marker = marker.with_other_node(other);
    }
    println!("{}", encode_marker(&marker));
    Ok(())
}

fn cmd_marker_decode(body: Option<&Path>) -> Result<()> {
    let text = read_text(body)?;
    match decode_marker(&text) {
        Some(marker) => print_json(&marker),
        None => bail!("no intent layer marker found"),
    }
}

async fn cmd_publish(config: &IntentConfig, proposals: &Path, pr: u64, head_sha: &str) -> Result<()> {
    let text = read_text(Some(proposals))?;
    let parsed = parse_proposals(&text).context("Failed to parse proposals")?;
    for rejected in &parsed.rejected {
        info!(index = rejected.index, error = %rejected.error, "proposal rejected");
    }

    let client = github_client()?;
    let report = publish_proposals(&client, pr, head_sha, &parsed.updates, config)
        .await
        .with_context(|| format!("Failed to publish proposals on #{pr}"))?;
    print_json(&report)
}

async fn cmd_apply(
    config: &IntentConfig,
    proposals: &Path,
    branch: &str,
    stop_on_error: bool,
) -> Result<()> {
    let text = read_text(Some(proposals))?;
    let parsed = parse_proposals(&text).context("Failed to parse proposals")?;
    for rejected in &parsed.rejected {
        info!(index = rejected.index, error = %rejected.error, "proposal rejected");
    }

    let mode = if stop_on_error {
        BatchMode::StopOnFirstError
    } else {
        BatchMode::ContinueOnError
    };
    let orchestrator =
        SyncOrchestrator::new(github_client()?, ApplyOptions::from_config(branch, config));
    let report = orchestrator.apply_batch(&parsed.updates, mode).await;
    let output = ApplyOutput {
        rejected: &parsed.rejected,
        report: &report,
    };
    print_json(&output)?;

    if let Some(summary) = output.failure_summary() {
        bail!(summary);
    }
    Ok(())
}

/// Batch report plus the proposals that never reached it.
#[derive(Serialize)]
struct ApplyOutput<'a> {
    rejected: &'a [RejectedProposal],
    #[serde(flatten)]
    report: &'a BatchReport,
}

impl ApplyOutput<'_> {
    fn failure_summary(&self) -> Option<String> {
        let failed = self.report.failed();
        let rejected = self.rejected.len();
        if failed == 0 && rejected == 0 {
            return None;
        }
        let total = self.report.items.len() + self.report.not_attempted + rejected;
        Some(format!(
            "{failed} proposal(s) failed and {rejected} rejected out of {total}"
        ))
    }
}

async fn cmd_checkbox(config: &IntentConfig, event: &Path, branch: &str) -> Result<()> {
    let input: EventInput = read_json_file(event)?;
    let event = CheckboxEvent::from(input);

    let orchestrator =
        SyncOrchestrator::new(github_client()?, ApplyOptions::from_config(branch, config));
    let outcome = orchestrator
        .handle_checkbox_event(&event)
        .await
        .with_context(|| format!("Failed to handle comment {}", event.comment_id))?;
    print_json(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "intent-layer",
            "--json",
            "apply",
            "--proposals",
            "p.json",
            "--branch",
            "feature",
            "--stop-on-error",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Apply {
                branch,
                stop_on_error,
                ..
            } => {
                assert_eq!(branch, "feature");
                assert!(stop_on_error);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn event_input_accepts_both_shapes() {
        let direct: EventInput =
            serde_json::from_str(r#"{"comment_id":7,"body":"x"}"#).unwrap();
        assert_eq!(CheckboxEvent::from(direct).comment_id, 7);

        let webhook: EventInput = serde_json::from_str(
            r#"{"action":"edited","comment":{"id":9,"body":"- [x] Apply this change","user":{}}}"#,
        )
        .unwrap();
        let event = CheckboxEvent::from(webhook);
        assert_eq!(event.comment_id, 9);
        assert!(event.body.contains("[x]"));
    }

    #[test]
    fn apply_output_lists_rejected_beside_the_report() {
        let rejected = vec![RejectedProposal {
            index: 1,
            node_path: Some("x/AGENTS.md".into()),
            error: "missing suggestedContent".into(),
        }];
        let report = BatchReport::default();
        let output = ApplyOutput {
            rejected: &rejected,
            report: &report,
        };

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["rejected"][0]["index"], 1);
        assert_eq!(json["not_attempted"], 0);
        assert!(json["items"].as_array().unwrap().is_empty());
        assert_eq!(
            output.failure_summary().as_deref(),
            Some("0 proposal(s) failed and 1 rejected out of 1")
        );

        let clean = ApplyOutput {
            rejected: &[],
            report: &report,
        };
        assert_eq!(clean.failure_summary(), None);
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intent.toml");
        std::fs::write(&path, "new_nodes = false\n[parent_review]\nmin_children = 2\n").unwrap();
        let config = IntentConfig::from_file(&path).unwrap();
        assert!(!config.new_nodes);
        assert_eq!(config.parent_review.min_children, 2);
    }

    #[test]
    fn analyze_reads_platform_diff_json() {
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(repo.path().join("AGENTS.md"), "# root\n").unwrap();
        std::fs::create_dir(repo.path().join("api")).unwrap();
        std::fs::write(repo.path().join("api/AGENTS.md"), "# api\n").unwrap();

        let diff = repo.path().join("diff.json");
        std::fs::write(
            &diff,
            r#"[{"filename":"api/h.rs","status":"modified","additions":1,"deletions":0}]"#,
        )
        .unwrap();

        let config = IntentConfig::default();
        let hierarchy = local_hierarchy(&config, repo.path()).unwrap();
        let entries: Vec<DiffEntry> = read_json_file(&diff).unwrap();
        let report = analyze(&entries, &hierarchy, None, &config);
        assert_eq!(report.decision.direct.len(), 1);
        assert_eq!(report.decision.direct[0].node_path, "api/AGENTS.md");
    }
}
