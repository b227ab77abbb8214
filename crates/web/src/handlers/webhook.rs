use std::{ops::ControlFlow, path::PathBuf};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use preview_sync_core::{SyncError, util};
use preview_sync_github::{
    ARTIFACT_NAME,
    models::{WorkflowRun, WorkflowRunEvent},
    webhook::SignedDelivery,
};
use preview_sync_publish::publish;
use url::Url;

use crate::AppState;

const PING_EVENT: &str = "ping";

/// Successful result of handling a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pong,
    /// The delivery was valid but describes nothing to sync.
    Ignored(String),
    Synced { branch: String, files: usize },
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let message = match self {
            Outcome::Pong => "pong".to_string(),
            Outcome::Ignored(reason) => reason,
            Outcome::Synced { branch, .. } => format!("Synced {ARTIFACT_NAME} into {branch}"),
        };
        (StatusCode::OK, message).into_response()
    }
}

/// A successful run, resolved to where its artifact should land.
#[derive(Debug)]
struct SyncTarget {
    branch: String,
    artifacts_url: Url,
    dir: PathBuf,
}

fn parse_event(body: &[u8]) -> Result<WorkflowRunEvent, SyncError> {
    serde_json::from_slice(body)
        .map_err(|e| SyncError::Validation(format!("Invalid workflow_run payload: {e}")))
}

/// Only completed, successful runs continue to the sync.
fn filter_event(event: &WorkflowRunEvent) -> Result<ControlFlow<Outcome, &WorkflowRun>, SyncError> {
    if event.action != "completed" {
        return Ok(ControlFlow::Break(Outcome::Ignored(format!(
            "Ignoring action {}",
            event.action
        ))));
    }
    let run = event
        .workflow_run
        .as_ref()
        .ok_or_else(|| SyncError::Validation("Payload has no workflow_run".to_string()))?;
    match run.conclusion.as_deref() {
        Some("success") => Ok(ControlFlow::Continue(run)),
        conclusion => Ok(ControlFlow::Break(Outcome::Ignored(format!(
            "Ignoring conclusion {}",
            conclusion.unwrap_or("[none]")
        )))),
    }
}

fn resolve_target(run: &WorkflowRun, state: &AppState) -> Result<SyncTarget, SyncError> {
    let branch = run
        .head_branch
        .clone()
        .ok_or_else(|| SyncError::Validation("workflow_run has no head_branch".to_string()))?;
    let artifacts_url = run
        .artifacts_url
        .clone()
        .ok_or_else(|| SyncError::Validation("workflow_run has no artifacts_url".to_string()))?;
    let dir = util::branch_dir(&state.config.output.root, &branch)
        .ok_or_else(|| SyncError::Validation(format!("Invalid branch name {branch:?}")))?;
    Ok(SyncTarget { branch, artifacts_url, dir })
}

async fn sync(state: &AppState, target: SyncTarget) -> Result<Outcome, SyncError> {
    let listing = state.github.list_artifacts(&target.artifacts_url).await?;
    let artifact = listing
        .find(ARTIFACT_NAME)
        .ok_or_else(|| SyncError::NotFound(format!("Artifact {ARTIFACT_NAME} not found")))?;

    // Removed on drop, whichever way this function returns
    let workspace = match &state.config.output.workspace_dir {
        Some(dir) => tempfile::tempdir_in(dir),
        None => tempfile::tempdir(),
    }
    .map_err(|e| SyncError::Filesystem(format!("Failed to create workspace: {e}")))?;
    let archive = workspace.path().join("artifact.zip");
    let size = state.github.download_artifact(artifact, &archive).await?;
    tracing::info!("Downloaded {} ({}) for {}", artifact.name, util::size(size), target.branch);

    let files = publish(&state.locks, archive, target.dir)
        .await
        .map_err(|e| SyncError::Filesystem(format!("Failed to publish {}: {e}", target.branch)))?;
    Ok(Outcome::Synced { branch: target.branch, files })
}

/// Sync the `generated_html` artifact of a successful workflow run into the
/// branch's output directory.
pub async fn webhook(
    State(state): State<AppState>,
    SignedDelivery { event, body }: SignedDelivery,
) -> Result<Outcome, SyncError> {
    // Other event names fall through to the payload filter
    if event.as_deref() == Some(PING_EVENT) {
        tracing::info!("Received ping event");
        return Ok(Outcome::Pong);
    }

    let payload = parse_event(&body)?;
    let run = match filter_event(&payload)? {
        ControlFlow::Continue(run) => run,
        ControlFlow::Break(outcome) => {
            tracing::info!("Skipping delivery: {outcome:?}");
            return Ok(outcome);
        }
    };
    let target = resolve_target(run, &state)?;
    tracing::info!("Syncing {} for branch {}", ARTIFACT_NAME, target.branch);
    let outcome = sync(&state, target).await?;
    tracing::info!("{outcome:?}");
    Ok(outcome)
}
