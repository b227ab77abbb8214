use serde::Deserialize;
use url::Url;

/// The subset of a `workflow_run` webhook payload the sync pipeline reads.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunEvent {
    pub action: String,
    #[serde(default)]
    pub workflow_run: Option<WorkflowRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowRun {
    /// `null` while the run is still in progress.
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub artifacts_url: Option<Url>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactList {
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub name: String,
    #[serde(alias = "archive_download_url")]
    pub download_url: Url,
}

impl ArtifactList {
    /// First artifact whose name is exactly `name`.
    pub fn find(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.name == name)
    }
}
