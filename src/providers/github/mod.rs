use super::{optional, required, CiContext, CiProvider};
use crate::error::Result;

const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Builds the context from GitHub Actions default environment variables.
pub(super) fn context_from_env(lookup: &impl Fn(&str) -> Option<String>) -> Result<CiContext> {
    let project_path = required(lookup, "GITHUB_REPOSITORY")?;

    Ok(CiContext {
        provider: CiProvider::GitHub,
        project_id: optional(lookup, "GITHUB_REPOSITORY_ID")
            .unwrap_or_else(|| project_path.clone()),
        project_path,
        pipeline_id: required(lookup, "GITHUB_RUN_ID")?,
        job_name: required(lookup, "GITHUB_JOB")?,
        job_id: optional(lookup, "GITHUB_RUN_ATTEMPT").unwrap_or_else(|| "1".to_string()),
        ref_: optional(lookup, "GITHUB_REF_NAME").unwrap_or_default(),
        pipeline_source: optional(lookup, "GITHUB_EVENT_NAME").unwrap_or_default(),
        server_url: optional(lookup, "GITHUB_SERVER_URL")
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
        pages_domain: None,
        project_dir: optional(lookup, "GITHUB_WORKSPACE").map(Into::into),
    })
}

/// Generate URL for a workflow run.
pub fn workflow_run_url(server_url: &str, repository: &str, run_id: &str) -> String {
    format!(
        "{}/{repository}/actions/runs/{run_id}",
        server_url.trim_end_matches('/')
    )
}
