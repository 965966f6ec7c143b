mod client;
mod history;
mod links;
mod types;

pub use client::GitLabClient;
pub use history::{HistoryOutcome, HistoryResolver};
pub use links::{pipeline_url, report_url};

use super::{optional, required, CiContext, CiProvider};
use crate::error::Result;

/// Builds the context from GitLab CI predefined variables.
pub(super) fn context_from_env(lookup: &impl Fn(&str) -> Option<String>) -> Result<CiContext> {
    Ok(CiContext {
        provider: CiProvider::GitLab,
        project_id: required(lookup, "CI_PROJECT_ID")?,
        project_path: required(lookup, "CI_PROJECT_PATH")?,
        pipeline_id: required(lookup, "CI_PIPELINE_ID")?,
        job_name: required(lookup, "CI_JOB_NAME")?,
        job_id: required(lookup, "CI_JOB_ID")?,
        ref_: optional(lookup, "CI_COMMIT_REF_NAME").unwrap_or_default(),
        pipeline_source: optional(lookup, "CI_PIPELINE_SOURCE").unwrap_or_default(),
        server_url: required(lookup, "CI_SERVER_URL")?,
        pages_domain: optional(lookup, "CI_PAGES_DOMAIN"),
        project_dir: optional(lookup, "CI_PROJECT_DIR").map(Into::into),
    })
}
