pub mod github;
pub mod gitlab;

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use crate::error::{PublisherError, Result};
use crate::executor::ExecutorMetadata;

/// CI vendor the process is running under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CiProvider {
    GitHub,
    GitLab,
    Local,
}

impl CiProvider {
    fn detect(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let enabled = |key: &str| lookup(key).is_some_and(|v| v == "true");

        if enabled("GITLAB_CI") {
            CiProvider::GitLab
        } else if enabled("GITHUB_ACTIONS") {
            CiProvider::GitHub
        } else {
            CiProvider::Local
        }
    }

    /// Human readable vendor label, used as executor `name`.
    pub fn label(self) -> &'static str {
        match self {
            CiProvider::GitHub => "GitHub",
            CiProvider::GitLab => "GitLab",
            CiProvider::Local => "Local",
        }
    }

    /// Lowercase vendor id, used as executor `type`.
    pub fn vendor_id(self) -> &'static str {
        match self {
            CiProvider::GitHub => "github",
            CiProvider::GitLab => "gitlab",
            CiProvider::Local => "local",
        }
    }
}

/// Immutable snapshot of the CI environment.
///
/// Built once at startup and passed by reference; nothing downstream reads
/// process environment directly. Resolution is never cached, so calling
/// [`CiContext::resolve`] again observes the current environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiContext {
    pub provider: CiProvider,
    pub project_id: String,
    /// Slash delimited `group/subgroup/.../project`
    pub project_path: String,
    pub pipeline_id: String,
    pub job_name: String,
    pub job_id: String,
    pub ref_: String,
    pub pipeline_source: String,
    pub server_url: String,
    pub pages_domain: Option<String>,
    pub project_dir: Option<PathBuf>,
}

impl CiContext {
    /// Resolves the context from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Config`] when a value required by the detected
    /// CI provider is missing.
    pub fn resolve() -> Result<Self> {
        Self::resolve_from(|key| std::env::var(key).ok())
    }

    /// Resolves the context through an arbitrary variable lookup.
    pub fn resolve_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match CiProvider::detect(&lookup) {
            CiProvider::GitLab => gitlab::context_from_env(&lookup),
            CiProvider::GitHub => github::context_from_env(&lookup),
            CiProvider::Local => Ok(Self::local()),
        }
    }

    /// Outside of CI only a run id is known; everything else stays empty.
    fn local() -> Self {
        let run_id = Utc::now().format("%Y%m%d%H%M%S").to_string();

        Self {
            provider: CiProvider::Local,
            project_id: String::new(),
            project_path: String::new(),
            pipeline_id: run_id,
            job_name: "local".to_string(),
            job_id: String::new(),
            ref_: String::new(),
            pipeline_source: String::new(),
            server_url: String::new(),
            pages_domain: None,
            project_dir: None,
        }
    }

    /// Monotonically increasing build counter for this run.
    pub fn build_order(&self) -> &str {
        &self.pipeline_id
    }

    /// Web URL of the running pipeline/workflow run.
    pub fn build_url(&self) -> Option<String> {
        match self.provider {
            CiProvider::GitHub => Some(github::workflow_run_url(
                &self.server_url,
                &self.project_path,
                &self.pipeline_id,
            )),
            CiProvider::GitLab => Some(gitlab::pipeline_url(
                &self.server_url,
                &self.project_path,
                &self.pipeline_id,
            )),
            CiProvider::Local => None,
        }
    }

    /// Provenance record stamped into result directories.
    ///
    /// Outside of CI there is no build to point at, so nothing is produced.
    pub fn executor_metadata(&self, report_url: &str) -> Option<ExecutorMetadata> {
        let build_url = self.build_url()?;

        Some(ExecutorMetadata {
            name: self.provider.label().to_string(),
            type_: self.provider.vendor_id().to_string(),
            report_url: report_url.to_string(),
            build_url,
            build_order: self.build_order().to_string(),
            build_name: self.job_name.clone(),
        })
    }
}

pub(crate) fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PublisherError::Config(format!("missing environment variable {key}")))
}

pub(crate) fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.is_empty())
}
