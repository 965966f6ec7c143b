use serde::Deserialize;

/// A GitLab CI/CD pipeline as returned by the REST API.
///
/// Only the identifier matters for history continuity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pipeline {
    pub id: u64,
}

/// A job within a GitLab CI/CD pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Job {
    pub id: u64,
    /// Job name as defined in .gitlab-ci.yml
    pub name: String,
}

/// Job status scope used when listing pipeline jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobScope {
    Failed,
    Success,
}

impl JobScope {
    pub fn as_str(self) -> &'static str {
        match self {
            JobScope::Failed => "failed",
            JobScope::Success => "success",
        }
    }
}
