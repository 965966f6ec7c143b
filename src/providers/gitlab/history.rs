use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};

use super::types::{Job, JobScope, Pipeline};
use crate::error::{PublisherError, Result};
use crate::providers::CiContext;

pub(super) const PAGE_SIZE: usize = 100;

/// Directory inside job artifacts where the history file is kept.
pub const HISTORY_ARTIFACT_DIR: &str = "reports/history";

const DEFAULT_HISTORY_FILE: &str = "history.json";

/// Job scopes searched for the previous attempt, in order.
const SCOPE_ORDER: [JobScope; 2] = [JobScope::Failed, JobScope::Success];

#[async_trait]
pub trait PipelineLister: Send + Sync {
    /// Lists a single page of the most recent pipelines for `ref_` and `source`,
    /// newest first.
    async fn list_pipelines(
        &self,
        project_id: &str,
        ref_: &str,
        source: &str,
    ) -> Result<Vec<Pipeline>>;
}

#[async_trait]
pub trait JobLister: Send + Sync {
    /// Lists non-retried jobs of a pipeline in the given scope.
    async fn list_jobs(
        &self,
        project_id: &str,
        pipeline_id: u64,
        scope: JobScope,
    ) -> Result<Vec<Job>>;
}

#[async_trait]
pub trait ArtifactDownloader: Send + Sync {
    /// Downloads a single file from a job's artifacts archive.
    async fn download_artifact(
        &self,
        project_id: &str,
        job_id: u64,
        artifact_path: &str,
    ) -> Result<Vec<u8>>;
}

/// What happened to history continuity for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    Downloaded { job_id: u64, bytes: usize },
    /// No job in the previous pipeline matched the current job name.
    NoMatchingJob,
}

/// Locates the previous run of the current job and carries its history file forward.
pub struct HistoryResolver {
    pipelines: Arc<dyn PipelineLister>,
    jobs: Arc<dyn JobLister>,
    artifacts: Arc<dyn ArtifactDownloader>,
}

impl HistoryResolver {
    pub fn new(
        pipelines: Arc<dyn PipelineLister>,
        jobs: Arc<dyn JobLister>,
        artifacts: Arc<dyn ArtifactDownloader>,
    ) -> Self {
        Self {
            pipelines,
            jobs,
            artifacts,
        }
    }

    /// Uses one client for all three collaborators.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: PipelineLister + JobLister + ArtifactDownloader + 'static,
    {
        Self::new(client.clone(), client.clone(), client)
    }

    /// Downloads the previous run's history file into `history_path`.
    ///
    /// # Errors
    ///
    /// - [`PublisherError::NotEnoughPipelines`] when there is no predecessor pipeline
    /// - [`PublisherError::ArtifactDownload`] when fetching the artifact fails
    /// - [`PublisherError::Io`] when the file cannot be written
    pub async fn download(&self, ctx: &CiContext, history_path: &Path) -> Result<HistoryOutcome> {
        let previous = self.previous_pipeline(ctx).await?;

        let Some(job) = self.matching_job(ctx, previous.id).await? else {
            debug!(
                "No '{}' job found in pipeline {}, skipping history download",
                ctx.job_name, previous.id
            );
            return Ok(HistoryOutcome::NoMatchingJob);
        };

        let file_name = history_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_HISTORY_FILE);
        let artifact_path = format!("{HISTORY_ARTIFACT_DIR}/{file_name}");

        info!(
            "Downloading history from job {} ('{}') of pipeline {}",
            job.id, job.name, previous.id
        );

        let bytes = self
            .artifacts
            .download_artifact(&ctx.project_id, job.id, &artifact_path)
            .await
            .map_err(|e| PublisherError::ArtifactDownload {
                job_id: job.id,
                message: e.to_string(),
            })?;

        if let Some(parent) = history_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(history_path, &bytes).await?;

        Ok(HistoryOutcome::Downloaded {
            job_id: job.id,
            bytes: bytes.len(),
        })
    }

    /// The second entry is the predecessor; the first is the running pipeline.
    async fn previous_pipeline(&self, ctx: &CiContext) -> Result<Pipeline> {
        let pipelines = self
            .pipelines
            .list_pipelines(&ctx.project_id, &ctx.ref_, &ctx.pipeline_source)
            .await?;

        pipelines
            .into_iter()
            .nth(1)
            .ok_or(PublisherError::NotEnoughPipelines)
    }

    async fn matching_job(&self, ctx: &CiContext, pipeline_id: u64) -> Result<Option<Job>> {
        for scope in SCOPE_ORDER {
            let jobs = self
                .jobs
                .list_jobs(&ctx.project_id, pipeline_id, scope)
                .await?;

            if let Some(job) = jobs.into_iter().find(|job| job.name == ctx.job_name) {
                return Ok(Some(job));
            }
        }

        Ok(None)
    }
}
