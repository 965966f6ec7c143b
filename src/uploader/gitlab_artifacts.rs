use std::sync::Arc;

use log::{debug, info};

use crate::auth::Token;
use crate::error::{PublisherError, Result};
use crate::providers::gitlab::{self, GitLabClient, HistoryOutcome, HistoryResolver};
use crate::providers::{CiContext, CiProvider};
use crate::report::ReportBuild;

/// Keeps the report as job artifacts and links to it through GitLab pages.
///
/// Nothing is transferred by this backend: the runner collects the report
/// directory as an artifact of the current job. The API client is only built
/// when history is requested, so report URLs stay available even when the
/// server URL cannot be parsed.
pub struct GitlabArtifactsUploader {
    ctx: Arc<CiContext>,
    build: ReportBuild,
    token: Option<Token>,
}

impl GitlabArtifactsUploader {
    /// # Errors
    ///
    /// Returns [`PublisherError::Config`] when not running inside GitLab CI.
    pub fn new(ctx: Arc<CiContext>, build: ReportBuild, token: Option<Token>) -> Result<Self> {
        if ctx.provider != CiProvider::GitLab {
            return Err(PublisherError::Config(
                "gitlab-artifacts upload is only supported in GitLab CI".to_string(),
            ));
        }

        Ok(Self { ctx, build, token })
    }

    pub fn build(&self) -> &ReportBuild {
        &self.build
    }

    fn history(&self) -> Result<HistoryResolver> {
        let client = GitLabClient::new(&self.ctx.server_url, self.token.clone())?;
        Ok(HistoryResolver::from_client(Arc::new(client)))
    }

    pub async fn download_history(&self) -> Result<()> {
        let outcome = self
            .history()?
            .download(&self.ctx, &self.build.history_path)
            .await?;

        match outcome {
            HistoryOutcome::Downloaded { job_id, bytes } => {
                info!("Downloaded history ({bytes} bytes) from job {job_id}");
            }
            HistoryOutcome::NoMatchingJob => {
                debug!("History continuity skipped for job '{}'", self.ctx.job_name);
            }
        }

        Ok(())
    }

    pub async fn upload(&self) -> Result<String> {
        info!(
            "Report {} will be published as artifacts of job {}",
            self.build.report_path.display(),
            self.ctx.job_id
        );
        Ok(self.report_url(None))
    }

    pub fn report_url(&self, plugin: Option<&str>) -> String {
        let report_path = self
            .build
            .relative_report_path(self.ctx.project_dir.as_deref());
        gitlab::report_url(&self.ctx, &report_path, plugin)
    }
}
