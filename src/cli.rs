use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::{debug, info};

use crate::auth::Token;
use crate::executor::write_executor_metadata;
use crate::output::{print_run_header, print_summary, Phase, PhaseProgress, PublishSummary};
use crate::providers::CiContext;
use crate::report::{ReportBuild, ReportGenerator};
use crate::results::find_result_dirs;
use crate::uploader::{
    GcsConfig, GcsStore, GitlabArtifactsUploader, S3Config, S3Store, StorageUploader,
    UploadTarget, Uploader,
};

#[derive(Parser)]
#[command(name = "allure-publisher")]
#[command(author, version, about = "Allure report publisher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write the publish summary as JSON to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Print debug logs
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and upload allure report
    Upload {
        #[command(subcommand)]
        backend: UploadCommand,
    },
}

#[derive(Subcommand)]
enum UploadCommand {
    /// Generate and upload allure report to s3 bucket
    S3 {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        target: BucketArgs,

        /// Custom endpoint for S3 compatible storage
        #[arg(long, env = "AWS_ENDPOINT")]
        endpoint: Option<String>,

        #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
        region: String,

        #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
        access_key_id: String,

        #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
        secret_access_key: String,

        #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
        session_token: Option<String>,
    },
    /// Generate and upload allure report to gcs bucket
    Gcs {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        target: BucketArgs,

        /// Custom JSON API endpoint, e.g. for an emulator
        #[arg(long, env = "GCS_ENDPOINT")]
        endpoint: Option<String>,

        #[arg(long, env = "GCS_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,
    },
    /// Generate report and output GitLab CI artifacts links
    GitlabArtifacts {
        #[command(flatten)]
        common: CommonArgs,

        /// Access token used for reading previous pipelines
        #[arg(long, env = "GITLAB_AUTH_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[arg(long, env = "CI_JOB_TOKEN", hide_env_values = true)]
        job_token: Option<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Glob matching allure results directories
    #[arg(long, default_value = "./**/allure-results")]
    results_glob: String,

    /// Directory the report is generated into
    #[arg(long, default_value = "reports/allure")]
    report_path: PathBuf,

    /// History file read and written by the report generator
    #[arg(long, default_value = "reports/history/history.json")]
    history_path: PathBuf,

    /// Plugin sub-report, repeatable; order is kept in the URL list
    #[arg(long = "plugin")]
    plugins: Vec<String>,

    /// Report generator executable
    #[arg(long, default_value = "allure")]
    generator: String,

    /// Report generator configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Title shown inside the generated report
    #[arg(long)]
    report_name: Option<String>,

    /// Section title for the PR/MR comment, carried in the publish summary
    #[arg(long)]
    ci_report_title: Option<String>,

    /// Do not carry history over from previous runs
    #[arg(long, default_value_t = false)]
    skip_history: bool,
}

impl CommonArgs {
    fn report_build(&self) -> ReportBuild {
        ReportBuild {
            report_path: self.report_path.clone(),
            plugins: self.plugins.clone(),
            history_path: self.history_path.clone(),
        }
    }

    fn generator(&self) -> ReportGenerator {
        ReportGenerator::new(self.generator.as_str(), self.config.clone())
            .with_report_name(self.report_name.clone())
    }
}

#[derive(Args)]
struct BucketArgs {
    #[arg(long)]
    bucket: String,

    /// Key prefix inside the bucket
    #[arg(long)]
    prefix: Option<String>,

    /// Public base URL of the bucket, e.g. a CDN in front of it
    #[arg(long)]
    base_url: Option<String>,

    /// Also publish the report under <prefix>/latest
    #[arg(long, default_value_t = false)]
    copy_latest: bool,
}

impl BucketArgs {
    fn upload_target(&self) -> UploadTarget {
        UploadTarget {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            copy_latest: self.copy_latest,
        }
    }
}

impl UploadCommand {
    fn common(&self) -> &CommonArgs {
        match self {
            UploadCommand::S3 { common, .. }
            | UploadCommand::Gcs { common, .. }
            | UploadCommand::GitlabArtifacts { common, .. } => common,
        }
    }

    fn uploader(&self, ctx: Arc<CiContext>, build: ReportBuild) -> Result<Uploader> {
        let uploader = match self {
            UploadCommand::S3 {
                target,
                endpoint,
                region,
                access_key_id,
                secret_access_key,
                session_token,
                ..
            } => {
                let config = S3Config {
                    endpoint: endpoint.clone(),
                    region: region.clone(),
                    access_key: access_key_id.clone(),
                    secret_key: secret_access_key.clone(),
                    session_token: session_token.clone(),
                };
                let store = S3Store::new(config, target.bucket.clone(), target.base_url.clone())?;
                Uploader::S3(StorageUploader::new(
                    Arc::new(store),
                    ctx,
                    build,
                    target.upload_target(),
                ))
            }
            UploadCommand::Gcs {
                target,
                endpoint,
                access_token,
                ..
            } => {
                let config = GcsConfig {
                    endpoint: endpoint.clone(),
                    access_token: access_token.clone(),
                };
                let store = GcsStore::new(config, target.bucket.clone(), target.base_url.clone())?;
                Uploader::Gcs(StorageUploader::new(
                    Arc::new(store),
                    ctx,
                    build,
                    target.upload_target(),
                ))
            }
            UploadCommand::GitlabArtifacts {
                token, job_token, ..
            } => {
                let token = Token::from_env_values(token.clone(), job_token.clone());
                Uploader::GitlabArtifacts(GitlabArtifactsUploader::new(ctx, build, token)?)
            }
        };

        Ok(uploader)
    }
}

impl Cli {
    /// Initializes logging; `--debug` lowers the default level.
    pub fn init_logger(&self) {
        let default_level = if self.debug { "debug" } else { "info" };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .init();
    }

    async fn execute_upload(&self, command: &UploadCommand) -> Result<()> {
        let common = command.common();
        let ctx = Arc::new(CiContext::resolve()?);

        let root = std::env::current_dir().context("Failed to read current directory")?;
        let result_dirs = find_result_dirs(&common.results_glob, &root)?;

        let uploader = command.uploader(Arc::clone(&ctx), common.report_build())?;
        print_run_header(&ctx, uploader.backend());

        let summary = publish(&ctx, &uploader, common, &result_dirs).await?;

        if let Some(output_path) = &self.output {
            let json_output = if self.pretty {
                serde_json::to_string_pretty(&summary)?
            } else {
                serde_json::to_string(&summary)?
            };
            std::fs::write(output_path, json_output)?;
            info!("Summary written to: {}", output_path.display());
        }

        print_summary(&summary);

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Upload { backend } => self.execute_upload(backend).await,
        }
    }
}

/// Runs history, executor stamping, generation and upload, in that order.
///
/// A failing phase ends the run; later phases never start.
async fn publish(
    ctx: &CiContext,
    uploader: &Uploader,
    common: &CommonArgs,
    result_dirs: &[PathBuf],
) -> Result<PublishSummary> {
    let mut progress = PhaseProgress::new(Phase::ALL.len());

    if common.skip_history {
        progress.skip(Phase::History, "--skip-history");
    } else {
        progress.start(Phase::History);
        uploader.download_history().await?;
    }

    progress.start(Phase::Report);
    let executor = ctx.executor_metadata(&uploader.report_url());
    if let Some(metadata) = &executor {
        let written = write_executor_metadata(result_dirs, metadata)?;
        debug!("Wrote executor metadata to {written} result directories");
    }
    common
        .generator()
        .generate(result_dirs, uploader.build())
        .await?;

    progress.start(Phase::Upload);
    let report_url = uploader.upload().await?;
    progress.finish();
    debug!("Phase outcomes: {:?}", progress.outcomes());

    uploader.output_report_urls();

    Ok(PublishSummary {
        ci_report_title: common.ci_report_title.clone(),
        provider: ctx.provider,
        backend: uploader.backend(),
        build_order: ctx.build_order().to_string(),
        report_url,
        report_urls: uploader.report_urls(),
        result_dirs: result_dirs.len(),
        executor,
        published_at: Utc::now(),
    })
}
