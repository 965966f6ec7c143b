mod gcs;
mod gitlab_artifacts;
mod s3;
mod storage;

pub use gcs::{GcsConfig, GcsStore};
pub use gitlab_artifacts::GitlabArtifactsUploader;
pub use s3::{S3Config, S3Store};
pub use storage::StorageUploader;

use async_trait::async_trait;
use log::info;
use serde::Serialize;

use crate::error::Result;
use crate::report::ReportBuild;

/// Destination of an object storage upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    pub prefix: Option<String>,
    /// Also publish the tree under `<prefix>/latest/`
    pub copy_latest: bool,
}

/// Minimal object storage surface the uploader relies on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;

    /// Returns `None` when the object does not exist.
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Public URL an uploaded object is reachable at.
    fn object_url(&self, key: &str) -> String;
}

/// Where the report ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    S3,
    Gcs,
    GitlabArtifacts,
}

impl Backend {
    pub fn label(self) -> &'static str {
        match self {
            Backend::S3 => "s3",
            Backend::Gcs => "gcs",
            Backend::GitlabArtifacts => "gitlab-artifacts",
        }
    }
}

/// Report publisher, one variant per backend, chosen once at startup.
pub enum Uploader {
    S3(StorageUploader),
    Gcs(StorageUploader),
    GitlabArtifacts(GitlabArtifactsUploader),
}

impl Uploader {
    pub fn backend(&self) -> Backend {
        match self {
            Uploader::S3(_) => Backend::S3,
            Uploader::Gcs(_) => Backend::Gcs,
            Uploader::GitlabArtifacts(_) => Backend::GitlabArtifacts,
        }
    }

    /// Brings the previous run's history file into the local report source tree.
    pub async fn download_history(&self) -> Result<()> {
        match self {
            Uploader::S3(u) | Uploader::Gcs(u) => u.download_history().await,
            Uploader::GitlabArtifacts(u) => u.download_history().await,
        }
    }

    /// Publishes the generated report and returns its primary URL.
    pub async fn upload(&self) -> Result<String> {
        match self {
            Uploader::S3(u) | Uploader::Gcs(u) => u.upload().await,
            Uploader::GitlabArtifacts(u) => u.upload().await,
        }
    }

    pub fn report_url(&self) -> String {
        self.url_for(None)
    }

    /// Primary URL followed by one URL per plugin, in configured order.
    pub fn report_urls(&self) -> Vec<String> {
        std::iter::once(self.url_for(None))
            .chain(self.plugins().iter().map(|p| self.url_for(Some(p.as_str()))))
            .collect()
    }

    pub fn output_report_urls(&self) {
        for line in self.report_url_lines() {
            info!("{line}");
        }
    }

    fn report_url_lines(&self) -> Vec<String> {
        self.report_urls()
            .into_iter()
            .map(|url| format!("- {url}"))
            .collect()
    }

    fn url_for(&self, plugin: Option<&str>) -> String {
        match self {
            Uploader::S3(u) | Uploader::Gcs(u) => u.report_url(plugin),
            Uploader::GitlabArtifacts(u) => u.report_url(plugin),
        }
    }

    pub fn build(&self) -> &ReportBuild {
        match self {
            Uploader::S3(u) | Uploader::Gcs(u) => u.build(),
            Uploader::GitlabArtifacts(u) => u.build(),
        }
    }

    fn plugins(&self) -> &[String] {
        &self.build().plugins
    }
}

/// Content type for a report file, by extension.
pub(crate) fn content_type(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("js" | "mjs") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("txt" | "log") => "text/plain; charset=utf-8",
        Some("csv") => "text/csv",
        Some("xml") => "application/xml",
        _ => "application/octet-stream",
    }
}

/// Joins object key segments with `/`, dropping empty ones.
pub(crate) fn object_key<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
