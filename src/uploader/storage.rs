use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::Semaphore;
use walkdir::WalkDir;

use super::{content_type, object_key, ObjectStore, UploadTarget};
use crate::error::{PublisherError, Result};
use crate::providers::CiContext;
use crate::report::ReportBuild;

const MAX_CONCURRENT_UPLOADS: usize = 32;
const LATEST_DIR: &str = "latest";
const HISTORY_DIR: &str = "history";

/// Publishes reports to an object storage bucket.
///
/// Layout under the target prefix:
/// - `<build order>/...` report tree of this run
/// - `latest/...` same tree, when copy-latest is enabled
/// - `history/<history file>` trend data carried between runs
pub struct StorageUploader {
    store: Arc<dyn ObjectStore>,
    ctx: Arc<CiContext>,
    build: ReportBuild,
    target: UploadTarget,
}

impl StorageUploader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        ctx: Arc<CiContext>,
        build: ReportBuild,
        target: UploadTarget,
    ) -> Self {
        Self {
            store,
            ctx,
            build,
            target,
        }
    }

    pub fn build(&self) -> &ReportBuild {
        &self.build
    }

    fn prefix(&self) -> &str {
        self.target.prefix.as_deref().unwrap_or("")
    }

    fn run_prefix(&self) -> String {
        object_key([self.prefix(), self.ctx.build_order()])
    }

    fn latest_prefix(&self) -> String {
        object_key([self.prefix(), LATEST_DIR])
    }

    fn history_key(&self) -> String {
        object_key([self.prefix(), HISTORY_DIR, self.build.history_file_name()])
    }

    /// Fetches the history object stored by the previous upload.
    ///
    /// A missing object only means there is no previous run yet.
    pub async fn download_history(&self) -> Result<()> {
        let key = self.history_key();

        let Some(bytes) = self.store.get_object(&key).await? else {
            debug!("No history found at '{key}', skipping history download");
            return Ok(());
        };

        let path = &self.build.history_path;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;

        info!("Downloaded history from '{key}' to {}", path.display());
        Ok(())
    }

    /// Uploads the report tree and the refreshed history file.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Upload`] naming the first object that failed.
    pub async fn upload(&self) -> Result<String> {
        let files = report_files(&self.build.report_path)?;
        if files.is_empty() {
            return Err(PublisherError::Config(format!(
                "Report directory {} is empty or missing",
                self.build.report_path.display()
            )));
        }

        let mut prefixes = vec![self.run_prefix()];
        if self.target.copy_latest {
            prefixes.push(self.latest_prefix());
        }

        let mut objects: Vec<(String, PathBuf)> = prefixes
            .iter()
            .flat_map(|prefix| {
                files.iter().map(move |(relative, path)| {
                    (object_key([prefix.as_str(), relative.as_str()]), path.clone())
                })
            })
            .collect();

        if self.build.history_path.is_file() {
            objects.push((self.history_key(), self.build.history_path.clone()));
        } else {
            debug!(
                "History file {} not found, not uploading history",
                self.build.history_path.display()
            );
        }

        info!(
            "Uploading {} objects to bucket '{}'",
            objects.len(),
            self.target.bucket
        );

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_UPLOADS));
        let futures: Vec<_> = objects
            .iter()
            .map(|(key, path)| self.upload_file(key, path, Arc::clone(&semaphore)))
            .collect();

        futures::future::join_all(futures)
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        Ok(self.report_url(None))
    }

    async fn upload_file(&self, key: &str, path: &Path, semaphore: Arc<Semaphore>) -> Result<()> {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|e| PublisherError::Transport(e.to_string()))?;

        let body = tokio::fs::read(path).await?;
        self.store
            .put_object(key, body, content_type(key))
            .await
            .map_err(|e| PublisherError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    pub fn report_url(&self, plugin: Option<&str>) -> String {
        let run_prefix = self.run_prefix();
        let key = object_key([run_prefix.as_str(), plugin.unwrap_or(""), "index.html"]);
        self.store.object_url(&key)
    }
}

/// Files below `root` as `(relative key, path)` pairs, sorted by key.
fn report_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| PublisherError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| PublisherError::Config(e.to_string()))?
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");
        files.push((relative, entry.into_path()));
    }

    files.sort();
    Ok(files)
}
