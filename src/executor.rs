use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const EXECUTOR_FILE: &str = "executor.json";

/// Provenance record Allure renders in the report's executor widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub report_url: String,
    pub build_url: String,
    pub build_order: String,
    pub build_name: String,
}

/// Stamps `executor.json` into every result directory that lacks one.
///
/// Directories are processed in input order. Existing files are never
/// overwritten, and the file is created with `create_new` so a concurrent
/// writer cannot be clobbered either. Parent directories are not created.
///
/// Returns how many directories were actually written.
pub fn write_executor_metadata(
    result_dirs: &[PathBuf],
    metadata: &ExecutorMetadata,
) -> Result<usize> {
    let content = serde_json::to_string_pretty(metadata)?;
    let mut written = 0;

    for dir in result_dirs {
        if write_once(&dir.join(EXECUTOR_FILE), &content)? {
            written += 1;
        } else {
            debug!("{} already contains {EXECUTOR_FILE}, skipping", dir.display());
        }
    }

    Ok(written)
}

fn write_once(path: &Path, content: &str) -> Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    file.write_all(content.as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::PublisherError;

    fn metadata() -> ExecutorMetadata {
        ExecutorMetadata {
            name: "GitHub".to_string(),
            type_: "github".to_string(),
            report_url: "https://example.com/report".to_string(),
            build_url: "https://github.com/owner/repo/actions/runs/123".to_string(),
            build_order: "123".to_string(),
            build_name: "test-job".to_string(),
        }
    }

    fn read(dir: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(dir.join(EXECUTOR_FILE)).unwrap()).unwrap()
    }

    #[test]
    fn test_creates_executor_json() {
        let temp = tempfile::tempdir().unwrap();
        let results = temp.path().join("allure-results");
        fs::create_dir(&results).unwrap();

        let written = write_executor_metadata(&[results.clone()], &metadata()).unwrap();

        assert_eq!(written, 1);
        let content = read(&results);
        for key in ["name", "type", "reportUrl", "buildUrl", "buildOrder", "buildName"] {
            assert!(
                content[key].as_str().is_some_and(|v| !v.is_empty()),
                "missing {key}"
            );
        }
        assert_eq!(content["reportUrl"], "https://example.com/report");
        assert_eq!(content["buildUrl"], "https://github.com/owner/repo/actions/runs/123");
    }

    #[test]
    fn test_writes_indented_json() {
        let temp = tempfile::tempdir().unwrap();

        write_executor_metadata(&[temp.path().to_path_buf()], &metadata()).unwrap();

        let raw = fs::read_to_string(temp.path().join(EXECUTOR_FILE)).unwrap();
        assert!(raw.starts_with("{\n  \"name\": \"GitHub\""));
    }

    #[test]
    fn test_skips_existing_executor_json() {
        let temp = tempfile::tempdir().unwrap();
        let existing = r#"{"name":"existing","reportUrl":"https://existing.com"}"#;
        fs::write(temp.path().join(EXECUTOR_FILE), existing).unwrap();

        let written = write_executor_metadata(&[temp.path().to_path_buf()], &metadata()).unwrap();

        assert_eq!(written, 0);
        assert_eq!(
            fs::read_to_string(temp.path().join(EXECUTOR_FILE)).unwrap(),
            existing
        );
    }

    #[test]
    fn test_second_write_is_noop() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = vec![temp.path().to_path_buf()];

        assert_eq!(write_executor_metadata(&dirs, &metadata()).unwrap(), 1);
        let first = fs::read_to_string(temp.path().join(EXECUTOR_FILE)).unwrap();

        let mut other = metadata();
        other.build_order = "124".to_string();
        assert_eq!(write_executor_metadata(&dirs, &other).unwrap(), 0);

        assert_eq!(
            fs::read_to_string(temp.path().join(EXECUTOR_FILE)).unwrap(),
            first
        );
    }

    #[test]
    fn test_multiple_result_directories() {
        let temp = tempfile::tempdir().unwrap();
        let dirs: Vec<PathBuf> = ["allure-results", "allure-results-2", "allure-results-3"]
            .iter()
            .map(|name| temp.path().join(name))
            .collect();
        for dir in &dirs {
            fs::create_dir(dir).unwrap();
        }
        fs::write(dirs[1].join(EXECUTOR_FILE), "{}").unwrap();

        let written = write_executor_metadata(&dirs, &metadata()).unwrap();

        assert_eq!(written, 2);
        assert_eq!(read(&dirs[0])["reportUrl"], "https://example.com/report");
        assert_eq!(read(&dirs[1]), serde_json::json!({}));
        assert_eq!(read(&dirs[2])["buildOrder"], "123");
    }

    #[test]
    fn test_missing_directory_is_not_created() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing");

        let err = write_executor_metadata(&[missing.clone()], &metadata()).unwrap_err();

        assert!(matches!(err, PublisherError::Io(_)));
        assert!(!missing.exists());
    }
}
