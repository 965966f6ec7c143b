use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::process::Command;

use crate::error::{PublisherError, Result};

/// A generated report tree and the history file it reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBuild {
    pub report_path: PathBuf,
    /// Plugin sub-reports, in the order their URLs are listed.
    pub plugins: Vec<String>,
    pub history_path: PathBuf,
}

impl ReportBuild {
    /// File name of the history file (e.g., "history.json").
    pub fn history_file_name(&self) -> &str {
        self.history_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("history.json")
    }

    /// Report path relative to `base`, with forward slashes.
    ///
    /// Paths outside of `base` are returned as given, minus leading separators.
    pub fn relative_report_path(&self, base: Option<&Path>) -> String {
        let relative = base
            .and_then(|base| self.report_path.strip_prefix(base).ok())
            .unwrap_or(&self.report_path);

        relative
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Invokes the external report generator CLI.
pub struct ReportGenerator {
    command: String,
    config: Option<PathBuf>,
    report_name: Option<String>,
}

impl ReportGenerator {
    pub fn new(command: impl Into<String>, config: Option<PathBuf>) -> Self {
        Self {
            command: command.into(),
            config,
            report_name: None,
        }
    }

    /// Title shown inside the generated report.
    pub fn with_report_name(mut self, report_name: Option<String>) -> Self {
        self.report_name = report_name;
        self
    }

    fn args(&self, result_dirs: &[PathBuf], build: &ReportBuild) -> Vec<String> {
        let mut args = vec!["generate".to_string()];
        args.extend(result_dirs.iter().map(|d| d.display().to_string()));
        args.push("--output".to_string());
        args.push(build.report_path.display().to_string());
        if let Some(config) = &self.config {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
        if let Some(name) = &self.report_name {
            args.push("--report-name".to_string());
            args.push(name.clone());
        }
        args
    }

    /// Generates the report from `result_dirs` into `build.report_path`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::ReportGeneration`] when the generator cannot be
    /// started or exits unsuccessfully.
    pub async fn generate(&self, result_dirs: &[PathBuf], build: &ReportBuild) -> Result<()> {
        let args = self.args(result_dirs, build);
        debug!("Running {} {}", self.command, args.join(" "));

        let output = Command::new(&self.command)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                PublisherError::ReportGeneration(format!("failed to run '{}': {e}", self.command))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PublisherError::ReportGeneration(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        info!("Generated report in {}", build.report_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> ReportBuild {
        ReportBuild {
            report_path: PathBuf::from("/builds/group/project/reports/allure"),
            plugins: vec!["awesome".to_string()],
            history_path: PathBuf::from("/builds/group/project/reports/history/history.json"),
        }
    }

    #[test]
    fn test_relative_report_path() {
        assert_eq!(
            build().relative_report_path(Some(Path::new("/builds/group/project"))),
            "reports/allure"
        );
    }

    #[test]
    fn test_relative_report_path_outside_base() {
        assert_eq!(
            build().relative_report_path(Some(Path::new("/elsewhere"))),
            "builds/group/project/reports/allure"
        );
        assert_eq!(
            build().relative_report_path(None),
            "builds/group/project/reports/allure"
        );
    }

    #[test]
    fn test_history_file_name() {
        assert_eq!(build().history_file_name(), "history.json");
    }

    #[test]
    fn test_generator_args() {
        let generator = ReportGenerator::new("allure", Some(PathBuf::from("allurerc.mjs")));
        let args = generator.args(&[PathBuf::from("a/allure-results")], &build());

        assert_eq!(
            args,
            vec![
                "generate",
                "a/allure-results",
                "--output",
                "/builds/group/project/reports/allure",
                "--config",
                "allurerc.mjs"
            ]
        );
    }

    #[test]
    fn test_generator_args_report_name() {
        let generator = ReportGenerator::new("allure", None)
            .with_report_name(Some("unit-test-report".to_string()));
        let args = generator.args(&[PathBuf::from("a"), PathBuf::from("b")], &build());

        assert_eq!(
            args,
            vec![
                "generate",
                "a",
                "b",
                "--output",
                "/builds/group/project/reports/allure",
                "--report-name",
                "unit-test-report"
            ]
        );
    }

    #[tokio::test]
    async fn test_generator_missing_binary() {
        let generator = ReportGenerator::new("definitely-not-an-allure-binary", None);
        let err = generator.generate(&[], &build()).await.unwrap_err();
        assert!(matches!(err, PublisherError::ReportGeneration(_)));
    }
}
