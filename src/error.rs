use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Not enough pipelines found")]
    NotEnoughPipelines,

    #[error("Failed to download history artifact from job ID: '{job_id}'. Err: '{message}'")]
    ArtifactDownload { job_id: u64, message: String },

    #[error("Failed to upload '{key}': {message}")]
    Upload { key: String, message: String },

    #[error("No result directories matched glob '{0}'")]
    MissingResults(String),

    #[error("API request failed (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("Report generation failed: {0}")]
    ReportGeneration(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PublisherError>;
