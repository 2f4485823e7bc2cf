use thiserror::Error;

/// Errors raised while building or mutating tasks.
#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("Task name is required.")]
    EmptyName,

    #[error("Duration must be a positive number of minutes.")]
    InvalidDuration,

    #[error("Invalid time format (HH:MM): `{0}`.")]
    InvalidStartTime(String),

    #[error("Please enter a valid URL: `{0}`.")]
    InvalidLink(String),

    #[error("Invalid month `{0}`, expected YYYY-MM.")]
    InvalidMonth(String),

    #[error("No task with id `{0}`.")]
    NotFound(String),
}

/// Errors raised by the study plan import flow.
///
/// The `Display` of the variants a user can act on is the message shown in
/// the terminal; the extractor variants are logged and then collapsed into
/// `ParseFailed`.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No content provided.")]
    NoContent,

    #[error("Invalid input.")]
    InvalidInput(String),

    #[error("Failed to read file.")]
    Read(#[from] std::io::Error),

    #[error("environment variable `{0}` is not set; it must hold the AI API key")]
    MissingApiKey(String),

    #[error("request to the extraction service failed: {0}")]
    Request(String),

    #[error("unexpected response from the extraction service: {0}")]
    Response(String),

    #[error("Failed to parse the study plan. Please check the format and try again.")]
    ParseFailed,
}

impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::Request(err.to_string())
    }
}
