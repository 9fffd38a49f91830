use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Notion API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed date: {0:?}")]
    MalformedDate(String),

    #[error("Malformed row: {0}")]
    MalformedRow(String),

    #[error("Could not resolve funds: {0}")]
    Resolution(String),

    #[error("{0}")]
    Dispatch(String),

    #[error("Missing setting: {0} (pass the flag, set the env var, or add it to settings.json)")]
    MissingSetting(&'static str),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
