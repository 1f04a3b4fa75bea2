#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Program not found")]
    ProgramNotFound,
    #[error("Episode not found")]
    EpisodeNotFound,
    #[error("Series not found")]
    SeriesNotFound,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Batch failed: {0}")]
    BatchFailed(String),
    #[error("Batch cancelled")]
    BatchCancelled,
    #[error("Unexpected status: {0}")]
    UnexpectedStatus(reqwest::StatusCode),
    #[error("std::io error: {0}")]
    IoError(std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(serde_json::Error),
    #[error("reqwest error: {0}")]
    ReqwestError(reqwest::Error),
    #[error("URL error: {0}")]
    UrlError(url::ParseError),
    #[error("actlet error: {0}")]
    ActletError(actlet::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::ReqwestError(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::UrlError(err)
    }
}

impl From<actlet::Error> for Error {
    fn from(err: actlet::Error) -> Self {
        Self::ActletError(err)
    }
}
