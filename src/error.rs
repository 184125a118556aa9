use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LinksError {
    #[error("malformed catalog record: missing {field} ({context})")]
    MalformedRecord { field: &'static str, context: String },

    #[error("catalog lookup failed for {id}: {message}")]
    Lookup { id: String, message: String },

    #[error("{0}")]
    #[diagnostic(help("usage: dx-links <WINDOW> <OUTPUT>, e.g. dx-links -12w links.csv"))]
    Usage(String),

    #[error("invalid recency window: {0}")]
    #[diagnostic(help("use a relative duration such as -12w, 30d, \"12 weeks\" or a date like 2024-01-31"))]
    InvalidRecency(String),

    #[error("invalid name pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("invalid file id: {0}")]
    InvalidFileId(String),

    #[error("invalid project id: {0}")]
    InvalidContainerId(String),

    #[error("no API token found in environment variable {0}")]
    #[diagnostic(help("export a DNAnexus API token, e.g. export {0}=<token>"))]
    MissingToken(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to write output: {0}")]
    Output(String),
}

impl LinksError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            LinksError::CatalogHttp(_) | LinksError::CatalogStatus { .. } | LinksError::Lookup { .. }
        )
    }
}
