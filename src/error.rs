use std::path::PathBuf;

use thiserror::Error;

/// Anything that can end a download run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Process exit code for the CLI. 2 is left to clap for usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Fetch(_) => 3,
            Error::Parse(_) => 4,
            Error::Store(_) => 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid thread url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} unavailable: {reason}")]
    Unavailable { url: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("post block has no {0}")]
    MissingField(&'static str),
    #[error("unrecognized timestamp {0:?}")]
    BadTimestamp(String),
    #[error("page contains no post markup")]
    NoPostMarkup,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("{path:?} has no posts table")]
    NotAPostStore { path: PathBuf },
    #[error("post {post_id} is already stored")]
    DuplicatePost { post_id: i64 },
}
