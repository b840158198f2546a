use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinError;

pub type Result<T> = std::result::Result<T, UpdateError>;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("config error: could not load config file '{path}' - {source}")]
    Config { path: String, source: std::io::Error },
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
    #[error("directory {} does not contain a valid git repository", path.display())]
    InvalidRepository { path: PathBuf, source: git2::Error },
    #[error("cannot pull {}: {reason}", path.display())]
    Pull { path: PathBuf, reason: String },
    #[error("source path '{}' does not exist", path.display())]
    MissingSource { path: PathBuf },
    #[error("could not copy '{}' to '{}' - {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("could not create directory '{}' - {source}", path.display())]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} answered with status {status}: {body}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("task join error: {0}")]
    Join(#[from] JoinError),
}
