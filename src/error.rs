use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced at the crate boundary. The per-cluster hot path is
/// total IEEE-754 arithmetic and cannot fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad parameters or inconsistent matrix shapes, rejected before any
    /// computation starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {msg}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },
}
