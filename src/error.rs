//! Errors reported by the command-line tool.

use derive_more::{Display, Error, From};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The input or config file could not be read.
    #[from(ignore)]
    #[display("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[display("invalid parser config: {_0}")]
    Config(#[error(source)] serde_json::Error),

    /// Rendered diagnostics of a failed parse.
    #[from(ignore)]
    #[display("{_0}")]
    Parse(#[error(not(source))] String),
}
