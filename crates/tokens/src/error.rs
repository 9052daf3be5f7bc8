use std::path::PathBuf;
use thiserror::Error;
use tokens_template::CompileError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load template '{path}'")]
    LoadTemplate {
        path: PathBuf,
        #[source]
        source: CompileError,
    },

    #[error("No *.tokens templates found in '{0}'")]
    NoTemplates(PathBuf),

    #[error("Failed to read input '{path}'")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
