use thiserror::Error;

use crate::config::ConfigError;
use crate::corpus::{BatchError, CorpusError};
use crate::decoder::DecodeError;
use crate::oracle::OracleError;

/// Unified engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Corpus: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Batching: {0}")]
    Batch(#[from] BatchError),

    #[error("Decoding: {0}")]
    Decode(#[from] DecodeError),

    #[error("Oracle: {0}")]
    Oracle(#[from] OracleError),

    #[error("Config: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Corpus(err) => err.user_message(),
            Self::Batch(err) => err.user_message(),
            Self::Decode(err) => err.user_message(),
            Self::Oracle(err) => err.user_message(),
            Self::Config(err) => err.user_message(),
            Self::Io(_) => "Could not read or write a file. Check the paths and permissions.",
        }
    }
}
