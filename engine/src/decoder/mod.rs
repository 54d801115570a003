mod beam;
pub mod config;
pub(crate) mod search;
pub mod state;

pub use config::DecodeConfig;
pub use search::{decode, BeamSearchDecoder};
pub use state::{DecodeOutput, Hypothesis, RankedHypothesis};

use crate::oracle::OracleError;
use crate::vocab::Label;

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("Invalid decoding parameter: {0}")]
    InvalidParameter(String),
    #[error("Non-finite log-probability {value} for label {label} at step {step}")]
    NumericInstability { step: usize, label: Label, value: f32 },
    #[error("Oracle returned {actual} scores for a vocabulary of {expected}")]
    VocabularyMismatch { expected: usize, actual: usize },
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
}

impl DecodeError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => {
                "The decoding settings are invalid. Beam width, maximum length and n-best must be positive."
            }
            Self::NumericInstability { .. } => {
                "The model produced invalid scores. Check the model and try again."
            }
            Self::VocabularyMismatch { .. } | Self::Oracle(_) => {
                "The response model failed to run. Check that it matches the vocabulary."
            }
        }
    }
}
