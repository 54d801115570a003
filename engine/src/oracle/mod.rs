pub mod bigram;
pub mod cumulative;

pub use bigram::{BigramConfig, BigramOracle, BigramState};
pub use cumulative::{CumulativeOracle, Scored};

use ndarray::Array1;

use crate::corpus::Turn;
use crate::vocab::{Label, EOS};

#[derive(thiserror::Error, Debug)]
pub enum OracleError {
    #[error("Label {label} outside vocabulary of {vocab_size}")]
    LabelOutOfRange { label: Label, vocab_size: usize },
    #[error("ndarray shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Model backend failed: {0}")]
    Backend(String),
}

impl OracleError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::LabelOutOfRange { .. } => {
                "The response model was given a word it does not know. Rebuild the vocabulary."
            }
            Self::Shape(_) | Self::Backend(_) => {
                "The response model failed to run. Try training it again."
            }
        }
    }
}

/// State transition and next-label prediction of a sequence model.
///
/// States are values: every call returns a fresh state and never mutates
/// the one it was given, so sibling hypotheses can share a parent.
pub trait ScoringOracle {
    type State: Clone;

    fn vocab_size(&self) -> usize;

    /// Encodes `context` on top of an optional previous state and feeds
    /// the `start` label. `None` stands for the zero state.
    fn initialize(
        &self,
        state: Option<&Self::State>,
        context: &[Label],
        start: Label,
    ) -> Result<Self::State, OracleError>;

    fn update(&self, state: &Self::State, label: Label) -> Result<Self::State, OracleError>;

    /// Natural-log probabilities over the vocabulary for the next label.
    fn predict(&self, state: &Self::State) -> Result<Array1<f32>, OracleError>;

    /// Consumes a whole turn: its input as context, then its output minus
    /// the closing `EOS`.
    fn observe_turn(
        &self,
        state: Option<&Self::State>,
        turn: &Turn,
    ) -> Result<Self::State, OracleError> {
        let (start, rest) = match turn.output.split_first() {
            Some((&start, rest)) => (start, rest),
            None => (EOS, &[][..]),
        };
        let body = rest.split_last().map(|(_, body)| body).unwrap_or(&[]);

        let mut next = self.initialize(state, &turn.input, start)?;
        for &label in body {
            next = self.update(&next, label)?;
        }
        Ok(next)
    }
}

pub(crate) fn check_label(label: Label, vocab_size: usize) -> Result<usize, OracleError> {
    let idx = label as usize;
    if idx < vocab_size {
        Ok(idx)
    } else {
        Err(OracleError::LabelOutOfRange { label, vocab_size })
    }
}
