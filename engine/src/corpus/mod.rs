pub mod batch;
pub mod loader;
pub mod sample;
pub mod stats;

pub use batch::{make_batches, shuffle_batches, verify_partition, Batch, BatchError};
pub use loader::{load_dialogs, load_file};
pub use stats::CorpusStats;

use crate::vocab::Label;

#[derive(thiserror::Error, Debug)]
pub enum CorpusError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Dialog has no turns")]
    EmptyDialog,
    #[error("Vocabulary is missing reserved label {0}")]
    MissingReservedLabel(&'static str),
}

impl CorpusError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Io(_) => "Could not read or write the corpus files. Check the paths and permissions.",
            Self::Json(_) | Self::MissingReservedLabel(_) => {
                "The vocabulary file is malformed. Rebuild it from the training corpus."
            }
            Self::EmptyDialog => "A dialog without any turn was found in the corpus.",
        }
    }
}

/// One exchange for the tracked speaker: the context it answers and its
/// reply, the latter bracketed by `EOS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub input: Vec<Label>,
    pub output: Vec<Label>,
}

impl Turn {
    pub fn new(input: Vec<Label>, output: Vec<Label>) -> Self {
        Self { input, output }
    }

    /// Reply labels without the surrounding `EOS` markers.
    pub fn reply(&self) -> &[Label] {
        match self.output.len() {
            0..=2 => &[],
            n => &self.output[1..n - 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    turns: Vec<Turn>,
}

impl Dialog {
    pub fn new(turns: Vec<Turn>) -> Result<Self, CorpusError> {
        if turns.is_empty() {
            return Err(CorpusError::EmptyDialog);
        }
        Ok(Self { turns })
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Turns replayed as context before the final one.
    pub fn context_turns(&self) -> &[Turn] {
        &self.turns[..self.turns.len() - 1]
    }

    pub fn last_turn(&self) -> &Turn {
        &self.turns[self.turns.len() - 1]
    }

    /// Lexicographic maximum over turns of `(output length, input length)`.
    pub fn longest(&self) -> (usize, usize) {
        self.turns
            .iter()
            .map(|t| (t.output.len(), t.input.len()))
            .max()
            .unwrap_or((0, 0))
    }
}
