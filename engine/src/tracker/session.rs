use std::sync::LazyLock;

use regex::Regex;

use super::DialogStateTracker;
use crate::decoder::{DecodeError, DecodeOutput};
use crate::oracle::ScoringOracle;
use crate::vocab::Label;

static CONTRACTION_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)'([a-z]+)$"));

/// Lowercases and splits typed input; `don't` becomes `don 't` to match the
/// corpus convention.
pub fn split_utterance(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    for token in text.split_whitespace().map(str::to_lowercase) {
        match &*CONTRACTION_RE {
            Ok(re) => {
                let spaced = re.replace(&token, "$1 '$2");
                words.extend(spaced.split_whitespace().map(str::to_string));
            }
            Err(_) => words.push(token),
        }
    }
    words
}

/// Live conversation: the state of each reply conditions the next one.
pub struct ConversationSession<'a, O: ScoringOracle> {
    tracker: DialogStateTracker<'a, O>,
    state: Option<O::State>,
    turns: usize,
}

impl<'a, O: ScoringOracle> ConversationSession<'a, O> {
    pub fn new(tracker: DialogStateTracker<'a, O>) -> Self {
        Self {
            tracker,
            state: None,
            turns: 0,
        }
    }

    /// Answers `input`. A search without any completed hypothesis leaves
    /// the session without state, as after `reset`.
    pub fn respond(&mut self, input: &[Label]) -> Result<DecodeOutput<O::State>, DecodeError> {
        let output = self.tracker.respond_from(self.state.as_ref(), input)?;
        self.state = output.best_state.clone();
        self.turns += 1;
        if output.is_empty_result() {
            log::warn!("No reply generated at turn {}; context cleared", self.turns);
        }
        Ok(output)
    }

    pub fn reset(&mut self) {
        log::debug!("Conversation reset after {} turns", self.turns);
        self.state = None;
        self.turns = 0;
    }

    pub fn has_context(&self) -> bool {
        self.state.is_some()
    }

    pub fn turns(&self) -> usize {
        self.turns
    }
}
