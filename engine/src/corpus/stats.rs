use std::fmt;

use serde::{Deserialize, Serialize};

/// Size summary of a dialog text corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub dialogs: usize,
    pub utterances: usize,
    pub words: usize,
}

impl CorpusStats {
    /// Counts dialogs, utterance lines and words (speaker fields excluded).
    pub fn of_text(text: &str) -> Self {
        let mut stats = Self::default();
        let mut in_dialog = false;
        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            if tokens.next().is_some() {
                stats.utterances += 1;
                stats.words += tokens.count();
                in_dialog = true;
            } else if in_dialog {
                stats.dialogs += 1;
                in_dialog = false;
            }
        }
        if in_dialog {
            stats.dialogs += 1;
        }
        stats
    }

    /// Percent differences `(dialogs, utterances, words)` of `self`
    /// relative to `expected`.
    pub fn relative_difference(&self, expected: &CorpusStats) -> (f64, f64, f64) {
        fn pct(actual: usize, expected: usize) -> f64 {
            if actual == 0 {
                return if expected == 0 { 0.0 } else { 100.0 };
            }
            (actual as f64 - expected as f64).abs() / actual as f64 * 100.0
        }
        (
            pct(self.dialogs, expected.dialogs),
            pct(self.utterances, expected.utterances),
            pct(self.words, expected.words),
        )
    }
}

impl fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n_dialogs: {}, n_utters: {}, n_words: {}",
            self.dialogs, self.utterances, self.words
        )
    }
}
