use serde::Serialize;

use crate::vocab::Label;

/// Partial output with the oracle state reached after its last label.
#[derive(Debug, Clone)]
pub struct Hypothesis<S> {
    pub tokens: Vec<Label>,
    pub score: f32,
    pub state: S,
}

impl<S> Hypothesis<S> {
    pub fn root(state: S) -> Self {
        Self {
            tokens: Vec::new(),
            score: 0.0,
            state,
        }
    }

    pub fn extend(&self, label: Label, score: f32, state: S) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend_from_slice(&self.tokens);
        tokens.push(label);
        Self {
            tokens,
            score,
            state,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedHypothesis {
    pub tokens: Vec<Label>,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct DecodeOutput<S> {
    /// Completed hypotheses, best first.
    pub hypotheses: Vec<RankedHypothesis>,
    /// State after feeding `EOS` to the best completed hypothesis.
    pub best_state: Option<S>,
}

impl<S> DecodeOutput<S> {
    /// Marker for a search in which no hypothesis reached `EOS`: one empty
    /// hypothesis scored 0 and no state.
    pub fn no_hypothesis() -> Self {
        Self {
            hypotheses: vec![RankedHypothesis::default()],
            best_state: None,
        }
    }

    pub fn is_empty_result(&self) -> bool {
        self.best_state.is_none()
    }

    pub fn best(&self) -> Option<&RankedHypothesis> {
        self.hypotheses.first()
    }
}
