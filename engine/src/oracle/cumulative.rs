use ndarray::Array1;

use super::{check_label, OracleError, ScoringOracle};
use crate::corpus::Turn;
use crate::vocab::Label;

/// Inner state plus the log-probability of the labels generated since the
/// last `initialize`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<S> {
    pub inner: S,
    pub prefix: f32,
}

/// Turns per-step predictions into prefix scores: `predict` returns the
/// inner log-probabilities shifted by the running prefix score, so the
/// decoder ranks whole sequences.
#[derive(Debug, Clone)]
pub struct CumulativeOracle<O> {
    inner: O,
}

impl<O> CumulativeOracle<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O: ScoringOracle> ScoringOracle for CumulativeOracle<O> {
    type State = Scored<O::State>;

    fn vocab_size(&self) -> usize {
        self.inner.vocab_size()
    }

    fn initialize(
        &self,
        state: Option<&Self::State>,
        context: &[Label],
        start: Label,
    ) -> Result<Self::State, OracleError> {
        Ok(Scored {
            inner: self
                .inner
                .initialize(state.map(|s| &s.inner), context, start)?,
            prefix: 0.0,
        })
    }

    fn update(&self, state: &Self::State, label: Label) -> Result<Self::State, OracleError> {
        let idx = check_label(label, self.inner.vocab_size())?;
        let scores = self.inner.predict(&state.inner)?;
        let step = scores.get(idx).copied().ok_or(OracleError::LabelOutOfRange {
            label,
            vocab_size: scores.len(),
        })?;
        Ok(Scored {
            inner: self.inner.update(&state.inner, label)?,
            prefix: state.prefix + step,
        })
    }

    fn predict(&self, state: &Self::State) -> Result<Array1<f32>, OracleError> {
        Ok(self.inner.predict(&state.inner)? + state.prefix)
    }

    fn observe_turn(
        &self,
        state: Option<&Self::State>,
        turn: &Turn,
    ) -> Result<Self::State, OracleError> {
        Ok(Scored {
            inner: self.inner.observe_turn(state.map(|s| &s.inner), turn)?,
            prefix: 0.0,
        })
    }
}
