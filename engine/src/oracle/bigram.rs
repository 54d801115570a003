use std::collections::HashMap;
use std::time::Instant;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::{check_label, OracleError, ScoringOracle};
use crate::corpus::Dialog;
use crate::vocab::{Label, EOS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigramConfig {
    /// Add-k smoothing mass per vocabulary entry.
    pub smoothing: f32,
    /// Interpolation weight of the context cache.
    pub cache_weight: f32,
    /// Factor applied to the cache when a new turn is encoded.
    pub cache_decay: f32,
}

impl Default for BigramConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.1,
            cache_weight: 0.2,
            cache_decay: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BigramState {
    pub last: Label,
    /// Decayed counts of labels seen as context.
    pub cache: Array1<f32>,
}

/// Smoothed bigram model interpolated with a context cache.
#[derive(Debug, Clone)]
pub struct BigramOracle {
    vocab_size: usize,
    transitions: Vec<HashMap<Label, f32>>,
    totals: Vec<f32>,
    config: BigramConfig,
}

impl BigramOracle {
    /// Estimates transition counts from every turn of `dialogs`; inputs are
    /// bracketed by `EOS` the way outputs already are.
    pub fn train(dialogs: &[Dialog], vocab_size: usize, config: BigramConfig) -> Self {
        let start = Instant::now();
        let mut oracle = Self {
            vocab_size,
            transitions: vec![HashMap::new(); vocab_size],
            totals: vec![0.0; vocab_size],
            config,
        };

        let mut pairs = 0usize;
        for turn in dialogs.iter().flat_map(|d| d.turns()) {
            let input = std::iter::once(EOS)
                .chain(turn.input.iter().copied())
                .chain(std::iter::once(EOS));
            pairs += oracle.count_sequence(input);
            pairs += oracle.count_sequence(turn.output.iter().copied());
        }

        log::info!(
            "Bigram model estimated from {} dialogs ({} transitions) in {:?}",
            dialogs.len(),
            pairs,
            start.elapsed()
        );
        oracle
    }

    fn count_sequence(&mut self, labels: impl Iterator<Item = Label>) -> usize {
        let mut prev: Option<usize> = None;
        let mut counted = 0;
        for label in labels {
            if (label as usize) >= self.vocab_size {
                prev = None;
                continue;
            }
            if let Some(p) = prev {
                *self.transitions[p].entry(label).or_insert(0.0) += 1.0;
                self.totals[p] += 1.0;
                counted += 1;
            }
            prev = Some(label as usize);
        }
        counted
    }

    fn transition_probs(&self, prev: usize) -> Array1<f32> {
        let k = self.config.smoothing.max(f32::MIN_POSITIVE);
        let denom = self.totals[prev] + k * self.vocab_size as f32;
        let mut probs = Array1::from_elem(self.vocab_size, k / denom);
        for (&label, &count) in &self.transitions[prev] {
            probs[label as usize] += count / denom;
        }
        probs
    }
}

impl ScoringOracle for BigramOracle {
    type State = BigramState;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn initialize(
        &self,
        state: Option<&BigramState>,
        context: &[Label],
        start: Label,
    ) -> Result<BigramState, OracleError> {
        check_label(start, self.vocab_size)?;
        let mut cache = match state {
            Some(prev) => &prev.cache * self.config.cache_decay,
            None => Array1::zeros(self.vocab_size),
        };
        for &label in context {
            let idx = check_label(label, self.vocab_size)?;
            if label != EOS {
                cache[idx] += 1.0;
            }
        }
        Ok(BigramState { last: start, cache })
    }

    fn update(&self, state: &BigramState, label: Label) -> Result<BigramState, OracleError> {
        check_label(label, self.vocab_size)?;
        Ok(BigramState {
            last: label,
            cache: state.cache.clone(),
        })
    }

    fn predict(&self, state: &BigramState) -> Result<Array1<f32>, OracleError> {
        let prev = check_label(state.last, self.vocab_size)?;
        if state.cache.len() != self.vocab_size {
            return Err(OracleError::Backend(format!(
                "cache holds {} entries, expected {}",
                state.cache.len(),
                self.vocab_size
            )));
        }

        let mut probs = self.transition_probs(prev);
        let mass = state.cache.sum();
        let weight = self.config.cache_weight.clamp(0.0, 1.0);
        if mass > 0.0 && weight > 0.0 {
            probs = probs * (1.0 - weight) + &state.cache * (weight / mass);
        }
        Ok(probs.mapv(f32::ln))
    }
}
