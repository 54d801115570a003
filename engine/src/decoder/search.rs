use std::time::Instant;

use ndarray::Array1;

use super::beam::{descending_labels, Beam};
use super::config::DecodeConfig;
use super::state::{DecodeOutput, Hypothesis, RankedHypothesis};
use super::DecodeError;
use crate::oracle::ScoringOracle;
use crate::vocab::Label;

/// Beam search over an oracle's label distributions.
#[derive(Debug, Clone)]
pub struct BeamSearchDecoder {
    config: DecodeConfig,
    eos: Label,
    unk: Label,
}

impl BeamSearchDecoder {
    pub fn new(config: DecodeConfig, eos: Label, unk: Label) -> Result<Self, DecodeError> {
        config.validate()?;
        Ok(Self { config, eos, unk })
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    pub fn eos(&self) -> Label {
        self.eos
    }

    pub fn unk(&self) -> Label {
        self.unk
    }

    /// Runs exactly `max_len` expansion steps from `initial`.
    ///
    /// Each step scores every active hypothesis. From step `min_len` on,
    /// stopping is recorded as a completed hypothesis scored
    /// `log p(eos) + penalty * (len + 1)`. Expansions skip `unk` and `eos`,
    /// are scored by the oracle's log-probability alone, and compete for
    /// `beam_width` slots; labels are visited best first, so the first one
    /// that fails to enter the beam ends that hypothesis' expansion.
    pub fn decode<O: ScoringOracle>(
        &self,
        oracle: &O,
        initial: O::State,
    ) -> Result<DecodeOutput<O::State>, DecodeError> {
        let vocab_size = oracle.vocab_size();
        for (name, label) in [("eos", self.eos), ("unk", self.unk)] {
            if label as usize >= vocab_size {
                return Err(DecodeError::InvalidParameter(format!(
                    "{name} label {label} outside vocabulary of {vocab_size}"
                )));
            }
        }

        let start = Instant::now();
        let cfg = &self.config;
        let mut active = vec![Hypothesis::root(initial)];
        let mut completed: Vec<RankedHypothesis> = Vec::new();
        let mut best: Option<(f32, O::State)> = None;

        for step in 0..cfg.max_len {
            let mut next = Beam::new(cfg.beam_width);

            for hyp in &active {
                let scores = oracle.predict(&hyp.state)?;
                check_scores(&scores, vocab_size, step)?;

                if step >= cfg.min_len {
                    let stop = scores[self.eos as usize]
                        + cfg.penalty * (hyp.tokens.len() + 1) as f32;
                    completed.push(RankedHypothesis {
                        tokens: hyp.tokens.clone(),
                        score: stop,
                    });
                    let improves = match &best {
                        Some((score, _)) => stop > *score,
                        None => true,
                    };
                    if improves {
                        best = Some((stop, hyp.state.clone()));
                    }
                }

                for (label, score) in descending_labels(&scores) {
                    if label == self.unk || label == self.eos {
                        continue;
                    }
                    let admitted = next.offer(score, || {
                        let state = oracle.update(&hyp.state, label)?;
                        Ok::<_, DecodeError>(hyp.extend(label, score, state))
                    })?;
                    if !admitted {
                        break;
                    }
                }
            }

            log::trace!(
                "Step {} kept {} of at most {} hypotheses",
                step,
                next.len(),
                cfg.beam_width
            );
            active = next.into_sorted();
        }

        let Some((_, parent)) = best else {
            log::warn!(
                "No hypothesis reached EOS within {} steps (beam={})",
                cfg.max_len,
                cfg.beam_width
            );
            return Ok(DecodeOutput::no_hypothesis());
        };

        let available = completed.len();
        completed.sort_by(|a, b| b.score.total_cmp(&a.score));
        completed.truncate(cfg.n_best);
        let best_state = oracle.update(&parent, self.eos)?;

        log::debug!(
            "Beam search completed in {:?} (steps: {}, completed: {}, best score: {:.4})",
            start.elapsed(),
            cfg.max_len,
            available,
            completed.first().map(|h| h.score).unwrap_or_default()
        );

        Ok(DecodeOutput {
            hypotheses: completed,
            best_state: Some(best_state),
        })
    }
}

/// One-shot form: validates `config` and decodes from `initial`.
pub fn decode<O: ScoringOracle>(
    oracle: &O,
    initial: O::State,
    eos: Label,
    unk: Label,
    config: &DecodeConfig,
) -> Result<DecodeOutput<O::State>, DecodeError> {
    BeamSearchDecoder::new(config.clone(), eos, unk)?.decode(oracle, initial)
}

/// `-inf` is a valid log-probability; NaN and `+inf` are not.
fn check_scores(scores: &Array1<f32>, vocab_size: usize, step: usize) -> Result<(), DecodeError> {
    if scores.len() != vocab_size {
        return Err(DecodeError::VocabularyMismatch {
            expected: vocab_size,
            actual: scores.len(),
        });
    }
    match scores
        .iter()
        .position(|&s| s.is_nan() || s == f32::INFINITY)
    {
        Some(label) => Err(DecodeError::NumericInstability {
            step,
            label: label as Label,
            value: scores[label],
        }),
        None => Ok(()),
    }
}
