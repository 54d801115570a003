#![allow(dead_code)]

use std::cell::RefCell;

use dialog_engine::oracle::{OracleError, ScoringOracle};
use dialog_engine::vocab::Label;
use ndarray::Array1;

/// Oracle whose state is the list of labels fed so far and whose scores
/// come from a closure over that list. Every predicted state is recorded.
pub struct FnOracle<F> {
    vocab_size: usize,
    score: F,
    pub seen: RefCell<Vec<Vec<Label>>>,
}

impl<F: Fn(&[Label]) -> Vec<f32>> FnOracle<F> {
    pub fn new(vocab_size: usize, score: F) -> Self {
        Self {
            vocab_size,
            score,
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn predictions(&self) -> usize {
        self.seen.borrow().len()
    }

    /// State of the `n`-th prediction, counting from 0.
    pub fn nth_prediction(&self, n: usize) -> Option<Vec<Label>> {
        self.seen.borrow().get(n).cloned()
    }

    pub fn predictions_at_depth(&self, depth: usize) -> usize {
        self.seen.borrow().iter().filter(|s| s.len() == depth).count()
    }
}

impl<F: Fn(&[Label]) -> Vec<f32>> ScoringOracle for FnOracle<F> {
    type State = Vec<Label>;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn initialize(
        &self,
        state: Option<&Vec<Label>>,
        context: &[Label],
        start: Label,
    ) -> Result<Vec<Label>, OracleError> {
        let mut next = state.cloned().unwrap_or_default();
        next.extend_from_slice(context);
        next.push(start);
        Ok(next)
    }

    fn update(&self, state: &Vec<Label>, label: Label) -> Result<Vec<Label>, OracleError> {
        let mut next = state.clone();
        next.push(label);
        Ok(next)
    }

    fn predict(&self, state: &Vec<Label>) -> Result<Array1<f32>, OracleError> {
        self.seen.borrow_mut().push(state.clone());
        Ok(Array1::from((self.score)(state)))
    }
}

/// Log-probabilities favouring label 2, then `EOS`, over `vocab_size`
/// labels.
pub fn prefers_two(vocab_size: usize) -> impl Fn(&[Label]) -> Vec<f32> {
    move |_: &[Label]| {
        let mut scores = vec![-5.0; vocab_size];
        scores[1] = -1.0;
        scores[2] = -0.5;
        scores
    }
}

/// Stateless oracle predicting the uniform distribution; safe to share
/// across worker threads.
pub struct UniformOracle {
    pub vocab_size: usize,
}

impl ScoringOracle for UniformOracle {
    type State = Vec<Label>;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn initialize(
        &self,
        state: Option<&Vec<Label>>,
        context: &[Label],
        start: Label,
    ) -> Result<Vec<Label>, OracleError> {
        let mut next = state.cloned().unwrap_or_default();
        next.extend_from_slice(context);
        next.push(start);
        Ok(next)
    }

    fn update(&self, state: &Vec<Label>, label: Label) -> Result<Vec<Label>, OracleError> {
        let mut next = state.clone();
        next.push(label);
        Ok(next)
    }

    fn predict(&self, _: &Vec<Label>) -> Result<Array1<f32>, OracleError> {
        Ok(Array1::from_elem(
            self.vocab_size,
            -(self.vocab_size as f32).ln(),
        ))
    }
}
