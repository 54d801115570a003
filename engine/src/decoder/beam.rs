use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ndarray::Array1;

use super::state::Hypothesis;
use crate::vocab::Label;

struct Ranked<S> {
    score: f32,
    // Insertion order; among equal scores the newest entry ranks lowest.
    seq: u64,
    hyp: Hypothesis<S>,
}

impl<S> PartialEq for Ranked<S> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<S> Eq for Ranked<S> {}

impl<S> PartialOrd for Ranked<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for Ranked<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Top-`width` hypotheses of one step, kept in a min-heap so the entry to
/// evict is always at the top.
pub(crate) struct Beam<S> {
    width: usize,
    heap: BinaryHeap<Reverse<Ranked<S>>>,
    next_seq: u64,
}

impl<S> Beam<S> {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            width,
            heap: BinaryHeap::with_capacity(width + 1),
            next_seq: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn min_score(&self) -> Option<f32> {
        self.heap.peek().map(|Reverse(r)| r.score)
    }

    /// Offers a candidate scored `score`. `build` runs only if the
    /// candidate enters the beam: while the beam has room, or when it beats
    /// the current minimum, which is then evicted. Returns whether it was
    /// admitted.
    pub(crate) fn offer<E>(
        &mut self,
        score: f32,
        build: impl FnOnce() -> Result<Hypothesis<S>, E>,
    ) -> Result<bool, E> {
        if self.width == 0 {
            return Ok(false);
        }
        if self.heap.len() < self.width {
            let hyp = build()?;
            self.push(score, hyp);
            return Ok(true);
        }
        match self.min_score() {
            Some(min) if score > min => {
                let hyp = build()?;
                self.heap.pop();
                self.push(score, hyp);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn push(&mut self, score: f32, hyp: Hypothesis<S>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Ranked { score, seq, hyp }));
    }

    /// Hypotheses best first; equal scores keep insertion order.
    pub(crate) fn into_sorted(self) -> Vec<Hypothesis<S>> {
        let mut ranked: Vec<Ranked<S>> = self.heap.into_iter().map(|Reverse(r)| r).collect();
        ranked.sort_by(|a, b| b.cmp(a));
        ranked.into_iter().map(|r| r.hyp).collect()
    }
}

struct LabelScore {
    label: Label,
    score: f32,
}

impl PartialEq for LabelScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LabelScore {}

impl PartialOrd for LabelScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LabelScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.label.cmp(&self.label))
    }
}

/// Yields `(label, score)` in descending score order, lower label first on
/// ties. Heapifying is linear; each pull costs `log V`, so callers that stop
/// early never pay for a full sort.
pub(crate) fn descending_labels(scores: &Array1<f32>) -> impl Iterator<Item = (Label, f32)> {
    let mut heap: BinaryHeap<LabelScore> = scores
        .iter()
        .enumerate()
        .map(|(i, &score)| LabelScore {
            label: i as Label,
            score,
        })
        .collect();
    std::iter::from_fn(move || heap.pop().map(|c| (c.label, c.score)))
}
