use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;

use super::Dialog;

#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("Batch partition invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl BatchError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InternalInvariantViolation(_) => {
                "Batching lost or duplicated a dialog. This is a bug; please report it."
            }
        }
    }
}

/// Dialog indices processed together. All members share a turn count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub indices: Vec<usize>,
    pub turns: usize,
    /// Largest member length, where a dialog's length is the larger side of
    /// its `(output, input)` turn lengths taken from the turn with the
    /// longest output (ties broken by input). Long inputs paired with
    /// short outputs on another turn do not count.
    pub max_len: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Shape {
    turns: usize,
    longest: (usize, usize),
}

impl Shape {
    fn of(dialog: &Dialog) -> Self {
        Self {
            turns: dialog.turn_count(),
            longest: dialog.longest(),
        }
    }

    /// Larger side of the lexicographically largest `(output, input)` pair.
    fn max_len(&self) -> usize {
        self.longest.0.max(self.longest.1)
    }
}

/// Partitions dialogs into minibatches of equal turn count.
///
/// Dialogs are ordered by descending `(turns, longest output, its input)`,
/// split wherever the turn count drops and cut into runs of at most
/// `batch_size`. A run whose largest member length (see [`Batch::max_len`])
/// exceeds `max_label_len` is shortened to
/// `batch_size / (longest / max_label_len + 1)` members (at
/// least one). `max_label_len == 0` disables the shortening. With
/// `batch_size <= 1` every dialog forms its own batch in input order.
pub fn make_batches(
    dialogs: &[Dialog],
    batch_size: usize,
    max_label_len: usize,
) -> Result<Vec<Batch>, BatchError> {
    let start = Instant::now();
    let shapes: Vec<Shape> = dialogs.iter().map(Shape::of).collect();

    let batches = if batch_size <= 1 {
        shapes
            .iter()
            .enumerate()
            .map(|(i, s)| Batch {
                indices: vec![i],
                turns: s.turns,
                max_len: s.max_len(),
            })
            .collect()
    } else {
        let mut order: Vec<usize> = (0..dialogs.len()).collect();
        order.sort_by(|&a, &b| {
            let (sa, sb) = (&shapes[a], &shapes[b]);
            (sb.turns, sb.longest).cmp(&(sa.turns, sa.longest))
        });

        let mut batches = Vec::new();
        for segment in turn_segments(&order, &shapes) {
            fill_segment(segment, &shapes, batch_size, max_label_len, &mut batches);
        }
        batches
    };

    verify_partition(&batches, dialogs.len())?;
    log::debug!(
        "Built {} batches from {} dialogs (batch_size={}, max_label_len={}) in {:?}",
        batches.len(),
        dialogs.len(),
        batch_size,
        max_label_len,
        start.elapsed()
    );
    Ok(batches)
}

/// Splits the sorted order into runs of identical turn count.
fn turn_segments<'a>(order: &'a [usize], shapes: &[Shape]) -> Vec<&'a [usize]> {
    let mut segments = Vec::new();
    let mut begin = 0;
    for k in 1..order.len() {
        if shapes[order[k - 1]].turns > shapes[order[k]].turns {
            segments.push(&order[begin..k]);
            begin = k;
        }
    }
    if begin < order.len() {
        segments.push(&order[begin..]);
    }
    segments
}

fn fill_segment(
    segment: &[usize],
    shapes: &[Shape],
    batch_size: usize,
    max_label_len: usize,
    out: &mut Vec<Batch>,
) {
    let mut bs = 0;
    while bs < segment.len() {
        let mut be = (bs + batch_size).min(segment.len());
        let window_max = window_max_len(&segment[bs..be], shapes);
        if max_label_len > 0 && window_max > max_label_len {
            be = be.min(bs + shrunk_batch_size(batch_size, window_max, max_label_len));
        }

        let indices = segment[bs..be].to_vec();
        out.push(Batch {
            turns: shapes[indices[0]].turns,
            max_len: window_max_len(&indices, shapes),
            indices,
        });
        bs = be;
    }
}

fn window_max_len(window: &[usize], shapes: &[Shape]) -> usize {
    window
        .iter()
        .map(|&i| shapes[i].max_len())
        .max()
        .unwrap_or(0)
}

/// Effective batch size for a window whose longest sequence is `window_max`.
pub fn shrunk_batch_size(batch_size: usize, window_max: usize, max_label_len: usize) -> usize {
    if max_label_len == 0 {
        return batch_size;
    }
    let ratio = window_max as f64 / max_label_len as f64 + 1.0;
    ((batch_size as f64 / ratio) as usize).max(1)
}

/// Checks that every index in `0..n` appears in exactly one batch.
pub fn verify_partition(batches: &[Batch], n: usize) -> Result<(), BatchError> {
    let mut seen = vec![false; n];
    for batch in batches {
        if batch.indices.is_empty() {
            return Err(BatchError::InternalInvariantViolation(
                "empty batch".to_string(),
            ));
        }
        for &i in &batch.indices {
            match seen.get_mut(i) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(BatchError::InternalInvariantViolation(format!(
                        "dialog {i} assigned twice"
                    )))
                }
                None => {
                    return Err(BatchError::InternalInvariantViolation(format!(
                        "dialog {i} out of range for {n} dialogs"
                    )))
                }
            }
        }
    }
    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(BatchError::InternalInvariantViolation(format!(
            "dialog {missing} not assigned to any batch"
        )));
    }
    Ok(())
}

/// Reorders batches for one pass over the data.
pub fn shuffle_batches<R: Rng + ?Sized>(batches: &mut [Batch], rng: &mut R) {
    batches.shuffle(rng);
}
