pub mod bleu;

pub use bleu::{corpus_bleu, read_transcript_pairs};

use std::io::Write;
use std::thread;
use std::time::Instant;

use num_cpus::get_physical;

use crate::corpus::{Batch, Dialog};
use crate::decoder::{BeamSearchDecoder, DecodeError, RankedHypothesis};
use crate::oracle::ScoringOracle;
use crate::tracker::{in_vocab, DialogStateTracker};
use crate::vocab::{Label, Vocabulary, EOS, UNK};

const WORKERS_ENV: &str = "DIALOG_WORKERS";

/// Worker threads for dialog-parallel work: the explicit setting, else the
/// `DIALOG_WORKERS` override, else the number of physical cores.
pub fn resolve_worker_count(configured: Option<usize>) -> usize {
    if let Some(n) = configured {
        return n.max(1);
    }
    if let Ok(value) = std::env::var(WORKERS_ENV) {
        match value.parse::<usize>() {
            Ok(parsed) => {
                log::info!("Using {WORKERS_ENV} override: {} workers", parsed);
                return parsed.max(1);
            }
            Err(err) => {
                log::warn!("Ignoring invalid {WORKERS_ENV} value '{}': {}", value, err);
            }
        }
    }
    get_physical().max(1)
}

/// Applies `f` to every item on up to `workers` scoped threads, each owning
/// a contiguous chunk. Results keep item order.
fn parallel_map<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, items.len());
    if workers == 1 {
        return items.iter().enumerate().map(|(i, t)| f(i, t)).collect();
    }

    let chunk = items.len().div_ceil(workers);
    let f = &f;
    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk)
            .enumerate()
            .map(|(c, part)| {
                scope.spawn(move || {
                    part.iter()
                        .enumerate()
                        .map(|(i, t)| f(c * chunk + i, t))
                        .collect::<Vec<R>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Best reply generated for the last turn of one dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalRecord {
    pub dialog: usize,
    pub hypothesis: RankedHypothesis,
    pub generated: bool,
}

/// Answers the final turn of every dialog, in parallel across dialogs.
pub fn generate_responses<O>(
    oracle: &O,
    dialogs: &[Dialog],
    decoder: &BeamSearchDecoder,
    workers: usize,
) -> Result<Vec<EvalRecord>, DecodeError>
where
    O: ScoringOracle + Sync,
{
    let start = Instant::now();
    let results = parallel_map(dialogs, workers, |i, dialog| -> Result<EvalRecord, DecodeError> {
        let tracker = DialogStateTracker::new(oracle, decoder.clone());
        let output = tracker.respond(dialog)?;
        let generated = !output.is_empty_result();
        let hypothesis = output.hypotheses.into_iter().next().unwrap_or_default();
        log::trace!("Dialog {} answered with score {:.4}", i, hypothesis.score);
        Ok(EvalRecord {
            dialog: i,
            hypothesis,
            generated,
        })
    });
    let records = results.into_iter().collect::<Result<Vec<_>, DecodeError>>()?;

    let failed = records.iter().filter(|r| !r.generated).count();
    log::info!(
        "Generated {} responses ({} without hypothesis) in {:?}",
        records.len(),
        failed,
        start.elapsed()
    );
    Ok(records)
}

/// Writes `U:` / `S:` context lines, the reference (`S_REF:`) and the
/// generated reply (`S_HYP:`) of each record, blank-line separated.
pub fn write_transcript<W: Write>(
    writer: &mut W,
    dialogs: &[Dialog],
    records: &[EvalRecord],
    vocab: &Vocabulary,
) -> std::io::Result<()> {
    let line = |labels: &[Label]| vocab.decode(labels).join(" ");
    for record in records {
        let Some(dialog) = dialogs.get(record.dialog) else {
            log::warn!("Skipping record for unknown dialog {}", record.dialog);
            continue;
        };
        for turn in dialog.context_turns() {
            writeln!(writer, "U: {}", line(&turn.input))?;
            writeln!(writer, "S: {}", line(turn.reply()))?;
        }
        let last = dialog.last_turn();
        writeln!(writer, "U: {}", line(&last.input))?;
        if !last.reply().is_empty() {
            writeln!(writer, "S_REF: {}", line(last.reply()))?;
        }
        writeln!(writer, "S_HYP: {}", line(&record.hypothesis.tokens))?;
        writeln!(writer)?;
    }
    writer.flush()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerplexityReport {
    pub labels: usize,
    pub nll: f64,
}

impl PerplexityReport {
    pub fn perplexity(&self) -> f64 {
        if self.labels == 0 {
            return f64::NAN;
        }
        (self.nll / self.labels as f64).exp()
    }
}

/// Teacher-forced negative log-likelihood of every reply label, batches
/// spread over worker threads.
pub fn perplexity<O>(
    oracle: &O,
    dialogs: &[Dialog],
    batches: &[Batch],
    workers: usize,
) -> Result<PerplexityReport, DecodeError>
where
    O: ScoringOracle + Sync,
{
    let start = Instant::now();
    let per_batch = parallel_map(batches, workers, |_, batch| -> Result<PerplexityReport, DecodeError> {
        let mut report = PerplexityReport { labels: 0, nll: 0.0 };
        for &idx in &batch.indices {
            let dialog = dialogs.get(idx).ok_or_else(|| {
                DecodeError::InvalidParameter(format!("batch refers to missing dialog {idx}"))
            })?;
            let (nll, labels) = score_dialog(oracle, dialog)?;
            report.nll += nll;
            report.labels += labels;
        }
        Ok(report)
    });

    let mut total = PerplexityReport { labels: 0, nll: 0.0 };
    for report in per_batch {
        let report = report?;
        total.nll += report.nll;
        total.labels += report.labels;
    }

    log::info!(
        "Perplexity {:.4} over {} labels in {} batches ({:?})",
        total.perplexity(),
        total.labels,
        batches.len(),
        start.elapsed()
    );
    Ok(total)
}

fn score_dialog<O: ScoringOracle>(oracle: &O, dialog: &Dialog) -> Result<(f64, usize), DecodeError> {
    let vocab_size = oracle.vocab_size();
    let mut state: Option<O::State> = None;
    let mut nll = 0.0;
    let mut labels = 0;

    for turn in dialog.turns() {
        let input = in_vocab(&turn.input, vocab_size, UNK);
        let output = in_vocab(&turn.output, vocab_size, UNK);
        let (start, targets) = match output.split_first() {
            Some((&start, rest)) => (start, rest),
            None => (EOS, &[][..]),
        };

        let mut current = oracle.initialize(state.as_ref(), &input, start)?;
        for (i, &target) in targets.iter().enumerate() {
            let scores = oracle.predict(&current)?;
            let lp = scores
                .get(target as usize)
                .copied()
                .ok_or(DecodeError::VocabularyMismatch {
                    expected: vocab_size,
                    actual: scores.len(),
                })?;
            nll -= f64::from(lp);
            labels += 1;
            if i + 1 < targets.len() {
                current = oracle.update(&current, target)?;
            }
        }
        state = Some(current);
    }
    Ok((nll, labels))
}
