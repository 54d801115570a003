use std::collections::HashMap;

/// Splits a transcript into reference and hypothesis token lists, pairing
/// each `S_HYP:` line with the `S_REF:` before it in the same dialog.
/// Hypotheses without a reference are skipped.
pub fn read_transcript_pairs(text: &str) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
    let mut references = Vec::new();
    let mut hypotheses = Vec::new();
    let mut pending: Option<Vec<String>> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            pending = None;
        } else if let Some(rest) = line.strip_prefix("S_REF:") {
            pending = Some(tokens(rest));
        } else if let Some(rest) = line.strip_prefix("S_HYP:") {
            match pending.take() {
                Some(reference) => {
                    references.push(reference);
                    hypotheses.push(tokens(rest));
                }
                None => log::debug!("Skipping hypothesis without reference: {}", rest.trim()),
            }
        }
    }
    (references, hypotheses)
}

fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn ngram_counts(words: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if n == 0 || words.len() < n {
        return counts;
    }
    for gram in words.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// Corpus-level BLEU with uniform weights up to `max_order`, one reference
/// per hypothesis.
///
/// Clipped n-gram matches and hypothesis n-gram totals are summed over the
/// corpus before taking precisions. Any order without a single match gives
/// a score of 0. Returns `None` when the lists differ in length, are empty
/// or `max_order` is 0.
pub fn corpus_bleu(
    references: &[Vec<String>],
    hypotheses: &[Vec<String>],
    max_order: usize,
) -> Option<f64> {
    if references.len() != hypotheses.len() || hypotheses.is_empty() || max_order == 0 {
        return None;
    }

    let mut matches = vec![0usize; max_order];
    let mut totals = vec![0usize; max_order];
    let mut hyp_len = 0usize;
    let mut ref_len = 0usize;

    for (reference, hypothesis) in references.iter().zip(hypotheses) {
        hyp_len += hypothesis.len();
        ref_len += reference.len();
        for n in 1..=max_order {
            let ref_counts = ngram_counts(reference, n);
            let hyp_counts = ngram_counts(hypothesis, n);
            matches[n - 1] += hyp_counts
                .iter()
                .map(|(gram, &count)| count.min(ref_counts.get(gram).copied().unwrap_or(0)))
                .sum::<usize>();
            totals[n - 1] += hypothesis.len().saturating_sub(n - 1).max(1);
        }
    }

    if matches.iter().any(|&m| m == 0) {
        return Some(0.0);
    }

    let log_precision = matches
        .iter()
        .zip(&totals)
        .map(|(&m, &t)| (m as f64 / t as f64).ln())
        .sum::<f64>()
        / max_order as f64;

    let brevity = if hyp_len == 0 {
        0.0
    } else if hyp_len > ref_len {
        1.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    };

    Some(brevity * log_precision.exp())
}
