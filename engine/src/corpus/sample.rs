use rand::seq::SliceRandom;
use rand::Rng;

/// Splits a corpus into dialogs: runs of non-empty, trimmed lines.
pub fn split_raw_dialogs(text: &str) -> Vec<Vec<&str>> {
    let mut dialogs = Vec::new();
    let mut current = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                dialogs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        dialogs.push(current);
    }
    dialogs
}

/// Draws `n` dialog prefixes that end on a `target` line.
///
/// Every prefix of at least two lines whose last line belongs to `target`
/// is a candidate, so one dialog can contribute several partial dialogs.
/// Candidates are shuffled with `rng`; fewer than `n` are returned when the
/// corpus is small.
pub fn sample_partial_dialogs<'t, R: Rng + ?Sized>(
    text: &'t str,
    target: &str,
    n: usize,
    rng: &mut R,
) -> Vec<Vec<&'t str>> {
    let marker = format!("{target}:");
    let mut candidates = Vec::new();
    for dialog in split_raw_dialogs(text) {
        for end in 2..=dialog.len() {
            if dialog[end - 1].starts_with(&marker) {
                candidates.push(dialog[..end].to_vec());
            }
        }
    }

    candidates.shuffle(rng);
    candidates.truncate(n);
    log::debug!("Sampled {} partial dialogs", candidates.len());
    candidates
}

/// Renders dialogs in corpus format, each followed by a blank line.
pub fn render_dialogs(dialogs: &[Vec<&str>]) -> String {
    let mut out = String::new();
    for dialog in dialogs {
        for line in dialog {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
