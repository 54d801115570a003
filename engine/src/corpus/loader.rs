use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use super::{CorpusError, Dialog, Turn};
use crate::vocab::Vocabulary;

/// Reads a dialog corpus file and assembles turns for `target`.
pub fn load_file<P: AsRef<Path>>(
    path: P,
    vocab: &Vocabulary,
    target: &str,
) -> Result<Vec<Dialog>, CorpusError> {
    let file = File::open(path.as_ref())?;
    log::info!("Loading dialogs from {}", path.as_ref().display());
    load_dialogs(BufReader::new(file), vocab, target)
}

/// Parses `SPEAKER: word word ...` lines, one blank line between dialogs.
///
/// Consecutive lines of one speaker are merged. Utterances of other
/// speakers accumulate as the input of the next `target` turn; if `target`
/// opens the dialog its utterance becomes that input instead. Dialogs that
/// never yield a turn are dropped, and a file that ends without a blank
/// line still closes its last dialog.
pub fn load_dialogs<R: BufRead>(
    reader: R,
    vocab: &Vocabulary,
    target: &str,
) -> Result<Vec<Dialog>, CorpusError> {
    let start = Instant::now();
    let mut builder = DialogBuilder::new(vocab, target);
    let mut dialogs = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        match words.next() {
            Some(head) => {
                let speaker = head.split(':').next().unwrap_or(head);
                builder.push_line(speaker, words);
            }
            None => {
                if let Some(dialog) = builder.finish()? {
                    dialogs.push(dialog);
                }
            }
        }
    }
    if let Some(dialog) = builder.finish()? {
        dialogs.push(dialog);
    }

    log::debug!(
        "Loaded {} dialogs for speaker '{}' in {:?}",
        dialogs.len(),
        target,
        start.elapsed()
    );
    Ok(dialogs)
}

struct DialogBuilder<'a> {
    vocab: &'a Vocabulary,
    target: &'a str,
    turns: Vec<Turn>,
    speaker: String,
    utterance: Vec<String>,
    input: Vec<String>,
}

impl<'a> DialogBuilder<'a> {
    fn new(vocab: &'a Vocabulary, target: &'a str) -> Self {
        Self {
            vocab,
            target,
            turns: Vec::new(),
            speaker: String::new(),
            utterance: Vec::new(),
            input: Vec::new(),
        }
    }

    fn push_line<'w>(&mut self, speaker: &str, words: impl Iterator<Item = &'w str>) {
        if !self.speaker.is_empty() && self.speaker != speaker {
            let finished = std::mem::take(&mut self.utterance);
            if self.speaker == self.target {
                if self.input.is_empty() {
                    self.input = finished;
                } else {
                    self.emit_turn(finished);
                }
            } else {
                self.input.extend(finished);
            }
        }
        self.utterance.extend(words.map(str::to_string));
        self.speaker = speaker.to_string();
    }

    fn emit_turn(&mut self, reply: Vec<String>) {
        let input = std::mem::take(&mut self.input);
        self.turns.push(Turn::new(
            self.vocab.encode(input.iter().map(String::as_str)),
            self.vocab.encode_output(reply.iter().map(String::as_str)),
        ));
    }

    /// Closes the current dialog; `None` when it produced no turn.
    fn finish(&mut self) -> Result<Option<Dialog>, CorpusError> {
        if self.speaker == self.target && !self.input.is_empty() {
            let reply = std::mem::take(&mut self.utterance);
            self.emit_turn(reply);
        }

        let turns = std::mem::take(&mut self.turns);
        self.speaker.clear();
        self.utterance.clear();
        self.input.clear();

        if turns.is_empty() {
            return Ok(None);
        }
        Dialog::new(turns).map(Some)
    }
}
