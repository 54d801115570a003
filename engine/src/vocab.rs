use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusError;

pub type Label = u32;

pub const UNK: Label = 0;
pub const EOS: Label = 1;
pub const UNK_TOKEN: &str = "<unk>";
pub const EOS_TOKEN: &str = "<eos>";

/// Word <-> label mapping. `<unk>` and `<eos>` always hold ids 0 and 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    words: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, Label>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::from_words(vec![UNK_TOKEN.to_string(), EOS_TOKEN.to_string()])
    }
}

impl Vocabulary {
    fn from_words(words: Vec<String>) -> Self {
        let index = words
            .iter()
            .enumerate()
            .map(|(id, w)| (w.clone(), id as Label))
            .collect();
        Self { words, index }
    }

    /// Builds a vocabulary from a dialog text corpus. The speaker field of
    /// each line is skipped. With `limit > 0` the most frequent words are
    /// kept until the vocabulary holds `limit` entries; with `limit == 0`
    /// every observed word is kept in first-seen order.
    pub fn from_corpus(text: &str, limit: usize) -> Self {
        let mut vocab = Self::default();
        let counts = count_words(text);

        if limit > 0 {
            let mut ranked = counts;
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
            for (word, _) in ranked {
                if vocab.len() >= limit {
                    break;
                }
                vocab.insert(&word);
            }
        } else {
            for (word, _) in counts {
                vocab.insert(&word);
            }
        }

        log::debug!(
            "Vocabulary built with {} entries (limit={})",
            vocab.len(),
            limit
        );
        vocab
    }

    /// Returns a copy with every word of `text` not yet present appended
    /// after the existing ids.
    pub fn extended_with(&self, text: &str) -> Self {
        let mut vocab = self.clone();
        for (word, _) in count_words(text) {
            vocab.insert(&word);
        }
        vocab
    }

    fn insert(&mut self, word: &str) {
        if self.index.contains_key(word) {
            return;
        }
        let id = self.words.len() as Label;
        self.words.push(word.to_string());
        self.index.insert(word.to_string(), id);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<Label> {
        self.index.get(word).copied()
    }

    pub fn word(&self, label: Label) -> Option<&str> {
        self.words.get(label as usize).map(String::as_str)
    }

    pub fn encode<'a, I>(&self, words: I) -> Vec<Label>
    where
        I: IntoIterator<Item = &'a str>,
    {
        words
            .into_iter()
            .map(|w| self.get(w).unwrap_or(UNK))
            .collect()
    }

    /// Encodes a target utterance bracketed by `EOS` on both ends.
    pub fn encode_output<'a, I>(&self, words: I) -> Vec<Label>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut labels = vec![EOS];
        labels.extend(self.encode(words));
        labels.push(EOS);
        labels
    }

    /// Maps labels back to words, dropping `EOS`.
    pub fn decode(&self, labels: &[Label]) -> Vec<String> {
        labels
            .iter()
            .filter(|&&l| l != EOS)
            .map(|&l| self.word(l).unwrap_or(UNK_TOKEN).to_string())
            .collect()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CorpusError> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let content = fs::read_to_string(path)?;
        let raw: Vocabulary = serde_json::from_str(&content)?;
        if raw.words.first().map(String::as_str) != Some(UNK_TOKEN) {
            return Err(CorpusError::MissingReservedLabel(UNK_TOKEN));
        }
        if raw.words.get(1).map(String::as_str) != Some(EOS_TOKEN) {
            return Err(CorpusError::MissingReservedLabel(EOS_TOKEN));
        }
        Ok(Self::from_words(raw.words))
    }
}

/// Word counts in first-seen order.
fn count_words(text: &str) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for line in text.lines() {
        for word in line.split_whitespace().skip(1) {
            match slots.get(word) {
                Some(&slot) => order[slot].1 += 1,
                None => {
                    slots.insert(word, order.len());
                    order.push((word.to_string(), 1));
                }
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "U: hello there\nS: hi\nU: hello again\n\nS: bye hello\n";

    #[test]
    fn reserved_labels_come_first() {
        let vocab = Vocabulary::from_corpus(TEXT, 0);
        assert_eq!(vocab.get(UNK_TOKEN), Some(UNK));
        assert_eq!(vocab.get(EOS_TOKEN), Some(EOS));
    }

    #[test]
    fn unlimited_vocabulary_keeps_first_seen_order() {
        let vocab = Vocabulary::from_corpus(TEXT, 0);
        assert_eq!(vocab.get("hello"), Some(2));
        assert_eq!(vocab.get("there"), Some(3));
        assert_eq!(vocab.get("hi"), Some(4));
        assert_eq!(vocab.get("again"), Some(5));
        assert_eq!(vocab.get("bye"), Some(6));
        assert_eq!(vocab.len(), 7);
    }

    #[test]
    fn limited_vocabulary_prefers_frequent_words() {
        let vocab = Vocabulary::from_corpus(TEXT, 3);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get("hello"), Some(2));
        assert_eq!(vocab.get("there"), None);
    }

    #[test]
    fn speaker_field_is_not_a_word() {
        let vocab = Vocabulary::from_corpus(TEXT, 0);
        assert_eq!(vocab.get("U:"), None);
        assert_eq!(vocab.get("S:"), None);
    }

    #[test]
    fn unknown_words_encode_as_unk() {
        let vocab = Vocabulary::from_corpus(TEXT, 0);
        assert_eq!(vocab.encode(["hello", "zebra"]), vec![2, UNK]);
        assert_eq!(vocab.encode_output(["hi"]), vec![EOS, 4, EOS]);
    }

    #[test]
    fn extension_appends_after_existing_ids() {
        let vocab = Vocabulary::from_corpus(TEXT, 3);
        let extended = vocab.extended_with("U: there zebra\n");
        assert_eq!(extended.get("hello"), Some(2));
        assert_eq!(extended.get("there"), Some(3));
        assert_eq!(extended.get("zebra"), Some(4));
    }

    #[test]
    fn decode_drops_eos() {
        let vocab = Vocabulary::from_corpus(TEXT, 0);
        assert_eq!(vocab.decode(&[EOS, 2, 3, EOS]), vec!["hello", "there"]);
    }
}
