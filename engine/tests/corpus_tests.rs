use std::io::Cursor;

use dialog_engine::corpus::{load_dialogs, load_file, CorpusError, CorpusStats, Dialog, Turn};
use dialog_engine::vocab::{Vocabulary, EOS, UNK};

const CORPUS: &str = "\
U: hello there
S: hi
U: how are you
U: today
S: fine
S: thanks

U: nobody answers
U: still nobody

S: opening line
U: reply
S: answer";

fn load(text: &str, target: &str) -> (Vocabulary, Vec<Dialog>) {
    let vocab = Vocabulary::from_corpus(text, 0);
    let dialogs = load_dialogs(Cursor::new(text), &vocab, target).unwrap();
    (vocab, dialogs)
}

fn labels(vocab: &Vocabulary, text: &str) -> Vec<u32> {
    vocab.encode(text.split_whitespace())
}

#[test]
fn turns_pair_accumulated_input_with_target_reply() {
    let (vocab, dialogs) = load(CORPUS, "S");

    assert_eq!(dialogs.len(), 2);
    let first = dialogs[0].turns();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].input, labels(&vocab, "hello there"));
    assert_eq!(first[0].output, vocab.encode_output(["hi"]));
    // consecutive lines of one speaker are merged
    assert_eq!(first[1].input, labels(&vocab, "how are you today"));
    assert_eq!(first[1].output, vocab.encode_output(["fine", "thanks"]));
}

#[test]
fn target_opening_line_becomes_context() {
    let (vocab, dialogs) = load(CORPUS, "S");

    // closed by end of input rather than a blank line
    let last = &dialogs[1];
    assert_eq!(last.turn_count(), 1);
    assert_eq!(last.turns()[0].input, labels(&vocab, "opening line reply"));
    assert_eq!(last.turns()[0].output, vocab.encode_output(["answer"]));
}

#[test]
fn dialogs_without_target_turns_are_dropped() {
    let (_, dialogs) = load("U: anyone\nU: there\n\n\n", "S");
    assert!(dialogs.is_empty());
}

#[test]
fn other_target_speaker_swaps_roles() {
    let (vocab, dialogs) = load("U: a b\nS: c\nU: d\n", "U");

    assert_eq!(dialogs.len(), 1);
    let turn = &dialogs[0].turns()[0];
    assert_eq!(turn.input, labels(&vocab, "a b c"));
    assert_eq!(turn.output, vocab.encode_output(["d"]));
}

#[test]
fn words_missing_from_vocabulary_load_as_unk() {
    let vocab = Vocabulary::from_corpus("U: hello\nS: hi\n", 0);
    let dialogs = load_dialogs(Cursor::new("U: hello stranger\nS: hi\n"), &vocab, "S").unwrap();

    let turn = &dialogs[0].turns()[0];
    assert_eq!(turn.input[1], UNK);
    assert_eq!(turn.output.first(), Some(&EOS));
    assert_eq!(turn.output.last(), Some(&EOS));
}

#[test]
fn load_file_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.txt");
    std::fs::write(&path, CORPUS).unwrap();

    let vocab = Vocabulary::from_corpus(CORPUS, 0);
    let dialogs = load_file(&path, &vocab, "S").unwrap();
    assert_eq!(dialogs.len(), 2);

    let missing = load_file(dir.path().join("absent.txt"), &vocab, "S");
    assert!(matches!(missing, Err(CorpusError::Io(_))));
}

#[test]
fn dialog_shape_helpers() {
    let dialog = Dialog::new(vec![
        Turn::new(vec![2, 3], vec![EOS, 4, EOS]),
        Turn::new(vec![5], vec![EOS, 6, 7, 8, EOS]),
    ])
    .unwrap();

    assert_eq!(dialog.context_turns().len(), 1);
    assert_eq!(dialog.last_turn().reply(), &[6, 7, 8]);
    assert_eq!(dialog.longest(), (5, 1));
    assert!(matches!(Dialog::new(Vec::new()), Err(CorpusError::EmptyDialog)));
}

#[test]
fn vocabulary_survives_a_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.json");
    let vocab = Vocabulary::from_corpus(CORPUS, 0);

    vocab.save(&path).unwrap();
    let loaded = Vocabulary::load(&path).unwrap();

    assert_eq!(loaded.len(), vocab.len());
    assert_eq!(loaded.get("thanks"), vocab.get("thanks"));
}

#[test]
fn vocabulary_without_reserved_labels_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.json");
    std::fs::write(&path, r#"{"words": ["hello", "<eos>"]}"#).unwrap();

    assert!(matches!(
        Vocabulary::load(&path),
        Err(CorpusError::MissingReservedLabel("<unk>"))
    ));
}

#[test]
fn corpus_stats_count_dialogs_lines_and_words() {
    let stats = CorpusStats::of_text(CORPUS);
    assert_eq!(
        stats,
        CorpusStats {
            dialogs: 3,
            utterances: 11,
            words: 17,
        }
    );
    assert_eq!(stats.to_string(), "n_dialogs: 3, n_utters: 11, n_words: 17");

    let (d, u, w) = stats.relative_difference(&stats);
    assert_eq!((d, u, w), (0.0, 0.0, 0.0));
}
