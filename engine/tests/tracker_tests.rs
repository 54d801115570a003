mod common;

use common::{prefers_two, FnOracle};
use dialog_engine::corpus::{Dialog, Turn};
use dialog_engine::decoder::{BeamSearchDecoder, DecodeConfig};
use dialog_engine::tracker::{in_vocab, ConversationSession, DialogStateTracker};
use dialog_engine::vocab::{Label, EOS, UNK};

fn decoder() -> BeamSearchDecoder {
    let config = DecodeConfig {
        beam_width: 2,
        max_len: 2,
        penalty: 0.0,
        n_best: 1,
        min_len: 1,
    };
    BeamSearchDecoder::new(config, EOS, UNK).unwrap()
}

fn reply(words: &[Label]) -> Vec<Label> {
    let mut out = vec![EOS];
    out.extend_from_slice(words);
    out.push(EOS);
    out
}

#[test]
fn single_turn_dialog_starts_from_zero_state() {
    let oracle = FnOracle::new(10, prefers_two(10));
    let tracker = DialogStateTracker::new(&oracle, decoder());
    let dialog = Dialog::new(vec![Turn::new(vec![4], reply(&[5]))]).unwrap();

    assert_eq!(tracker.context_state(&dialog).unwrap(), None);

    let out = tracker.respond(&dialog).unwrap();
    assert_eq!(oracle.nth_prediction(0), Some(vec![4, EOS]));
    assert_eq!(out.hypotheses[0].tokens, vec![2]);
    assert_eq!(out.best_state, Some(vec![4, EOS, 2, EOS]));
}

#[test]
fn context_turns_are_folded_in_order() {
    let oracle = FnOracle::new(10, prefers_two(10));
    let tracker = DialogStateTracker::new(&oracle, decoder());
    let dialog = Dialog::new(vec![
        Turn::new(vec![5], reply(&[6, 7])),
        Turn::new(vec![8], reply(&[9])),
        Turn::new(vec![4], reply(&[3])),
    ])
    .unwrap();

    // Each observed turn feeds its input, the opening EOS and the reply
    // without its closing EOS.
    assert_eq!(
        tracker.context_state(&dialog).unwrap(),
        Some(vec![5, EOS, 6, 7, 8, EOS, 9])
    );

    tracker.respond(&dialog).unwrap();
    assert_eq!(
        oracle.nth_prediction(0),
        Some(vec![5, EOS, 6, 7, 8, EOS, 9, 4, EOS])
    );
}

#[test]
fn labels_beyond_the_oracle_vocabulary_become_unk() {
    let oracle = FnOracle::new(10, prefers_two(10));
    let tracker = DialogStateTracker::new(&oracle, decoder());
    let dialog = Dialog::new(vec![
        Turn::new(vec![42], reply(&[17, 3])),
        Turn::new(vec![4, 99], reply(&[])),
    ])
    .unwrap();

    tracker.respond(&dialog).unwrap();
    assert_eq!(
        oracle.nth_prediction(0),
        Some(vec![UNK, EOS, UNK, 3, 4, UNK, EOS])
    );
}

#[test]
fn in_vocab_borrows_when_nothing_changes() {
    let labels = [2, 3, 4];
    assert!(matches!(in_vocab(&labels, 5, UNK), std::borrow::Cow::Borrowed(_)));
    assert_eq!(in_vocab(&labels, 4, UNK).as_ref(), &[2, 3, UNK]);
}

#[test]
fn session_threads_best_state_between_turns() {
    let oracle = FnOracle::new(10, prefers_two(10));
    let mut session = ConversationSession::new(DialogStateTracker::new(&oracle, decoder()));
    assert!(!session.has_context());

    let first = session.respond(&[4]).unwrap();
    assert_eq!(first.hypotheses[0].tokens, vec![2]);
    assert!(session.has_context());
    assert_eq!(session.turns(), 1);

    let before = oracle.predictions();
    session.respond(&[5]).unwrap();
    assert_eq!(
        oracle.nth_prediction(before),
        Some(vec![4, EOS, 2, EOS, 5, EOS])
    );
    assert_eq!(session.turns(), 2);
}

#[test]
fn session_reset_starts_a_new_conversation() {
    let oracle = FnOracle::new(10, prefers_two(10));
    let mut session = ConversationSession::new(DialogStateTracker::new(&oracle, decoder()));
    session.respond(&[4]).unwrap();
    session.reset();

    assert!(!session.has_context());
    assert_eq!(session.turns(), 0);

    let before = oracle.predictions();
    session.respond(&[6]).unwrap();
    assert_eq!(oracle.nth_prediction(before), Some(vec![6, EOS]));
}

#[test]
fn failed_search_clears_session_context() {
    let oracle = FnOracle::new(10, prefers_two(10));
    let stubborn = BeamSearchDecoder::new(
        DecodeConfig {
            beam_width: 2,
            max_len: 2,
            penalty: 0.0,
            n_best: 1,
            min_len: 5,
        },
        EOS,
        UNK,
    )
    .unwrap();
    let mut session = ConversationSession::new(DialogStateTracker::new(&oracle, stubborn));

    let out = session.respond(&[4]).unwrap();
    assert!(out.is_empty_result());
    assert!(!session.has_context());
}
