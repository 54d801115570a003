mod common;

use common::{prefers_two, FnOracle};
use dialog_engine::corpus::{Dialog, Turn};
use dialog_engine::decoder::{decode, DecodeConfig};
use dialog_engine::oracle::{BigramConfig, BigramOracle, CumulativeOracle, ScoringOracle};
use dialog_engine::vocab::{EOS, UNK};

#[test]
fn cumulative_prediction_adds_prefix_score() {
    let oracle = CumulativeOracle::new(FnOracle::new(4, prefers_two(4)));
    let root = oracle.initialize(None, &[3], EOS).unwrap();
    assert_eq!(root.prefix, 0.0);

    let child = oracle.update(&root, 2).unwrap();
    let grandchild = oracle.update(&child, 2).unwrap();
    assert!((grandchild.prefix - -1.0).abs() < 1e-6);
    assert_eq!(grandchild.inner, vec![3, EOS, 2, 2]);

    let scores = oracle.predict(&grandchild).unwrap();
    assert!((scores[EOS as usize] - -2.0).abs() < 1e-6);
}

#[test]
fn cumulative_scores_prefer_shorter_replies_without_penalty() {
    let inner = FnOracle::new(4, prefers_two(4));
    let oracle = CumulativeOracle::new(inner);
    let config = DecodeConfig {
        beam_width: 2,
        max_len: 4,
        penalty: 0.0,
        n_best: 3,
        min_len: 1,
    };
    let initial = oracle.initialize(None, &[], EOS).unwrap();
    let out = decode(&oracle, initial, EOS, UNK, &config).unwrap();

    // -0.5 for "2" then -1.0 for EOS; each extra label costs another 0.5
    assert_eq!(out.hypotheses[0].tokens, vec![2]);
    assert!((out.hypotheses[0].score - -1.5).abs() < 1e-6);
    assert_eq!(out.hypotheses[1].tokens, vec![2, 2]);
    assert!((out.hypotheses[1].score - -2.0).abs() < 1e-6);
}

#[test]
fn turn_observation_resets_prefix() {
    let dialogs = vec![Dialog::new(vec![Turn::new(vec![2, 3], vec![EOS, 4, EOS])]).unwrap()];
    let oracle = CumulativeOracle::new(BigramOracle::train(&dialogs, 5, BigramConfig::default()));

    let state = oracle.observe_turn(None, &dialogs[0].turns()[0]).unwrap();
    assert_eq!(state.prefix, 0.0);
    assert_eq!(state.inner.last, 4);
    assert!((state.inner.cache[2] - 1.0).abs() < f32::EPSILON);
}
