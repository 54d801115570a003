mod common;

use std::io::Cursor;

use common::UniformOracle;
use dialog_engine::corpus::{load_dialogs, make_batches, Dialog};
use dialog_engine::decoder::{BeamSearchDecoder, DecodeConfig, RankedHypothesis};
use dialog_engine::eval::{
    corpus_bleu, generate_responses, perplexity, read_transcript_pairs, resolve_worker_count,
    write_transcript, EvalRecord,
};
use dialog_engine::oracle::{BigramConfig, BigramOracle, CumulativeOracle};
use dialog_engine::vocab::{Vocabulary, EOS, UNK};

fn corpus_text() -> String {
    let mut text = String::new();
    for i in 0..12 {
        text.push_str(&format!(
            "U: hello number{}\nS: hi there\nU: how are you\nS: fine thanks\n\n",
            i % 3
        ));
    }
    text.push_str("U: what is new\nS: nothing much\n");
    text
}

fn load(text: &str) -> (Vocabulary, Vec<Dialog>) {
    let vocab = Vocabulary::from_corpus(text, 0);
    let dialogs = load_dialogs(Cursor::new(text), &vocab, "S").unwrap();
    (vocab, dialogs)
}

fn decoder() -> BeamSearchDecoder {
    let config = DecodeConfig {
        beam_width: 3,
        max_len: 6,
        penalty: 0.0,
        n_best: 1,
        min_len: 1,
    };
    BeamSearchDecoder::new(config, EOS, UNK).unwrap()
}

#[test]
fn uniform_oracle_has_vocabulary_sized_perplexity() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (vocab, dialogs) = load(&corpus_text());
    let oracle = UniformOracle {
        vocab_size: vocab.len(),
    };
    let batches = make_batches(&dialogs, 4, 0).unwrap();

    let report = perplexity(&oracle, &dialogs, &batches, 3).unwrap();

    let expected_labels: usize = dialogs
        .iter()
        .flat_map(|d| d.turns())
        .map(|t| t.output.len() - 1)
        .sum();
    assert_eq!(report.labels, expected_labels);
    let ppl = report.perplexity();
    assert!((ppl - vocab.len() as f64).abs() < 1e-3 * vocab.len() as f64, "{ppl}");
}

#[test]
fn perplexity_is_independent_of_worker_count() {
    let (vocab, dialogs) = load(&corpus_text());
    let oracle = BigramOracle::train(&dialogs, vocab.len(), BigramConfig::default());
    let batches = make_batches(&dialogs, 3, 0).unwrap();

    let single = perplexity(&oracle, &dialogs, &batches, 1).unwrap();
    let many = perplexity(&oracle, &dialogs, &batches, 4).unwrap();

    assert_eq!(single.labels, many.labels);
    assert!((single.nll - many.nll).abs() < 1e-6 * single.nll.abs().max(1.0));
    assert!(single.perplexity() < vocab.len() as f64);
}

#[test]
fn responses_come_back_in_dialog_order() {
    let (vocab, dialogs) = load(&corpus_text());
    let oracle = CumulativeOracle::new(BigramOracle::train(
        &dialogs,
        vocab.len(),
        BigramConfig::default(),
    ));

    let serial = generate_responses(&oracle, &dialogs, &decoder(), 1).unwrap();
    let parallel = generate_responses(&oracle, &dialogs, &decoder(), 4).unwrap();

    assert_eq!(serial.len(), dialogs.len());
    assert_eq!(serial, parallel);
    for (i, record) in serial.iter().enumerate() {
        assert_eq!(record.dialog, i);
        assert!(record.generated);
        assert!(!record.hypothesis.tokens.contains(&EOS));
    }
}

#[test]
fn transcript_lists_context_reference_and_hypothesis() {
    let (vocab, dialogs) = load("U: hello there\nS: hi\nU: how are you\nS: fine thanks\n");
    let hypothesis = RankedHypothesis {
        tokens: vocab.encode(["fine", "thanks"]),
        score: -1.5,
    };
    let records = vec![EvalRecord {
        dialog: 0,
        hypothesis,
        generated: true,
    }];

    let mut out = Vec::new();
    write_transcript(&mut out, &dialogs, &records, &vocab).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(
        text,
        "U: hello there\nS: hi\nU: how are you\nS_REF: fine thanks\nS_HYP: fine thanks\n\n"
    );

    let (refs, hyps) = read_transcript_pairs(&text);
    assert_eq!(refs.len(), 1);
    let score = corpus_bleu(&refs, &hyps, 2).unwrap();
    assert!((score - 1.0).abs() < 1e-9);
}

#[test]
fn explicit_worker_count_wins() {
    assert_eq!(resolve_worker_count(Some(3)), 3);
    assert_eq!(resolve_worker_count(Some(0)), 1);
    assert!(resolve_worker_count(None) >= 1);
}
