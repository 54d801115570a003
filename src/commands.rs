use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::time::Instant;

use dialog_engine::corpus::sample::{render_dialogs, sample_partial_dialogs};
use dialog_engine::corpus::{make_batches, shuffle_batches, CorpusStats};
use dialog_engine::eval::{self, corpus_bleu, read_transcript_pairs};
use dialog_engine::tracker::split_utterance;
use dialog_engine::{ConversationSession, DialogStateTracker, EngineConfig, Vocabulary};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::app::{
    BatchesArgs, BleuArgs, ConverseArgs, EvaluateArgs, PerplexityArgs, SampleArgs, StatsArgs,
    VocabArgs,
};
use crate::utils::{decode_config, decoder, read_text, user_error, Workbench};

pub fn build_vocab(config: &EngineConfig, args: VocabArgs) -> Result<(), String> {
    log::info!("Command vocab invoked: {}", args.train.display());
    let text = read_text(&args.train)?;
    let limit = args.vocab_size.unwrap_or(config.vocab_size);
    let vocab = Vocabulary::from_corpus(&text, limit);
    vocab
        .save(&args.output)
        .map_err(user_error("Failed to save vocabulary"))?;
    log::info!(
        "Saved {} words to {}",
        vocab.len(),
        args.output.display()
    );
    Ok(())
}

pub fn corpus_stats(args: StatsArgs) -> Result<(), String> {
    let text = read_text(&args.corpus)?;
    let stats = CorpusStats::of_text(&text);

    if args.json {
        let json = serde_json::to_string_pretty(&stats).map_err(|err| {
            log::error!("Failed to serialize statistics: {err}");
            "Could not format the statistics.".to_string()
        })?;
        println!("{json}");
    } else {
        println!("{stats}");
    }

    let expected = CorpusStats {
        dialogs: args.expect_dialogs.unwrap_or(stats.dialogs),
        utterances: args.expect_utterances.unwrap_or(stats.utterances),
        words: args.expect_words.unwrap_or(stats.words),
    };
    if expected != stats {
        let (dialogs, utterances, words) = stats.relative_difference(&expected);
        println!(
            "difference: dialogs {dialogs:.2}%, utterances {utterances:.2}%, words {words:.2}%"
        );
    }
    Ok(())
}

pub fn sample_dialogs(config: &EngineConfig, args: SampleArgs) -> Result<(), String> {
    let text = read_text(&args.corpus)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let samples = sample_partial_dialogs(&text, &config.target_speaker, args.count, &mut rng);
    if samples.len() < args.count {
        log::warn!(
            "Only {} partial dialogs available, {} requested",
            samples.len(),
            args.count
        );
    }

    let rendered = render_dialogs(&samples);
    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .map_err(user_error(&format!("Failed to write {}", path.display())))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn show_batches(config: &EngineConfig, args: BatchesArgs) -> Result<(), String> {
    let bench = Workbench::load(config, &args.model)?;
    let batch_size = args.batch_size.unwrap_or(config.batching.batch_size);
    let max_len = args
        .max_batch_length
        .unwrap_or(config.batching.max_batch_length);

    let mut batches =
        make_batches(&bench.train, batch_size, max_len).map_err(user_error("Batching failed"))?;
    if args.shuffle {
        shuffle_batches(&mut batches, &mut StdRng::seed_from_u64(config.seed));
    }

    for (i, batch) in batches.iter().enumerate() {
        println!(
            "batch {i}: {} dialogs, {} turns, longest {}",
            batch.len(),
            batch.turns,
            batch.max_len
        );
    }
    log::info!(
        "{} dialogs in {} batches (batch_size={}, max_batch_length={})",
        bench.train.len(),
        batches.len(),
        batch_size,
        max_len
    );
    Ok(())
}

pub fn evaluate(config: &EngineConfig, args: EvaluateArgs) -> Result<(), String> {
    log::info!("Command evaluate invoked: {}", args.test.display());
    let start = Instant::now();
    let bench = Workbench::load(config, &args.model)?;
    let (vocab, dialogs) = bench.load_eval(config, &args.test)?;
    let decoder = decoder(decode_config(&config.decode, &args.decode))?;
    let workers = eval::resolve_worker_count(args.workers.or(config.workers));

    let records = eval::generate_responses(&bench.oracle, &dialogs, &decoder, workers)
        .map_err(user_error("Response generation failed"))?;

    let write_result = match &args.output {
        Some(path) => File::create(path).and_then(|file| {
            eval::write_transcript(&mut BufWriter::new(file), &dialogs, &records, &vocab)
        }),
        None => eval::write_transcript(&mut io::stdout().lock(), &dialogs, &records, &vocab),
    };
    write_result.map_err(user_error("Failed to write transcript"))?;

    let (references, hypotheses): (Vec<_>, Vec<_>) = records
        .iter()
        .filter_map(|r| {
            let dialog = dialogs.get(r.dialog)?;
            Some((
                vocab.decode(dialog.last_turn().reply()),
                vocab.decode(&r.hypothesis.tokens),
            ))
        })
        .collect();
    match corpus_bleu(&references, &hypotheses, 4) {
        Some(score) => log::info!("BLEU-4 {:.4} over {} dialogs", score, records.len()),
        None => log::warn!("No dialogs to score"),
    }
    log::info!("Evaluation finished in {:?}", start.elapsed());
    Ok(())
}

pub fn perplexity(config: &EngineConfig, args: PerplexityArgs) -> Result<(), String> {
    let bench = Workbench::load(config, &args.model)?;
    let (_, dialogs) = bench.load_eval(config, &args.test)?;
    let batch_size = args.batch_size.unwrap_or(config.batching.batch_size);
    let batches = make_batches(&dialogs, batch_size, config.batching.max_batch_length)
        .map_err(user_error("Batching failed"))?;
    let workers = eval::resolve_worker_count(args.workers.or(config.workers));

    // The per-step distributions are what perplexity measures, not the
    // prefix-shifted scores the decoder ranks by.
    let report = eval::perplexity(bench.oracle.inner(), &dialogs, &batches, workers)
        .map_err(user_error("Perplexity computation failed"))?;
    println!(
        "perplexity {:.4} ({} labels, nll {:.4})",
        report.perplexity(),
        report.labels,
        report.nll
    );
    Ok(())
}

pub fn bleu(args: BleuArgs) -> Result<(), String> {
    let text = read_text(&args.transcript)?;
    let (references, hypotheses) = read_transcript_pairs(&text);
    let score = corpus_bleu(&references, &hypotheses, args.max_order)
        .ok_or_else(|| "The transcript holds no reference and hypothesis pairs.".to_string())?;
    println!(
        "BLEU-{} {:.4} ({} pairs)",
        args.max_order,
        score,
        hypotheses.len()
    );
    Ok(())
}

pub fn converse(config: &EngineConfig, args: ConverseArgs) -> Result<(), String> {
    let bench = Workbench::load(config, &args.model)?;
    let decoder = decoder(decode_config(&config.converse, &args.decode))?;
    let mut session = ConversationSession::new(DialogStateTracker::new(&bench.oracle, decoder));

    println!("Enter an utterance; an empty line starts a new conversation.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.map_err(user_error("Failed to read input"))?;
        let words = split_utterance(&line);
        if words.is_empty() {
            session.reset();
            println!("-- new conversation --");
            continue;
        }

        let input = bench.vocab.encode(words.iter().map(String::as_str));
        let output = session
            .respond(&input)
            .map_err(user_error("Decoding failed"))?;
        for (rank, hyp) in output.hypotheses.iter().enumerate() {
            let reply = bench.vocab.decode(&hyp.tokens).join(" ");
            let written = if rank == 0 {
                writeln!(stdout, "S: {reply}")
            } else {
                writeln!(stdout, "   {reply} ({:.3})", hyp.score)
            };
            written.map_err(user_error("Failed to write output"))?;
        }
        stdout.flush().map_err(user_error("Failed to write output"))?;
    }
    log::info!("Conversation ended after {} turns", session.turns());
    Ok(())
}
