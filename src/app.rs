use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dialog_engine::EngineConfig;

use crate::commands;

/// Baseline dialog response generation: corpus tools, a bigram response
/// model, beam-search decoding and evaluation.
#[derive(Parser, Debug)]
#[command(name = "dialog-baseline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file; environment overrides still apply
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Speaker whose utterances are modelled as replies
    #[arg(short, long, global = true)]
    pub target: Option<String>,

    /// Random seed for sampling and batch order
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Log debug information
    #[arg(long, global = true, conflicts_with = "silent")]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    pub silent: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a vocabulary from a training corpus
    Vocab(VocabArgs),
    /// Count dialogs, utterances and words of a corpus
    Stats(StatsArgs),
    /// Draw random partial dialogs ending on a target utterance
    Sample(SampleArgs),
    /// Show how a corpus is split into minibatches
    Batches(BatchesArgs),
    /// Generate replies for the last turn of every test dialog
    Evaluate(EvaluateArgs),
    /// Teacher-forced perplexity of the model on a test corpus
    Perplexity(PerplexityArgs),
    /// Corpus BLEU of an evaluation transcript
    Bleu(BleuArgs),
    /// Chat with the model on standard input
    Converse(ConverseArgs),
}

/// Where the model and its vocabulary come from.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Training corpus the bigram model is estimated from
    #[arg(long, value_name = "FILE")]
    pub train: PathBuf,

    /// Saved vocabulary; built from the training corpus when absent
    #[arg(long, value_name = "FILE")]
    pub vocab: Option<PathBuf>,

    /// Vocabulary size limit including reserved labels (0 keeps all)
    #[arg(long)]
    pub vocab_size: Option<usize>,
}

/// Decoder overrides on top of the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct DecodeArgs {
    #[arg(long)]
    pub beam: Option<usize>,
    #[arg(long)]
    pub max_len: Option<usize>,
    #[arg(long)]
    pub penalty: Option<f32>,
    #[arg(long)]
    pub n_best: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VocabArgs {
    #[arg(long, value_name = "FILE")]
    pub train: PathBuf,
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
    #[arg(long)]
    pub vocab_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(value_name = "FILE")]
    pub corpus: PathBuf,
    /// Expected dialog count, compared against the measured one
    #[arg(long)]
    pub expect_dialogs: Option<usize>,
    #[arg(long)]
    pub expect_utterances: Option<usize>,
    #[arg(long)]
    pub expect_words: Option<usize>,
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[arg(value_name = "FILE")]
    pub corpus: PathBuf,
    #[arg(short = 'n', long, default_value_t = 100)]
    pub count: usize,
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BatchesArgs {
    #[command(flatten)]
    pub model: ModelArgs,
    #[arg(long)]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub max_batch_length: Option<usize>,
    /// Shuffle the batch order with the configured seed
    #[arg(long)]
    pub shuffle: bool,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub model: ModelArgs,
    #[command(flatten)]
    pub decode: DecodeArgs,
    #[arg(long, value_name = "FILE")]
    pub test: PathBuf,
    /// Transcript destination; standard output when absent
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PerplexityArgs {
    #[command(flatten)]
    pub model: ModelArgs,
    #[arg(long, value_name = "FILE")]
    pub test: PathBuf,
    #[arg(long)]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Args, Debug)]
pub struct BleuArgs {
    #[arg(value_name = "FILE")]
    pub transcript: PathBuf,
    #[arg(long, default_value_t = 4)]
    pub max_order: usize,
}

#[derive(Args, Debug)]
pub struct ConverseArgs {
    #[command(flatten)]
    pub model: ModelArgs,
    #[command(flatten)]
    pub decode: DecodeArgs,
}

pub fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        log::LevelFilter::Debug
    } else if cli.silent {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

/// Loads the configuration and applies global flags on top of it.
fn resolve_config(cli: &Cli) -> Result<EngineConfig, String> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).map_err(|err| {
            log::error!("Failed to load configuration {}: {err}", path.display());
            err.user_message().to_string()
        })?,
        None => EngineConfig::from_env(),
    };
    if let Some(target) = &cli.target {
        config.target_speaker = target.clone();
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    config.validate().map_err(|err| {
        log::error!("Invalid configuration: {err}");
        err.user_message().to_string()
    })?;
    Ok(config)
}

pub fn run(cli: Cli) -> Result<(), String> {
    let config = resolve_config(&cli)?;
    log::debug!("Running {:?} with {:?}", cli.command, config);

    match cli.command {
        Command::Vocab(args) => commands::build_vocab(&config, args),
        Command::Stats(args) => commands::corpus_stats(args),
        Command::Sample(args) => commands::sample_dialogs(&config, args),
        Command::Batches(args) => commands::show_batches(&config, args),
        Command::Evaluate(args) => commands::evaluate(&config, args),
        Command::Perplexity(args) => commands::perplexity(&config, args),
        Command::Bleu(args) => commands::bleu(args),
        Command::Converse(args) => commands::converse(&config, args),
    }
}
