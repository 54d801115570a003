use std::fmt::Display;
use std::path::Path;
use std::time::Instant;

use dialog_engine::corpus::load_file;
use dialog_engine::{
    BeamSearchDecoder, BigramOracle, CumulativeOracle, DecodeConfig, Dialog, EngineConfig,
    EngineError, Vocabulary, EOS, UNK,
};

use crate::app::{DecodeArgs, ModelArgs};

/// Logs the full error and keeps its short user-facing message.
pub fn user_error<E>(context: &str) -> impl FnOnce(E) -> String + '_
where
    E: Into<EngineError> + Display,
{
    move |err| {
        log::error!("{context}: {err}");
        let err: EngineError = err.into();
        err.user_message().to_string()
    }
}

pub fn read_text(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(user_error(&format!("Failed to read {}", path.display())))
}

/// Vocabulary, training dialogs and the response model estimated from them.
pub struct Workbench {
    pub vocab: Vocabulary,
    pub train: Vec<Dialog>,
    pub oracle: CumulativeOracle<BigramOracle>,
}

impl Workbench {
    pub fn load(config: &EngineConfig, args: &ModelArgs) -> Result<Self, String> {
        let start = Instant::now();
        let vocab = match &args.vocab {
            Some(path) => Vocabulary::load(path)
                .map_err(user_error(&format!("Failed to load vocabulary {}", path.display())))?,
            None => {
                let text = read_text(&args.train)?;
                Vocabulary::from_corpus(&text, args.vocab_size.unwrap_or(config.vocab_size))
            }
        };

        let train = load_file(&args.train, &vocab, &config.target_speaker)
            .map_err(user_error("Failed to load training dialogs"))?;
        let oracle = CumulativeOracle::new(BigramOracle::train(
            &train,
            vocab.len(),
            config.bigram.clone(),
        ));

        log::info!(
            "Model ready: {} words, {} training dialogs ({:?})",
            vocab.len(),
            train.len(),
            start.elapsed()
        );
        Ok(Self {
            vocab,
            train,
            oracle,
        })
    }

    /// Loads a held-out corpus. Words unseen in training get fresh ids so
    /// transcripts keep them; the model still reads them as `<unk>`.
    pub fn load_eval(&self, config: &EngineConfig, path: &Path) -> Result<(Vocabulary, Vec<Dialog>), String> {
        let text = read_text(path)?;
        let vocab = self.vocab.extended_with(&text);
        let dialogs = load_file(path, &vocab, &config.target_speaker)
            .map_err(user_error(&format!("Failed to load dialogs from {}", path.display())))?;
        Ok((vocab, dialogs))
    }
}

pub fn decode_config(base: &DecodeConfig, args: &DecodeArgs) -> DecodeConfig {
    let mut config = base.clone();
    if let Some(beam) = args.beam {
        config.beam_width = beam;
    }
    if let Some(max_len) = args.max_len {
        config.max_len = max_len;
    }
    if let Some(penalty) = args.penalty {
        config.penalty = penalty;
    }
    if let Some(n_best) = args.n_best {
        config.n_best = n_best;
    }
    config
}

pub fn decoder(config: DecodeConfig) -> Result<BeamSearchDecoder, String> {
    BeamSearchDecoder::new(config, EOS, UNK).map_err(user_error("Invalid decoder settings"))
}
