use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decoder::DecodeConfig;
use crate::oracle::BigramConfig;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Io(_) => "Could not read the configuration file. Check the path and permissions.",
            Self::Json(_) => "The configuration file is not valid JSON.",
            Self::Invalid(_) => "The configuration contains an invalid value.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// Longest utterance a full batch may hold; larger windows shrink the
    /// batch. 0 never shrinks.
    pub max_batch_length: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_batch_length: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Speaker whose utterances are the replies to model.
    pub target_speaker: String,
    /// Vocabulary cap including reserved labels; 0 keeps every word.
    pub vocab_size: usize,
    pub seed: u64,
    /// Worker threads for evaluation; `None` resolves from the machine.
    pub workers: Option<usize>,
    pub decode: DecodeConfig,
    /// Decoder settings for `converse`; defaults to the interactive ones.
    pub converse: DecodeConfig,
    pub batching: BatchConfig,
    pub bigram: BigramConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_speaker: "S".to_string(),
            vocab_size: 0,
            seed: 99,
            workers: None,
            decode: DecodeConfig::default(),
            converse: DecodeConfig::interactive_defaults(),
            batching: BatchConfig::default(),
            bigram: BigramConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with `DIALOG_`, `DECODE_` and `CONVERSE_` environment
    /// overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_all_env_overrides();
        config
    }

    /// Reads a JSON file; missing fields keep their defaults and the
    /// environment still wins.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&raw)?;
        config.apply_all_env_overrides();
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_all_env_overrides(&mut self) {
        self.apply_env_overrides("DIALOG_");
        self.decode.apply_env_overrides("DECODE_");
        self.converse.apply_interactive_env_overrides();
    }

    pub fn apply_env_overrides(&mut self, prefix: &str) {
        let parse_env = |suffix: &str| std::env::var(format!("{prefix}{suffix}")).ok();
        let apply = |suffix: &str, target: &mut usize| {
            if let Some(raw) = parse_env(suffix) {
                match raw.parse() {
                    Ok(v) => *target = v,
                    Err(err) => log::warn!("Ignoring invalid {prefix}{suffix} value '{raw}': {err}"),
                }
            }
        };

        apply("VOCAB_SIZE", &mut self.vocab_size);
        apply("BATCH_SIZE", &mut self.batching.batch_size);
        apply("MAX_BATCH_LENGTH", &mut self.batching.max_batch_length);

        if let Some(speaker) = parse_env("TARGET_SPEAKER").filter(|s| !s.is_empty()) {
            self.target_speaker = speaker;
        }
        if let Some(raw) = parse_env("SEED") {
            match raw.parse() {
                Ok(v) => self.seed = v,
                Err(err) => log::warn!("Ignoring invalid {prefix}SEED value '{raw}': {err}"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_speaker.trim().is_empty() {
            return Err(ConfigError::Invalid("target_speaker must not be empty".to_string()));
        }
        if self.target_speaker.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "target_speaker '{}' must be a single field",
                self.target_speaker
            )));
        }
        if self.vocab_size == 1 || self.vocab_size == 2 {
            return Err(ConfigError::Invalid(format!(
                "vocab_size {} leaves no room beyond the reserved labels",
                self.vocab_size
            )));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        self.decode
            .validate()
            .and_then(|()| self.converse.validate())
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}
