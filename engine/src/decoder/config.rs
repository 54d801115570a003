use serde::{Deserialize, Serialize};

use super::DecodeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub beam_width: usize,
    pub max_len: usize,
    /// Added per generated label when a hypothesis stops.
    pub penalty: f32,
    pub n_best: usize,
    /// First step at which a hypothesis may stop; with 0 the empty reply
    /// is admissible.
    pub min_len: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            beam_width: 5,
            max_len: 20,
            penalty: 2.0,
            n_best: 1,
            min_len: 1,
        }
    }
}

impl DecodeConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides("DECODE_");
        config
    }

    /// Interactive settings: `DECODE_` overrides, then `CONVERSE_` ones.
    pub fn interactive_from_env() -> Self {
        let mut config = Self::interactive_defaults();
        config.apply_interactive_env_overrides();
        config
    }

    /// Defaults for live conversation, which stops earlier than batch
    /// evaluation.
    pub fn interactive_defaults() -> Self {
        Self {
            penalty: 1.0,
            ..Default::default()
        }
    }

    pub fn apply_interactive_env_overrides(&mut self) {
        self.apply_env_overrides("DECODE_");
        self.apply_env_overrides("CONVERSE_");
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

        apply("BEAM_WIDTH", &mut self.beam_width);
        apply("MAX_LEN", &mut self.max_len);
        apply("N_BEST", &mut self.n_best);
        apply("MIN_LEN", &mut self.min_len);

        if let Some(v) = parse_env("PENALTY").and_then(|s| s.parse().ok()) {
            self.penalty = v;
        }
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.beam_width == 0 {
            return Err(DecodeError::InvalidParameter(
                "beam_width must be at least 1".to_string(),
            ));
        }
        if self.max_len == 0 {
            return Err(DecodeError::InvalidParameter(
                "max_len must be at least 1".to_string(),
            ));
        }
        if self.n_best == 0 {
            return Err(DecodeError::InvalidParameter(
                "n_best must be at least 1".to_string(),
            ));
        }
        if !self.penalty.is_finite() {
            return Err(DecodeError::InvalidParameter(format!(
                "penalty must be finite, got {}",
                self.penalty
            )));
        }
        Ok(())
    }
}
