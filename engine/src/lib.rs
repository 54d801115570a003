pub mod config;
pub mod corpus;
pub mod decoder;
pub mod error;
pub mod eval;
pub mod oracle;
pub mod tracker;
pub mod vocab;

pub use config::{BatchConfig, ConfigError, EngineConfig};
pub use corpus::{Batch, BatchError, CorpusError, Dialog, Turn};
pub use decoder::{BeamSearchDecoder, DecodeConfig, DecodeError, DecodeOutput, RankedHypothesis};
pub use error::EngineError;
pub use oracle::{BigramOracle, CumulativeOracle, OracleError, ScoringOracle};
pub use tracker::{ConversationSession, DialogStateTracker};
pub use vocab::{Label, Vocabulary, EOS, UNK};
