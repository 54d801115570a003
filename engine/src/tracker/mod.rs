mod session;

pub use session::{split_utterance, ConversationSession};

use std::borrow::Cow;

use crate::corpus::{Dialog, Turn};
use crate::decoder::{BeamSearchDecoder, DecodeError, DecodeOutput};
use crate::oracle::ScoringOracle;
use crate::vocab::Label;

/// Replays a dialog's history through an oracle and answers its last turn.
pub struct DialogStateTracker<'a, O: ScoringOracle> {
    oracle: &'a O,
    decoder: BeamSearchDecoder,
}

impl<'a, O: ScoringOracle> DialogStateTracker<'a, O> {
    pub fn new(oracle: &'a O, decoder: BeamSearchDecoder) -> Self {
        Self { oracle, decoder }
    }

    pub fn decoder(&self) -> &BeamSearchDecoder {
        &self.decoder
    }

    /// Left fold of every turn but the last; `None` for single-turn dialogs.
    pub fn context_state(&self, dialog: &Dialog) -> Result<Option<O::State>, DecodeError> {
        let mut state: Option<O::State> = None;
        for turn in dialog.context_turns() {
            let turn = self.in_vocab_turn(turn);
            state = Some(self.oracle.observe_turn(state.as_ref(), &turn)?);
        }
        Ok(state)
    }

    /// Decodes a reply to the final turn's input, conditioned on the
    /// accumulated context.
    pub fn respond(&self, dialog: &Dialog) -> Result<DecodeOutput<O::State>, DecodeError> {
        let context = self.context_state(dialog)?;
        self.respond_from(context.as_ref(), &dialog.last_turn().input)
    }

    /// Decodes a reply to `input` on top of an explicit previous state.
    pub fn respond_from(
        &self,
        state: Option<&O::State>,
        input: &[Label],
    ) -> Result<DecodeOutput<O::State>, DecodeError> {
        let input = self.in_vocab(input);
        let initial = self.oracle.initialize(state, &input, self.decoder.eos())?;
        self.decoder.decode(self.oracle, initial)
    }

    fn in_vocab<'l>(&self, labels: &'l [Label]) -> Cow<'l, [Label]> {
        in_vocab(labels, self.oracle.vocab_size(), self.decoder.unk())
    }

    fn in_vocab_turn<'t>(&self, turn: &'t Turn) -> Cow<'t, Turn> {
        let input = self.in_vocab(&turn.input);
        let output = self.in_vocab(&turn.output);
        match (input, output) {
            (Cow::Borrowed(_), Cow::Borrowed(_)) => Cow::Borrowed(turn),
            (input, output) => Cow::Owned(Turn::new(input.into_owned(), output.into_owned())),
        }
    }
}

/// Replaces labels the oracle does not know with `unk`; borrows when
/// nothing needs replacing.
pub fn in_vocab(labels: &[Label], vocab_size: usize, unk: Label) -> Cow<'_, [Label]> {
    if labels.iter().all(|&l| (l as usize) < vocab_size) {
        return Cow::Borrowed(labels);
    }
    Cow::Owned(
        labels
            .iter()
            .map(|&l| if (l as usize) < vocab_size { l } else { unk })
            .collect(),
    )
}
