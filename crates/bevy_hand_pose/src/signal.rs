use crate::library::GestureId;

/// Recognition lifecycle signal produced by a single tick of a hand recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureSignal {
    /// Step `step` of the dynamic gesture `sequence` was matched by `template`.
    StepRecognized {
        sequence: GestureId,
        step: usize,
        template: GestureId,
    },
    /// Every step of `sequence` was performed in order. Fires once per completion.
    SequenceRecognized { sequence: GestureId },
    /// `sequence` was released after completion, or abandoned by timeout.
    SequenceEnded { sequence: GestureId },
    /// A new static gesture became the best match.
    StaticRecognized { template: GestureId },
    /// The previously recognized static gesture is no longer the best match.
    StaticRecognizedEnd { template: GestureId },
}

impl GestureSignal {
    /// The dynamic gesture or static template this signal is about.
    pub fn gesture(&self) -> GestureId {
        match *self {
            Self::StepRecognized { sequence, .. }
            | Self::SequenceRecognized { sequence }
            | Self::SequenceEnded { sequence } => sequence,
            Self::StaticRecognized { template } | Self::StaticRecognizedEnd { template } => {
                template
            }
        }
    }
}
