use crate::types::NoteId;
use thiserror::Error;

/// Everything that can go wrong at the boundary of the engine.
///
/// The reducer itself never returns these: chart, config and input
/// validation happens before events reach the merged channel, and audio
/// problems are reported by the executor and skipped.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("chart line {line}: {reason}")]
    ChartParse { line: usize, reason: String },

    #[error("chart has no note rows")]
    EmptyChart,

    #[error("duplicate live note id {0}")]
    DuplicateIdentity(NoteId),

    #[error("no sound device for instrument {0:?}")]
    MissingVoice(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GameError {
    pub fn chart(line: usize, reason: impl Into<String>) -> Self {
        GameError::ChartParse {
            line,
            reason: reason.into(),
        }
    }
}
