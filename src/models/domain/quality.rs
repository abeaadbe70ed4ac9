use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::domain::evaluation::Phase;

/// Non-fatal findings of a generation run. Each one is logged when raised and kept on the
/// committed document so reviewers can see where content was repaired or padded.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityWarning {
    CandidateRejected {
        word: String,
        reason: String,
    },
    FillerPadding {
        target: String,
        fillers: usize,
    },
    PlaceholderPadding {
        target: String,
        placeholders: usize,
    },
    BlankIndexMismatch {
        item_id: String,
        placeholders: usize,
        indices: usize,
    },
    ItemDropped {
        phase: Phase,
        item_id: String,
        reason: String,
    },
    PhaseDegraded {
        phase: Phase,
        reason: String,
    },
    PartialPhase {
        phase: Phase,
        requested: usize,
        produced: usize,
    },
}

impl QualityWarning {
    /// Logs the warning and hands it back so call sites can push it in one expression.
    pub fn raise(self) -> Self {
        log::warn!("quality warning: {}", self);
        self
    }
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityWarning::CandidateRejected { word, reason } => {
                write!(f, "candidate '{}' rejected: {}", word, reason)
            }
            QualityWarning::FillerPadding { target, fillers } => {
                write!(f, "choice set for '{}' padded with {} filler(s)", target, fillers)
            }
            QualityWarning::PlaceholderPadding {
                target,
                placeholders,
            } => write!(
                f,
                "choice set for '{}' needed {} numbered placeholder(s)",
                target, placeholders
            ),
            QualityWarning::BlankIndexMismatch {
                item_id,
                placeholders,
                indices,
            } => write!(
                f,
                "blank item {} has {} placeholder(s) but {} correct index(es)",
                item_id, placeholders, indices
            ),
            QualityWarning::ItemDropped {
                phase,
                item_id,
                reason,
            } => write!(f, "{} item {} dropped: {}", phase, item_id, reason),
            QualityWarning::PhaseDegraded { phase, reason } => {
                write!(f, "{} phase degraded to fallback content: {}", phase, reason)
            }
            QualityWarning::PartialPhase {
                phase,
                requested,
                produced,
            } => write!(
                f,
                "{} phase produced {} of {} requested item(s)",
                phase, produced, requested
            ),
        }
    }
}
