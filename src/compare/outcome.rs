use serde::Serialize;

use crate::stage::Stage;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Computed(T),
    InsufficientData { observed: usize, required: usize },
    Degenerate { reason: String },
    MissingStage { stage: Stage },
}

impl<T> Outcome<T> {
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::Degenerate {
            reason: reason.into(),
        }
    }

    pub fn computed(&self) -> Option<&T> {
        match self {
            Self::Computed(value) => Some(value),
            _ => None,
        }
    }

    pub fn skip_reason(&self) -> Option<String> {
        match self {
            Self::Computed(_) => None,
            Self::InsufficientData { observed, required } => Some(format!(
                "insufficient data ({observed} observations, {required} required)"
            )),
            Self::Degenerate { reason } => Some(format!("could not compute: {reason}")),
            Self::MissingStage { stage } => Some(format!("stage {stage} missing from input")),
        }
    }
}
