use thiserror::Error;

use crate::ids::{CallbackId, NodeId};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to decode command batch: {0}")]
    BatchDecode(String),
    #[error("unknown command kind '{0}'")]
    UnknownCommand(String),
    #[error("{label}: node id={id} not found")]
    NotFound { label: String, id: NodeId },
    #[error("{label}: callback id={id} not found")]
    CallbackNotFound { label: String, id: CallbackId },
    #[error("there was already a callback added with callback_id={0}")]
    DuplicateRegistration(CallbackId),
    #[error("{label}: expected {expected}, found {found}")]
    TypeMismatch {
        label: String,
        expected: &'static str,
        found: String,
    },
    #[error("no support for the event '{0}'")]
    UnsupportedEvent(String),
    #[error("failed to read dropped file '{name}': {source}")]
    AsyncIo {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("shell document has no <{0}> element")]
    InvalidShell(&'static str),
    #[error("engine error: {0}")]
    Engine(#[from] anyhow::Error),
}

impl DriverError {
    pub(crate) fn not_found(label: impl Into<String>, id: NodeId) -> Self {
        Self::NotFound {
            label: label.into(),
            id,
        }
    }

    pub(crate) fn type_mismatch(
        label: impl Into<String>,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            label: label.into(),
            expected,
            found: found.into(),
        }
    }
}

pub type Result<T, E = DriverError> = std::result::Result<T, E>;
