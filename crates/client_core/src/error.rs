use shared::domain::ParticipantId;
use thiserror::Error;

use crate::{controller::Phase, normalize::NormalizeError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{0} must not be empty")]
    MissingInput(&'static str),
    #[error("invalid api base '{base}': {source}")]
    InvalidBase {
        base: String,
        #[source]
        source: url::ParseError,
    },
    #[error("LOAD_FAILED_{0}")]
    Status(u16),
    #[error("participants request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("participants response is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl LoadError {
    /// Short machine-readable kind, mirroring the delete error kinds.
    pub fn kind(&self) -> String {
        match self {
            Self::Status(status) => format!("LOAD_FAILED_{status}"),
            Self::MissingInput(_) | Self::InvalidBase { .. } => "INVALID_REQUEST".to_string(),
            Self::Transport(_) => "NETWORK_ERROR".to_string(),
            Self::Decode(_) | Self::Normalize(_) => "INVALID_RESPONSE".to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("{0} must not be empty")]
    MissingInput(&'static str),
    #[error("invalid api base '{base}': {source}")]
    InvalidBase {
        base: String,
        #[source]
        source: url::ParseError,
    },
    /// The backend answered with a non-success status.
    #[error("{kind} (HTTP {status})")]
    Rejected { kind: String, status: u16 },
    #[error("delete request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DeleteError {
    /// Kind string fed to [`crate::explain_error`].
    pub fn kind(&self) -> String {
        match self {
            Self::Rejected { kind, .. } => kind.clone(),
            Self::MissingInput(_) | Self::InvalidBase { .. } => "INVALID_REQUEST".to_string(),
            Self::Transport(_) => "NETWORK_ERROR".to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("controller is busy ({0:?})")]
    Busy(Phase),
    #[error("participant {0} is not in the list")]
    UnknownParticipant(ParticipantId),
    #[error("participant {0} is an admin and cannot be removed")]
    AdminProtected(ParticipantId),
    #[error("no removal is awaiting confirmation")]
    NothingToConfirm,
    #[error("room id must not be empty")]
    MissingRoom,
    #[error("admin code must not be empty")]
    MissingAdminCode,
    #[error("controller task failed: {0}")]
    TaskFailed(String),
}

