use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable reasons the backend gives for refusing a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalErrorKind {
    UserNotFound,
    AdminNotFound,
    NotAdmin,
    DifferentRooms,
    CannotDeleteSelf,
    RoomClosedOrLocked,
}

impl RemovalErrorKind {
    pub const ALL: [Self; 6] = [
        Self::UserNotFound,
        Self::AdminNotFound,
        Self::NotAdmin,
        Self::DifferentRooms,
        Self::CannotDeleteSelf,
        Self::RoomClosedOrLocked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::AdminNotFound => "ADMIN_NOT_FOUND",
            Self::NotAdmin => "NOT_ADMIN",
            Self::DifferentRooms => "DIFFERENT_ROOMS",
            Self::CannotDeleteSelf => "CANNOT_DELETE_SELF",
            Self::RoomClosedOrLocked => "ROOM_CLOSED_OR_LOCKED",
        }
    }

    pub fn status_code(self) -> u16 {
        match self {
            Self::UserNotFound | Self::AdminNotFound => 404,
            Self::NotAdmin => 403,
            Self::DifferentRooms | Self::RoomClosedOrLocked => 409,
            Self::CannotDeleteSelf => 400,
        }
    }
}

impl FromStr for RemovalErrorKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or(())
    }
}

impl fmt::Display for RemovalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// JSON error body shared by every failing backend route: `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    Removal(RemovalErrorKind),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Removal(kind) => kind.status_code(),
            Self::Validation(_) => 422,
            Self::Internal(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Removal(kind) => ErrorBody::new(kind.as_str()),
            Self::Validation(message) => ErrorBody::new(format!("VALIDATION_ERROR: {message}")),
            Self::Internal(_) => ErrorBody::new("INTERNAL_ERROR"),
        }
    }
}

impl From<RemovalErrorKind> for ApiError {
    fn from(value: RemovalErrorKind) -> Self {
        Self::Removal(value)
    }
}
