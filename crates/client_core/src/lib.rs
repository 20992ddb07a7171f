//! Client side of room participant management: backend access, record
//! normalization, and the optimistic delete controller.

pub mod config;
pub mod controller;
pub mod error;
pub mod explain;
pub mod normalize;
pub mod repository;

pub use controller::{
    ControllerEvent, ControllerSnapshot, ParticipantController, Phase, Toast, ToastKind,
};
pub use error::{ControllerError, DeleteError, LoadError};
pub use explain::explain_error;
pub use normalize::{normalize_participant, normalize_participants, NormalizeError};
pub use repository::{HttpParticipantRepository, ParticipantsApi};
