//! Reconciles loosely-shaped backend participant records into [`Participant`].
//!
//! Precedence rules:
//! - `name` falls back to the participant id when absent.
//! - the room id is taken from `roomId`, then `room_id`, then the caller's
//!   fallback room. With none of the three the record is rejected.
//! - ids must be non-empty and unique within one list.

use std::collections::HashSet;

use shared::{
    domain::{Participant, ParticipantId, RoomId},
    protocol::RawParticipant,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("participant id must not be empty")]
    EmptyId,
    #[error("participant {id} has neither roomId nor room_id")]
    MissingRoomId { id: ParticipantId },
    #[error("participant {id} appears more than once")]
    DuplicateId { id: ParticipantId },
}

pub fn normalize_participant(
    raw: RawParticipant,
    fallback_room: Option<&RoomId>,
) -> Result<Participant, NormalizeError> {
    if raw.id.as_str().is_empty() {
        return Err(NormalizeError::EmptyId);
    }

    let room_id = match (raw.room_id_camel, raw.room_id_snake, fallback_room) {
        (Some(room_id), _, _) | (None, Some(room_id), _) => room_id,
        (None, None, Some(fallback)) => fallback.clone(),
        (None, None, None) => return Err(NormalizeError::MissingRoomId { id: raw.id }),
    };
    let name = raw.name.unwrap_or_else(|| raw.id.0.clone());

    Ok(Participant {
        id: raw.id,
        name,
        role: raw.role,
        room_id,
    })
}

/// Normalizes a whole response, keeping the backend order.
pub fn normalize_participants(
    raw: Vec<RawParticipant>,
    fallback_room: Option<&RoomId>,
) -> Result<Vec<Participant>, NormalizeError> {
    let mut seen = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .map(|record| {
            let participant = normalize_participant(record, fallback_room)?;
            if !seen.insert(participant.id.clone()) {
                return Err(NormalizeError::DuplicateId { id: participant.id });
            }
            Ok(participant)
        })
        .collect()
}
