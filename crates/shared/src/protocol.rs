use serde::{Deserialize, Serialize};

use crate::domain::{ParticipantId, Role, RoomId};

/// Participant record as the backend sends it. `name` and the room id are
/// optional, and the room id may arrive under either spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawParticipant {
    pub id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    #[serde(rename = "roomId", default, skip_serializing_if = "Option::is_none")]
    pub room_id_camel: Option<RoomId>,
    #[serde(rename = "room_id", default, skip_serializing_if = "Option::is_none")]
    pub room_id_snake: Option<RoomId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantsQuery {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveUserQuery {
    #[serde(rename = "userCode")]
    pub user_code: String,
}

pub const USER_REMOVED: &str = "USER_REMOVED";

/// Success body of the delete endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalResponse {
    #[serde(default)]
    pub removed_user_id: ParticipantId,
    #[serde(default)]
    pub room_id: RoomId,
    #[serde(default)]
    pub participants_count: u64,
    #[serde(default)]
    pub message: String,
}
