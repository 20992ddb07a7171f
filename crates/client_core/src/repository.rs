//! HTTP access to the participants backend.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::{Participant, ParticipantId, RoomId},
    protocol::{ParticipantsQuery, RawParticipant, RemovalResponse, RemoveUserQuery},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::{DeleteError, LoadError},
    normalize::normalize_participants,
};

/// Backend operations the controller depends on.
#[async_trait]
pub trait ParticipantsApi: Send + Sync {
    async fn load_participants(&self, room_id: &RoomId) -> Result<Vec<Participant>, LoadError>;
    async fn delete_participant(
        &self,
        user_id: &ParticipantId,
        admin_code: &str,
    ) -> Result<RemovalResponse, DeleteError>;
}

#[derive(Clone)]
pub struct HttpParticipantRepository {
    http: Client,
    base: String,
}

impl HttpParticipantRepository {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base: base.into(),
        }
    }

    pub fn base(&self) -> &str {
        trim_base(&self.base)
    }
}

#[async_trait]
impl ParticipantsApi for HttpParticipantRepository {
    async fn load_participants(&self, room_id: &RoomId) -> Result<Vec<Participant>, LoadError> {
        load_participants(&self.http, &self.base, room_id).await
    }

    async fn delete_participant(
        &self,
        user_id: &ParticipantId,
        admin_code: &str,
    ) -> Result<RemovalResponse, DeleteError> {
        delete_participant(&self.http, &self.base, user_id, admin_code).await
    }
}

/// Strips a single trailing slash from the configured base.
pub fn trim_base(base: &str) -> &str {
    base.strip_suffix('/').unwrap_or(base)
}

fn endpoint(base: &str, segments: &[&str]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("{}/", trim_base(base)))?;
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `GET {base}/users/participants?roomId=..`, normalized in backend order.
/// Records without a room id belong to the queried room.
pub async fn load_participants(
    http: &Client,
    base: &str,
    room_id: &RoomId,
) -> Result<Vec<Participant>, LoadError> {
    if base.trim().is_empty() {
        return Err(LoadError::MissingInput("api base"));
    }
    if room_id.is_empty() {
        return Err(LoadError::MissingInput("room id"));
    }

    let url = endpoint(base, &["users", "participants"]).map_err(|source| {
        LoadError::InvalidBase {
            base: base.to_string(),
            source,
        }
    })?;
    let response = http
        .get(url)
        .query(&ParticipantsQuery {
            room_id: room_id.clone(),
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        warn!(%room_id, status = status.as_u16(), "participants request rejected");
        return Err(LoadError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await?;
    let raw: Vec<RawParticipant> = serde_json::from_slice(&bytes)?;
    let participants = normalize_participants(raw, Some(room_id))?;
    debug!(%room_id, count = participants.len(), "participants loaded");
    Ok(participants)
}

/// `DELETE {base}/users/{user_id}?userCode=..`.
///
/// A failing response is turned into a kind taken from the body's `detail`,
/// or `HTTP_<status>` when there is none. A success body is trusted as-is.
pub async fn delete_participant(
    http: &Client,
    base: &str,
    user_id: &ParticipantId,
    admin_code: &str,
) -> Result<RemovalResponse, DeleteError> {
    if base.trim().is_empty() {
        return Err(DeleteError::MissingInput("api base"));
    }
    if user_id.is_empty() {
        return Err(DeleteError::MissingInput("user id"));
    }
    if admin_code.is_empty() {
        return Err(DeleteError::MissingInput("admin code"));
    }

    let url = endpoint(base, &["users", user_id.as_str()]).map_err(|source| {
        DeleteError::InvalidBase {
            base: base.to_string(),
            source,
        }
    })?;
    let response = http
        .delete(url)
        .query(&RemoveUserQuery {
            user_code: admin_code.to_string(),
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = match response.bytes().await {
            Ok(bytes) => json_or_empty(&bytes),
            Err(err) => {
                debug!(%user_id, error = %err, "rejected response body unreadable");
                json_or_empty(&[])
            }
        };
        let kind = error_kind(&body, status.as_u16());
        warn!(%user_id, status = status.as_u16(), %kind, "delete request rejected");
        return Err(DeleteError::Rejected {
            kind,
            status: status.as_u16(),
        });
    }

    let body = json_or_empty(&response.bytes().await?);
    let mut removal = match serde_json::from_value::<RemovalResponse>(body) {
        Ok(removal) => removal,
        Err(err) => {
            warn!(%user_id, error = %err, "unexpected delete response body");
            RemovalResponse::default()
        }
    };
    if removal.removed_user_id.is_empty() {
        removal.removed_user_id = user_id.clone();
    }
    info!(
        %user_id,
        room_id = %removal.room_id,
        participants_count = removal.participants_count,
        "participant deleted"
    );
    Ok(removal)
}

/// Bodies that are missing or not JSON read as `{}`.
fn json_or_empty(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or_else(|_| Value::Object(Default::default()))
}

/// Only a non-empty string `detail` counts as a kind.
fn error_kind(body: &Value, status: u16) -> String {
    body.get("detail")
        .and_then(Value::as_str)
        .filter(|detail| !detail.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP_{status}"))
}

#[cfg(test)]
#[path = "tests/repository_tests.rs"]
mod tests;
