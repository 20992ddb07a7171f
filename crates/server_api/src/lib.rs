use shared::{
    domain::{ParticipantId, RoomId},
    error::{ApiError, RemovalErrorKind},
    protocol::{RawParticipant, RemovalResponse, USER_REMOVED},
};
use storage::Storage;
use tracing::info;

/// Admin codes shorter than this are rejected before any lookup.
pub const MIN_ADMIN_CODE_LEN: usize = 2;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

/// Lists the users of a room in insertion order. Names are not stored, so the
/// id doubles as the display name.
pub async fn list_participants(
    ctx: &ApiContext,
    room_id: &RoomId,
) -> Result<Vec<RawParticipant>, ApiError> {
    if room_id.is_empty() {
        return Err(ApiError::Validation("roomId must not be empty".into()));
    }

    let users = ctx
        .storage
        .list_users_in_room(room_id)
        .await
        .map_err(internal)?;
    Ok(users
        .into_iter()
        .map(|user| RawParticipant {
            name: Some(user.id.0.clone()),
            id: user.id,
            role: user.role,
            room_id_camel: Some(user.room_id),
            room_id_snake: None,
        })
        .collect())
}

/// Removes `user_id` on behalf of the admin identified by `admin_code`.
///
/// The admin code is the admin's own user id. Checks run in a fixed order
/// and the first failing one decides the error kind.
pub async fn remove_user(
    ctx: &ApiContext,
    user_id: &ParticipantId,
    admin_code: &str,
) -> Result<RemovalResponse, ApiError> {
    if admin_code.chars().count() < MIN_ADMIN_CODE_LEN {
        return Err(ApiError::Validation(format!(
            "userCode must be at least {MIN_ADMIN_CODE_LEN} characters"
        )));
    }

    let victim = ctx
        .storage
        .find_user(user_id)
        .await
        .map_err(internal)?
        .ok_or(RemovalErrorKind::UserNotFound)?;

    let admin = ctx
        .storage
        .find_user(&ParticipantId::from(admin_code))
        .await
        .map_err(internal)?
        .ok_or(RemovalErrorKind::AdminNotFound)?;

    if !admin.role.is_admin() {
        return Err(RemovalErrorKind::NotAdmin.into());
    }
    if admin.room_id != victim.room_id {
        return Err(RemovalErrorKind::DifferentRooms.into());
    }
    if admin.id == victim.id {
        return Err(RemovalErrorKind::CannotDeleteSelf.into());
    }

    let status = ctx
        .storage
        .room_status(&admin.room_id)
        .await
        .map_err(internal)?;
    if status.is_locked() {
        return Err(RemovalErrorKind::RoomClosedOrLocked.into());
    }

    ctx.storage
        .delete_user(&victim.id)
        .await
        .map_err(internal)?;
    let remaining = ctx
        .storage
        .count_users_in_room(&admin.room_id)
        .await
        .map_err(internal)?;
    info!(
        removed_user_id = %victim.id,
        admin_id = %admin.id,
        room_id = %admin.room_id,
        remaining,
        "participant removed"
    );

    Ok(RemovalResponse {
        removed_user_id: user_id.clone(),
        room_id: admin.room_id,
        participants_count: remaining,
        message: USER_REMOVED.to_string(),
    })
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::Internal(err.to_string())
}
