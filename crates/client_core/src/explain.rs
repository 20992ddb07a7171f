use shared::error::RemovalErrorKind;

pub const REMOVED_MESSAGE: &str = "Учасника видалено.";
pub const LOAD_FAILED_MESSAGE: &str = "Не вдалося завантажити учасників.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "Невідома помилка.";

/// Turns an error kind into the sentence shown to the admin. Unrecognized
/// kinds are echoed back verbatim.
pub fn explain_error(kind: &str) -> String {
    match kind.parse::<RemovalErrorKind>() {
        Ok(known) => explain_removal_error(known).to_string(),
        Err(()) if kind.is_empty() => UNKNOWN_ERROR_MESSAGE.to_string(),
        Err(()) => kind.to_string(),
    }
}

pub fn explain_removal_error(kind: RemovalErrorKind) -> &'static str {
    match kind {
        RemovalErrorKind::UserNotFound => "Користувача не знайдено.",
        RemovalErrorKind::AdminNotFound => "Адмін-код не знайдено.",
        RemovalErrorKind::NotAdmin => "Тільки адміністратор може видаляти учасників.",
        RemovalErrorKind::DifferentRooms => "Адмін і користувач у різних кімнатах.",
        RemovalErrorKind::CannotDeleteSelf => "Адміністратор не може видалити себе.",
        RemovalErrorKind::RoomClosedOrLocked => "Кімната заблокована для змін.",
    }
}
