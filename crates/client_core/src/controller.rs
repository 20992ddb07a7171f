//! Participant list state with confirm-then-delete and optimistic rollback.

use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{Participant, ParticipantId, RoomId},
    protocol::RemovalResponse,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    error::{ControllerError, DeleteError, LoadError},
    explain::{explain_error, LOAD_FAILED_MESSAGE, REMOVED_MESSAGE},
    repository::ParticipantsApi,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What the controller is doing. Confirming and deleting never overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Confirming(ParticipantId),
    Deleting(ParticipantId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == ToastKind::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    ParticipantsReplaced(Vec<Participant>),
    PhaseChanged(Phase),
    Toast(Option<Toast>),
}

/// Owned copy of the controller state for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub participants: Vec<Participant>,
    pub phase: Phase,
    pub toast: Option<Toast>,
}

impl ControllerSnapshot {
    pub fn by_id(&self) -> HashMap<&ParticipantId, &Participant> {
        self.participants.iter().map(|p| (&p.id, p)).collect()
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn pending_id(&self) -> Option<&ParticipantId> {
        match &self.phase {
            Phase::Deleting(id) => Some(id),
            _ => None,
        }
    }

    pub fn confirm_id(&self) -> Option<&ParticipantId> {
        match &self.phase {
            Phase::Confirming(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_pending(&self, id: &ParticipantId) -> bool {
        self.pending_id() == Some(id)
    }

    /// Whether a remove control should be offered for `id`.
    pub fn can_remove(&self, id: &ParticipantId) -> bool {
        self.participants
            .iter()
            .find(|p| &p.id == id)
            .is_some_and(|p| !p.is_admin() && !self.is_pending(id))
    }

    pub fn confirmation_prompt(&self) -> Option<String> {
        let id = self.confirm_id()?;
        let name = self
            .by_id()
            .get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string());
        Some(format!("Підтвердьте видалення користувача {name}."))
    }
}

#[derive(Default)]
struct ControllerState {
    participants: Vec<Participant>,
    phase: Phase,
    toast: Option<Toast>,
}

pub struct ParticipantController {
    api: Arc<dyn ParticipantsApi>,
    room_id: RoomId,
    admin_code: String,
    state: Mutex<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ParticipantController {
    /// Builds an idle controller with an empty list; call
    /// [`Self::reload`] to fetch the room.
    pub fn new(
        api: Arc<dyn ParticipantsApi>,
        room_id: RoomId,
        admin_code: impl Into<String>,
    ) -> Result<Arc<Self>, ControllerError> {
        let admin_code = admin_code.into();
        if room_id.is_empty() {
            return Err(ControllerError::MissingRoom);
        }
        if admin_code.is_empty() {
            return Err(ControllerError::MissingAdminCode);
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Arc::new(Self {
            api,
            room_id,
            admin_code,
            state: Mutex::new(ControllerState::default()),
            events,
        }))
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state.lock().await;
        ControllerSnapshot {
            participants: state.participants.clone(),
            phase: state.phase.clone(),
            toast: state.toast.clone(),
        }
    }

    /// Replaces the list with a fresh copy from the backend. A failed load
    /// keeps the current list and raises an error toast.
    ///
    /// The request and its state update run on a spawned task, so dropping
    /// the returned future does not leave the controller in `Loading`.
    pub async fn reload(self: &Arc<Self>) -> Result<(), ControllerError> {
        {
            let mut state = self.state.lock().await;
            if matches!(state.phase, Phase::Loading | Phase::Deleting(_)) {
                return Err(ControllerError::Busy(state.phase.clone()));
            }
            self.set_phase(&mut state, Phase::Loading);
        }

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let result = controller.api.load_participants(&controller.room_id).await;
            controller.finish_reload(result).await;
        })
        .await
        .map_err(|err| ControllerError::TaskFailed(err.to_string()))
    }

    async fn finish_reload(&self, result: Result<Vec<Participant>, LoadError>) {
        let mut state = self.state.lock().await;
        match result {
            Ok(participants) => {
                info!(
                    room_id = %self.room_id,
                    count = participants.len(),
                    "participants replaced"
                );
                state.participants = participants;
                self.emit(ControllerEvent::ParticipantsReplaced(
                    state.participants.clone(),
                ));
            }
            Err(err) => {
                warn!(
                    room_id = %self.room_id,
                    kind = %err.kind(),
                    error = %err,
                    "participants load failed"
                );
                self.show_toast(&mut state, Toast::error(LOAD_FAILED_MESSAGE));
            }
        }
        self.set_phase(&mut state, Phase::Idle);
    }

    /// Asks for confirmation before removing `id`. Admins are never removable.
    pub async fn request_delete(&self, id: &ParticipantId) -> Result<(), ControllerError> {
        let mut state = self.state.lock().await;
        if matches!(state.phase, Phase::Loading | Phase::Deleting(_)) {
            return Err(ControllerError::Busy(state.phase.clone()));
        }

        let participant = state
            .participants
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| ControllerError::UnknownParticipant(id.clone()))?;
        if participant.is_admin() {
            return Err(ControllerError::AdminProtected(id.clone()));
        }

        self.set_phase(&mut state, Phase::Confirming(id.clone()));
        Ok(())
    }

    pub async fn cancel_delete(&self) {
        let mut state = self.state.lock().await;
        if matches!(state.phase, Phase::Confirming(_)) {
            self.set_phase(&mut state, Phase::Idle);
        }
    }

    /// Removes the participant awaiting confirmation: the list drops it at
    /// once, and the pre-delete list is restored if the backend refuses.
    ///
    /// Once issued, the request runs to completion on a spawned task and
    /// settles the state even if the returned future is dropped.
    pub async fn confirm_delete(self: &Arc<Self>) -> Result<Toast, ControllerError> {
        let (target, snapshot) = {
            let mut state = self.state.lock().await;
            let Phase::Confirming(target) = state.phase.clone() else {
                return Err(ControllerError::NothingToConfirm);
            };

            let snapshot = state.participants.clone();
            state.participants.retain(|p| p.id != target);
            self.emit(ControllerEvent::ParticipantsReplaced(
                state.participants.clone(),
            ));
            self.set_phase(&mut state, Phase::Deleting(target.clone()));
            (target, snapshot)
        };

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let result = controller
                .api
                .delete_participant(&target, &controller.admin_code)
                .await;
            controller.finish_delete(&target, snapshot, result).await
        })
        .await
        .map_err(|err| ControllerError::TaskFailed(err.to_string()))
    }

    async fn finish_delete(
        &self,
        target: &ParticipantId,
        snapshot: Vec<Participant>,
        result: Result<RemovalResponse, DeleteError>,
    ) -> Toast {
        let mut state = self.state.lock().await;
        let toast = match result {
            Ok(removal) => {
                info!(
                    user_id = %target,
                    participants_count = removal.participants_count,
                    "removal confirmed"
                );
                Toast::success(REMOVED_MESSAGE)
            }
            Err(err) => {
                let kind = err.kind();
                warn!(
                    user_id = %target,
                    %kind,
                    status = ?err.status(),
                    "removal failed; rolling back"
                );
                state.participants = snapshot;
                self.emit(ControllerEvent::ParticipantsReplaced(
                    state.participants.clone(),
                ));
                Toast::error(explain_error(&kind))
            }
        };
        self.show_toast(&mut state, toast.clone());
        self.set_phase(&mut state, Phase::Idle);
        toast
    }

    pub async fn dismiss_toast(&self) {
        let mut state = self.state.lock().await;
        if state.toast.take().is_some() {
            self.emit(ControllerEvent::Toast(None));
        }
    }

    fn set_phase(&self, state: &mut ControllerState, phase: Phase) {
        if state.phase != phase {
            state.phase = phase.clone();
            self.emit(ControllerEvent::PhaseChanged(phase));
        }
    }

    fn show_toast(&self, state: &mut ControllerState, toast: Toast) {
        state.toast = Some(toast.clone());
        self.emit(ControllerEvent::Toast(Some(toast)));
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
