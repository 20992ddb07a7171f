use std::{collections::VecDeque, time::Duration};

use super::*;
use crate::{
    error::{DeleteError, LoadError},
    repository::HttpParticipantRepository,
};
use async_trait::async_trait;
use axum::{
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use shared::{domain::Role, protocol::RemovalResponse};
use tokio::{net::TcpListener, sync::Notify};

fn participant(id: &str, name: &str, role: Role) -> Participant {
    Participant {
        id: id.into(),
        name: name.into(),
        role,
        room_id: "r1".into(),
    }
}

fn scenario_list() -> Vec<Participant> {
    vec![
        participant("u1", "u1", Role::Admin),
        participant("u2", "Bob", Role::Member),
    ]
}

fn removal(id: &str) -> RemovalResponse {
    RemovalResponse {
        removed_user_id: id.into(),
        room_id: "r1".into(),
        participants_count: 1,
        message: "USER_REMOVED".into(),
    }
}

#[derive(Default)]
struct ScriptedApi {
    loads: Mutex<VecDeque<Result<Vec<Participant>, LoadError>>>,
    deletes: Mutex<VecDeque<Result<RemovalResponse, DeleteError>>>,
    delete_calls: Mutex<Vec<(ParticipantId, String)>>,
    delete_gate: Option<Arc<Notify>>,
    load_gate: Option<Arc<Notify>>,
}

impl ScriptedApi {
    fn with_loads(loads: Vec<Result<Vec<Participant>, LoadError>>) -> Self {
        Self {
            loads: Mutex::new(loads.into()),
            ..Self::default()
        }
    }

    fn then_delete(mut self, result: Result<RemovalResponse, DeleteError>) -> Self {
        self.deletes.get_mut().push_back(result);
        self
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.delete_gate = Some(gate);
        self
    }

    fn gated_loads(mut self, gate: Arc<Notify>) -> Self {
        self.load_gate = Some(gate);
        self
    }
}

#[async_trait]
impl ParticipantsApi for ScriptedApi {
    async fn load_participants(&self, _room_id: &RoomId) -> Result<Vec<Participant>, LoadError> {
        if let Some(gate) = &self.load_gate {
            gate.notified().await;
        }
        self.loads
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(LoadError::Status(599)))
    }

    async fn delete_participant(
        &self,
        user_id: &ParticipantId,
        admin_code: &str,
    ) -> Result<RemovalResponse, DeleteError> {
        self.delete_calls
            .lock()
            .await
            .push((user_id.clone(), admin_code.to_string()));
        if let Some(gate) = &self.delete_gate {
            gate.notified().await;
        }
        self.deletes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(DeleteError::MissingInput("scripted delete")))
    }
}

async fn loaded_controller(api: ScriptedApi) -> (Arc<ParticipantController>, Arc<ScriptedApi>) {
    let api = Arc::new(api);
    let controller =
        ParticipantController::new(api.clone(), RoomId::from("r1"), "u1").expect("controller");
    controller.reload().await.expect("reload");
    (controller, api)
}

fn ids(snapshot: &ControllerSnapshot) -> Vec<&str> {
    snapshot.participants.iter().map(|p| p.id.as_str()).collect()
}

#[tokio::test]
async fn loaded_admins_are_not_removable_but_members_are() {
    let (controller, _api) =
        loaded_controller(ScriptedApi::with_loads(vec![Ok(scenario_list())])).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(ids(&snapshot), vec!["u1", "u2"]);
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(!snapshot.can_remove(&"u1".into()));
    assert!(snapshot.can_remove(&"u2".into()));
    assert!(!snapshot.can_remove(&"ghost".into()));
    assert_eq!(
        snapshot
            .by_id()
            .get(&ParticipantId::from("u2"))
            .map(|p| p.name.as_str()),
        Some("Bob")
    );
}

#[tokio::test]
async fn confirmed_delete_keeps_member_removed_and_toasts_success() {
    let api = ScriptedApi::with_loads(vec![Ok(scenario_list())]).then_delete(Ok(removal("u2")));
    let (controller, api) = loaded_controller(api).await;

    controller.request_delete(&"u2".into()).await.expect("request");
    let toast = controller.confirm_delete().await.expect("confirm");

    assert_eq!(toast, Toast::success(REMOVED_MESSAGE));
    let snapshot = controller.snapshot().await;
    assert_eq!(ids(&snapshot), vec!["u1"]);
    assert_eq!(snapshot.toast.map(|t| t.kind), Some(ToastKind::Success));
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(
        api.delete_calls.lock().await.as_slice(),
        &[(ParticipantId::from("u2"), "u1".to_string())]
    );
}

#[tokio::test]
async fn failed_delete_restores_member_at_original_position() {
    let list = vec![
        participant("u1", "u1", Role::Admin),
        participant("u2", "Bob", Role::Member),
        participant("u3", "Eve", Role::Member),
    ];
    let api = ScriptedApi::with_loads(vec![Ok(list.clone())]).then_delete(Err(
        DeleteError::Rejected {
            kind: "NOT_ADMIN".into(),
            status: 403,
        },
    ));
    let (controller, _api) = loaded_controller(api).await;

    controller.request_delete(&"u2".into()).await.expect("request");
    let toast = controller.confirm_delete().await.expect("confirm");

    assert_eq!(toast.kind, ToastKind::Error);
    assert_eq!(toast.message, "Тільки адміністратор може видаляти учасників.");
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.participants, list);
    assert_eq!(snapshot.phase, Phase::Idle);
}

#[tokio::test]
async fn unexplained_failure_echoes_http_kind() {
    let api = ScriptedApi::with_loads(vec![Ok(scenario_list())]).then_delete(Err(
        DeleteError::Rejected {
            kind: "HTTP_500".into(),
            status: 500,
        },
    ));
    let (controller, _api) = loaded_controller(api).await;

    controller.request_delete(&"u2".into()).await.expect("request");
    let toast = controller.confirm_delete().await.expect("confirm");
    assert_eq!(toast, Toast::error("HTTP_500"));
}

#[tokio::test]
async fn cancel_never_touches_the_list() {
    let (controller, _api) =
        loaded_controller(ScriptedApi::with_loads(vec![Ok(scenario_list())])).await;
    let before = controller.snapshot().await.participants;

    controller.cancel_delete().await;
    controller.request_delete(&"u2".into()).await.expect("request");
    assert_eq!(
        controller.snapshot().await.confirm_id(),
        Some(&ParticipantId::from("u2"))
    );
    controller.cancel_delete().await;
    controller.cancel_delete().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.participants, before);
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(
        controller.confirm_delete().await,
        Err(ControllerError::NothingToConfirm)
    );
}

#[tokio::test]
async fn admins_and_unknown_ids_cannot_be_requested() {
    let (controller, _api) =
        loaded_controller(ScriptedApi::with_loads(vec![Ok(scenario_list())])).await;

    assert_eq!(
        controller.request_delete(&"u1".into()).await,
        Err(ControllerError::AdminProtected("u1".into()))
    );
    assert_eq!(
        controller.request_delete(&"ghost".into()).await,
        Err(ControllerError::UnknownParticipant("ghost".into()))
    );
    assert_eq!(controller.snapshot().await.phase, Phase::Idle);
}

#[tokio::test]
async fn confirmation_prompt_names_the_target() {
    let (controller, _api) =
        loaded_controller(ScriptedApi::with_loads(vec![Ok(scenario_list())])).await;
    assert_eq!(controller.snapshot().await.confirmation_prompt(), None);

    controller.request_delete(&"u2".into()).await.expect("request");
    assert_eq!(
        controller.snapshot().await.confirmation_prompt().as_deref(),
        Some("Підтвердьте видалення користувача Bob.")
    );
}

#[tokio::test]
async fn each_reload_replaces_the_list_wholesale() {
    let second = vec![participant("u9", "Zed", Role::Member)];
    let (controller, _api) = loaded_controller(ScriptedApi::with_loads(vec![
        Ok(scenario_list()),
        Ok(second.clone()),
    ]))
    .await;
    assert_eq!(ids(&controller.snapshot().await), vec!["u1", "u2"]);

    controller.reload().await.expect("second reload");
    assert_eq!(controller.snapshot().await.participants, second);
}

#[tokio::test]
async fn failed_reload_keeps_list_and_raises_error_toast() {
    let (controller, _api) = loaded_controller(ScriptedApi::with_loads(vec![
        Ok(scenario_list()),
        Err(LoadError::Status(502)),
    ]))
    .await;

    controller.reload().await.expect("reload");
    let snapshot = controller.snapshot().await;
    assert_eq!(ids(&snapshot), vec!["u1", "u2"]);
    assert_eq!(snapshot.toast, Some(Toast::error(LOAD_FAILED_MESSAGE)));
    assert!(!snapshot.is_loading());
    assert_eq!(snapshot.phase, Phase::Idle);
}

#[tokio::test]
async fn reload_drops_a_pending_confirmation() {
    let (controller, _api) = loaded_controller(ScriptedApi::with_loads(vec![
        Ok(scenario_list()),
        Ok(scenario_list()),
    ]))
    .await;

    controller.request_delete(&"u2".into()).await.expect("request");
    controller.reload().await.expect("reload");
    assert_eq!(controller.snapshot().await.phase, Phase::Idle);
}

#[tokio::test]
async fn in_flight_delete_is_visible_and_blocks_other_operations() {
    let gate = Arc::new(Notify::new());
    let api = ScriptedApi::with_loads(vec![Ok(vec![
        participant("u1", "u1", Role::Admin),
        participant("u2", "Bob", Role::Member),
        participant("u3", "Eve", Role::Member),
    ])])
    .then_delete(Err(DeleteError::Rejected {
        kind: "ROOM_CLOSED_OR_LOCKED".into(),
        status: 409,
    }))
    .gated(gate.clone());
    let (controller, _api) = loaded_controller(api).await;

    controller.request_delete(&"u2".into()).await.expect("request");
    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.confirm_delete().await })
    };

    let mut snapshot = controller.snapshot().await;
    for _ in 0..100 {
        if snapshot.pending_id().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        snapshot = controller.snapshot().await;
    }
    assert_eq!(snapshot.phase, Phase::Deleting("u2".into()));
    assert_eq!(ids(&snapshot), vec!["u1", "u3"]);
    assert!(!snapshot.can_remove(&"u2".into()));
    assert!(snapshot.can_remove(&"u3".into()));

    assert!(matches!(
        controller.request_delete(&"u3".into()).await,
        Err(ControllerError::Busy(Phase::Deleting(_)))
    ));
    assert!(matches!(
        controller.reload().await,
        Err(ControllerError::Busy(Phase::Deleting(_)))
    ));

    gate.notify_one();
    let toast = task.await.expect("join").expect("confirm");
    assert_eq!(toast.message, "Кімната заблокована для змін.");
    assert_eq!(ids(&controller.snapshot().await), vec!["u1", "u2", "u3"]);
}

async fn wait_for_phase(controller: &ParticipantController, phase: Phase) -> ControllerSnapshot {
    let mut snapshot = controller.snapshot().await;
    for _ in 0..200 {
        if snapshot.phase == phase {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        snapshot = controller.snapshot().await;
    }
    snapshot
}

#[tokio::test]
async fn dropped_confirm_still_settles_and_rolls_back() {
    let gate = Arc::new(Notify::new());
    let api = ScriptedApi::with_loads(vec![Ok(scenario_list())])
        .then_delete(Err(DeleteError::Rejected {
            kind: "NOT_ADMIN".into(),
            status: 403,
        }))
        .gated(gate.clone());
    let (controller, _api) = loaded_controller(api).await;

    controller.request_delete(&"u2".into()).await.expect("request");
    let timed_out =
        tokio::time::timeout(Duration::from_millis(50), controller.confirm_delete()).await;
    assert!(timed_out.is_err());
    assert_eq!(
        controller.snapshot().await.phase,
        Phase::Deleting("u2".into())
    );

    gate.notify_one();
    let snapshot = wait_for_phase(&controller, Phase::Idle).await;
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(snapshot.participants, scenario_list());
    assert_eq!(
        snapshot.toast,
        Some(Toast::error("Тільки адміністратор може видаляти учасників."))
    );

    controller.request_delete(&"u2".into()).await.expect("request again");
    controller.reload().await.expect("reload after recovery");
}

#[tokio::test]
async fn dropped_reload_still_replaces_the_list() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(
        ScriptedApi::with_loads(vec![Ok(scenario_list())]).gated_loads(gate.clone()),
    );
    let controller =
        ParticipantController::new(api, RoomId::from("r1"), "u1").expect("controller");

    let timed_out = tokio::time::timeout(Duration::from_millis(50), controller.reload()).await;
    assert!(timed_out.is_err());
    assert!(controller.snapshot().await.is_loading());

    gate.notify_one();
    let snapshot = wait_for_phase(&controller, Phase::Idle).await;
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(ids(&snapshot), vec!["u1", "u2"]);
}

#[tokio::test]
async fn events_trace_the_optimistic_update_and_rollback() {
    let api = ScriptedApi::with_loads(vec![Ok(scenario_list())]).then_delete(Err(
        DeleteError::Rejected {
            kind: "USER_NOT_FOUND".into(),
            status: 404,
        },
    ));
    let (controller, _api) = loaded_controller(api).await;
    let mut events = controller.subscribe_events();

    controller.request_delete(&"u2".into()).await.expect("request");
    controller.confirm_delete().await.expect("confirm");

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(
        received,
        vec![
            ControllerEvent::PhaseChanged(Phase::Confirming("u2".into())),
            ControllerEvent::ParticipantsReplaced(vec![participant("u1", "u1", Role::Admin)]),
            ControllerEvent::PhaseChanged(Phase::Deleting("u2".into())),
            ControllerEvent::ParticipantsReplaced(scenario_list()),
            ControllerEvent::Toast(Some(Toast::error("Користувача не знайдено."))),
            ControllerEvent::PhaseChanged(Phase::Idle),
        ]
    );
}

#[tokio::test]
async fn dismiss_clears_the_toast() {
    let api = ScriptedApi::with_loads(vec![Ok(scenario_list())]).then_delete(Ok(removal("u2")));
    let (controller, _api) = loaded_controller(api).await;
    controller.request_delete(&"u2".into()).await.expect("request");
    controller.confirm_delete().await.expect("confirm");
    assert!(controller.snapshot().await.toast.is_some());

    controller.dismiss_toast().await;
    assert_eq!(controller.snapshot().await.toast, None);
}

#[tokio::test]
async fn controller_requires_room_and_admin_code() {
    let api: Arc<dyn ParticipantsApi> = Arc::new(ScriptedApi::default());
    assert!(matches!(
        ParticipantController::new(api.clone(), RoomId::from(""), "u1"),
        Err(ControllerError::MissingRoom)
    ));
    assert!(matches!(
        ParticipantController::new(api, RoomId::from("r1"), ""),
        Err(ControllerError::MissingAdminCode)
    ));
}

async fn spawn_backend(delete_status: StatusCode, delete_body: serde_json::Value) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let app = Router::new()
        .route(
            "/api/users/participants",
            get(|| async {
                Json(serde_json::json!([
                    { "id": "u1", "role": "admin" },
                    { "id": "u2", "name": "Bob", "role": "member", "roomId": "r1" },
                ]))
            }),
        )
        .route(
            "/api/users/:user_id",
            delete(move || async move { (delete_status, Json(delete_body)) }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api/")
}

#[tokio::test]
async fn http_rejection_rolls_back_through_the_real_repository() {
    let base = spawn_backend(
        StatusCode::FORBIDDEN,
        serde_json::json!({ "detail": "NOT_ADMIN" }),
    )
    .await;
    let controller = ParticipantController::new(
        Arc::new(HttpParticipantRepository::new(base)),
        RoomId::from("r1"),
        "u2",
    )
    .expect("controller");

    controller.reload().await.expect("reload");
    let loaded = controller.snapshot().await.participants;
    assert_eq!(loaded[0].room_id.as_str(), "r1");
    assert_eq!(loaded[0].name, "u1");

    controller.request_delete(&"u2".into()).await.expect("request");
    let toast = controller.confirm_delete().await.expect("confirm");
    assert_eq!(toast.message, "Тільки адміністратор може видаляти учасників.");
    assert_eq!(controller.snapshot().await.participants, loaded);
}

#[tokio::test]
async fn http_server_error_without_detail_toasts_http_kind() {
    let base = spawn_backend(
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({ "error": "boom" }),
    )
    .await;
    let controller = ParticipantController::new(
        Arc::new(HttpParticipantRepository::new(base)),
        RoomId::from("r1"),
        "u1",
    )
    .expect("controller");

    controller.reload().await.expect("reload");
    controller.request_delete(&"u2".into()).await.expect("request");
    let toast = controller.confirm_delete().await.expect("confirm");
    assert_eq!(toast, Toast::error("HTTP_500"));
    assert_eq!(ids(&controller.snapshot().await), vec!["u1", "u2"]);
}
