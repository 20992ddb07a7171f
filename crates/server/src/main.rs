use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use server_api::{list_participants, remove_user, ApiContext};
use shared::{
    domain::ParticipantId,
    error::{ApiError, ErrorBody},
    protocol::{ParticipantsQuery, RawParticipant, RemovalResponse, RemoveUserQuery},
};
use storage::Storage;
use tracing::{error, info, warn};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

type HttpError = (StatusCode, Json<ErrorBody>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    if settings.seed_demo_data {
        storage.seed_defaults_if_empty().await?;
    }

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// User routes answer both at the root and under `/api`, so a client using
/// the default relative base reaches them without a proxy.
fn build_router(state: Arc<AppState>) -> Router {
    let users = Router::new()
        .route("/users/participants", get(http_list_participants))
        .route("/users/:user_id", delete(http_remove_user));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(users.clone())
        .nest("/api", users)
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state
        .api
        .storage
        .health_check()
        .await
        .map_err(|e| error_response(ApiError::Internal(e.to_string())))?;
    Ok("ok")
}

async fn http_list_participants(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ParticipantsQuery>, QueryRejection>,
) -> Result<Json<Vec<RawParticipant>>, HttpError> {
    let Query(query) = query.map_err(rejected_query)?;
    let participants = list_participants(&state.api, &query.room_id)
        .await
        .map_err(error_response)?;
    Ok(Json(participants))
}

async fn http_remove_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    query: Result<Query<RemoveUserQuery>, QueryRejection>,
) -> Result<Json<RemovalResponse>, HttpError> {
    let Query(query) = query.map_err(rejected_query)?;
    let response = remove_user(&state.api, &ParticipantId::from(user_id), &query.user_code)
        .await
        .map_err(error_response)?;
    Ok(Json(response))
}

fn rejected_query(rejection: QueryRejection) -> HttpError {
    error_response(ApiError::Validation(rejection.body_text()))
}

fn error_response(err: ApiError) -> HttpError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match &err {
        ApiError::Internal(message) => error!(%message, "request failed"),
        other => warn!(status = status.as_u16(), error = %other, "request rejected"),
    }
    (status, Json(err.body()))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
