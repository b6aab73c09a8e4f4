// HTTP boundary: submit, cancel, event stream.
//
// The browser UI is a pure consumer of this surface; jobs run to a terminal
// state whether or not anyone is listening, and a subscriber that attaches
// late gets the full event history replayed before the live feed.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{delete, get, post};
use dirgraph_core::JobEvent;
use dirgraph_core::job::JobManager;
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;
use tracing::debug;

pub struct AppState {
    pub manager: JobManager,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/scans", post(submit_scan))
        .route("/api/scans/{id}", delete(cancel_scan))
        .route("/api/scans/{id}/events", get(scan_events))
        .route("/healthz", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct SubmitBody {
    url: String,
}

async fn submit_scan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.manager.submit(&body.url) {
        Ok(job_id) => Ok(Json(json!({ "job_id": job_id }))),
        Err(err) => {
            debug!("rejected submission '{}': {}", body.url, err);
            Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            ))
        }
    }
}

async fn cancel_scan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    if state.manager.cancel(&id) {
        Ok(Json(json!({ "status": "canceled" })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn scan_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let Some((history, rx)) = state.manager.subscribe(&id) else {
        return Err(StatusCode::NOT_FOUND);
    };

    let replay = tokio_stream::iter(history.into_iter().map(to_sse));
    let live = BroadcastStream::new(rx).filter_map(|received| received.ok().map(to_sse));

    Ok(Sse::new(replay.chain(live)).keep_alive(KeepAlive::default()))
}

fn to_sse(event: JobEvent) -> Result<Event, Infallible> {
    Ok(Event::default().data(serde_json::to_string(&event).unwrap_or_default()))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
