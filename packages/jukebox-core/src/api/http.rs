//! HTTP route handlers.
//!
//! All handlers are thin: they look up the room's session and delegate.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::response::{api_error, api_ok, api_success};
use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::constants::SERVICE_ID;
use crate::display::{format_duration, render_now_playing, render_queue, QueueView};
use crate::error::{JukeboxError, JukeboxResult};
use crate::node::NodeEvent;
use crate::queue::LoopMode;
use crate::services::PlaybackSession;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/{room_id}", delete(destroy_room))
        .route("/api/rooms/{room_id}/play", post(play))
        .route("/api/rooms/{room_id}/stop", post(stop))
        .route("/api/rooms/{room_id}/resume", post(resume))
        .route("/api/rooms/{room_id}/skip", post(skip))
        .route("/api/rooms/{room_id}/shuffle", post(shuffle))
        .route("/api/rooms/{room_id}/clear", post(clear))
        .route("/api/rooms/{room_id}/dedup", post(remove_duplicates))
        .route("/api/rooms/{room_id}/loop", post(toggle_loop))
        .route("/api/rooms/{room_id}/volume", post(set_volume))
        .route("/api/rooms/{room_id}/queue", get(queue))
        .route("/api/rooms/{room_id}/now-playing", get(now_playing))
        .route("/api/rooms/{room_id}/voice-empty", post(voice_channel_empty))
        .route("/api/node/events", post(node_event))
        .fallback(not_found)
        .with_state(state)
}

fn session(state: &AppState, room_id: &str) -> JukeboxResult<Arc<PlaybackSession>> {
    state
        .registry
        .get(room_id)
        .ok_or_else(|| JukeboxError::NoSession(room_id.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Bodies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayRequest {
    requester: String,
    /// Voice channel the requester is connected to, if any.
    #[serde(default)]
    voice_channel_id: Option<String>,
    text_channel_id: String,
    /// Link or search text. Without one, `play` resumes the existing queue.
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoopRequest {
    mode: LoopMode,
}

#[derive(Debug, Deserialize)]
struct VolumeRequest {
    volume: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoiceEmptyRequest {
    voice_channel_id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Health & Rooms
// ─────────────────────────────────────────────────────────────────────────────

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "rooms": state.registry.len(),
    }))
}

async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({ "rooms": state.registry.list() }))
}

async fn destroy_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> JukeboxResult<impl IntoResponse> {
    let destroyed = state.registry.destroy(&room_id).await?;
    Ok(api_success(json!({ "destroyed": destroyed })))
}

async fn voice_channel_empty(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<VoiceEmptyRequest>,
) -> JukeboxResult<impl IntoResponse> {
    let destroyed = state
        .registry
        .handle_voice_channel_empty(&room_id, &body.voice_channel_id)
        .await?;
    Ok(api_success(json!({ "destroyed": destroyed })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback Commands
// ─────────────────────────────────────────────────────────────────────────────

async fn play(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<PlayRequest>,
) -> JukeboxResult<impl IntoResponse> {
    let voice_channel_id = body
        .voice_channel_id
        .filter(|id| !id.is_empty())
        .ok_or(JukeboxError::NotInVoiceChannel)?;

    let session = state
        .registry
        .get_or_create(&room_id, &voice_channel_id, &body.text_channel_id)
        .await?;

    let enqueued = match body.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => Some(session.enqueue(&body.requester, query).await?),
        _ => None,
    };
    let playback = session.play().await?;

    log::info!(
        "[API] Play in room {} by {}: {:?}",
        room_id,
        body.requester,
        playback
    );

    Ok(api_success(json!({
        "enqueued": enqueued,
        "playback": playback,
        "session": session.summary(),
    })))
}

async fn stop(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> JukeboxResult<impl IntoResponse> {
    session(&state, &room_id)?.stop().await?;
    Ok(api_ok())
}

async fn resume(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> JukeboxResult<impl IntoResponse> {
    session(&state, &room_id)?.resume().await?;
    Ok(api_ok())
}

async fn skip(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> JukeboxResult<impl IntoResponse> {
    let skipped = session(&state, &room_id)?.skip()?;
    log::info!("[API] Skipped {} in room {}", skipped.title, room_id);
    Ok(api_success(json!({ "skipped": skipped })))
}

async fn set_volume(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<VolumeRequest>,
) -> JukeboxResult<impl IntoResponse> {
    let volume = session(&state, &room_id)?.set_volume(body.volume).await?;
    Ok(api_success(json!({ "volume": volume })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Queue Commands
// ─────────────────────────────────────────────────────────────────────────────

async fn shuffle(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> JukeboxResult<impl IntoResponse> {
    let shuffled = session(&state, &room_id)?.shuffle();
    Ok(api_success(json!({ "shuffled": shuffled })))
}

async fn clear(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> JukeboxResult<impl IntoResponse> {
    let removed = session(&state, &room_id)?.clear();
    Ok(api_success(json!({ "removed": removed })))
}

async fn remove_duplicates(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> JukeboxResult<impl IntoResponse> {
    let removed = session(&state, &room_id)?.remove_duplicates();
    Ok(api_success(json!({ "removed": removed })))
}

async fn toggle_loop(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<LoopRequest>,
) -> JukeboxResult<impl IntoResponse> {
    let mode = session(&state, &room_id)?.toggle_loop(body.mode);
    Ok(api_success(json!({ "loopMode": mode, "label": mode.label() })))
}

async fn queue(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> JukeboxResult<impl IntoResponse> {
    let session = session(&state, &room_id)?;
    let view = QueueView::new(&session.queue_snapshot(), session.loop_mode());
    let text = render_queue(&view);
    let total = format_duration(view.total);
    Ok(api_success(json!({
        "queue": view,
        "text": text,
        "totalLength": total,
    })))
}

async fn now_playing(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> JukeboxResult<impl IntoResponse> {
    let now = session(&state, &room_id)?.now_playing().await?;
    let text = render_now_playing(&now.item, now.position);
    let thumbnail = now.item.thumbnail();
    Ok(api_success(json!({
        "nowPlaying": now,
        "thumbnail": thumbnail,
        "text": text,
    })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Events
// ─────────────────────────────────────────────────────────────────────────────

/// Accepts an event pushed by an audio node that reports over HTTP.
async fn node_event(
    State(state): State<AppState>,
    Json(event): Json<NodeEvent>,
) -> impl IntoResponse {
    let delivered = state.node_events.handle_event(&event);
    api_success(json!({ "delivered": delivered }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    api_error(StatusCode::NOT_FOUND, "not_found", format!("No route for {uri}"))
}
