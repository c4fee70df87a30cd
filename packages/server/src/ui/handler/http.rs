//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use kairo_shared::time::timestamp_to_jst_rfc3339;

use crate::{
    domain::RoomId,
    infrastructure::dto::http::{HealthDto, ParticipantDetailDto, RoomDetailDto, RoomSummaryDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
        connections: state.repository.count_connections().await,
        rooms: state.repository.rooms().await.len(),
    })
}

/// Get list of live rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let mut summaries = Vec::new();
    for room in state.repository.rooms().await {
        let participants = room
            .members()
            .await
            .into_iter()
            .map(|m| m.identity.user_id.into_string())
            .collect();

        summaries.push(RoomSummaryDto {
            id: room.id().as_str().to_string(),
            participants,
            created_at: timestamp_to_jst_rfc3339(room.created_at().value()),
        });
    }

    Json(summaries)
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let room_id = RoomId::try_from(room_id).map_err(|_| StatusCode::NOT_FOUND)?;
    let room = state
        .repository
        .find_room(&room_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let participants = room
        .members()
        .await
        .into_iter()
        .map(|m| ParticipantDetailDto {
            user_id: m.identity.user_id.into_string(),
            name: m.identity.name.as_str().to_string(),
            connected_at: timestamp_to_jst_rfc3339(m.connected_at.value()),
        })
        .collect();

    Ok(Json(RoomDetailDto {
        id: room.id().as_str().to_string(),
        participants,
        created_at: timestamp_to_jst_rfc3339(room.created_at().value()),
    }))
}
