// src/handlers/rooms.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AdminUser,
    models::{
        booking::{BookedDatesQuery, BookedRange},
        room::{CreateRoomPayload, Room, RoomFilter, UpdateRoomPayload},
    },
};

#[utoipa::path(
    get,
    path = "/api/rooms",
    tag = "Rooms",
    params(RoomFilter),
    responses(
        (status = 200, description = "Quartos do hotel", body = Vec<Room>)
    )
)]
pub async fn list_rooms(
    State(app_state): State<AppState>,
    Query(filter): Query<RoomFilter>,
) -> Result<Json<Vec<Room>>, AppError> {
    let rooms = app_state.room_service.list_rooms(&filter).await?;
    Ok(Json(rooms))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{id}",
    tag = "Rooms",
    params(("id" = Uuid, Path, description = "ID do quarto")),
    responses(
        (status = 200, description = "Detalhes do quarto", body = Room),
        (status = 404, description = "Quarto não encontrado")
    )
)]
pub async fn get_room(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(app_state.room_service.get_room(id).await?))
}

// Datas ocupadas para o calendário da página do quarto
#[utoipa::path(
    get,
    path = "/api/rooms/{id}/booked-dates",
    tag = "Rooms",
    params(("id" = Uuid, Path, description = "ID do quarto"), BookedDatesQuery),
    responses(
        (status = 200, description = "Períodos [checkIn, checkOut) ocupados", body = Vec<BookedRange>),
        (status = 400, description = "Janela de datas inválida"),
        (status = 404, description = "Quarto não encontrado")
    )
)]
pub async fn booked_dates(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<BookedDatesQuery>,
) -> Result<Json<Vec<BookedRange>>, AppError> {
    let today = chrono::Utc::now().date_naive();
    let ranges = app_state.booking_service.booked_dates(id, query, today).await?;
    Ok(Json(ranges))
}

#[utoipa::path(
    post,
    path = "/api/admin/rooms",
    tag = "Admin",
    request_body = CreateRoomPayload,
    responses(
        (status = 201, description = "Quarto criado", body = Room),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_room(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    let room = app_state.room_service.create_room(payload).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[utoipa::path(
    put,
    path = "/api/admin/rooms/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do quarto")),
    request_body = UpdateRoomPayload,
    responses(
        (status = 200, description = "Quarto atualizado", body = Room),
        (status = 404, description = "Quarto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_room(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoomPayload>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(app_state.room_service.update_room(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/rooms/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do quarto")),
    responses(
        (status = 204, description = "Quarto removido"),
        (status = 400, description = "Quarto com reservas"),
        (status = 404, description = "Quarto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_room(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.room_service.delete_room(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
