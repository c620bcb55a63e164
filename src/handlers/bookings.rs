// src/handlers/bookings.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::{AdminUser, AuthenticatedUser},
    models::{
        booking::{Booking, BookingListFilter, QuotePayload, QuoteResponse, ReservePayload},
        payment::RefundResponse,
    },
};

#[utoipa::path(
    post,
    path = "/api/bookings/quote",
    tag = "Bookings",
    request_body = QuotePayload,
    responses(
        (status = 200, description = "Cotação da estadia", body = QuoteResponse),
        (status = 400, description = "Datas ou hóspedes inválidos"),
        (status = 404, description = "Quarto não encontrado"),
        (status = 409, description = "Quarto em manutenção")
    )
)]
pub async fn quote(
    State(app_state): State<AppState>,
    Json(payload): Json<QuotePayload>,
) -> Result<Json<QuoteResponse>, AppError> {
    Ok(Json(app_state.booking_service.quote(payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "Bookings",
    request_body = ReservePayload,
    responses(
        (status = 201, description = "Reserva criada (pendente de pagamento)", body = Booking),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Quarto indisponível nas datas"),
        (status = 503, description = "Não foi possível verificar a disponibilidade")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_booking(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ReservePayload>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = app_state.booking_service.reserve(user.actor(), payload).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    get,
    path = "/api/bookings/me",
    tag = "Bookings",
    responses(
        (status = 200, description = "Minhas reservas, mais recentes primeiro", body = Vec<Booking>)
    ),
    security(("api_jwt" = []))
)]
pub async fn my_bookings(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(app_state.booking_service.list_for_user(user.actor()).await?))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Reserva", body = Booking),
        (status = 403, description = "Reserva de outro usuário"),
        (status = 404, description = "Reserva não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_booking(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(app_state.booking_service.get(user.actor(), id).await?))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Reserva cancelada (com estorno se estava paga)", body = RefundResponse),
        (status = 409, description = "Reserva já cancelada ou falhou"),
        (status = 500, description = "Estorno falhou; a reserva continua confirmada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_booking(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RefundResponse>, AppError> {
    let result = app_state.booking_service.cancel(user.actor(), id).await?;
    Ok(Json(RefundResponse { refund: result.refund, booking: result.booking }))
}

#[utoipa::path(
    get,
    path = "/api/admin/bookings",
    tag = "Admin",
    params(BookingListFilter),
    responses(
        (status = 200, description = "Todas as reservas, mais recentes primeiro", body = Vec<Booking>),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_all_bookings(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<BookingListFilter>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(app_state.booking_service.list_all(&filter).await?))
}
