// src/handlers/payments.rs
//
// Relay de pagamento: o front-end fala com estas rotas, nunca direto
// com o gateway.

use axum::{Json, extract::State};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        booking::Booking,
        payment::{
            ConfirmPaymentPayload, CreatePaymentIntentPayload, PaymentIntentResponse, RefundPayload,
            RefundResponse,
        },
    },
};

#[utoipa::path(
    post,
    path = "/api/create-payment-intent",
    tag = "Payments",
    request_body = CreatePaymentIntentPayload,
    responses(
        (status = 200, description = "Intent criado (ou reaproveitado)", body = PaymentIntentResponse),
        (status = 400, description = "Valor ou moeda não batem com a reserva"),
        (status = 409, description = "Reserva não está pendente"),
        (status = 500, description = "Falha no gateway")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_payment_intent(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreatePaymentIntentPayload>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let handle = app_state
        .booking_service
        .request_payment(user.actor(), payload)
        .await?;
    Ok(Json(handle))
}

#[utoipa::path(
    post,
    path = "/api/confirm-payment",
    tag = "Payments",
    request_body = ConfirmPaymentPayload,
    responses(
        (status = 200, description = "Reserva confirmada e paga", body = Booking),
        (status = 402, description = "Pagamento recusado"),
        (status = 409, description = "Pagamento ainda não concluído")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_payment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ConfirmPaymentPayload>,
) -> Result<Json<Booking>, AppError> {
    payload.validate()?;

    let booking = app_state
        .booking_service
        .confirm_payment(user.actor(), &payload.payment_intent_id)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    post,
    path = "/api/refund",
    tag = "Payments",
    request_body = RefundPayload,
    responses(
        (status = 200, description = "Reserva cancelada e estornada", body = RefundResponse),
        (status = 500, description = "Estorno falhou")
    ),
    security(("api_jwt" = []))
)]
pub async fn refund(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RefundPayload>,
) -> Result<Json<RefundResponse>, AppError> {
    payload.validate()?;

    let result = app_state
        .booking_service
        .refund_by_intent(user.actor(), &payload.payment_intent_id)
        .await?;
    Ok(Json(RefundResponse { refund: result.refund, booking: result.booking }))
}
