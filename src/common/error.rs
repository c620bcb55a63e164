// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{booking::BookingStatus, payment::IntentStatus};
use crate::services::payment_gateway::GatewayError;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- Entrada inválida (corrigível no formulário) ---
    #[error("Check-out must be after check-in")]
    InvalidDateRange,

    #[error("Nightly rate must be greater than zero")]
    InvalidRate,

    #[error("Guest count {guests} is outside 1..={capacity}")]
    InvalidGuestCount { guests: i32, capacity: i32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Recursos ---
    #[error("Room {0} not found")]
    RoomNotFound(Uuid),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("User not found")]
    UserNotFound,

    // --- Disponibilidade ---
    #[error("Room {0} is under maintenance")]
    RoomNotBookable(Uuid),

    #[error("Room is not available for the selected dates")]
    RoomUnavailable,

    // Nunca tratar como "disponível": a falha sobe até o usuário
    #[error("Availability check failed: {0}")]
    AvailabilityCheckFailed(String),

    // --- Ciclo de vida ---
    #[error("Booking cannot move from {} to {}", from.as_str(), to.as_str())]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Payment not completed yet (status {0:?})")]
    PaymentIncomplete(IntentStatus),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // Pagamento chegou depois da reserva encerrada e foi devolvido
    #[error("Booking {booking_id} is {} and its payment was refunded", status.as_str())]
    PaymentRefunded { booking_id: Uuid, status: BookingStatus },

    // A reserva não muda; o operador precisa tentar de novo
    #[error("Refund failed for booking {booking_id}: {source}")]
    RefundFailed {
        booking_id: Uuid,
        #[source]
        source: GatewayError,
    },

    // --- Autenticação ---
    #[error("E-mail already exists")]
    EmailAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden")]
    Forbidden,

    // Variante para erros de banco de dados
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidDateRange
            | AppError::InvalidRate
            | AppError::InvalidGuestCount { .. }
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,

            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,

            AppError::RoomNotFound(_) | AppError::BookingNotFound(_) | AppError::UserNotFound => {
                StatusCode::NOT_FOUND
            }

            AppError::RoomNotBookable(_)
            | AppError::RoomUnavailable
            | AppError::InvalidTransition { .. }
            | AppError::PaymentIncomplete(_)
            | AppError::PaymentRefunded { .. }
            | AppError::EmailAlreadyExists => StatusCode::CONFLICT,

            AppError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::AvailabilityCheckFailed(_) => StatusCode::SERVICE_UNAVAILABLE,

            // O relay de pagamento sempre respondeu 500 para falhas do gateway
            AppError::Gateway(_)
            | AppError::RefundFailed { .. }
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_message = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::InvalidDateRange => "Check-out must be after check-in.".to_string(),
            AppError::InvalidRate => "Nightly rate must be greater than zero.".to_string(),
            AppError::InvalidGuestCount { capacity, .. } => {
                format!("This room accommodates between 1 and {capacity} guests.")
            }
            AppError::InvalidInput(msg) => msg,
            AppError::RoomNotFound(_) => "Room not found.".to_string(),
            AppError::BookingNotFound(_) => "Booking not found.".to_string(),
            AppError::UserNotFound => "User not found.".to_string(),
            AppError::RoomNotBookable(_) => "This room is currently closed for maintenance.".to_string(),
            AppError::RoomUnavailable => "This room is not available for the selected dates.".to_string(),
            AppError::AvailabilityCheckFailed(ref reason) => {
                tracing::error!("Availability check failed: {}", reason);
                "Could not verify availability right now. Please try again.".to_string()
            }
            AppError::InvalidTransition { from, .. } => {
                format!("This booking is already {} and cannot be changed.", from.as_str())
            }
            AppError::PaymentDeclined(msg) => msg,
            AppError::PaymentIncomplete(_) => {
                "Payment has not been completed yet. Please finish the payment step.".to_string()
            }
            AppError::PaymentRefunded { status, .. } => format!(
                "This booking is already {} and can no longer be confirmed. Your payment has been refunded.",
                status.as_str()
            ),
            AppError::Gateway(ref e) => {
                tracing::error!("Payment gateway error: {}", e);
                e.user_message()
                    .unwrap_or_else(|| "Failed to process payment. Please try again.".to_string())
            }
            AppError::RefundFailed { booking_id, ref source } => {
                tracing::error!("Refund failed for booking {}: {}", booking_id, source);
                "Failed to process refund. The booking was not changed.".to_string()
            }
            AppError::EmailAlreadyExists => "This e-mail is already in use.".to_string(),
            AppError::InvalidCredentials => "Invalid e-mail or password.".to_string(),
            AppError::InvalidToken => "Invalid or missing authentication token.".to_string(),
            AppError::Forbidden => "You are not allowed to perform this action.".to_string(),

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Internal server error: {}", e);
                "An unexpected error occurred.".to_string()
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
