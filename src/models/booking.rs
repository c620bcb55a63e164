// src/models/booking.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::pricing::PriceQuote;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,   // Aguardando pagamento
    Confirmed, // Pago
    Cancelled, // Cancelado (terminal)
    Failed,    // Pagamento recusado ou abandonado (terminal)
}

impl BookingStatus {
    /// Transições permitidas. `Cancelled` e `Failed` não têm saída.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Pending, BookingStatus::Failed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    /// Reservas que ainda ocupam o quarto no calendário.
    pub fn holds_room(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub room_id: Uuid,
    #[schema(ignore)]
    pub user_id: Uuid,

    #[schema(example = "John Smith")]
    pub guest_name: String,
    #[schema(example = "john.smith@example.com")]
    pub guest_email: String,

    // Intervalo semiaberto [check_in, check_out)
    #[schema(value_type = String, format = Date, example = "2024-01-10")]
    pub check_in: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-01-15")]
    pub check_out: NaiveDate,

    #[schema(example = 2)]
    pub guests: i32,

    // Cotação congelada no momento da reserva
    pub nights: i32,
    #[schema(example = "375.00")]
    pub subtotal: Decimal,
    #[schema(example = "45.00")]
    pub tax: Decimal,
    #[schema(example = "42.00")]
    pub discount: Decimal,
    pub promo_code: Option<String>,
    #[schema(example = "378.00")]
    pub total_price: Decimal,
    #[schema(example = "cad")]
    pub currency: String,

    pub special_requests: Option<String>,

    pub status: BookingStatus,
    pub payment_status: PaymentStatus,

    // Referências do gateway
    pub payment_intent_id: Option<String>,
    pub refund_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        crate::services::availability::ranges_overlap(self.check_in, self.check_out, check_in, check_out)
    }
}

/// Dados para inserir uma reserva nova (sempre `pending`).
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub quote: PriceQuote,
    pub currency: String,
    pub special_requests: Option<String>,
}

/// Mudança de estado aplicada com compare-and-set sobre `expected`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub expected: BookingStatus,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub refund_id: Option<String>,
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    pub room_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2024-01-10")]
    pub check_in: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-01-13")]
    pub check_out: NaiveDate,
    #[validate(range(min = 1, message = "At least one guest is required."))]
    #[schema(example = 1)]
    pub guests: i32,
    #[schema(example = "WELCOME10")]
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservePayload {
    pub room_id: Uuid,

    #[validate(length(min = 1, message = "Please fill in all required fields"))]
    #[schema(example = "John Smith")]
    pub guest_name: String,

    #[validate(email(message = "The e-mail provided is invalid."))]
    #[schema(example = "john.smith@example.com")]
    pub guest_email: String,

    #[schema(value_type = String, format = Date, example = "2024-01-10")]
    pub check_in: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-01-13")]
    pub check_out: NaiveDate,

    #[validate(range(min = 1, message = "At least one guest is required."))]
    pub guests: i32,

    pub promo_code: Option<String>,

    #[validate(length(max = 1000, message = "Special requests are limited to 1000 characters."))]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub room_id: Uuid,
    pub room_name: String,
    pub guests: i32,
    #[serde(flatten)]
    pub quote: PriceQuote,
}

/// Período ocupado `[check_in, check_out)`, para bloquear o calendário.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookedRange {
    #[schema(value_type = String, format = Date, example = "2024-01-10")]
    pub check_in: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-01-13")]
    pub check_out: NaiveDate,
}

// Janela consultada; padrão: de hoje até um ano à frente
#[derive(Debug, Default, Clone, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookedDatesQuery {
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Clone, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookingListFilter {
    pub status: Option<BookingStatus>,
    pub room_id: Option<Uuid>,
}

impl BookingListFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.is_none_or(|s| booking.status == s)
            && self.room_id.is_none_or(|r| booking.room_id == r)
    }
}
