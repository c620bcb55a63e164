// src/models/payment.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::booking::Booking;

// --- Objetos do gateway ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentIntent {
    #[schema(example = "pi_3Nxyz")]
    pub id: String,
    pub client_secret: Option<String>,
    pub status: IntentStatus,
    // Em centavos
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Refund {
    #[schema(example = "re_3Nxyz")]
    pub id: String,
    // Em centavos
    pub amount: i64,
    pub status: Option<String>,
    pub payment_intent: Option<String>,
}

/// Pedido de criação de intent. `idempotency_key` garante que um retry
/// da mesma operação não gere uma segunda cobrança.
#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub idempotency_key: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CreateRefundRequest {
    pub payment_intent_id: String,
    pub reason: String,
    pub idempotency_key: String,
}

// --- Payloads da API ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentPayload {
    pub booking_id: Uuid,

    // Opcional; se vier, precisa bater com o total calculado no servidor
    #[schema(example = "378.00")]
    pub amount: Option<Decimal>,

    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code."))]
    #[schema(example = "cad")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    #[schema(example = "378.00")]
    pub amount: Decimal,
    #[schema(example = "cad")]
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentPayload {
    #[validate(length(min = 1, message = "required"))]
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundPayload {
    #[validate(length(min = 1, message = "required"))]
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub refund: Option<Refund>,
    pub booking: Booking,
}

/// Resultado do cancelamento: a reserva já cancelada e o estorno, se houve.
#[derive(Debug, Clone)]
pub struct Cancellation {
    pub booking: Booking,
    pub refund: Option<Refund>,
}
