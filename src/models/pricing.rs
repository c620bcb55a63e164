// src/models/pricing.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Resultado da aplicação de um cupom. Cupom inválido não é erro:
/// o checkout continua, só sem desconto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PromoOutcome {
    NotProvided,
    #[serde(rename_all = "camelCase")]
    Applied { code: String, percent: Decimal },
    #[serde(rename_all = "camelCase")]
    Rejected { code: String, message: String },
}

impl PromoOutcome {
    pub fn applied_code(&self) -> Option<&str> {
        match self {
            PromoOutcome::Applied { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Cotação derivada; não é persistida sozinha, só congelada na reserva.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    #[schema(example = 3)]
    pub nights: i64,
    #[schema(example = "125.00")]
    pub nightly_rate: Decimal,
    #[schema(example = "375.00")]
    pub subtotal: Decimal,
    #[schema(example = "0.12")]
    pub tax_rate: Decimal,
    #[schema(example = "45.00")]
    pub tax: Decimal,
    #[schema(example = "420.00")]
    pub total_before_discount: Decimal,
    #[schema(example = "42.00")]
    pub discount: Decimal,
    #[schema(example = "378.00")]
    pub grand_total: Decimal,
    pub promo: PromoOutcome,
}
