// src/services/pricing.rs

use std::collections::HashMap;

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    common::error::AppError,
    models::pricing::{PriceQuote, PromoOutcome},
};

const INVALID_PROMO_MESSAGE: &str = "The promo code you entered is invalid or expired.";

/// Estadia máxima aceita numa reserva.
pub const MAX_NIGHTS: i64 = 365;

/// Tabela de cupons: código (maiúsculo) -> percentual de desconto.
#[derive(Debug, Clone)]
pub struct PromoTable(HashMap<String, Decimal>);

impl Default for PromoTable {
    fn default() -> Self {
        let mut codes = HashMap::new();
        codes.insert("WELCOME10".to_string(), Decimal::from(10));
        codes.insert("SUMMER20".to_string(), Decimal::from(20));
        Self(codes)
    }
}

impl PromoTable {
    /// Lê o formato `CODE:PCT,CODE:PCT` (ex: `WELCOME10:10,SUMMER20:20`).
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut codes = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (code, pct) = entry
                .split_once(':')
                .with_context(|| format!("promo entry '{entry}' must be CODE:PERCENT"))?;
            let pct: Decimal = pct
                .trim()
                .parse()
                .with_context(|| format!("promo '{code}' has an invalid percentage"))?;
            anyhow::ensure!(
                pct > Decimal::ZERO && pct <= Decimal::ONE_HUNDRED,
                "promo '{code}' percentage must be in (0, 100]"
            );
            codes.insert(code.trim().to_uppercase(), pct);
        }
        Ok(Self(codes))
    }

    // Busca sem diferenciar maiúsculas/minúsculas
    pub fn lookup(&self, code: &str) -> Option<Decimal> {
        self.0.get(&code.trim().to_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone)]
pub struct PricingCalculator {
    tax_rate: Decimal,
    promos: PromoTable,
}

impl PricingCalculator {
    pub fn new(tax_rate: Decimal, promos: PromoTable) -> Self {
        Self { tax_rate, promos }
    }

    /// Calcula diárias, imposto, desconto e total.
    ///
    /// O arredondamento para 2 casas só acontece nos valores finais; os
    /// intermediários seguem com precisão total para não acumular erro.
    pub fn quote(
        &self,
        nightly_rate: Decimal,
        check_in: NaiveDate,
        check_out: NaiveDate,
        promo_code: Option<&str>,
    ) -> Result<PriceQuote, AppError> {
        if check_out <= check_in {
            return Err(AppError::InvalidDateRange);
        }
        if nightly_rate <= Decimal::ZERO {
            return Err(AppError::InvalidRate);
        }

        let nights = (check_out - check_in).num_days();
        if nights > MAX_NIGHTS {
            return Err(AppError::InvalidInput(format!(
                "Stays are limited to {MAX_NIGHTS} nights."
            )));
        }
        let subtotal = nightly_rate * Decimal::from(nights);
        let tax = subtotal * self.tax_rate;
        let total_before_discount = subtotal + tax;

        let promo = self.resolve_promo(promo_code);
        let discount = match &promo {
            PromoOutcome::Applied { percent, .. } => {
                total_before_discount * *percent / Decimal::ONE_HUNDRED
            }
            _ => Decimal::ZERO,
        };

        let grand_total = (total_before_discount - discount).max(Decimal::ZERO);

        Ok(PriceQuote {
            nights,
            nightly_rate,
            subtotal: round_money(subtotal),
            tax_rate: self.tax_rate,
            tax: round_money(tax),
            total_before_discount: round_money(total_before_discount),
            discount: round_money(discount),
            grand_total: round_money(grand_total),
            promo,
        })
    }

    fn resolve_promo(&self, promo_code: Option<&str>) -> PromoOutcome {
        let Some(code) = promo_code.map(str::trim).filter(|c| !c.is_empty()) else {
            return PromoOutcome::NotProvided;
        };

        match self.promos.lookup(code) {
            Some(percent) => PromoOutcome::Applied {
                code: code.to_uppercase(),
                percent,
            },
            None => {
                tracing::debug!("Promo code rejected: {}", code);
                PromoOutcome::Rejected {
                    code: code.to_string(),
                    message: INVALID_PROMO_MESSAGE.to_string(),
                }
            }
        }
    }
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converte um valor monetário para a menor unidade da moeda (centavos).
pub fn to_minor_units(amount: Decimal) -> Result<i64, AppError> {
    (round_money(amount) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| AppError::InvalidInput(format!("Amount {amount} is out of range")))
}
