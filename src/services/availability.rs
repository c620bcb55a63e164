// src/services/availability.rs

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::db::store::BookingStore;

/// Sobreposição de intervalos semiabertos `[in, out)`.
/// Check-out num dia e check-in no mesmo dia não conflitam.
pub fn ranges_overlap(a_in: NaiveDate, a_out: NaiveDate, b_in: NaiveDate, b_out: NaiveDate) -> bool {
    a_in < b_out && a_out > b_in
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityOutcome {
    Available,
    Unavailable { conflicting: Vec<Uuid> },
    // Falha de leitura nunca vira "disponível"
    CheckFailed(String),
}

#[derive(Clone)]
pub struct AvailabilityChecker {
    bookings: Arc<dyn BookingStore>,
}

impl AvailabilityChecker {
    pub fn new(bookings: Arc<dyn BookingStore>) -> Self {
        Self { bookings }
    }

    pub async fn check(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> AvailabilityOutcome {
        match self
            .bookings
            .find_active_overlapping(room_id, check_in, check_out)
            .await
        {
            Ok(found) if found.is_empty() => AvailabilityOutcome::Available,
            Ok(found) => AvailabilityOutcome::Unavailable {
                conflicting: found.into_iter().map(|b| b.id).collect(),
            },
            Err(e) => {
                tracing::warn!("Falha ao consultar disponibilidade do quarto {}: {}", room_id, e);
                AvailabilityOutcome::CheckFailed(e.to_string())
            }
        }
    }
}
