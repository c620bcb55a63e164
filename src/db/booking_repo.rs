// src/db/booking_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::BookingStore,
    models::booking::{Booking, BookingStatus, NewBooking, StatusChange},
};

// Código SQLSTATE de violação da constraint EXCLUDE (bookings_no_overlap)
const EXCLUSION_VIOLATION: &str = "23P01";

// O repositório de reservas, responsável por todas as interações com a tabela 'bookings'
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn insert(&self, booking: NewBooking) -> Result<Booking, AppError> {
        let nights = i32::try_from(booking.quote.nights)
            .map_err(|_| AppError::InvalidInput("Stay is too long.".to_string()))?;

        sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                room_id, user_id, guest_name, guest_email, check_in, check_out,
                guests, nights, subtotal, tax, discount, promo_code, total_price,
                currency, special_requests
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(booking.room_id)
        .bind(booking.user_id)
        .bind(&booking.guest_name)
        .bind(&booking.guest_email)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.guests)
        .bind(nights)
        .bind(booking.quote.subtotal)
        .bind(booking.quote.tax)
        .bind(booking.quote.discount)
        .bind(booking.quote.promo.applied_code())
        .bind(booking.quote.grand_total)
        .bind(&booking.currency)
        .bind(booking.special_requests.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // A constraint de exclusão fecha a corrida "verifica e depois grava"
            if let Some(db_err) = e.as_database_error() {
                if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) {
                    return AppError::RoomUnavailable;
                }
                if db_err.is_foreign_key_violation() {
                    return AppError::RoomNotFound(booking.room_id);
                }
            }
            AppError::DatabaseError(e)
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Booking>, AppError> {
        let booking =
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE payment_intent_id = $1")
                .bind(payment_intent_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(booking)
    }

    async fn find_active_overlapping(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<Booking>, AppError> {
        // Sobreposição semiaberta: existente.check_in < pedido.check_out
        // AND existente.check_out > pedido.check_in
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE room_id = $1
              AND status IN ('pending', 'confirmed')
              AND check_in < $3
              AND check_out > $2
            ORDER BY check_in ASC
            "#,
        )
        .bind(room_id)
        .bind(check_in)
        .bind(check_out)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn attach_payment_intent(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET payment_intent_id = $2, updated_at = NOW()
            WHERE id = $1
              AND status = 'pending'
              AND (payment_intent_id IS NULL OR payment_intent_id = $2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    async fn transition(&self, id: Uuid, change: StatusChange) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $3,
                payment_status = $4,
                payment_intent_id = COALESCE($5, payment_intent_id),
                refund_id = COALESCE($6, refund_id),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(change.expected)
        .bind(change.status)
        .bind(change.payment_status)
        .bind(change.payment_intent_id.as_deref())
        .bind(change.refund_id.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn list_all(&self) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(bookings)
    }

    async fn find_pending_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE status = $1 AND created_at < $2 ORDER BY created_at ASC",
        )
        .bind(BookingStatus::Pending)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }
}
