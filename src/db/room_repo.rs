// src/db/room_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::RoomStore,
    models::room::{CreateRoomPayload, Room, RoomFilter, RoomStatus},
};

#[derive(Clone)]
pub struct RoomRepository {
    pool: PgPool,
}

impl RoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomStore for RoomRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, AppError> {
        let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(room)
    }

    async fn list(&self, filter: &RoomFilter) -> Result<Vec<Room>, AppError> {
        // Filtros opcionais: NULL desliga o critério
        let rooms = sqlx::query_as::<_, Room>(
            r#"
            SELECT * FROM rooms
            WHERE ($1::BOOLEAN IS NULL OR featured = $1)
              AND ($2::room_status IS NULL OR status = $2)
              AND ($3::INT IS NULL OR capacity >= $3)
            ORDER BY featured DESC, price ASC, name ASC
            "#,
        )
        .bind(filter.featured)
        .bind(filter.status)
        .bind(filter.min_capacity)
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }

    async fn create(&self, payload: CreateRoomPayload) -> Result<Room, AppError> {
        let room = sqlx::query_as::<_, Room>(
            r#"
            INSERT INTO rooms (
                name, description, price, capacity, size, images, amenities, featured, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&payload.name)
        .bind(payload.description.as_deref())
        .bind(payload.price)
        .bind(payload.capacity)
        .bind(payload.size)
        .bind(&payload.images)
        .bind(&payload.amenities)
        .bind(payload.featured)
        .bind(payload.status.unwrap_or(RoomStatus::Available))
        .fetch_one(&self.pool)
        .await?;

        Ok(room)
    }

    async fn update(&self, room: Room) -> Result<Room, AppError> {
        let updated = sqlx::query_as::<_, Room>(
            r#"
            UPDATE rooms
            SET name = $2, description = $3, price = $4, capacity = $5, size = $6,
                images = $7, amenities = $8, featured = $9, status = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(room.id)
        .bind(&room.name)
        .bind(room.description.as_deref())
        .bind(room.price)
        .bind(room.capacity)
        .bind(room.size)
        .bind(&room.images)
        .bind(&room.amenities)
        .bind(room.featured)
        .bind(room.status)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(AppError::RoomNotFound(room.id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                // Quarto com histórico de reservas não pode sumir
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_foreign_key_violation() {
                        return AppError::InvalidInput(
                            "Room has bookings; set it to maintenance instead.".to_string(),
                        );
                    }
                }
                AppError::DatabaseError(e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}
