// src/db/store.rs
//
// Contratos de persistência. O controlador de reservas só conhece estes
// traits; a implementação Postgres e a em memória (testes) são trocáveis.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::User,
        booking::{Booking, NewBooking, StatusChange},
        room::{CreateRoomPayload, Room, RoomFilter},
    },
};

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insere uma reserva `pending`. Deve falhar com `RoomUnavailable` se
    /// outra reserva ativa do mesmo quarto sobrepuser o intervalo; a
    /// verificação é atômica com a inserção.
    async fn insert(&self, booking: NewBooking) -> Result<Booking, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, AppError>;

    async fn find_by_payment_intent(&self, payment_intent_id: &str)
    -> Result<Option<Booking>, AppError>;

    /// Reservas `pending`/`confirmed` do quarto que cruzam `[check_in, check_out)`.
    async fn find_active_overlapping(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<Booking>, AppError>;

    /// Grava a referência do intent numa reserva ainda `pending`.
    /// Retorna `None` se a reserva não estiver mais pendente.
    async fn attach_payment_intent(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> Result<Option<Booking>, AppError>;

    /// Compare-and-set de status. Retorna `None` se o status atual não for
    /// `change.expected`.
    async fn transition(&self, id: Uuid, change: StatusChange) -> Result<Option<Booking>, AppError>;

    /// Mais recentes primeiro.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>, AppError>;

    /// Mais recentes primeiro.
    async fn list_all(&self) -> Result<Vec<Booking>, AppError>;

    async fn find_pending_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError>;
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, AppError>;

    async fn list(&self, filter: &RoomFilter) -> Result<Vec<Room>, AppError>;

    async fn create(&self, payload: CreateRoomPayload) -> Result<Room, AppError>;

    async fn update(&self, room: Room) -> Result<Room, AppError>;

    /// `false` se o quarto não existia.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Falha com `EmailAlreadyExists` se o e-mail (sem diferenciar
    /// maiúsculas) já estiver em uso.
    async fn create_user(&self, email: &str, hashed_password: &str, name: &str)
    -> Result<User, AppError>;

    /// Grava nome, telefone e endereço.
    async fn update_profile(&self, user: &User) -> Result<User, AppError>;
}
