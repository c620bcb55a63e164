// src/db/memory.rs
//
// Stores em memória para os testes do controlador. A trava única faz o
// papel da constraint de exclusão do Postgres.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{BookingStore, RoomStore, UserStore},
    models::{
        auth::{User, UserRole},
        booking::{Booking, BookingStatus, NewBooking, PaymentStatus, StatusChange},
        room::{CreateRoomPayload, Room, RoomFilter, RoomStatus},
    },
};

#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<Vec<Booking>>,
    offline: AtomicBool,
}

impl InMemoryBookingStore {
    /// Simula o banco fora do ar: toda operação falha.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insere uma reserva pronta, sem checagem (para montar cenários).
    pub fn seed(&self, booking: Booking) {
        self.bookings.lock().unwrap().push(booking);
    }

    /// Envelhece a reserva, para testar expiração.
    pub fn backdate(&self, id: Uuid, created_at: DateTime<Utc>) {
        let mut bookings = self.bookings.lock().unwrap();
        if let Some(b) = bookings.iter_mut().find(|b| b.id == id) {
            b.created_at = created_at;
        }
    }

    fn ensure_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, new: NewBooking) -> Result<Booking, AppError> {
        self.ensure_online()?;
        let mut bookings = self.bookings.lock().unwrap();

        let clash = bookings.iter().any(|b| {
            b.room_id == new.room_id && b.status.holds_room() && b.overlaps(new.check_in, new.check_out)
        });
        if clash {
            return Err(AppError::RoomUnavailable);
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            room_id: new.room_id,
            user_id: new.user_id,
            guest_name: new.guest_name,
            guest_email: new.guest_email,
            check_in: new.check_in,
            check_out: new.check_out,
            guests: new.guests,
            nights: i32::try_from(new.quote.nights).unwrap(),
            subtotal: new.quote.subtotal,
            tax: new.quote.tax,
            discount: new.quote.discount,
            promo_code: new.quote.promo.applied_code().map(str::to_string),
            total_price: new.quote.grand_total,
            currency: new.currency,
            special_requests: new.special_requests,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_intent_id: None,
            refund_id: None,
            created_at: now,
            updated_at: now,
        };
        bookings.push(booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        self.ensure_online()?;
        Ok(self.bookings.lock().unwrap().iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Booking>, AppError> {
        self.ensure_online()?;
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.payment_intent_id.as_deref() == Some(payment_intent_id))
            .cloned())
    }

    async fn find_active_overlapping(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<Booking>, AppError> {
        self.ensure_online()?;
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.room_id == room_id && b.status.holds_room() && b.overlaps(check_in, check_out))
            .cloned()
            .collect())
    }

    async fn attach_payment_intent(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> Result<Option<Booking>, AppError> {
        self.ensure_online()?;
        let mut bookings = self.bookings.lock().unwrap();
        let Some(b) = bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        let compatible = b
            .payment_intent_id
            .as_deref()
            .is_none_or(|existing| existing == payment_intent_id);
        if b.status != BookingStatus::Pending || !compatible {
            return Ok(None);
        }
        b.payment_intent_id = Some(payment_intent_id.to_string());
        b.updated_at = Utc::now();
        Ok(Some(b.clone()))
    }

    async fn transition(&self, id: Uuid, change: StatusChange) -> Result<Option<Booking>, AppError> {
        self.ensure_online()?;
        let mut bookings = self.bookings.lock().unwrap();
        let Some(b) = bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if b.status != change.expected {
            return Ok(None);
        }
        b.status = change.status;
        b.payment_status = change.payment_status;
        if change.payment_intent_id.is_some() {
            b.payment_intent_id = change.payment_intent_id;
        }
        if change.refund_id.is_some() {
            b.refund_id = change.refund_id;
        }
        b.updated_at = Utc::now();
        Ok(Some(b.clone()))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>, AppError> {
        self.ensure_online()?;
        let mine = self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(mine))
    }

    async fn list_all(&self) -> Result<Vec<Booking>, AppError> {
        self.ensure_online()?;
        let all = self.bookings.lock().unwrap().clone();
        Ok(Self::newest_first(all))
    }

    async fn find_pending_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        self.ensure_online()?;
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryRoomStore {
    rooms: Mutex<Vec<Room>>,
}

impl InMemoryRoomStore {
    pub fn with_rooms(rooms: Vec<Room>) -> Self {
        Self { rooms: Mutex::new(rooms) }
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, AppError> {
        Ok(self.rooms.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, filter: &RoomFilter) -> Result<Vec<Room>, AppError> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn create(&self, payload: CreateRoomPayload) -> Result<Room, AppError> {
        let now = Utc::now();
        let room = Room {
            id: Uuid::new_v4(),
            name: payload.name,
            description: payload.description,
            price: payload.price,
            capacity: payload.capacity,
            size: payload.size,
            images: payload.images,
            amenities: payload.amenities,
            featured: payload.featured,
            status: payload.status.unwrap_or(RoomStatus::Available),
            created_at: now,
            updated_at: now,
        };
        self.rooms.lock().unwrap().push(room.clone());
        Ok(room)
    }

    async fn update(&self, room: Room) -> Result<Room, AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        let slot = rooms
            .iter_mut()
            .find(|r| r.id == room.id)
            .ok_or(AppError::RoomNotFound(room.id))?;
        *slot = Room { updated_at: Utc::now(), ..room };
        Ok(slot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        let before = rooms.len();
        rooms.retain(|r| r.id != id);
        Ok(rooms.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserStore {
    /// Cadastra um usuário direto, sem senha utilizável.
    pub fn seed(&self, email: &str, role: UserRole) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            name: "Test User".into(),
            password_hash: String::new(),
            role,
            phone_number: None,
            address: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_lowercase();
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        name: &str,
    ) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        let email = email.to_lowercase();
        if users.iter().any(|u| u.email == email) {
            return Err(AppError::EmailAlreadyExists);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            name: name.to_string(),
            password_hash: hashed_password.to_string(),
            role: UserRole::Guest,
            phone_number: None,
            address: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, user: &User) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        let slot = users.iter_mut().find(|u| u.id == user.id).ok_or(AppError::UserNotFound)?;
        slot.name = user.name.clone();
        slot.phone_number = user.phone_number.clone();
        slot.address = user.address.clone();
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }
}
