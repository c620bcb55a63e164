// src/services/room_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::store::RoomStore,
    models::room::{CreateRoomPayload, Room, RoomFilter, UpdateRoomPayload},
};

#[derive(Clone)]
pub struct RoomService {
    rooms: Arc<dyn RoomStore>,
}

impl RoomService {
    pub fn new(rooms: Arc<dyn RoomStore>) -> Self {
        Self { rooms }
    }

    pub async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, AppError> {
        self.rooms.list(filter).await
    }

    pub async fn get_room(&self, id: Uuid) -> Result<Room, AppError> {
        self.rooms.find_by_id(id).await?.ok_or(AppError::RoomNotFound(id))
    }

    pub async fn create_room(&self, payload: CreateRoomPayload) -> Result<Room, AppError> {
        payload.validate()?;
        let room = self.rooms.create(payload).await?;
        tracing::info!("🏨 Quarto '{}' criado ({})", room.name, room.id);
        Ok(room)
    }

    pub async fn update_room(&self, id: Uuid, payload: UpdateRoomPayload) -> Result<Room, AppError> {
        payload.validate()?;
        let mut room = self.get_room(id).await?;
        payload.apply_to(&mut room);
        self.rooms.update(room).await
    }

    pub async fn delete_room(&self, id: Uuid) -> Result<(), AppError> {
        if !self.rooms.delete(id).await? {
            return Err(AppError::RoomNotFound(id));
        }
        tracing::info!("Quarto {} removido", id);
        Ok(())
    }
}
