// src/models/room.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "room_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Available,
    Booked,
    Maintenance,
}

impl RoomStatus {
    /// Quartos em manutenção não podem ser cotados nem reservados.
    pub fn is_bookable(self) -> bool {
        !matches!(self, RoomStatus::Maintenance)
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "Single Bedroom")]
    pub name: String,

    #[schema(example = "Spacious room with king-sized bed")]
    pub description: Option<String>,

    // Diária, sem centavos implícitos (decimal)
    #[schema(example = "125.00")]
    pub price: Decimal,

    #[schema(example = 2)]
    pub capacity: i32,

    // Metragem em m²
    #[schema(example = 40)]
    pub size: i32,

    // A ordem importa: a primeira imagem é a capa
    pub images: Vec<String>,

    #[schema(example = json!(["Free Wi-Fi", "Air Conditioning"]))]
    pub amenities: Vec<String>,

    pub featured: bool,
    pub status: RoomStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Filtros da listagem pública (GET /api/rooms)
#[derive(Debug, Default, Clone, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RoomFilter {
    pub featured: Option<bool>,
    pub status: Option<RoomStatus>,
    pub min_capacity: Option<i32>,
}

impl RoomFilter {
    pub fn matches(&self, room: &Room) -> bool {
        self.featured.is_none_or(|f| room.featured == f)
            && self.status.is_none_or(|s| room.status == s)
            && self.min_capacity.is_none_or(|c| room.capacity >= c)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    #[validate(length(min = 1, message = "Room name is required."))]
    #[schema(example = "Standard Twin Room")]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_positive_price"))]
    #[schema(example = "145.00")]
    pub price: Decimal,

    #[validate(range(min = 1, message = "Capacity must be at least 1."))]
    #[schema(example = 2)]
    pub capacity: i32,

    #[validate(range(min = 0, message = "Size cannot be negative."))]
    #[schema(example = 45)]
    pub size: i32,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub amenities: Vec<String>,

    #[serde(default)]
    pub featured: bool,

    pub status: Option<RoomStatus>,
}

// Edição parcial feita pelo painel administrativo
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomPayload {
    #[validate(length(min = 1, message = "Room name is required."))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_positive_price"))]
    pub price: Option<Decimal>,
    #[validate(range(min = 1, message = "Capacity must be at least 1."))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0, message = "Size cannot be negative."))]
    pub size: Option<i32>,
    pub images: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub status: Option<RoomStatus>,
}

impl UpdateRoomPayload {
    /// Aplica os campos presentes sobre o quarto atual.
    pub fn apply_to(self, room: &mut Room) {
        if let Some(name) = self.name {
            room.name = name;
        }
        if let Some(description) = self.description {
            room.description = Some(description);
        }
        if let Some(price) = self.price {
            room.price = price;
        }
        if let Some(capacity) = self.capacity {
            room.capacity = capacity;
        }
        if let Some(size) = self.size {
            room.size = size;
        }
        if let Some(images) = self.images {
            room.images = images;
        }
        if let Some(amenities) = self.amenities {
            room.amenities = amenities;
        }
        if let Some(featured) = self.featured {
            room.featured = featured;
        }
        if let Some(status) = self.status {
            room.status = status;
        }
    }
}

fn validate_positive_price(price: &Decimal) -> Result<(), validator::ValidationError> {
    if *price <= Decimal::ZERO {
        let mut err = validator::ValidationError::new("positive");
        err.message = Some("Price must be greater than zero.".into());
        return Err(err);
    }
    Ok(())
}
