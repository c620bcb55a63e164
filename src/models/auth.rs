// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Guest,
    Admin,
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "guest@example.com")]
    pub email: String,
    #[schema(example = "John Smith")]
    pub name: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub role: UserRole,

    #[schema(example = "+1 604 555 0199")]
    pub phone_number: Option<String>,
    #[schema(example = "1234 Main St, Vancouver, BC")]
    pub address: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserPayload {
    #[validate(email(message = "The e-mail provided is invalid."))]
    #[schema(example = "guest@example.com")]
    pub email: String,
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required."))]
    #[schema(example = "John Smith")]
    pub name: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "The e-mail provided is invalid."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,
}

// Edição do perfil (PUT /api/users/me). Campos ausentes ficam como estão;
// string vazia apaga telefone e endereço.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(min = 1, max = 120, message = "Name must have between 1 and 120 characters."))]
    #[schema(example = "John Smith")]
    pub name: Option<String>,
    #[validate(length(max = 32, message = "Phone number is limited to 32 characters."))]
    #[schema(example = "+1 604 555 0199")]
    pub phone_number: Option<String>,
    #[validate(length(max = 255, message = "Address is limited to 255 characters."))]
    pub address: Option<String>,
}

impl UpdateProfilePayload {
    pub fn apply_to(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name.trim().to_string();
        }
        if let Some(phone) = self.phone_number {
            user.phone_number = non_blank(phone);
        }
        if let Some(address) = self.address {
            user.address = non_blank(address);
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}
