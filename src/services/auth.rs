// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::store::UserStore,
    models::auth::{Claims, UpdateProfilePayload, User},
};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt_secret: String) -> Self {
        Self { users, jwt_secret }
    }

    pub async fn register_user(&self, email: &str, password: &str, name: &str) -> Result<String, AppError> {
        // Hash fora do runtime async (bcrypt é CPU-bound)
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let new_user = self
            .users
            .create_user(email.trim(), &hashed_password, name.trim())
            .await?;

        tracing::info!("👤 Usuário {} registrado", new_user.id);
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn update_profile(&self, mut user: User, payload: UpdateProfilePayload) -> Result<User, AppError> {
        payload.validate()?;
        payload.apply_to(&mut user);

        let updated = self.users.update_profile(&user).await?;
        tracing::info!("Perfil do usuário {} atualizado", updated.id);
        Ok(updated)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_claims(token)?;

        self.users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
    }

    pub(crate) fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
