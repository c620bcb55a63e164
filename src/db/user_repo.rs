// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::UserStore, models::auth::User};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    // Busca um usuário pelo seu e-mail
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    // Busca um usuário pelo seu ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    // Grava os dados editáveis do perfil
    async fn update_profile(&self, user: &User) -> Result<User, AppError> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, phone_number = $3, address = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.phone_number.as_deref())
        .bind(user.address.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(AppError::UserNotFound)
    }

    // Cria um novo usuário (sempre como hóspede; admins são promovidos via SQL)
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        name: &str,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, name) VALUES (LOWER($1), $2, $3) RETURNING *",
        )
        .bind(email)
        .bind(hashed_password)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::EmailAlreadyExists;
                }
            }
            AppError::DatabaseError(e)
        })
    }
}
