// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    db::{BookingRepository, RoomRepository, UserRepository},
    services::{
        auth::AuthService,
        booking_service::{BookingService, BookingSettings},
        notification::{HttpMailer, MailSettings, NotificationDispatcher, RetryConfig},
        payment_gateway::StripeGateway,
        pricing::{PricingCalculator, PromoTable},
        room_service::RoomService,
    },
};

const NOTIFICATION_QUEUE_SIZE: usize = 256;

/// Configuração lida do ambiente (`.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub currency: String,
    pub tax_rate: Decimal,
    pub promo_codes: PromoTable,
    pub payment_timeout: chrono::Duration,
    pub sweep_interval: Duration,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub hotel_email: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Separado de `from_env` para os testes não dependerem do processo
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).with_context(|| format!("{key} deve ser definida"));

        let tax_rate = parse_or(&get, "TAX_RATE", Decimal::new(12, 2))?;
        anyhow::ensure!(
            tax_rate >= Decimal::ZERO && tax_rate < Decimal::ONE,
            "TAX_RATE deve estar entre 0 e 1 (ex: 0.12)"
        );

        let promo_codes = match get("PROMO_CODES") {
            Some(raw) => PromoTable::parse(&raw).context("PROMO_CODES inválida")?,
            None => PromoTable::default(),
        };

        let currency = get("CURRENCY").unwrap_or_else(|| "cad".to_string()).to_lowercase();
        anyhow::ensure!(currency.len() == 3, "CURRENCY deve ser um código ISO 4217");

        let timeout_minutes: i64 = parse_or(&get, "PAYMENT_TIMEOUT_MINUTES", 30)?;
        anyhow::ensure!(timeout_minutes > 0, "PAYMENT_TIMEOUT_MINUTES deve ser positivo");
        let sweep_secs: u64 = parse_or(&get, "SWEEP_INTERVAL_SECS", 60)?;
        anyhow::ensure!(sweep_secs > 0, "SWEEP_INTERVAL_SECS deve ser positivo");

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5001".to_string()),
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
            stripe_api_base: get("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".to_string()),
            currency,
            tax_rate,
            promo_codes,
            payment_timeout: chrono::Duration::minutes(timeout_minutes),
            sweep_interval: Duration::from_secs(sweep_secs),
            mail_api_url: get("MAIL_API_URL"),
            mail_api_key: get("MAIL_API_KEY"),
            mail_from: get("MAIL_FROM").unwrap_or_else(|| "reservations@localhost".to_string()),
            hotel_email: get("HOTEL_EMAIL"),
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} inválida: '{raw}'")),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub booking_service: BookingService,
    pub room_service: RoomService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        if config.stripe_secret_key.is_none() {
            tracing::warn!("STRIPE_SECRET_KEY ausente: pagamentos vão falhar");
        }
        if config.mail_api_url.is_none() {
            tracing::warn!("MAIL_API_URL ausente: e-mails não serão enviados");
        }
        tracing::info!(promo_codes = config.promo_codes.len(), "Códigos promocionais carregados");

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Falha ao criar o cliente HTTP")?;

        // --- Monta o gráfico de dependências ---
        let user_repo = Arc::new(UserRepository::new(db_pool.clone()));
        let booking_repo = Arc::new(BookingRepository::new(db_pool.clone()));
        let room_repo = Arc::new(RoomRepository::new(db_pool.clone()));

        let gateway = Arc::new(StripeGateway::new(
            http.clone(),
            &config.stripe_api_base,
            config.stripe_secret_key.clone(),
        ));
        let mailer = Arc::new(HttpMailer::new(
            http,
            config.mail_api_url.clone(),
            config.mail_api_key.clone(),
        ));
        let (notifier, _worker) = NotificationDispatcher::spawn(
            mailer,
            MailSettings {
                from: config.mail_from.clone(),
                hotel_email: config.hotel_email.clone(),
            },
            RetryConfig::default(),
            NOTIFICATION_QUEUE_SIZE,
        );

        let auth_service = AuthService::new(user_repo, config.jwt_secret.clone());
        let room_service = RoomService::new(room_repo.clone());
        let booking_service = BookingService::new(
            booking_repo,
            room_repo,
            PricingCalculator::new(config.tax_rate, config.promo_codes.clone()),
            gateway,
            notifier,
            BookingSettings {
                currency: config.currency.clone(),
                payment_timeout: config.payment_timeout,
            },
        );

        Ok(Self {
            db_pool,
            auth_service,
            booking_service,
            room_service,
        })
    }
}
