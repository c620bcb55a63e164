// src/services/payment_gateway.rs
//
// Cliente do gateway de pagamento (API REST do Stripe, corpo form-encoded).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::payment::{CreateIntentRequest, CreateRefundRequest, PaymentIntent, Refund};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned {status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
        code: Option<String>,
        kind: Option<String>,
    },

    #[error("unexpected gateway response: {0}")]
    Decode(String),

    #[error("payment gateway is not configured")]
    NotConfigured,
}

impl GatewayError {
    /// Mensagem que pode ir para o cliente. Só erros de cartão trazem texto
    /// pensado para o usuário final; o resto fica no log.
    pub fn user_message(&self) -> Option<String> {
        match self {
            GatewayError::Api { message, kind, .. } if kind.as_deref() == Some("card_error") => {
                Some(message.clone())
            }
            _ => None,
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: CreateIntentRequest) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Cancela um intent ainda não pago. O client secret deixa de aceitar
    /// pagamento; o gateway recusa intents já pagos ou em processamento.
    async fn cancel_intent(
        &self,
        payment_intent_id: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn create_refund(&self, request: CreateRefundRequest) -> Result<Refund, GatewayError>;
}

// Formato de erro do Stripe: {"error": {"message", "code", "type"}}
#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

impl StripeGateway {
    pub fn new(http: reqwest::Client, base_url: &str, secret_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn intent_path(payment_intent_id: &str) -> Result<String, GatewayError> {
        if payment_intent_id.is_empty() || payment_intent_id.contains('/') {
            return Err(GatewayError::Decode(format!("invalid payment intent id '{payment_intent_id}'")));
        }
        Ok(format!("payment_intents/{payment_intent_id}"))
    }

    fn secret(&self) -> Result<&str, GatewayError> {
        self.secret_key.as_deref().ok_or(GatewayError::NotConfigured)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
        idempotency_key: &str,
    ) -> Result<T, GatewayError> {
        let url = self.url(path);
        tracing::debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .bearer_auth(self.secret()?)
            .header("Idempotency-Key", idempotency_key)
            .form(form)
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let url = self.url(path);
        tracing::debug!("GET {url}");

        let resp = self.http.get(url).bearer_auth(self.secret()?).send().await?;
        Self::handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, GatewayError> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let (message, code, kind) = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(ErrorEnvelope { error }) => (
                    error.message.unwrap_or_else(|| status.to_string()),
                    error.code,
                    error.kind,
                ),
                Err(_) => (body, None, None),
            };
            return Err(GatewayError::Api { status, message, code, kind });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: CreateIntentRequest) -> Result<PaymentIntent, GatewayError> {
        let mut form = vec![
            ("amount".to_string(), request.amount_minor.to_string()),
            ("currency".to_string(), request.currency.to_lowercase()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        form.extend(
            request
                .metadata
                .into_iter()
                .map(|(k, v)| (format!("metadata[{k}]"), v)),
        );

        self.post_form("payment_intents", &form, &request.idempotency_key).await
    }

    async fn retrieve_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.get(&Self::intent_path(payment_intent_id)?).await
    }

    async fn cancel_intent(
        &self,
        payment_intent_id: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let path = format!("{}/cancel", Self::intent_path(payment_intent_id)?);
        let form = vec![("cancellation_reason".to_string(), "abandoned".to_string())];
        self.post_form(&path, &form, idempotency_key).await
    }

    async fn create_refund(&self, request: CreateRefundRequest) -> Result<Refund, GatewayError> {
        let form = vec![
            ("payment_intent".to_string(), request.payment_intent_id),
            ("reason".to_string(), request.reason),
        ];
        self.post_form("refunds", &form, &request.idempotency_key).await
    }
}
