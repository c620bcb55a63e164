// src/services/notification.rs
//
// E-mails de confirmação e cancelamento. O controlador só enfileira o
// evento; um worker em background monta as mensagens (hóspede + hotel)
// e envia com retry. Falha de envio nunca volta para a reserva.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::models::{
    booking::Booking,
    notification::{BookingEvent, EmailMessage},
};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail API returned {status}: {body}")]
    Rejected { status: reqwest::StatusCode, body: String },

    #[error("mailer is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Cliente da API transacional de e-mail: POST JSON com chave bearer.
#[derive(Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(http: reqwest::Client, api_url: Option<String>, api_key: Option<String>) -> Self {
        Self { http, api_url, api_key }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let url = self.api_url.as_deref().ok_or(NotifyError::NotConfigured)?;

        let mut request = self.http.post(url).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    // Exponencial: initial * 2^(tentativa-1), limitado a max_backoff
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub from: String,
    pub hotel_email: Option<String>,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<BookingEvent>,
}

impl NotificationDispatcher {
    /// Cria o dispatcher e sobe o worker. O worker termina quando todos
    /// os dispatchers (senders) forem descartados.
    pub fn spawn(
        mailer: Arc<dyn Mailer>,
        settings: MailSettings,
        retry: RetryConfig,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(run_worker(rx, mailer, settings, retry));
        (Self { tx }, handle)
    }

    /// Enfileira sem bloquear. Fila cheia ou worker parado: loga e descarta.
    pub fn notify(&self, event: BookingEvent) {
        let booking_id = event.booking().id;
        if let Err(e) = self.tx.try_send(event) {
            tracing::warn!("Notificação da reserva {} descartada: {}", booking_id, e);
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<BookingEvent>,
    mailer: Arc<dyn Mailer>,
    settings: MailSettings,
    retry: RetryConfig,
) {
    while let Some(event) = rx.recv().await {
        for message in build_messages(&event, &settings) {
            deliver(mailer.as_ref(), &message, &retry).await;
        }
    }
    tracing::debug!("Worker de notificações encerrado");
}

async fn deliver(mailer: &dyn Mailer, message: &EmailMessage, retry: &RetryConfig) {
    let mut attempt = 1;
    loop {
        match mailer.send(message).await {
            Ok(()) => {
                tracing::info!("📧 E-mail '{}' enviado para {}", message.subject, message.to);
                return;
            }
            // Sem configuração não adianta tentar de novo
            Err(NotifyError::NotConfigured) => {
                tracing::warn!("Mailer não configurado; e-mail '{}' não enviado", message.subject);
                return;
            }
            Err(e) if attempt >= retry.max_attempts => {
                tracing::error!(
                    "Falha ao enviar e-mail '{}' para {} após {} tentativas: {}",
                    message.subject,
                    message.to,
                    attempt,
                    e
                );
                return;
            }
            Err(e) => {
                tracing::warn!("Tentativa {} de e-mail para {} falhou: {}", attempt, message.to, e);
                tokio::time::sleep(retry.backoff(attempt)).await;
                attempt += 1;
            }
        }
    }
}

fn money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {}", amount, currency.to_uppercase())
}

fn booking_fields(booking: &Booking, room_name: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("bookingId".into(), booking.id.to_string());
    fields.insert("guestName".into(), booking.guest_name.clone());
    fields.insert("guestEmail".into(), booking.guest_email.clone());
    fields.insert("roomName".into(), room_name.to_string());
    fields.insert("checkIn".into(), booking.check_in.format("%Y-%m-%d").to_string());
    fields.insert("checkOut".into(), booking.check_out.format("%Y-%m-%d").to_string());
    fields.insert("nights".into(), booking.nights.to_string());
    fields.insert("guests".into(), booking.guests.to_string());
    fields.insert("totalPrice".into(), money(booking.total_price, &booking.currency));
    if let Some(requests) = &booking.special_requests {
        fields.insert("specialRequests".into(), requests.clone());
    }
    fields
}

/// Monta as mensagens do evento: uma para o hóspede e, se houver endereço
/// configurado, outra para o hotel.
pub fn build_messages(event: &BookingEvent, settings: &MailSettings) -> Vec<EmailMessage> {
    let (subject, mut fields) = match event {
        BookingEvent::Confirmed { booking, room_name } => (
            format!("Booking confirmed: {} ({} to {})", room_name, booking.check_in, booking.check_out),
            booking_fields(booking, room_name),
        ),
        BookingEvent::Cancelled { booking, room_name, refund } => {
            let mut fields = booking_fields(booking, room_name);
            if let Some(refund) = refund {
                fields.insert("refundId".into(), refund.id.clone());
                fields.insert(
                    "refundAmount".into(),
                    money(Decimal::new(refund.amount, 2), &booking.currency),
                );
            }
            (
                format!("Booking cancelled: {} ({} to {})", room_name, booking.check_in, booking.check_out),
                fields,
            )
        }
    };

    let booking = event.booking();
    fields.insert("status".into(), booking.status.as_str().to_string());

    let mut messages = vec![EmailMessage {
        from: settings.from.clone(),
        to: booking.guest_email.clone(),
        subject: subject.clone(),
        fields: fields.clone(),
    }];

    if let Some(hotel) = &settings.hotel_email {
        messages.push(EmailMessage {
            from: settings.from.clone(),
            to: hotel.clone(),
            subject: format!("[Hotel] {subject}"),
            fields,
        });
    }
    messages
}
