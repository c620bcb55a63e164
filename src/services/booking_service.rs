// src/services/booking_service.rs

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::store::{BookingStore, RoomStore},
    models::{
        auth::User,
        booking::{
            BookedDatesQuery, BookedRange, Booking, BookingListFilter, BookingStatus, NewBooking,
            PaymentStatus, QuotePayload, QuoteResponse, ReservePayload, StatusChange,
        },
        notification::BookingEvent,
        payment::{
            Cancellation, CreateIntentRequest, CreatePaymentIntentPayload, CreateRefundRequest,
            IntentStatus, PaymentIntent, PaymentIntentResponse, Refund,
        },
        pricing::PriceQuote,
        room::Room,
    },
    services::{
        availability::{AvailabilityChecker, AvailabilityOutcome},
        notification::NotificationDispatcher,
        payment_gateway::{GatewayError, PaymentGateway},
        pricing::{MAX_NIGHTS, PricingCalculator, round_money, to_minor_units},
    },
};

const REFUND_REASON: &str = "requested_by_customer";

// Chave de idempotência por reserva e operação no gateway
fn idempotency_key(booking_id: Uuid, operation: &str) -> String {
    format!("booking-{booking_id}-{operation}")
}

/// Situação do intent depois de tentar fechá-lo no gateway.
enum IntentRelease {
    // Sem intent, ou intent cancelado: nenhuma cobrança pode entrar
    Released,
    // O hóspede já pagou
    Paid(PaymentIntent),
    // Pagamento em andamento; decidir depois
    InFlight(IntentStatus),
}

/// Quem está agindo sobre a reserva.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self { user_id: user.id, is_admin: user.is_admin() }
    }
}

#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub currency: String,
    // Reservas pendentes mais velhas que isso expiram
    pub payment_timeout: chrono::Duration,
}

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingStore>,
    rooms: Arc<dyn RoomStore>,
    availability: AvailabilityChecker,
    pricing: PricingCalculator,
    gateway: Arc<dyn PaymentGateway>,
    notifier: NotificationDispatcher,
    settings: BookingSettings,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        rooms: Arc<dyn RoomStore>,
        pricing: PricingCalculator,
        gateway: Arc<dyn PaymentGateway>,
        notifier: NotificationDispatcher,
        settings: BookingSettings,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(bookings.clone()),
            bookings,
            rooms,
            pricing,
            gateway,
            notifier,
            settings,
        }
    }

    // --- COTAÇÃO ---
    pub async fn quote(&self, payload: QuotePayload) -> Result<QuoteResponse, AppError> {
        payload.validate()?;

        let (room, quote) = self
            .price_stay(
                payload.room_id,
                payload.check_in,
                payload.check_out,
                payload.guests,
                payload.promo_code.as_deref(),
            )
            .await?;

        Ok(QuoteResponse {
            room_id: room.id,
            room_name: room.name,
            guests: payload.guests,
            quote,
        })
    }

    // Carrega o quarto, valida hóspedes e calcula o preço no servidor
    async fn price_stay(
        &self,
        room_id: Uuid,
        check_in: chrono::NaiveDate,
        check_out: chrono::NaiveDate,
        guests: i32,
        promo_code: Option<&str>,
    ) -> Result<(Room, PriceQuote), AppError> {
        let room = self
            .rooms
            .find_by_id(room_id)
            .await?
            .ok_or(AppError::RoomNotFound(room_id))?;

        if !room.status.is_bookable() {
            return Err(AppError::RoomNotBookable(room.id));
        }

        let quote = self.pricing.quote(room.price, check_in, check_out, promo_code)?;

        if guests < 1 || guests > room.capacity {
            return Err(AppError::InvalidGuestCount { guests, capacity: room.capacity });
        }

        Ok((room, quote))
    }

    // --- RESERVA ---
    pub async fn reserve(&self, actor: Actor, payload: ReservePayload) -> Result<Booking, AppError> {
        payload.validate()?;

        let (room, quote) = self
            .price_stay(
                payload.room_id,
                payload.check_in,
                payload.check_out,
                payload.guests,
                payload.promo_code.as_deref(),
            )
            .await?;

        match self
            .availability
            .check(room.id, payload.check_in, payload.check_out)
            .await
        {
            AvailabilityOutcome::Available => {}
            AvailabilityOutcome::Unavailable { conflicting } => {
                tracing::info!(
                    "Quarto {} indisponível de {} a {} ({} conflito(s))",
                    room.id,
                    payload.check_in,
                    payload.check_out,
                    conflicting.len()
                );
                return Err(AppError::RoomUnavailable);
            }
            AvailabilityOutcome::CheckFailed(reason) => {
                return Err(AppError::AvailabilityCheckFailed(reason));
            }
        }

        // A verificação acima é otimista; o store garante a exclusão de fato
        let booking = self
            .bookings
            .insert(NewBooking {
                room_id: room.id,
                user_id: actor.user_id,
                guest_name: payload.guest_name.trim().to_string(),
                guest_email: payload.guest_email.trim().to_lowercase(),
                check_in: payload.check_in,
                check_out: payload.check_out,
                guests: payload.guests,
                quote,
                currency: self.settings.currency.clone(),
                special_requests: payload
                    .special_requests
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            })
            .await?;

        tracing::info!(
            "Reserva {} criada (quarto {}, {} a {}, total {})",
            booking.id,
            booking.room_id,
            booking.check_in,
            booking.check_out,
            booking.total_price
        );
        Ok(booking)
    }

    // --- PAGAMENTO ---
    pub async fn request_payment(
        &self,
        actor: Actor,
        payload: CreatePaymentIntentPayload,
    ) -> Result<PaymentIntentResponse, AppError> {
        payload.validate()?;

        let booking = self.load_authorized(actor, payload.booking_id).await?;
        ensure_transition(booking.status, BookingStatus::Confirmed)?;

        // O valor cobrado é sempre o total gravado; o do cliente só é conferido
        if let Some(amount) = payload.amount {
            if round_money(amount) != booking.total_price {
                return Err(AppError::InvalidInput(format!(
                    "Amount {} does not match the booking total {}.",
                    amount, booking.total_price
                )));
            }
        }
        if let Some(currency) = payload.currency.as_deref() {
            if !currency.eq_ignore_ascii_case(&booking.currency) {
                return Err(AppError::InvalidInput(format!(
                    "Currency must be {}.",
                    booking.currency.to_uppercase()
                )));
            }
        }

        let intent = match booking.payment_intent_id.as_deref() {
            Some(existing) => self.gateway.retrieve_intent(existing).await?,
            None => self.create_intent(&booking).await?,
        };

        if booking.payment_intent_id.as_deref() != Some(intent.id.as_str()) {
            let attached = self.bookings.attach_payment_intent(booking.id, &intent.id).await?;
            if attached.is_none() {
                let current = self.load(booking.id).await?;
                return Err(AppError::InvalidTransition {
                    from: current.status,
                    to: BookingStatus::Confirmed,
                });
            }
        }

        let client_secret = intent
            .client_secret
            .ok_or_else(|| GatewayError::Decode("payment intent has no client_secret".into()))?;

        Ok(PaymentIntentResponse {
            client_secret,
            payment_intent_id: intent.id,
            amount: booking.total_price,
            currency: booking.currency,
        })
    }

    async fn create_intent(&self, booking: &Booking) -> Result<PaymentIntent, AppError> {
        let mut metadata = BTreeMap::new();
        metadata.insert("bookingId".to_string(), booking.id.to_string());
        metadata.insert("checkIn".to_string(), booking.check_in.to_string());
        metadata.insert("checkOut".to_string(), booking.check_out.to_string());

        let intent = self
            .gateway
            .create_intent(CreateIntentRequest {
                amount_minor: to_minor_units(booking.total_price)?,
                currency: booking.currency.clone(),
                idempotency_key: idempotency_key(booking.id, "intent"),
                metadata,
            })
            .await?;

        tracing::info!("Payment intent {} criado para a reserva {}", intent.id, booking.id);
        Ok(intent)
    }

    pub async fn confirm_payment(
        &self,
        actor: Actor,
        payment_intent_id: &str,
    ) -> Result<Booking, AppError> {
        let booking = self.load_by_intent(payment_intent_id).await?;
        authorize(actor, &booking)?;

        match booking.status {
            // Confirmar de novo é inofensivo
            BookingStatus::Confirmed => Ok(booking),
            BookingStatus::Pending => {
                let intent = self.gateway.retrieve_intent(payment_intent_id).await?;
                self.settle(booking, &intent).await
            }
            // Reserva já encerrada: um pagamento que chegou depois é devolvido
            other => {
                if self.refund_stray_payment(&booking).await?.is_some() {
                    return Err(AppError::PaymentRefunded { booking_id: booking.id, status: other });
                }
                Err(AppError::InvalidTransition { from: other, to: BookingStatus::Confirmed })
            }
        }
    }

    // Aplica o status do intent a uma reserva pendente
    async fn settle(&self, booking: Booking, intent: &PaymentIntent) -> Result<Booking, AppError> {
        match intent.status {
            IntentStatus::Succeeded => {
                let expected = to_minor_units(booking.total_price)?;
                if intent.amount != expected {
                    tracing::error!(
                        "Intent {} cobrou {} mas a reserva {} vale {}",
                        intent.id,
                        intent.amount,
                        booking.id,
                        expected
                    );
                    return Err(AppError::InvalidInput(
                        "Payment amount does not match the booking total.".to_string(),
                    ));
                }

                let change = StatusChange {
                    expected: BookingStatus::Pending,
                    status: BookingStatus::Confirmed,
                    payment_status: PaymentStatus::Paid,
                    payment_intent_id: Some(intent.id.clone()),
                    refund_id: None,
                };
                let Some(confirmed) = self.bookings.transition(booking.id, change).await? else {
                    let current = self.load(booking.id).await?;
                    if current.status == BookingStatus::Confirmed {
                        return Ok(current);
                    }
                    return Err(AppError::InvalidTransition {
                        from: current.status,
                        to: BookingStatus::Confirmed,
                    });
                };

                tracing::info!("✅ Reserva {} confirmada (intent {})", confirmed.id, intent.id);
                let room_name = self.room_name(confirmed.room_id).await;
                self.notifier.notify(BookingEvent::Confirmed { booking: confirmed.clone(), room_name });
                Ok(confirmed)
            }
            IntentStatus::Canceled | IntentStatus::RequiresPaymentMethod => {
                // Depois de uma recusa o intent ainda aceita outra tentativa
                if intent.status == IntentStatus::RequiresPaymentMethod {
                    let closed = self
                        .gateway
                        .cancel_intent(&intent.id, &idempotency_key(booking.id, "intent-cancel"))
                        .await?;
                    if closed.status != IntentStatus::Canceled {
                        return Err(AppError::PaymentIncomplete(closed.status));
                    }
                }

                let change = StatusChange {
                    expected: BookingStatus::Pending,
                    status: BookingStatus::Failed,
                    payment_status: PaymentStatus::Pending,
                    payment_intent_id: None,
                    refund_id: None,
                };
                if self.bookings.transition(booking.id, change).await?.is_none() {
                    let current = self.load(booking.id).await?;
                    match current.status {
                        BookingStatus::Confirmed => return Ok(current),
                        BookingStatus::Failed => {}
                        other => {
                            return Err(AppError::InvalidTransition {
                                from: other,
                                to: BookingStatus::Failed,
                            });
                        }
                    }
                }

                tracing::warn!("Pagamento da reserva {} recusado ({:?})", booking.id, intent.status);
                Err(AppError::PaymentDeclined(
                    "Your payment was declined. Please book again with another payment method."
                        .to_string(),
                ))
            }
            other => Err(AppError::PaymentIncomplete(other)),
        }
    }

    // --- CANCELAMENTO ---
    pub async fn cancel(&self, actor: Actor, booking_id: Uuid) -> Result<Cancellation, AppError> {
        let booking = self.load_authorized(actor, booking_id).await?;
        ensure_transition(booking.status, BookingStatus::Cancelled)?;

        if booking.status == BookingStatus::Confirmed {
            let payment_intent_id = booking.payment_intent_id.clone().ok_or_else(|| {
                anyhow::anyhow!("confirmed booking {} has no payment intent", booking.id)
            })?;
            return self.refund_and_cancel(booking, &payment_intent_id).await;
        }

        // Pendente: o intent precisa morrer no gateway antes da reserva
        match self.release_intent(&booking).await? {
            IntentRelease::Released => {
                let change = StatusChange {
                    expected: BookingStatus::Pending,
                    status: BookingStatus::Cancelled,
                    payment_status: booking.payment_status,
                    payment_intent_id: None,
                    refund_id: None,
                };
                let cancelled = self.apply_cancel(booking.id, change).await?;
                tracing::info!("Reserva pendente {} cancelada", cancelled.id);
                self.notify_cancelled(&cancelled, None).await;
                Ok(Cancellation { booking: cancelled, refund: None })
            }
            IntentRelease::Paid(intent) => {
                tracing::info!("Reserva pendente {} já estava paga; estornando", booking.id);
                self.refund_and_cancel(booking, &intent.id).await
            }
            IntentRelease::InFlight(status) => Err(AppError::PaymentIncomplete(status)),
        }
    }

    // Estorno primeiro; só depois a reserva muda de estado
    async fn refund_and_cancel(
        &self,
        booking: Booking,
        payment_intent_id: &str,
    ) -> Result<Cancellation, AppError> {
        let refund = self.issue_refund(&booking, payment_intent_id).await?;

        let change = StatusChange {
            expected: booking.status,
            status: BookingStatus::Cancelled,
            payment_status: PaymentStatus::Refunded,
            payment_intent_id: None,
            refund_id: Some(refund.id.clone()),
        };
        let cancelled = self.apply_cancel(booking.id, change).await?;
        tracing::info!("Reserva {} cancelada com estorno {}", cancelled.id, refund.id);
        self.notify_cancelled(&cancelled, Some(refund.clone())).await;
        Ok(Cancellation { booking: cancelled, refund: Some(refund) })
    }

    async fn issue_refund(&self, booking: &Booking, payment_intent_id: &str) -> Result<Refund, AppError> {
        self.gateway
            .create_refund(CreateRefundRequest {
                payment_intent_id: payment_intent_id.to_string(),
                reason: REFUND_REASON.to_string(),
                idempotency_key: idempotency_key(booking.id, "refund"),
            })
            .await
            .map_err(|source| {
                tracing::warn!("Estorno da reserva {} falhou: {}", booking.id, source);
                AppError::RefundFailed { booking_id: booking.id, source }
            })
    }

    /// Fecha o intent da reserva pendente no gateway. Um intent já pago ou
    /// em processamento não é tocado.
    async fn release_intent(&self, booking: &Booking) -> Result<IntentRelease, AppError> {
        let Some(intent_id) = booking.payment_intent_id.as_deref() else {
            return Ok(IntentRelease::Released);
        };

        let intent = self.gateway.retrieve_intent(intent_id).await?;
        let status = match intent.status {
            IntentStatus::Canceled => return Ok(IntentRelease::Released),
            IntentStatus::Succeeded => return Ok(IntentRelease::Paid(intent)),
            IntentStatus::Processing | IntentStatus::Unknown => {
                return Ok(IntentRelease::InFlight(intent.status));
            }
            _ => {
                let closed = self
                    .gateway
                    .cancel_intent(intent_id, &idempotency_key(booking.id, "intent-cancel"))
                    .await?;
                closed.status
            }
        };

        tracing::info!("Intent {} da reserva {} cancelado no gateway", intent_id, booking.id);
        Ok(match status {
            IntentStatus::Canceled => IntentRelease::Released,
            other => IntentRelease::InFlight(other),
        })
    }

    /// Reserva encerrada (`cancelled`/`failed`) cujo intent acabou pago:
    /// estorna e marca o pagamento como `refunded`.
    async fn refund_stray_payment(&self, booking: &Booking) -> Result<Option<Cancellation>, AppError> {
        let Some(intent_id) = booking.payment_intent_id.as_deref() else {
            return Ok(None);
        };
        if booking.status.holds_room() || booking.payment_status == PaymentStatus::Refunded {
            return Ok(None);
        }

        let intent = self.gateway.retrieve_intent(intent_id).await?;
        if intent.status != IntentStatus::Succeeded {
            return Ok(None);
        }

        let refund = self.issue_refund(booking, intent_id).await?;
        let change = StatusChange {
            expected: booking.status,
            status: booking.status,
            payment_status: PaymentStatus::Refunded,
            payment_intent_id: None,
            refund_id: Some(refund.id.clone()),
        };
        let updated = match self.bookings.transition(booking.id, change).await? {
            Some(updated) => updated,
            None => self.load(booking.id).await?,
        };

        tracing::warn!(
            "Pagamento {} chegou para a reserva {} já {}; estorno {}",
            intent_id,
            booking.id,
            booking.status.as_str(),
            refund.id
        );
        self.notify_cancelled(&updated, Some(refund.clone())).await;
        Ok(Some(Cancellation { booking: updated, refund: Some(refund) }))
    }

    async fn apply_cancel(&self, booking_id: Uuid, change: StatusChange) -> Result<Booking, AppError> {
        match self.bookings.transition(booking_id, change).await? {
            Some(booking) => Ok(booking),
            None => {
                let current = self.load(booking_id).await?;
                Err(AppError::InvalidTransition { from: current.status, to: BookingStatus::Cancelled })
            }
        }
    }

    async fn notify_cancelled(&self, booking: &Booking, refund: Option<Refund>) {
        let room_name = self.room_name(booking.room_id).await;
        self.notifier.notify(BookingEvent::Cancelled {
            booking: booking.clone(),
            room_name,
            refund,
        });
    }

    /// Estorno pelo id do intent (rota `/api/refund`).
    pub async fn refund_by_intent(
        &self,
        actor: Actor,
        payment_intent_id: &str,
    ) -> Result<Cancellation, AppError> {
        let booking = self.load_by_intent(payment_intent_id).await?;
        authorize(actor, &booking)?;

        if let Some(stray) = self.refund_stray_payment(&booking).await? {
            return Ok(stray);
        }
        self.cancel(actor, booking.id).await
    }

    // --- EXPIRAÇÃO ---

    /// Move para `failed` as reservas pendentes além da janela de pagamento.
    /// Se o intent já tiver sido pago, confirma em vez de expirar.
    pub async fn expire_abandoned(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let cutoff = now - self.settings.payment_timeout;
        let stale = self.bookings.find_pending_created_before(cutoff).await?;
        let mut expired = 0;

        for booking in stale {
            match self.release_intent(&booking).await {
                Ok(IntentRelease::Released) => {}
                Ok(IntentRelease::Paid(intent)) => {
                    if let Err(e) = self.settle(booking.clone(), &intent).await {
                        tracing::warn!("Não foi possível confirmar a reserva {}: {}", booking.id, e);
                    }
                    continue;
                }
                Ok(IntentRelease::InFlight(_)) => continue,
                Err(e) => {
                    tracing::warn!("Intent da reserva {} não foi fechado; reserva mantida: {}", booking.id, e);
                    continue;
                }
            }

            let change = StatusChange {
                expected: BookingStatus::Pending,
                status: BookingStatus::Failed,
                payment_status: PaymentStatus::Pending,
                payment_intent_id: None,
                refund_id: None,
            };
            if self.bookings.transition(booking.id, change).await?.is_some() {
                tracing::info!("Reserva {} expirou sem pagamento", booking.id);
                expired += 1;
            }
        }

        Ok(expired)
    }

    /// Roda `expire_abandoned` periodicamente em background.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match service.expire_abandoned(Utc::now()).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("{} reserva(s) pendente(s) expirada(s)", n),
                    Err(e) => tracing::error!("Falha ao expirar reservas pendentes: {}", e),
                }
            }
        })
    }

    // --- CONSULTAS ---

    /// Períodos ativos (`pending`/`confirmed`) do quarto dentro da janela.
    pub async fn booked_dates(
        &self,
        room_id: Uuid,
        query: BookedDatesQuery,
        today: NaiveDate,
    ) -> Result<Vec<BookedRange>, AppError> {
        let from = query.from.unwrap_or(today);
        let to = query.to.unwrap_or(from + chrono::Duration::days(MAX_NIGHTS));
        if to <= from {
            return Err(AppError::InvalidDateRange);
        }
        if (to - from).num_days() > 2 * MAX_NIGHTS {
            return Err(AppError::InvalidInput("The date window is limited to two years.".to_string()));
        }

        self.rooms
            .find_by_id(room_id)
            .await?
            .ok_or(AppError::RoomNotFound(room_id))?;

        // Falha de leitura não pode virar calendário livre
        let mut bookings = self
            .bookings
            .find_active_overlapping(room_id, from, to)
            .await
            .map_err(|e| AppError::AvailabilityCheckFailed(e.to_string()))?;
        bookings.sort_by_key(|b| b.check_in);

        Ok(bookings
            .into_iter()
            .map(|b| BookedRange { check_in: b.check_in, check_out: b.check_out })
            .collect())
    }

    pub async fn get(&self, actor: Actor, booking_id: Uuid) -> Result<Booking, AppError> {
        self.load_authorized(actor, booking_id).await
    }

    pub async fn list_for_user(&self, actor: Actor) -> Result<Vec<Booking>, AppError> {
        self.bookings.list_by_user(actor.user_id).await
    }

    pub async fn list_all(&self, filter: &BookingListFilter) -> Result<Vec<Booking>, AppError> {
        let all = self.bookings.list_all().await?;
        Ok(all.into_iter().filter(|b| filter.matches(b)).collect())
    }

    // --- Helpers ---

    async fn load(&self, booking_id: Uuid) -> Result<Booking, AppError> {
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(AppError::BookingNotFound(booking_id))
    }

    async fn load_authorized(&self, actor: Actor, booking_id: Uuid) -> Result<Booking, AppError> {
        let booking = self.load(booking_id).await?;
        authorize(actor, &booking)?;
        Ok(booking)
    }

    async fn load_by_intent(&self, payment_intent_id: &str) -> Result<Booking, AppError> {
        self.bookings
            .find_by_payment_intent(payment_intent_id)
            .await?
            .ok_or_else(|| {
                AppError::InvalidInput("No booking is associated with this payment.".to_string())
            })
    }

    async fn room_name(&self, room_id: Uuid) -> String {
        match self.rooms.find_by_id(room_id).await {
            Ok(Some(room)) => room.name,
            _ => "your room".to_string(),
        }
    }
}

fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

fn authorize(actor: Actor, booking: &Booking) -> Result<(), AppError> {
    if actor.is_admin || booking.user_id == actor.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        db::memory::{InMemoryBookingStore, InMemoryRoomStore},
        models::{pricing::PromoOutcome, room::RoomStatus},
        services::{
            notification::{MailSettings, NotificationDispatcher, RetryConfig, fake::RecordingMailer},
            payment_gateway::fake::FakeGateway,
            pricing::PromoTable,
        },
    };

    struct Harness {
        service: BookingService,
        store: Arc<InMemoryBookingStore>,
        gateway: Arc<FakeGateway>,
        mailer: Arc<RecordingMailer>,
        room: Room,
        guest: Actor,
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn room(price: &str, capacity: i32, status: RoomStatus) -> Room {
        Room {
            id: Uuid::new_v4(),
            name: "Deluxe King".into(),
            description: None,
            price: d(price),
            capacity,
            size: 30,
            images: vec![],
            amenities: vec![],
            featured: false,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn harness_with(room: Room, mailer: RecordingMailer) -> Harness {
        let store = Arc::new(InMemoryBookingStore::default());
        let rooms = Arc::new(InMemoryRoomStore::with_rooms(vec![room.clone()]));
        let gateway = Arc::new(FakeGateway::default());
        let mailer = Arc::new(mailer);
        let retry = RetryConfig {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        };
        let (notifier, _worker) = NotificationDispatcher::spawn(
            mailer.clone(),
            MailSettings { from: "noreply@viewmont.test".into(), hotel_email: None },
            retry,
            16,
        );
        let service = BookingService::new(
            store.clone(),
            rooms,
            PricingCalculator::new(d("0.12"), PromoTable::default()),
            gateway.clone(),
            notifier,
            BookingSettings { currency: "cad".into(), payment_timeout: chrono::Duration::minutes(30) },
        );
        Harness {
            service,
            store,
            gateway,
            mailer,
            room,
            guest: Actor { user_id: Uuid::new_v4(), is_admin: false },
        }
    }

    fn harness() -> Harness {
        harness_with(room("125.00", 2, RoomStatus::Available), RecordingMailer::default())
    }

    fn reserve_payload(room_id: Uuid, check_in: NaiveDate, check_out: NaiveDate) -> ReservePayload {
        ReservePayload {
            room_id,
            guest_name: "John Smith".into(),
            guest_email: "John@Example.com".into(),
            check_in,
            check_out,
            guests: 2,
            promo_code: Some("WELCOME10".into()),
            special_requests: Some("  ".into()),
        }
    }

    fn intent_payload(booking_id: Uuid) -> CreatePaymentIntentPayload {
        CreatePaymentIntentPayload { booking_id, amount: None, currency: None }
    }

    async fn wait_for_mail(mailer: &RecordingMailer, count: usize) {
        for _ in 0..100 {
            if mailer.sent().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn confirmed_booking(h: &Harness) -> Booking {
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
        let handle = h.service.request_payment(h.guest, intent_payload(booking.id)).await.unwrap();
        h.gateway.set_status(&handle.payment_intent_id, IntentStatus::Succeeded);
        h.service.confirm_payment(h.guest, &handle.payment_intent_id).await.unwrap()
    }

    #[tokio::test]
    async fn quote_applies_welcome10() {
        let h = harness();
        let quote = h
            .service
            .quote(QuotePayload {
                room_id: h.room.id,
                check_in: date(1, 10),
                check_out: date(1, 13),
                guests: 1,
                promo_code: Some("WELCOME10".into()),
            })
            .await
            .unwrap();

        assert_eq!(quote.room_name, "Deluxe King");
        assert_eq!(quote.quote.subtotal, d("375.00"));
        assert_eq!(quote.quote.tax, d("45.00"));
        assert_eq!(quote.quote.discount, d("42.00"));
        assert_eq!(quote.quote.grand_total, d("378.00"));
    }

    #[tokio::test]
    async fn quote_rejects_too_many_guests() {
        let h = harness();
        let err = h
            .service
            .quote(QuotePayload {
                room_id: h.room.id,
                check_in: date(1, 10),
                check_out: date(1, 13),
                guests: 3,
                promo_code: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidGuestCount { guests: 3, capacity: 2 }));
    }

    #[tokio::test]
    async fn absurdly_long_stay_is_rejected_before_booking() {
        let h = harness();
        let payload = reserve_payload(h.room.id, date(1, 10), NaiveDate::from_ymd_opt(9999, 1, 1).unwrap());

        let err = h.service.reserve(h.guest, payload).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(h.service.list_for_user(h.guest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn maintenance_room_is_not_bookable() {
        let h = harness_with(room("125.00", 2, RoomStatus::Maintenance), RecordingMailer::default());
        let err = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RoomNotBookable(_)));
    }

    #[tokio::test]
    async fn reserve_freezes_quote_and_normalizes_input() {
        let h = harness();
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.total_price, d("378.00"));
        assert_eq!(booking.promo_code.as_deref(), Some("WELCOME10"));
        assert_eq!(booking.guest_email, "john@example.com");
        assert_eq!(booking.special_requests, None);
        assert_eq!(booking.nights, 3);
    }

    #[tokio::test]
    async fn unknown_promo_still_books_at_full_price() {
        let h = harness();
        let mut payload = reserve_payload(h.room.id, date(1, 10), date(1, 13));
        payload.promo_code = Some("FOO123".into());

        let booking = h.service.reserve(h.guest, payload).await.unwrap();
        assert_eq!(booking.total_price, d("420.00"));
        assert_eq!(booking.promo_code, None);

        let quote = h
            .service
            .quote(QuotePayload {
                room_id: h.room.id,
                check_in: date(2, 1),
                check_out: date(2, 4),
                guests: 1,
                promo_code: Some("FOO123".into()),
            })
            .await
            .unwrap();
        assert!(matches!(quote.quote.promo, PromoOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn overlapping_reservation_is_rejected_but_adjacent_is_fine() {
        let h = harness();
        h.service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 15)))
            .await
            .unwrap();

        let err = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 14), date(1, 20)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RoomUnavailable));

        h.service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 15), date(1, 20)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn store_outage_is_reported_not_booked() {
        let h = harness();
        h.store.set_offline(true);
        let err = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AvailabilityCheckFailed(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_overlapping_reservations_only_one_wins() {
        let h = harness();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = h.service.clone();
            let payload = reserve_payload(h.room.id, date(3, 1), date(3, 5));
            let actor = Actor { user_id: Uuid::new_v4(), is_admin: false };
            handles.push(tokio::spawn(async move { service.reserve(actor, payload).await }));
        }

        let mut won = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => won += 1,
                Err(AppError::RoomUnavailable) => {}
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!(won, 1);
    }

    #[tokio::test]
    async fn request_payment_is_idempotent_and_uses_stored_total() {
        let h = harness();
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();

        let first = h.service.request_payment(h.guest, intent_payload(booking.id)).await.unwrap();
        let second = h.service.request_payment(h.guest, intent_payload(booking.id)).await.unwrap();

        assert_eq!(first.payment_intent_id, second.payment_intent_id);
        assert_eq!(h.gateway.create_count(), 1);
        assert_eq!(first.amount, d("378.00"));

        let intent = h.gateway.intent(&first.payment_intent_id).unwrap();
        assert_eq!(intent.amount, 37800);
        assert_eq!(intent.metadata["bookingId"], booking.id.to_string());
        assert_eq!(intent.metadata["checkIn"], "2024-01-10");
    }

    #[tokio::test]
    async fn request_payment_rejects_tampered_amount() {
        let h = harness();
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();

        let payload = CreatePaymentIntentPayload {
            booking_id: booking.id,
            amount: Some(d("1.00")),
            currency: None,
        };
        let err = h.service.request_payment(h.guest, payload).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(h.gateway.create_count(), 0);
    }

    #[tokio::test]
    async fn other_guests_cannot_touch_the_booking() {
        let h = harness();
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
        let stranger = Actor { user_id: Uuid::new_v4(), is_admin: false };

        let err = h.service.request_payment(stranger, intent_payload(booking.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let err = h.service.cancel(stranger, booking.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let admin = Actor { user_id: Uuid::new_v4(), is_admin: true };
        assert_eq!(h.service.get(admin, booking.id).await.unwrap().id, booking.id);
    }

    #[tokio::test]
    async fn confirm_payment_marks_paid_and_notifies() {
        let h = harness();
        let confirmed = confirmed_booking(&h).await;

        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.payment_status, PaymentStatus::Paid);

        wait_for_mail(&h.mailer, 1).await;
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "john@example.com");

        // Segunda confirmação devolve a mesma reserva
        let again = h
            .service
            .confirm_payment(h.guest, confirmed.payment_intent_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(again.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn mail_failure_does_not_undo_confirmation() {
        let h = harness_with(room("125.00", 2, RoomStatus::Available), RecordingMailer::failing(u32::MAX));
        let confirmed = confirmed_booking(&h).await;

        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        let stored = h.service.get(h.guest, confirmed.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn declined_payment_fails_booking_and_frees_room() {
        let h = harness();
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
        let handle = h.service.request_payment(h.guest, intent_payload(booking.id)).await.unwrap();
        h.gateway.set_status(&handle.payment_intent_id, IntentStatus::Canceled);

        let err = h.service.confirm_payment(h.guest, &handle.payment_intent_id).await.unwrap_err();
        assert!(matches!(err, AppError::PaymentDeclined(_)));
        assert_eq!(h.service.get(h.guest, booking.id).await.unwrap().status, BookingStatus::Failed);

        h.service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn processing_payment_leaves_booking_pending() {
        let h = harness();
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
        let handle = h.service.request_payment(h.guest, intent_payload(booking.id)).await.unwrap();
        h.gateway.set_status(&handle.payment_intent_id, IntentStatus::Processing);

        let err = h.service.confirm_payment(h.guest, &handle.payment_intent_id).await.unwrap_err();
        assert!(matches!(err, AppError::PaymentIncomplete(IntentStatus::Processing)));
        assert_eq!(h.service.get(h.guest, booking.id).await.unwrap().status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn cancelling_confirmed_booking_refunds_it() {
        let h = harness();
        let confirmed = confirmed_booking(&h).await;

        let result = h.service.cancel(h.guest, confirmed.id).await.unwrap();
        let refund = result.refund.unwrap();

        assert_eq!(result.booking.status, BookingStatus::Cancelled);
        assert_eq!(result.booking.payment_status, PaymentStatus::Refunded);
        assert_eq!(result.booking.refund_id.as_deref(), Some(refund.id.as_str()));
        assert_eq!(refund.amount, 37800);

        let requests = h.gateway.refunds();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].reason, "requested_by_customer");
        assert_eq!(requests[0].idempotency_key, format!("booking-{}-refund", confirmed.id));

        let err = h.service.cancel(h.guest, confirmed.id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition { from: BookingStatus::Cancelled, to: BookingStatus::Cancelled }
        ));
    }

    #[tokio::test]
    async fn failed_refund_keeps_booking_confirmed() {
        let h = harness();
        let confirmed = confirmed_booking(&h).await;
        *h.gateway.fail_refunds.lock().unwrap() = true;

        let err = h.service.cancel(h.guest, confirmed.id).await.unwrap_err();
        assert!(matches!(err, AppError::RefundFailed { .. }));

        let stored = h.service.get(h.guest, confirmed.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn pending_booking_cancels_without_refund() {
        let h = harness();
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();

        let result = h.service.cancel(h.guest, booking.id).await.unwrap();
        assert!(result.refund.is_none());
        assert_eq!(result.booking.status, BookingStatus::Cancelled);
        assert!(h.gateway.refunds().is_empty());
    }

    async fn pending_with_intent(h: &Harness) -> (Booking, String) {
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
        let handle = h.service.request_payment(h.guest, intent_payload(booking.id)).await.unwrap();
        (booking, handle.payment_intent_id)
    }

    #[tokio::test]
    async fn cancelling_pending_booking_closes_its_intent() {
        let h = harness();
        let (booking, intent_id) = pending_with_intent(&h).await;

        let result = h.service.cancel(h.guest, booking.id).await.unwrap();
        assert_eq!(result.booking.status, BookingStatus::Cancelled);
        assert!(result.refund.is_none());
        assert_eq!(h.gateway.cancels(), vec![intent_id.clone()]);
        assert_eq!(h.gateway.intent(&intent_id).unwrap().status, IntentStatus::Canceled);
    }

    #[tokio::test]
    async fn cancelling_paid_pending_booking_refunds_it() {
        let h = harness();
        let (booking, intent_id) = pending_with_intent(&h).await;
        h.gateway.set_status(&intent_id, IntentStatus::Succeeded);

        let result = h.service.cancel(h.guest, booking.id).await.unwrap();
        assert_eq!(result.booking.status, BookingStatus::Cancelled);
        assert_eq!(result.booking.payment_status, PaymentStatus::Refunded);
        assert_eq!(result.refund.unwrap().amount, 37800);
        assert_eq!(h.gateway.refunds().len(), 1);
        assert!(h.gateway.cancels().is_empty());
    }

    #[tokio::test]
    async fn pending_booking_with_payment_in_flight_is_not_cancelled() {
        let h = harness();
        let (booking, intent_id) = pending_with_intent(&h).await;
        h.gateway.set_status(&intent_id, IntentStatus::Processing);

        let err = h.service.cancel(h.guest, booking.id).await.unwrap_err();
        assert!(matches!(err, AppError::PaymentIncomplete(IntentStatus::Processing)));
        assert_eq!(h.service.get(h.guest, booking.id).await.unwrap().status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn declined_intent_is_closed_before_failing_the_booking() {
        let h = harness();
        let (booking, intent_id) = pending_with_intent(&h).await;

        // Intent novo continua em requires_payment_method depois da recusa
        let err = h.service.confirm_payment(h.guest, &intent_id).await.unwrap_err();
        assert!(matches!(err, AppError::PaymentDeclined(_)));
        assert_eq!(h.gateway.intent(&intent_id).unwrap().status, IntentStatus::Canceled);
        assert_eq!(h.service.get(h.guest, booking.id).await.unwrap().status, BookingStatus::Failed);
    }

    #[tokio::test]
    async fn decline_after_concurrent_confirmation_reports_the_confirmation() {
        let h = harness();
        let (stale, intent_id) = pending_with_intent(&h).await;
        h.gateway.set_status(&intent_id, IntentStatus::Succeeded);
        h.service.confirm_payment(h.guest, &intent_id).await.unwrap();

        let mut declined = h.gateway.intent(&intent_id).unwrap();
        declined.status = IntentStatus::Canceled;
        let current = h.service.settle(stale, &declined).await.unwrap();
        assert_eq!(current.status, BookingStatus::Confirmed);
        assert_eq!(current.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn expired_booking_closes_its_intent() {
        let h = harness();
        let (booking, intent_id) = pending_with_intent(&h).await;
        h.store.backdate(booking.id, Utc::now() - chrono::Duration::hours(2));

        assert_eq!(h.service.expire_abandoned(Utc::now()).await.unwrap(), 1);
        assert_eq!(h.gateway.intent(&intent_id).unwrap().status, IntentStatus::Canceled);
        assert_eq!(h.service.get(h.guest, booking.id).await.unwrap().status, BookingStatus::Failed);
    }

    #[tokio::test]
    async fn late_payment_on_closed_booking_is_refunded() {
        let h = harness();
        let (booking, intent_id) = pending_with_intent(&h).await;
        h.store.backdate(booking.id, Utc::now() - chrono::Duration::hours(2));
        h.service.expire_abandoned(Utc::now()).await.unwrap();

        // O pagamento passou no gateway mesmo assim
        h.gateway.set_status(&intent_id, IntentStatus::Succeeded);
        let err = h.service.confirm_payment(h.guest, &intent_id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::PaymentRefunded { status: BookingStatus::Failed, .. }
        ));

        let stored = h.service.get(h.guest, booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Failed);
        assert_eq!(stored.payment_status, PaymentStatus::Refunded);
        assert!(stored.refund_id.is_some());
        assert_eq!(h.gateway.refunds().len(), 1);

        // Nada mais a estornar
        let err = h.service.refund_by_intent(h.guest, &intent_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { from: BookingStatus::Failed, .. }));
        assert_eq!(h.gateway.refunds().len(), 1);
    }

    #[tokio::test]
    async fn refund_by_intent_returns_late_payment_on_cancelled_booking() {
        let h = harness();
        let (booking, intent_id) = pending_with_intent(&h).await;
        h.service.cancel(h.guest, booking.id).await.unwrap();
        h.gateway.set_status(&intent_id, IntentStatus::Succeeded);

        let result = h.service.refund_by_intent(h.guest, &intent_id).await.unwrap();
        assert!(result.refund.is_some());
        assert_eq!(result.booking.status, BookingStatus::Cancelled);
        assert_eq!(result.booking.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn refund_by_intent_resolves_the_booking() {
        let h = harness();
        let confirmed = confirmed_booking(&h).await;
        let intent_id = confirmed.payment_intent_id.clone().unwrap();

        let result = h.service.refund_by_intent(h.guest, &intent_id).await.unwrap();
        assert_eq!(result.booking.id, confirmed.id);
        assert!(result.refund.is_some());

        let err = h.service.refund_by_intent(h.guest, "pi_unknown").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn abandoned_pending_bookings_expire() {
        let h = harness();
        let stale = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
        let fresh = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(2, 10), date(2, 13)))
            .await
            .unwrap();
        h.store.backdate(stale.id, Utc::now() - chrono::Duration::hours(2));

        let expired = h.service.expire_abandoned(Utc::now()).await.unwrap();
        assert_eq!(expired, 1);
        assert_eq!(h.service.get(h.guest, stale.id).await.unwrap().status, BookingStatus::Failed);
        assert_eq!(h.service.get(h.guest, fresh.id).await.unwrap().status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn paid_but_unconfirmed_booking_is_confirmed_by_sweeper() {
        let h = harness();
        let booking = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
        let handle = h.service.request_payment(h.guest, intent_payload(booking.id)).await.unwrap();
        h.gateway.set_status(&handle.payment_intent_id, IntentStatus::Succeeded);
        h.store.backdate(booking.id, Utc::now() - chrono::Duration::hours(2));

        let expired = h.service.expire_abandoned(Utc::now()).await.unwrap();
        assert_eq!(expired, 0);
        assert_eq!(h.service.get(h.guest, booking.id).await.unwrap().status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn booked_dates_lists_only_active_stays_in_the_window() {
        let h = harness();
        let later = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(3, 1), date(3, 4)))
            .await
            .unwrap();
        let earlier = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
        let cancelled = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(2, 1), date(2, 5)))
            .await
            .unwrap();
        h.service.cancel(h.guest, cancelled.id).await.unwrap();

        let ranges = h
            .service
            .booked_dates(h.room.id, BookedDatesQuery::default(), date(1, 1))
            .await
            .unwrap();
        assert_eq!(
            ranges,
            vec![
                BookedRange { check_in: earlier.check_in, check_out: earlier.check_out },
                BookedRange { check_in: later.check_in, check_out: later.check_out },
            ]
        );

        // Check-out em 13/01 libera o próprio dia 13
        let query = BookedDatesQuery { from: Some(date(1, 13)), to: Some(date(2, 28)) };
        assert!(h.service.booked_dates(h.room.id, query, date(1, 1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn booked_dates_rejects_bad_windows_and_unknown_rooms() {
        let h = harness();
        let inverted = BookedDatesQuery { from: Some(date(2, 1)), to: Some(date(1, 1)) };
        assert!(matches!(
            h.service.booked_dates(h.room.id, inverted, date(1, 1)).await,
            Err(AppError::InvalidDateRange)
        ));
        assert!(matches!(
            h.service.booked_dates(Uuid::new_v4(), BookedDatesQuery::default(), date(1, 1)).await,
            Err(AppError::RoomNotFound(_))
        ));

        h.store.set_offline(true);
        assert!(matches!(
            h.service.booked_dates(h.room.id, BookedDatesQuery::default(), date(1, 1)).await,
            Err(AppError::AvailabilityCheckFailed(_))
        ));
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_filterable() {
        let h = harness();
        let first = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(1, 10), date(1, 13)))
            .await
            .unwrap();
        let second = h
            .service
            .reserve(h.guest, reserve_payload(h.room.id, date(2, 10), date(2, 13)))
            .await
            .unwrap();
        h.store.backdate(first.id, Utc::now() - chrono::Duration::minutes(5));
        h.service.cancel(h.guest, second.id).await.unwrap();

        let mine = h.service.list_for_user(h.guest).await.unwrap();
        assert_eq!(mine.iter().map(|b| b.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let other = Actor { user_id: Uuid::new_v4(), is_admin: false };
        assert!(h.service.list_for_user(other).await.unwrap().is_empty());

        let filter = BookingListFilter { status: Some(BookingStatus::Pending), room_id: None };
        let pending = h.service.list_all(&filter).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first.id);
    }
}
