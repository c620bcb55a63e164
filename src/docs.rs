// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::update_me,

        // --- Rooms ---
        handlers::rooms::list_rooms,
        handlers::rooms::get_room,
        handlers::rooms::booked_dates,

        // --- Bookings ---
        handlers::bookings::quote,
        handlers::bookings::create_booking,
        handlers::bookings::my_bookings,
        handlers::bookings::get_booking,
        handlers::bookings::cancel_booking,

        // --- Payments ---
        handlers::payments::create_payment_intent,
        handlers::payments::confirm_payment,
        handlers::payments::refund,

        // --- Admin ---
        handlers::bookings::list_all_bookings,
        handlers::rooms::create_room,
        handlers::rooms::update_room,
        handlers::rooms::delete_room,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::UpdateProfilePayload,

            // --- Rooms ---
            models::room::RoomStatus,
            models::room::Room,
            models::room::CreateRoomPayload,
            models::room::UpdateRoomPayload,

            // --- Bookings ---
            models::booking::BookingStatus,
            models::booking::PaymentStatus,
            models::booking::Booking,
            models::booking::QuotePayload,
            models::booking::ReservePayload,
            models::booking::QuoteResponse,
            models::booking::BookedRange,
            models::pricing::PriceQuote,
            models::pricing::PromoOutcome,

            // --- Payments ---
            models::payment::IntentStatus,
            models::payment::PaymentIntent,
            models::payment::Refund,
            models::payment::CreatePaymentIntentPayload,
            models::payment::PaymentIntentResponse,
            models::payment::ConfirmPaymentPayload,
            models::payment::RefundPayload,
            models::payment::RefundResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "Rooms", description = "Catálogo de Quartos"),
        (name = "Bookings", description = "Cotação, Reserva e Cancelamento"),
        (name = "Payments", description = "Relay de Pagamento (Stripe)"),
        (name = "Admin", description = "Painel Administrativo")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
