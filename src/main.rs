//src/main.rs

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; padrão "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    app_state.booking_service.spawn_sweeper(config.sweep_interval);

    let app = router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let public_routes = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/rooms", get(handlers::rooms::list_rooms))
        .route("/rooms/{id}", get(handlers::rooms::get_room))
        .route("/rooms/{id}/booked-dates", get(handlers::rooms::booked_dates))
        .route("/bookings/quote", post(handlers::bookings::quote))
        .nest("/auth", auth_routes);

    // Rotas protegidas pelo middleware
    let protected_routes = Router::new()
        .route("/users/me", get(handlers::auth::get_me).put(handlers::auth::update_me))
        .route("/bookings", post(handlers::bookings::create_booking))
        .route("/bookings/me", get(handlers::bookings::my_bookings))
        .route("/bookings/{id}", get(handlers::bookings::get_booking))
        .route("/bookings/{id}/cancel", post(handlers::bookings::cancel_booking))
        .route("/create-payment-intent", post(handlers::payments::create_payment_intent))
        .route("/confirm-payment", post(handlers::payments::confirm_payment))
        .route("/refund", post(handlers::payments::refund))
        // O extrator AdminUser checa o papel em cada handler
        .route("/admin/bookings", get(handlers::bookings::list_all_bookings))
        .route("/admin/rooms", post(handlers::rooms::create_room))
        .route(
            "/admin/rooms/{id}",
            put(handlers::rooms::update_room).delete(handlers::rooms::delete_room),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(app_state)
}
