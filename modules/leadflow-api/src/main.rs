use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadflow_common::Config;
use leadflow_engine::notify::{Mailer, NoopMailer, PostmarkMailer};
use leadflow_engine::{Ctx, Services};
use leadflow_store::Store;
use stripe_client::StripeClient;

mod rest;

pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub services: Services,
    pub mailer: Arc<dyn Mailer>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadflow=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await?;
    let store = Store::new(pool);
    store.migrate().await?;
    info!("Connected to database, migrations complete");

    let mailer: Arc<dyn Mailer> = match &config.postmark_token {
        Some(token) => {
            info!("Using Postmark mailer");
            Arc::new(PostmarkMailer::new(token.clone(), config.mail_from.clone()))
        }
        None => {
            info!("No mail provider configured; emails are logged only");
            Arc::new(NoopMailer)
        }
    };

    let stripe = Arc::new(StripeClient::new(config.stripe_secret_key.clone()));

    let services = Services::new(Ctx {
        store: store.clone(),
        mailer: mailer.clone(),
        stripe,
        base_url: config.public_base_url.clone(),
        currency: config.currency.clone(),
    });

    let state = Arc::new(AppState {
        config,
        store,
        services,
        mailer,
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Ingestion
        .route("/webhook/{token}", post(rest::webhook::source_webhook))
        .route(
            "/api/leads",
            post(rest::webhook::submit_lead).get(rest::admin::list_leads),
        )
        // Assignment
        .route("/api/leads/assign", post(rest::assign::assign))
        .route("/api/leads/assign-bulk", post(rest::assign::assign_bulk))
        // Contracts
        .route("/api/contracts", post(rest::contracts::create))
        .route(
            "/api/contracts/{id}/confirm/{token}",
            get(rest::contracts::view),
        )
        .route("/api/contracts/{id}/confirm", post(rest::contracts::confirm))
        // Follow-ups
        .route(
            "/api/followups/{id}/{token}",
            get(rest::followups::view),
        )
        .route("/api/followups/{id}", post(rest::followups::submit))
        // Payments
        .route("/webhook/stripe", post(rest::payments::stripe_webhook))
        .route("/api/payments/verify", post(rest::payments::verify))
        .route("/payment/success", get(rest::payments::success_redirect))
        // Invoices
        .route("/api/invoices/{id}", get(rest::invoices::document))
        // Packages
        .route("/api/packages", post(rest::packages::create))
        .route("/api/packages/{id}/deliver", post(rest::packages::deliver))
        // Reference data
        .route(
            "/api/brokers",
            post(rest::admin::create_broker).get(rest::admin::list_brokers),
        )
        .route(
            "/api/categories",
            post(rest::admin::create_category).get(rest::admin::list_categories),
        )
        .route(
            "/api/sources",
            post(rest::admin::create_source).get(rest::admin::list_sources),
        )
        // Scheduled sweeps — GET so any cron runner can hit them; all are
        // idempotent per row.
        .route("/cron/followups", get(rest::cron::followups))
        .route("/cron/packages", get(rest::cron::packages))
        .route("/cron/outbox", get(rest::cron::outbox))
        .route("/cron/commissions", get(rest::cron::commissions))
        .route("/cron/subscriptions", get(rest::cron::subscriptions))
        .route("/cron/adsync", get(rest::cron::adsync))
        .with_state(state.clone())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", state.config.web_host, state.config.web_port);
    info!("Leadflow API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
