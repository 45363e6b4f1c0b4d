//! bookline-server: webhook front end for the booking platform.
//!
//! Wires the dialogue engine to Postgres repositories, the NATS notifier,
//! and the channel push client, and serves the per-tenant webhook.

mod app;
mod channel;
mod config;
mod db;
mod error;
mod notify;
mod routes;
mod vault;

use crate::app::AppState;
use crate::channel::ChannelClient;
use crate::config::ServerConfig;
use crate::db::{PgCatalog, PgLedger, PgSessionStore, PgSettings, PgStaffing};
use crate::notify::{LogOnlyDispatcher, NatsDispatcher};
use crate::vault::PgVault;
use bookline_availability::SettingsProvider;
use bookline_catalog::CatalogProvider;
use bookline_dialogue::{DialogueEngine, EngineConfig};
use bookline_ledger::{BookingLedger, CommitService, NotificationDispatcher};
use bookline_session::{SessionGate, SessionStore};
use bookline_staffing::StaffProvider;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let store: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(db_pool.clone()));
    let gate = Arc::new(SessionGate::new());

    // Expiry is enforced on read; the sweep only reclaims storage.
    match store.sweep_expired(Utc::now()).await {
        Ok(count) if count > 0 => {
            tracing::info!(swept_sessions = count, "Swept expired sessions on startup");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Failed to sweep expired sessions on startup");
        }
    }

    let sweep_store = Arc::clone(&store);
    let sweep_gate = Arc::clone(&gate);
    let sweep_interval_secs = config.session.sweep_interval_seconds;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(sweep_interval_secs));
        loop {
            interval.tick().await;
            match sweep_store.sweep_expired(Utc::now()).await {
                Ok(count) if count > 0 => {
                    tracing::debug!(swept_sessions = count, "Periodic session sweep");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to sweep expired sessions");
                }
            }
            let released = sweep_gate.compact();
            if released > 0 {
                tracing::debug!(released_gates = released, "Compacted idle session gates");
            }
        }
    });

    let catalog: Arc<dyn CatalogProvider> = Arc::new(PgCatalog::new(db_pool.clone()));
    let staffing: Arc<dyn StaffProvider> = Arc::new(PgStaffing::new(db_pool.clone()));
    let settings: Arc<dyn SettingsProvider> = Arc::new(PgSettings::new(db_pool.clone()));
    let ledger: Arc<dyn BookingLedger> = Arc::new(PgLedger::new(db_pool.clone()));

    let dispatcher: Arc<dyn NotificationDispatcher> = match &config.nats.url {
        Some(url) => {
            tracing::info!("Connecting to NATS...");
            Arc::new(
                NatsDispatcher::connect(url)
                    .await
                    .expect("failed to connect to NATS"),
            )
        }
        None => {
            tracing::warn!("No NATS URL configured; notifications will be logged and dropped");
            Arc::new(LogOnlyDispatcher)
        }
    };

    let commit = Arc::new(CommitService::new(
        Arc::clone(&ledger),
        Arc::clone(&catalog),
        Arc::clone(&staffing),
        Arc::clone(&settings),
        dispatcher,
    ));
    let engine = Arc::new(DialogueEngine::new(
        store,
        gate,
        catalog,
        staffing,
        settings,
        ledger,
        commit,
        EngineConfig::default(),
    ));

    let channel = ChannelClient::new(&config.channel).expect("failed to build channel client");
    let state = AppState {
        engine,
        vault: Arc::new(PgVault::new(db_pool)),
        channel,
    };

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listen address");
    tracing::info!(addr = %config.listen_addr, "Listening");

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("Shutting down");
}
