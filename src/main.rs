//! Tourguard - Emergency SOS and complaint lifecycle backend for tourist safety.
//!
//! # API Endpoints
//!
//! - `/sos/*` - Tourist complaint submission, tracking and feedback
//! - `/authority/*` - Triage, assignment, resolution and dashboards
//! - `/notifications` - The caller's notifications
//! - `GET /health` - Health check
//!
//! See [`tourguard::api`] for the full route table.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tourguard::api::{self, AppState};
use tourguard::config::Config;
use tourguard::lifecycle::ComplaintService;
use tourguard::notify::Notifier;
use tourguard::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Complaint text and contact details stay out of logs at the default level
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tourguard=info".parse()?))
        .init();

    let config = Config::from_env()?;
    info!(port = config.port, db_url = %config.database_url, "Starting Tourguard server");

    let storage = Storage::new(&config.database_url).await?;
    info!("Database initialized");

    let (notifier, _delivery) = Notifier::spawn(storage.clone());
    let complaints = ComplaintService::new(storage.clone(), notifier);

    let state = AppState {
        storage,
        complaints,
        jwt: Arc::new(config.jwt),
    };
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Tourguard is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
