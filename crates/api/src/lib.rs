//! # Office Hours API
//!
//! The web server for the office-hours live queue: REST endpoints for the
//! queue, schedules and presence, plus a WebSocket realtime channel.
//!
//! ## Architecture
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate HTTP requests into service calls
//! - **Middleware**: Identity extraction and error mapping
//! - **Realtime**: Broadcast hub and per-connection WebSocket sessions
//! - **Config**: Environment configuration
//!
//! The API uses Axum as the web framework. Storage is PostgreSQL through
//! `officehours-db`, or an in-memory store when no database is configured.

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Middleware for authentication and error handling
pub mod middleware;
/// Background presence sweeper
pub mod monitor;
/// Broadcast hub and WebSocket sessions
pub mod realtime;
/// Route definitions and API endpoint structure
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    BoxError, Router,
};
use eyre::Result;
use officehours_core::{
    service::{PresenceService, QueueService, ScheduleService},
    store::{memory::MemoryStore, PresenceStore, QueueStore, ScheduleStore},
};
use officehours_db::{create_pool, schema::initialize_database, PgStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::{
    middleware::auth::{USER_ID_HEADER, USER_ROLE_HEADER},
    realtime::BroadcastHub,
};

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    pub queue: QueueService,
    pub schedules: ScheduleService,
    pub presence: PresenceService,
    pub hub: Arc<BroadcastHub>,
    /// Which storage backend is in use, reported by `/health`
    pub storage: &'static str,
}

impl ApiState {
    /// Wires every service onto one store and one broadcast hub.
    pub fn from_store<S>(store: Arc<S>, storage: &'static str, config: &config::ApiConfig) -> Self
    where
        S: QueueStore + ScheduleStore + PresenceStore + 'static,
    {
        let hub = Arc::new(BroadcastHub::new(config.broadcast_capacity));
        let queue = QueueService::new(store.clone(), store.clone(), hub.clone())
            .with_wait_window(config.wait_window());
        let schedules = ScheduleService::new(store.clone(), queue.clone());
        let presence =
            PresenceService::new(store, hub.clone()).with_offline_after(config.offline_after());

        Self {
            queue,
            schedules,
            presence,
            hub,
            storage,
        }
    }

    pub fn in_memory(config: &config::ApiConfig) -> Self {
        Self::from_store(Arc::new(MemoryStore::new()), "memory", config)
    }

    /// Uses PostgreSQL when `DATABASE_URL` is set, bootstrapping the schema,
    /// and the in-memory store otherwise.
    pub async fn from_config(config: &config::ApiConfig) -> Result<Self> {
        match &config.database_url {
            Some(database_url) => {
                let pool = create_pool(database_url).await?;
                initialize_database(&pool).await?;
                info!("Connected to PostgreSQL");
                Ok(Self::from_store(Arc::new(PgStore::new(pool)), "postgres", config))
            }
            None => {
                warn!("DATABASE_URL not set, queue state will not survive a restart");
                Ok(Self::in_memory(config))
            }
        }
    }
}

/// Installs the global `tracing` subscriber at the configured level.
pub fn init_tracing(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Builds the application router with all routes and layers
pub fn build_router(state: Arc<ApiState>, config: &config::ApiConfig) -> Router {
    let app = Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Office hours schedule management
        .merge(routes::schedule::routes())
        // Live queue
        .merge(routes::queue::routes())
        // Presence
        .merge(routes::presence::routes())
        // WebSocket realtime channel
        .merge(routes::realtime::routes())
        .with_state(state);

    // Apply CORS configuration if origins are specified
    let app = if let Some(origins) = &config.cors_origins {
        let cors = tower_http::cors::CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
                HeaderName::from_static(USER_ID_HEADER),
                HeaderName::from_static(USER_ROLE_HEADER),
            ])
            .allow_origin(
                origins
                    .iter()
                    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_credentials(true);

        app.layer(cors)
    } else {
        app
    };

    // Add request timeout middleware
    app.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(|_: BoxError| async {
                StatusCode::REQUEST_TIMEOUT
            }))
            .timeout(Duration::from_secs(config.request_timeout)),
    )
}

/// Starts the API server and the presence monitor, running until `shutdown`
/// is cancelled.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> eyre::Result<()> {
/// use std::sync::Arc;
/// use officehours_api::{config::ApiConfig, start_server, ApiState};
/// use tokio_util::sync::CancellationToken;
///
/// let config = ApiConfig::from_env()?;
/// let state = Arc::new(ApiState::from_config(&config).await?);
/// start_server(config, state, CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_server(
    config: config::ApiConfig,
    state: Arc<ApiState>,
    shutdown: CancellationToken,
) -> Result<()> {
    let monitor = monitor::spawn_presence_monitor(
        state.presence.clone(),
        config.sweep_interval(),
        shutdown.child_token(),
    );

    let app = build_router(state, &config);

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await?;

    shutdown.cancel();
    monitor.await?;
    info!("Server stopped");

    Ok(())
}
