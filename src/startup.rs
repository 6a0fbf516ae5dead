//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::infrastructure::database;
use crate::presentation::http::routes;
use crate::presentation::middleware::create_cors_layer;
use crate::realtime::{EventRouter, MembershipDirectory, PresenceRegistry};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub router: Arc<EventRouter>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Assemble the shared state: the storage pool plus explicitly
    /// constructed realtime services (no ambient globals).
    pub fn new(db: PgPool, settings: Settings) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let directory = Arc::new(MembershipDirectory::new());
        let router = Arc::new(EventRouter::new(presence, directory));

        Self {
            db,
            router,
            settings: Arc::new(settings),
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        // Apply pending migrations
        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
        let cors = create_cors_layer(&settings.cors);

        let state = AppState::new(db, settings);

        // Build router with middleware
        let router = routes::create_router(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors));

        // Bind to address
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
