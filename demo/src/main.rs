//!
//! Standalone authentication server built on the core-auth library.
//! Reads configuration from TOML file (~/.config/core-auth/config.toml).

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use core_auth::mail::{LogMailer, Mailer, SmtpMailer};
use core_auth::metrics_exporter_prometheus;
use core_auth::{
    create_api_router, create_default_admin, default_config_path, init_database, seed_defaults,
    ApiContext, AuthConfig, BufferLayer, DatabaseConfig, LogBuffer, Migrator, MigratorTrait,
    SeaOrmRepositoryProvider, ShutdownCoordinator, TokenSweeper,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("CORE_AUTH_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let loaded = AuthConfig::load(&config_path);

    // The log buffer feeds the admin dashboard, so it joins the
    // subscriber before the first log line.
    let log_buffer = LogBuffer::new();
    let logging = loaded
        .as_ref()
        .map(|cfg| cfg.logging.clone())
        .unwrap_or_default();
    let fmt_layer = if logging.json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level)),
        )
        .with(fmt_layer)
        .with(BufferLayer::new(log_buffer.clone()))
        .init();

    let app_cfg = match loaded {
        Ok(cfg) => {
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            error!("Failed to load config: {}. Using defaults.", e);
            AuthConfig::default()
        }
    };

    info!("Starting Core Auth service...");
    if app_cfg.security.uses_default_secret() {
        warn!("⚠️ security.jwt_secret is still the shipped default, change it before going to production");
    }

    // ── Prometheus metrics recorder (must be installed before any metrics calls) ──
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("📊 Prometheus metrics recorder installed");

    let db_config = DatabaseConfig::from(&app_cfg.database);
    info!("Database: {}", db_config.url);
    info!(
        "JWT configured with {}h token expiration",
        app_cfg.security.jwt_expiration_hours
    );

    // ── Database ───────────────────────────────────────────────
    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    // Initialize repository provider
    let repos: Arc<dyn core_auth::domain::RepositoryProvider> =
        Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    // Seed the permission catalogue and built-in roles, then the admin account
    if let Err(e) = seed_defaults(repos.as_ref()).await {
        error!("Failed to seed default roles and permissions: {}", e);
        return Err(e.into());
    }
    if let Err(e) = create_default_admin(repos.as_ref(), &app_cfg.admin).await {
        error!("Failed to create default admin user: {}", e);
    }

    // ── Mailer ─────────────────────────────────────────────────
    let mailer: Arc<dyn Mailer> = if app_cfg.email.username.is_empty() {
        info!("SMTP credentials not configured, password reset mails go to the log");
        Arc::new(LogMailer)
    } else {
        match SmtpMailer::new(app_cfg.email.clone()) {
            Ok(smtp) => {
                info!(
                    "📧 SMTP mailer configured: {}:{}",
                    app_cfg.email.smtp_host, app_cfg.email.smtp_port
                );
                Arc::new(smtp)
            }
            Err(e) => {
                error!("Failed to configure SMTP mailer: {}. Falling back to the log mailer.", e);
                Arc::new(LogMailer)
            }
        }
    };

    // Initialize shutdown coordinator
    let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
    let shutdown_signal = shutdown.signal();

    // Start listening for shutdown signals (SIGTERM, SIGINT)
    shutdown.start_signal_listener();

    // Expired reset tokens are swept in the background
    TokenSweeper::new(repos.clone()).start(shutdown_signal.clone());

    // Create REST API router
    let api_router = create_api_router(
        ApiContext {
            db: db.clone(),
            repos,
            mailer,
            log_buffer,
            metrics_handle: Some(prometheus_handle),
        },
        &app_cfg,
    );

    // Start REST API server with graceful shutdown
    let api_addr = app_cfg.server.address();
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("REST API server listening on http://{}", api_addr);
    info!("Swagger UI available at http://{}/docs/", api_addr);

    let api_shutdown = shutdown_signal.clone();
    // connect_info feeds the peer-IP rate limiter on the auth routes
    let api_server = axum::serve(
        listener,
        api_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        api_shutdown.wait().await;
        info!("🛑 REST API server received shutdown signal");
    });

    info!("🚀 Server started. Press Ctrl+C to shutdown gracefully.");

    if let Err(e) = api_server.await {
        error!("REST API server error: {}", e);
    }

    // Perform final cleanup
    info!("🧹 Performing final cleanup...");

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    } else {
        info!("✅ Database connection closed");
    }

    info!("👋 Core Auth shutdown complete");
    Ok(())
}
