//! Equb Backend Service
//!
//! Main entry point for the equb backend.
//! This service provides:
//! - gRPC API for admins and members
//! - Background sweep that activates equbs once every seat is filled

use equb_backend::config::AppConfig;
use equb_backend::database::{create_pool, run_migrations};
use equb_backend::error::{AppError, AppResult};
use equb_backend::grpc_service::{proto, EqubGrpcService};
use equb_backend::services::ActivationMonitor;
use equb_backend::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::{error, info, warn};

/// Install the global tracing subscriber
fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("equb_backend={},sqlx=warn,tonic=info", config.log_level).into()
    });

    if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("Equb backend service starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("gRPC port: {}", config.grpc_port);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // SERVICES
    // =========================================================================
    let app_state = Arc::new(AppState::new(pool, &config));
    info!("✓ Application state initialized");

    if config.advisor.is_enabled() {
        info!("✓ AI advisor enabled (model {})", config.advisor.model);
    }

    let grpc_service = EqubGrpcService::new(app_state.clone());

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    let monitor_handle = match config.activation_sweep_interval() {
        Some(interval) => {
            let monitor = ActivationMonitor::new(app_state.lifecycle.clone(), interval);
            info!("✓ Activation monitor started ({:?} interval)", interval);
            Some(tokio::spawn(async move {
                monitor.start().await;
            }))
        }
        None => {
            warn!("ACTIVATION_SWEEP_INTERVAL_SECS is 0 - activation monitor not started");
            None
        }
    };

    // =========================================================================
    // START SERVER
    // =========================================================================
    let grpc_addr: SocketAddr = format!("0.0.0.0:{}", config.grpc_port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gRPC address: {}", e)))?;

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(proto::FILE_DESCRIPTOR_SET)
        .build()
        .map_err(|e| AppError::Message(format!("Failed to build reflection service: {}", e)))?;

    info!("Starting gRPC server on {}...", grpc_addr);

    let grpc_server = Server::builder()
        .add_service(reflection)
        .add_service(grpc_service.into_server())
        .serve(grpc_addr);

    let grpc_handle = tokio::spawn(async move {
        if let Err(e) = grpc_server.await {
            error!("gRPC server error: {}", e);
        }
    });

    info!("✓ gRPC server started on {}", grpc_addr);
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = grpc_handle => {
            error!("gRPC server exited unexpectedly");
        }
        _ = async {
            if let Some(handle) = monitor_handle {
                handle.await.ok();
            } else {
                // Never completes if the monitor is not running
                futures::future::pending::<()>().await;
            }
        } => {
            error!("Activation monitor exited unexpectedly");
        }
    }

    app_state.database.pool().close().await;
    info!("Equb backend service shutdown complete");
    Ok(())
}
