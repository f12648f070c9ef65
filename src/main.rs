//! QuickSplit Backend Service
//!
//! Entry point for the shared-expense ledger backend: loads configuration,
//! connects to the database, runs migrations, and wires up the repositories
//! and services.

use quicksplit_backend::config::AppConfig;
use quicksplit_backend::database::{create_pool, run_migrations};
use quicksplit_backend::error::{AppError, AppResult};
use quicksplit_backend::AppState;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("quicksplit_backend={},sqlx=warn", config.log_level).into()
            }),
        )
        .init();

    info!("QuickSplit backend service starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Database: {}", config.database_url());

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

    let app_state = Arc::new(AppState::new(pool.clone(), &config));
    info!("Application state initialized with repositories and services");

    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .map_err(AppError::Sqlx)?;
    let group_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expense_groups")
        .fetch_one(&pool)
        .await
        .map_err(AppError::Sqlx)?;
    let expense_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expenses")
        .fetch_one(&pool)
        .await
        .map_err(AppError::Sqlx)?;

    info!(
        users = user_count,
        groups = group_count,
        expenses = expense_count,
        "QuickSplit backend service ready"
    );
    info!("Press Ctrl+C to shutdown gracefully");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::Message(format!("Failed to listen for shutdown signal: {}", e)))?;

    info!("Shutdown signal received, shutting down gracefully...");
    drop(app_state);
    pool.close().await;
    info!("QuickSplit backend service shutdown complete");

    Ok(())
}
