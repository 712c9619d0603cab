/// Social Feed Server
///
/// Main server entry point. Handles:
/// - Command-line argument parsing
/// - Database initialization
/// - HTTP and WebSocket server startup
use actix_web::web;
use anyhow::Context;
use social_feed_server::config::Config;
use social_feed_server::db;
use social_feed_server::handlers::WsServer;
use social_feed_server::push::PushNotifier;
use social_feed_server::server::{self, AppServices};
use social_feed_server::uploads::FileStore;
use std::fs;
use std::process;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    let config = Config::from_args();

    log::info!("Starting Social Feed Server");
    log::info!("Database: {:?}", config.database);
    log::info!("Uploads: {:?}", config.upload_dir);
    log::info!(
        "Delivery scopes: chat={:?}, search={:?}",
        config.chat_scope,
        config.search_scope
    );

    // Write PID file if specified
    if let Some(pidfile) = &config.pidfile {
        let pid = process::id().to_string();
        fs::write(pidfile, pid)
            .with_context(|| format!("Failed to write PID file {:?}", pidfile))?;
        log::info!("PID file written to: {:?}", pidfile);
    }

    // Initialize database
    let db_path = config
        .database
        .to_str()
        .context("Database path is not valid UTF-8")?;
    let pool = db::create_pool(db_path).context("Failed to create database pool")?;

    log::info!("Database initialized");

    let notifier = PushNotifier::new(config.push_endpoint.clone(), config.push_key.clone());
    if !notifier.is_enabled() {
        log::info!("No push endpoint configured, notifications will only be logged");
    }

    let pool = web::Data::new(pool);
    let ws_server = WsServer::new(Arc::new(pool.clone()))
        .with_notifier(notifier.clone())
        .with_scopes(config.chat_scope, config.search_scope);
    let services = AppServices::with_ws_server(
        pool,
        ws_server,
        notifier,
        FileStore::new(&config.upload_dir),
    );

    // Start HTTP server
    let bind_addr = config.bind_addr();
    log::info!("Starting HTTP server on {}", bind_addr);

    let http_server = server::create_http_server(services, &bind_addr)?;
    http_server.await?;
    Ok(())
}
