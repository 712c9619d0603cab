/// HTTP server factory and configuration.
/// Provides a reusable function to create and configure the HTTP server
/// for use in both the main binary and tests.
use actix_web::{middleware, web, App, HttpRequest, HttpServer};
use std::fmt::Display;
use std::sync::Arc;

use crate::db::DbPool;
use crate::error::AppError;
use crate::handlers::{configure_routes, WsServer};
use crate::push::PushNotifier;
use crate::uploads::{FileStore, MAX_UPLOAD_SIZE};

/// JSON bodies carry base64 uploads, which are a third larger than the file.
const JSON_LIMIT: usize = MAX_UPLOAD_SIZE / 3 * 4 + 4096;

/// Extractor failures (missing fields, bad query strings, unparsable path
/// segments) answer with the same JSON error body as handler failures.
fn reject_input<E: Display>(err: E, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(err.to_string()).into()
}

/// Shared collaborators handed to every worker.
#[derive(Clone)]
pub struct AppServices {
    pub pool: web::Data<DbPool>,
    pub ws_server: web::Data<WsServer>,
    pub notifier: web::Data<PushNotifier>,
    pub files: web::Data<FileStore>,
}

impl AppServices {
    /// Wire the websocket relay to the same pool and notifier the REST side uses.
    pub fn new(pool: DbPool, notifier: PushNotifier, files: FileStore) -> Self {
        let pool = web::Data::new(pool);
        let ws_server = WsServer::new(Arc::new(pool.clone())).with_notifier(notifier.clone());
        Self::with_ws_server(pool, ws_server, notifier, files)
    }

    pub fn with_ws_server(
        pool: web::Data<DbPool>,
        ws_server: WsServer,
        notifier: PushNotifier,
        files: FileStore,
    ) -> Self {
        AppServices {
            pool,
            ws_server: web::Data::new(ws_server),
            notifier: web::Data::new(notifier),
            files: web::Data::new(files),
        }
    }

    /// In-memory database, push disabled, uploads under a fresh temp directory.
    pub fn for_tests() -> Self {
        let uploads =
            std::env::temp_dir().join(format!("social-feed-uploads-{}", uuid::Uuid::new_v4()));
        Self::new(
            crate::db::create_test_pool(),
            PushNotifier::disabled(),
            FileStore::new(uploads),
        )
    }

    /// Attach collaborators and routes to an app.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.pool.clone())
            .app_data(self.ws_server.clone())
            .app_data(self.notifier.clone())
            .app_data(self.files.clone())
            .app_data(
                web::JsonConfig::default()
                    .limit(JSON_LIMIT)
                    .error_handler(reject_input),
            )
            .app_data(web::QueryConfig::default().error_handler(reject_input))
            .app_data(web::PathConfig::default().error_handler(reject_input))
            .configure(configure_routes);
    }
}

/// Create a configured HTTP server
///
/// Takes the shared collaborators and a bind address, then returns a
/// fully configured `HttpServer` ready to be run.
///
/// # Example
/// ```ignore
/// let services = AppServices::new(db::create_pool("social.db")?, notifier, files);
/// let server = server::create_http_server(services, "127.0.0.1:3001")?;
/// server.await?;
/// ```
pub fn create_http_server(
    services: AppServices,
    bind_addr: &str,
) -> std::io::Result<actix_web::dev::Server> {
    let server = HttpServer::new(move || {
        let services = services.clone();
        App::new()
            .wrap(middleware::Logger::default())
            .configure(move |cfg| services.configure(cfg))
    })
    .bind(bind_addr)?
    .run();

    Ok(server)
}

/// Create a test HTTP server with in-memory database and WebSocket server
///
/// Binds to a random available port.
///
/// # Returns
/// A tuple of (server, bind_address) where bind_address can be used to make requests
pub fn create_test_http_server() -> std::io::Result<(actix_web::dev::Server, String)> {
    let services = AppServices::for_tests();

    // Bind to 127.0.0.1:0 to get a random available port
    let server = HttpServer::new(move || {
        let services = services.clone();
        App::new()
            .wrap(middleware::Logger::default())
            .configure(move |cfg| services.configure(cfg))
    })
    .bind("127.0.0.1:0")?;

    // Get the actual bind address (including the assigned port)
    let addr_str = server
        .addrs()
        .first()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "No bind address found"))?
        .to_string();

    Ok((server.run(), addr_str))
}
