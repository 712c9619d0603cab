/// Social feed server library.
/// Exposes the storage layer, social-graph rules and HTTP/WebSocket handlers
/// so the binary and the integration tests share one implementation.
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod push;
pub mod server;
pub mod social;
pub mod uploads;
