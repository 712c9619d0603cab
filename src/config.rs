/// Configuration management for the social feed server.
/// Handles command-line argument parsing and config structure.
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Who receives a relayed chat message.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatScope {
    /// Connections of the sender and the receiver
    #[default]
    Participants,
    /// Every connected client
    Broadcast,
}

/// Who receives the results of a realtime search.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Only the connection that asked
    #[default]
    Requester,
    /// Every connected client
    Broadcast,
}

#[derive(Parser, Debug)]
#[command(name = "Social Feed Server")]
#[command(about = "Accounts, posts, friendships and chat over HTTP and WebSocket", long_about = None)]
pub struct Config {
    /// Interface to bind (default: 127.0.0.1)
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port (default: 3001)
    #[arg(long, default_value = "3001")]
    pub port: u16,

    /// SQLite database file path (default: social.db)
    #[arg(long, default_value = "social.db")]
    pub database: PathBuf,

    /// PID file path (optional) - write server PID to this file on startup
    #[arg(long)]
    pub pidfile: Option<PathBuf>,

    /// Directory uploaded files are written to
    #[arg(long, default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Push gateway URL; notifications are only logged when unset
    #[arg(long)]
    pub push_endpoint: Option<String>,

    /// Bearer key sent to the push gateway
    #[arg(long)]
    pub push_key: Option<String>,

    #[arg(long, value_enum, default_value_t = ChatScope::Participants)]
    pub chat_scope: ChatScope,

    #[arg(long, value_enum, default_value_t = SearchScope::Requester)]
    pub search_scope: SearchScope,
}

impl Config {
    /// Parse command-line arguments into Config
    pub fn from_args() -> Self {
        Config::parse()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
