/// WebSocket relay for realtime chat and account search.
/// Tracks connections per account and delivers events according to the
/// configured chat and search scopes.
use crate::config::{ChatScope, SearchScope};
use crate::db::{models::Message as DirectMessage, Database, DbPool};
use crate::error::{AppError, Result};
use crate::push::PushNotifier;
use crate::social::AccountId;
use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;

pub const CHAT_EVENT: &str = "chat message";
pub const SEARCH_EVENT: &str = "search";

/// Commands a client may send, as `{"event": ..., "data": {...}}`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientCommand {
    #[serde(rename = "chat message")]
    ChatMessage {
        receiver_id: AccountId,
        content: String,
    },
    #[serde(rename = "search")]
    Search { query: String },
}

/// Serialize an outbound event.
pub fn event(name: &str, data: impl Serialize) -> String {
    json!({ "event": name, "data": data }).to_string()
}

/// WebSocket server state - manages client connections and routing
pub struct WsServer {
    pub clients: Arc<RwLock<HashMap<String, UnboundedSender<String>>>>,
    /// Open connections per account; one account may have several.
    pub accounts: Arc<RwLock<HashMap<AccountId, HashSet<String>>>>,
    pub pool: Arc<web::Data<DbPool>>,
    notifier: PushNotifier,
    chat_scope: ChatScope,
    search_scope: SearchScope,
}

impl WsServer {
    pub fn new(pool: Arc<web::Data<DbPool>>) -> Self {
        WsServer {
            clients: Arc::new(RwLock::new(HashMap::new())),
            accounts: Arc::new(RwLock::new(HashMap::new())),
            pool,
            notifier: PushNotifier::disabled(),
            chat_scope: ChatScope::default(),
            search_scope: SearchScope::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: PushNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_scopes(mut self, chat_scope: ChatScope, search_scope: SearchScope) -> Self {
        self.chat_scope = chat_scope;
        self.search_scope = search_scope;
        self
    }

    fn db(&self) -> &DbPool {
        self.pool.get_ref()
    }

    /// Register a client connection
    pub async fn register(
        &self,
        client_id: String,
        account_id: AccountId,
        tx: UnboundedSender<String>,
    ) {
        self.clients.write().await.insert(client_id.clone(), tx);
        self.accounts
            .write()
            .await
            .entry(account_id)
            .or_default()
            .insert(client_id);
    }

    /// Unregister a client connection
    pub async fn unregister(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);

        let mut accounts = self.accounts.write().await;
        accounts.retain(|_, connections| {
            connections.remove(client_id);
            !connections.is_empty()
        });
    }

    pub async fn send_to_client(&self, client_id: &str, message: &str) {
        let clients = self.clients.read().await;
        if let Some(tx) = clients.get(client_id) {
            let _ = tx.send(message.to_string());
        }
    }

    /// Every connection of one account.
    pub async fn send_to_account(&self, account_id: AccountId, message: &str) {
        let connections: Vec<String> = match self.accounts.read().await.get(&account_id) {
            Some(connections) => connections.iter().cloned().collect(),
            None => return,
        };

        let clients = self.clients.read().await;
        for client_id in connections {
            if let Some(tx) = clients.get(&client_id) {
                let _ = tx.send(message.to_string());
            }
        }
    }

    pub async fn broadcast(&self, message: &str) {
        let clients = self.clients.read().await;
        for tx in clients.values() {
            let _ = tx.send(message.to_string());
        }
    }

    /// Relay a stored message according to the chat scope.
    pub async fn deliver_chat(&self, message: &DirectMessage) {
        let payload = event(CHAT_EVENT, message);
        match self.chat_scope {
            ChatScope::Participants => {
                futures::future::join(
                    self.send_to_account(message.sender_id, &payload),
                    self.send_to_account(message.receiver_id, &payload),
                )
                .await;
            }
            ChatScope::Broadcast => self.broadcast(&payload).await,
        }
    }

    /// Push-notify the receiver of a direct message.
    pub async fn notify_message(&self, message: &DirectMessage) {
        let sender = match Database::get_account_by_id(self.db(), message.sender_id).await {
            Ok(sender) => sender,
            Err(e) => {
                log::warn!("Skipping push for message {}: {}", message.message_id, e);
                return;
            }
        };

        self.notifier.notify(
            self.db().clone(),
            message.receiver_id,
            format!("New message from {}", sender.username),
            message.content.clone(),
            json!({
                "type": "message",
                "sender_id": message.sender_id,
                "message_id": message.message_id,
            }),
        );
    }

    /// Parse and run one inbound frame. Failures of a known command go back
    /// to the requesting connection as `<event>_error`, anything else as
    /// `error`. The connection stays open.
    pub async fn handle_command(&self, client_id: &str, account_id: AccountId, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to parse WebSocket message from {}: {}", client_id, e);
                let reply = event("error", json!({ "message": "Invalid message format" }));
                self.send_to_client(client_id, &reply).await;
                return;
            }
        };

        let name = value
            .get("event")
            .and_then(|e| e.as_str())
            .unwrap_or_default()
            .to_string();
        log::debug!("Command {:?} from {}", name, client_id);

        let result = match serde_json::from_value::<ClientCommand>(value) {
            Ok(command) => self.run_command(client_id, account_id, command).await,
            Err(e) => Err(AppError::validation(format!("Invalid command: {}", e))),
        };

        if let Err(e) = result {
            log::warn!("Command {:?} from {} failed: {}", name, client_id, e);
            let error_event = match name.as_str() {
                CHAT_EVENT | SEARCH_EVENT => format!("{}_error", name),
                _ => "error".to_string(),
            };
            let reply = event(&error_event, json!({ "message": e.public_message() }));
            self.send_to_client(client_id, &reply).await;
        }
    }

    async fn run_command(
        &self,
        client_id: &str,
        account_id: AccountId,
        command: ClientCommand,
    ) -> Result<()> {
        // Look the email up per command so an address change mid-session is honored
        let email = Database::get_account_by_id(self.db(), account_id).await?.email;

        match command {
            ClientCommand::ChatMessage {
                receiver_id,
                content,
            } => {
                let message =
                    Database::send_message(self.db(), &email, receiver_id, &content).await?;
                self.deliver_chat(&message).await;
                self.notify_message(&message).await;
            }
            ClientCommand::Search { query } => {
                let matches = Database::search_accounts(self.db(), &email, &query).await?;
                let payload = event(SEARCH_EVENT, &matches);
                match self.search_scope {
                    SearchScope::Requester => self.send_to_client(client_id, &payload).await,
                    SearchScope::Broadcast => self.broadcast(&payload).await,
                }
            }
        }
        Ok(())
    }
}

/// WebSocket actor for individual client connections
pub struct WsActor {
    pub client_id: String,
    pub account_id: AccountId,
    pub server: web::Data<WsServer>,
}

impl Actor for WsActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        log::info!("WebSocket connection started: {}", self.client_id);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let addr = ctx.address();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                addr.do_send(IncomingMessage(msg));
            }
        });

        let server = self.server.clone();
        let client_id = self.client_id.clone();
        let account_id = self.account_id;
        actix::spawn(async move {
            server.register(client_id, account_id, tx).await;
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        log::info!("WebSocket connection stopped: {}", self.client_id);
        let server = self.server.clone();
        let client_id = self.client_id.clone();
        actix::spawn(async move {
            server.unregister(&client_id).await;
        });
    }
}

impl StreamHandler<std::result::Result<ws::Message, ws::ProtocolError>> for WsActor {
    fn handle(
        &mut self,
        msg: std::result::Result<ws::Message, ws::ProtocolError>,
        ctx: &mut Self::Context,
    ) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                let server = self.server.clone();
                let client_id = self.client_id.clone();
                let account_id = self.account_id;
                let text = text.to_string();
                actix::spawn(async move {
                    server.handle_command(&client_id, account_id, &text).await;
                });
            }
            Ok(ws::Message::Ping(bytes)) => ctx.pong(&bytes),
            Ok(ws::Message::Close(_)) => {
                ctx.stop();
            }
            Err(e) => {
                log::error!("WebSocket error: {}", e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

#[derive(Message)]
#[rtype(result = "()")]
struct IncomingMessage(String);

impl Handler<IncomingMessage> for WsActor {
    type Result = ();

    fn handle(&mut self, msg: IncomingMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

/// WebSocket connection handler
/// GET /ws/{email}
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    email: web::Path<String>,
    pool: web::Data<DbPool>,
    server: web::Data<WsServer>,
) -> actix_web::Result<HttpResponse> {
    let account_id = Database::resolve_account(&pool, &email).await?;
    let client_id = format!("{}_{}", account_id, uuid::Uuid::new_v4());

    let actor = WsActor {
        client_id,
        account_id,
        server: server.clone(),
    };

    let resp = ws::start(actor, &req, stream)?;
    Ok(resp)
}
