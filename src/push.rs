/// Push notification delivery.
/// Posts a notification payload to an HTTP push gateway. Without a configured
/// endpoint notifications are only logged, which is what tests and local
/// development run with.
use serde_json::{json, Value};

use crate::db::{Database, DbPool};
use crate::error::{AppError, Result};
use crate::social::AccountId;

#[derive(Clone)]
pub struct PushNotifier {
    endpoint: Option<String>,
    key: Option<String>,
    client: reqwest::Client,
}

impl PushNotifier {
    pub fn new(endpoint: Option<String>, key: Option<String>) -> Self {
        PushNotifier {
            endpoint,
            key,
            client: reqwest::Client::new(),
        }
    }

    /// Notifier that never leaves the process.
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Deliver one notification to a device token.
    pub async fn send(&self, token: &str, title: &str, body: &str, data: Value) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            log::debug!("Push disabled, dropping notification {:?} for {}", title, token);
            return Ok(());
        };

        let mut request = self
            .client
            .post(endpoint)
            .json(&payload(token, title, body, data));
        if let Some(key) = &self.key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Push(format!("Failed to reach push endpoint: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Push(format!(
                "Push endpoint returned status: {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Fire-and-forget notification to an account. The recipient's token is
    /// looked up in the background; failures are logged and never reach the
    /// caller.
    pub fn notify(
        &self,
        pool: DbPool,
        recipient: AccountId,
        title: impl Into<String>,
        body: impl Into<String>,
        data: Value,
    ) {
        let notifier = self.clone();
        let title = title.into();
        let body = body.into();

        tokio::spawn(async move {
            let token = match Database::push_token(&pool, recipient).await {
                Ok(Some(token)) => token,
                Ok(None) => {
                    log::debug!("Account {} has no push token", recipient);
                    return;
                }
                Err(e) => {
                    log::warn!("Push token lookup for account {} failed: {}", recipient, e);
                    return;
                }
            };

            if let Err(e) = notifier.send(&token, &title, &body, data).await {
                log::warn!("Push to account {} failed: {}", recipient, e);
            }
        });
    }
}

fn payload(token: &str, title: &str, body: &str, data: Value) -> Value {
    json!({
        "token": token,
        "notification": {
            "title": title,
            "body": body,
        },
        "data": data,
    })
}
