/// Database layer for persistent storage.
/// Handles all database operations for accounts, posts, comments, reactions,
/// friendships and direct messages. Each resource lives in its own file as an
/// `impl Database` block; multi-statement state changes run in one transaction.
pub mod accounts;
pub mod comments;
pub mod friends;
pub mod init;
pub mod messages;
pub mod models;
pub mod posts;
pub mod reactions;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::social::{normalize_email, AccountId};
use models::{Account, AccountSummary};

pub type DbPool = Arc<Mutex<Connection>>;

/// Create a connection pool (simplified for single-threaded SQLite)
pub fn create_pool(db_path: &str) -> SqliteResult<DbPool> {
    let conn = Connection::open(db_path)?;
    init::initialize_database(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Create an in-memory database for testing
pub fn create_test_pool() -> DbPool {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory DB");
    init::initialize_database(&conn).expect("Failed to initialize DB");
    Arc::new(Mutex::new(conn))
}

/// Database operations
pub struct Database;

impl Database {
    /// Resolve the caller's email to their account id.
    pub async fn resolve_account(pool: &DbPool, email: &str) -> Result<AccountId> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        account_id_by_email(&conn, &email)
    }

    /// Device token for push notifications, if the account registered one.
    pub async fn push_token(pool: &DbPool, account_id: AccountId) -> Result<Option<String>> {
        let conn = pool.lock().await;
        push_token_of(&conn, account_id)
    }
}

/// Fixed-width UTC timestamp, so stored values sort lexically.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) const ACCOUNT_COLUMNS: &str =
    "account_id, email, username, phone_number, fname, lname, join_date, profile_image, push_token";

pub(crate) fn account_from_row(row: &Row<'_>) -> SqliteResult<Account> {
    Ok(Account {
        account_id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        phone_number: row.get(3)?,
        fname: row.get(4)?,
        lname: row.get(5)?,
        join_date: row.get(6)?,
        profile_image: row.get(7)?,
        push_token: row.get(8)?,
    })
}

/// Columns for `AccountSummary`, with accounts aliased as `a`.
pub(crate) const SUMMARY_COLUMNS: &str =
    "a.account_id, a.username, a.fname, a.lname, a.profile_image";

/// Reads a summary starting at column `offset`.
pub(crate) fn summary_from_row(row: &Row<'_>, offset: usize) -> SqliteResult<AccountSummary> {
    Ok(AccountSummary {
        account_id: row.get(offset)?,
        username: row.get(offset + 1)?,
        fname: row.get(offset + 2)?,
        lname: row.get(offset + 3)?,
        profile_image: row.get(offset + 4)?,
    })
}

pub(crate) fn account_id_by_email(conn: &Connection, email: &str) -> Result<AccountId> {
    conn.query_row(
        "SELECT account_id FROM accounts WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("Account not found"))
}

pub(crate) fn ensure_account(conn: &Connection, account_id: AccountId) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE account_id = ?1)",
        params![account_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(AppError::not_found("Account not found"));
    }
    Ok(())
}

pub(crate) fn push_token_of(conn: &Connection, account_id: AccountId) -> Result<Option<String>> {
    let token: Option<Option<String>> = conn
        .query_row(
            "SELECT push_token FROM accounts WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(token.flatten())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use models::CreateAccountRequest;

    /// Register `<name>@x.com` with username `<name>` and phone `phone`.
    pub async fn account(pool: &DbPool, name: &str, phone: &str) -> Account {
        Database::create_account(
            pool,
            &CreateAccountRequest {
                email: format!("{}@x.com", name),
                phone_number: phone.to_string(),
                username: name.to_string(),
                fname: name.to_uppercase(),
                lname: "Test".to_string(),
            },
        )
        .await
        .expect("Failed to create account")
    }

    pub async fn befriend(pool: &DbPool, a: &Account, b: &Account) {
        Database::send_friend_request(pool, &a.email, b.account_id)
            .await
            .expect("Failed to send request");
        Database::accept_friend_request(pool, &b.email, a.account_id)
            .await
            .expect("Failed to accept request");
    }
}
