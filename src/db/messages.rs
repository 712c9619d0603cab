/// Direct message storage between two accounts.
use rusqlite::{params, Row};

use super::models::{Conversation, Message};
use super::{
    account_id_by_email, ensure_account, now_timestamp, summary_from_row, Database, DbPool,
    SUMMARY_COLUMNS,
};
use crate::error::{AppError, Result};
use crate::social::{normalize_email, require_text, AccountId};

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

impl Database {
    pub async fn send_message(
        pool: &DbPool,
        email: &str,
        receiver: AccountId,
        content: &str,
    ) -> Result<Message> {
        let email = normalize_email(email)?;
        let content = require_text("content", content)?;
        let conn = pool.lock().await;
        let sender = account_id_by_email(&conn, &email)?;
        ensure_account(&conn, receiver)?;
        if sender == receiver {
            return Err(AppError::validation("Cannot message your own account"));
        }

        let sent_at = now_timestamp();
        conn.execute(
            "INSERT INTO messages (sender_id, receiver_id, content, sent_at) VALUES (?1, ?2, ?3, ?4)",
            params![sender, receiver, content, sent_at],
        )?;

        Ok(Message {
            message_id: conn.last_insert_rowid(),
            sender_id: sender,
            receiver_id: receiver,
            content,
            sent_at,
        })
    }

    /// Both directions between the caller and `other`, newest first.
    pub async fn conversation(
        pool: &DbPool,
        email: &str,
        other: AccountId,
        limit: Option<i64>,
    ) -> Result<Vec<Message>> {
        let email = normalize_email(email)?;
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;
        ensure_account(&conn, other)?;

        let mut stmt = conn.prepare(
            "SELECT message_id, sender_id, receiver_id, content, sent_at FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY message_id DESC
             LIMIT ?3",
        )?;
        let messages = stmt
            .query_map(params![viewer, other, limit], |row| message_from_row(row, 0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Latest message with every partner, most recent conversation first.
    pub async fn conversations(pool: &DbPool, email: &str) -> Result<Vec<Conversation>> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;

        let sql = format!(
            "SELECT {}, m.message_id, m.sender_id, m.receiver_id, m.content, m.sent_at
             FROM messages m
             JOIN accounts a ON a.account_id =
                CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END
             WHERE m.message_id IN (
                SELECT MAX(message_id) FROM messages
                WHERE sender_id = ?1 OR receiver_id = ?1
                GROUP BY CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END)
             ORDER BY m.message_id DESC",
            SUMMARY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let conversations = stmt
            .query_map(params![viewer], |row| {
                Ok(Conversation {
                    partner: summary_from_row(row, 0)?,
                    last_message: message_from_row(row, 5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(conversations)
    }
}

fn message_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Message> {
    Ok(Message {
        message_id: row.get(offset)?,
        sender_id: row.get(offset + 1)?,
        receiver_id: row.get(offset + 2)?,
        content: row.get(offset + 3)?,
        sent_at: row.get(offset + 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::create_test_pool;
    use super::super::test_support::account;
    use super::*;

    #[tokio::test]
    async fn test_send_and_read_conversation() {
        let pool = create_test_pool();
        let alice = account(&pool, "alice", "1").await;
        let bob = account(&pool, "bob", "2").await;

        let first = Database::send_message(&pool, "alice@x.com", bob.account_id, "hi bob")
            .await
            .expect("Failed to send");
        assert_eq!(first.sender_id, alice.account_id);
        assert_eq!(first.receiver_id, bob.account_id);

        Database::send_message(&pool, "bob@x.com", alice.account_id, "hi alice")
            .await
            .expect("Failed to send");

        let history = Database::conversation(&pool, "alice@x.com", bob.account_id, None)
            .await
            .expect("Failed to load history");
        let texts: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["hi alice", "hi bob"]);

        let same_from_bob = Database::conversation(&pool, "bob@x.com", alice.account_id, None)
            .await
            .unwrap();
        assert_eq!(same_from_bob, history);
    }

    #[tokio::test]
    async fn test_history_limit() {
        let pool = create_test_pool();
        account(&pool, "alice", "1").await;
        let bob = account(&pool, "bob", "2").await;

        for i in 0..5 {
            Database::send_message(&pool, "alice@x.com", bob.account_id, &format!("m{}", i))
                .await
                .unwrap();
        }

        let last_two = Database::conversation(&pool, "alice@x.com", bob.account_id, Some(2))
            .await
            .unwrap();
        let texts: Vec<_> = last_two.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["m4", "m3"]);
    }

    #[tokio::test]
    async fn test_conversations_lists_latest_per_partner() {
        let pool = create_test_pool();
        let alice = account(&pool, "alice", "1").await;
        let bob = account(&pool, "bob", "2").await;
        let carol = account(&pool, "carol", "3").await;

        Database::send_message(&pool, "alice@x.com", bob.account_id, "old")
            .await
            .unwrap();
        Database::send_message(&pool, "carol@x.com", alice.account_id, "from carol")
            .await
            .unwrap();
        Database::send_message(&pool, "bob@x.com", alice.account_id, "newest")
            .await
            .unwrap();

        let conversations = Database::conversations(&pool, "alice@x.com").await.unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].partner.account_id, bob.account_id);
        assert_eq!(conversations[0].last_message.content, "newest");
        assert_eq!(conversations[1].partner.account_id, carol.account_id);
    }

    #[tokio::test]
    async fn test_invalid_messages_rejected() {
        let pool = create_test_pool();
        let alice = account(&pool, "alice", "1").await;

        let to_self = Database::send_message(&pool, "alice@x.com", alice.account_id, "me").await;
        assert!(matches!(to_self, Err(AppError::Validation(_))));

        let to_nobody = Database::send_message(&pool, "alice@x.com", 404, "hello?").await;
        assert!(matches!(to_nobody, Err(AppError::NotFound(_))));

        let blank = Database::send_message(&pool, "alice@x.com", 404, "  ").await;
        assert!(matches!(blank, Err(AppError::Validation(_))));
    }
}
