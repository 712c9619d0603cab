/// Friendship and friend-request storage.
///
/// Every transition reads the current relationship and applies its effect
/// inside one transaction while holding the connection, so the check and
/// the write cannot interleave with another request.
use rusqlite::{params, Connection};

use super::models::{AccountSummary, FriendRequests};
use super::{
    account_id_by_email, ensure_account, now_timestamp, summary_from_row, Database, DbPool,
    SUMMARY_COLUMNS,
};
use crate::error::{AppError, Result};
use crate::social::{normalize_email, ordered_pair, AccountId, Relationship, Transition};

impl Database {
    /// Relationship of `other` as seen by the account behind `email`.
    pub async fn relationship(
        pool: &DbPool,
        email: &str,
        other: AccountId,
    ) -> Result<Relationship> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;
        ensure_account(&conn, other)?;
        relationship_between(&conn, viewer, other)
    }

    /// The flag is true only when this call created the request, so a
    /// repeated send can be told apart from the first one.
    pub async fn send_friend_request(
        pool: &DbPool,
        email: &str,
        receiver: AccountId,
    ) -> Result<(Relationship, bool)> {
        apply_transition(pool, email, receiver, Transition::SendRequest).await
    }

    pub async fn cancel_friend_request(
        pool: &DbPool,
        email: &str,
        receiver: AccountId,
    ) -> Result<Relationship> {
        apply_transition(pool, email, receiver, Transition::CancelRequest)
            .await
            .map(|(state, _)| state)
    }

    pub async fn accept_friend_request(
        pool: &DbPool,
        email: &str,
        sender: AccountId,
    ) -> Result<Relationship> {
        apply_transition(pool, email, sender, Transition::AcceptRequest)
            .await
            .map(|(state, _)| state)
    }

    pub async fn reject_friend_request(
        pool: &DbPool,
        email: &str,
        sender: AccountId,
    ) -> Result<Relationship> {
        apply_transition(pool, email, sender, Transition::RejectRequest)
            .await
            .map(|(state, _)| state)
    }

    /// No-op when the two accounts are not friends.
    pub async fn remove_friend(
        pool: &DbPool,
        email: &str,
        friend: AccountId,
    ) -> Result<Relationship> {
        apply_transition(pool, email, friend, Transition::RemoveFriend)
            .await
            .map(|(state, _)| state)
    }

    pub async fn list_friends(pool: &DbPool, email: &str) -> Result<Vec<AccountSummary>> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;

        let sql = format!(
            "SELECT {} FROM friends f
             JOIN accounts a ON a.account_id =
                CASE WHEN f.account_id1 = ?1 THEN f.account_id2 ELSE f.account_id1 END
             WHERE f.account_id1 = ?1 OR f.account_id2 = ?1
             ORDER BY a.username",
            SUMMARY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let friends = stmt
            .query_map(params![viewer], |row| summary_from_row(row, 0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(friends)
    }

    /// Pending requests in both directions, newest first.
    pub async fn list_friend_requests(pool: &DbPool, email: &str) -> Result<FriendRequests> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;

        let incoming = pending_requests(
            &conn,
            viewer,
            "fr.receiver_id = ?1 AND a.account_id = fr.sender_id",
        )?;
        let outgoing = pending_requests(
            &conn,
            viewer,
            "fr.sender_id = ?1 AND a.account_id = fr.receiver_id",
        )?;

        Ok(FriendRequests { incoming, outgoing })
    }
}

async fn apply_transition(
    pool: &DbPool,
    email: &str,
    other: AccountId,
    transition: Transition,
) -> Result<(Relationship, bool)> {
    let email = normalize_email(email)?;
    let mut conn = pool.lock().await;
    let tx = conn.transaction()?;

    let viewer = account_id_by_email(&tx, &email)?;
    ensure_account(&tx, other)?;
    if viewer == other {
        return Err(AppError::validation("Cannot target your own account"));
    }

    let current = relationship_between(&tx, viewer, other)?;
    let next = current.apply(transition)?;
    if next == current {
        return Ok((current, false));
    }

    let now = now_timestamp();
    let (lo, hi) = ordered_pair(viewer, other);
    match transition {
        Transition::SendRequest => {
            tx.execute(
                "INSERT INTO friend_requests (sender_id, receiver_id, sent_at) VALUES (?1, ?2, ?3)",
                params![viewer, other, now],
            )?;
        }
        Transition::CancelRequest => {
            tx.execute(
                "DELETE FROM friend_requests WHERE sender_id = ?1 AND receiver_id = ?2",
                params![viewer, other],
            )?;
        }
        Transition::AcceptRequest => {
            tx.execute(
                "DELETE FROM friend_requests
                 WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)",
                params![other, viewer],
            )?;
            tx.execute(
                "INSERT INTO friends (account_id1, account_id2, since) VALUES (?1, ?2, ?3)",
                params![lo, hi, now],
            )?;
        }
        Transition::RejectRequest => {
            tx.execute(
                "DELETE FROM friend_requests WHERE sender_id = ?1 AND receiver_id = ?2",
                params![other, viewer],
            )?;
        }
        Transition::RemoveFriend => {
            tx.execute(
                "DELETE FROM friends WHERE account_id1 = ?1 AND account_id2 = ?2",
                params![lo, hi],
            )?;
        }
    }

    tx.commit()?;
    log::info!(
        "Friendship {} -> {}: {:?} ({} -> {})",
        viewer,
        other,
        transition,
        current.as_str(),
        next.as_str()
    );
    Ok((next, true))
}

pub(crate) fn relationship_between(
    conn: &Connection,
    viewer: AccountId,
    other: AccountId,
) -> Result<Relationship> {
    let (lo, hi) = ordered_pair(viewer, other);
    let (are_friends, outgoing, incoming): (bool, bool, bool) = conn.query_row(
        "SELECT
            EXISTS(SELECT 1 FROM friends WHERE account_id1 = ?1 AND account_id2 = ?2),
            EXISTS(SELECT 1 FROM friend_requests WHERE sender_id = ?3 AND receiver_id = ?4),
            EXISTS(SELECT 1 FROM friend_requests WHERE sender_id = ?4 AND receiver_id = ?3)",
        params![lo, hi, viewer, other],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    Ok(Relationship::resolve(are_friends, outgoing, incoming))
}

pub(crate) fn are_friends(conn: &Connection, a: AccountId, b: AccountId) -> Result<bool> {
    let (lo, hi) = ordered_pair(a, b);
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM friends WHERE account_id1 = ?1 AND account_id2 = ?2)",
        params![lo, hi],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn pending_requests(
    conn: &Connection,
    viewer: AccountId,
    condition: &str,
) -> Result<Vec<AccountSummary>> {
    let sql = format!(
        "SELECT {} FROM friend_requests fr, accounts a
         WHERE {}
         ORDER BY fr.sent_at DESC",
        SUMMARY_COLUMNS, condition
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![viewer], |row| summary_from_row(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::super::create_test_pool;
    use super::super::test_support::{account, befriend};
    use super::*;

    #[tokio::test]
    async fn test_accept_request_scenario() {
        let pool = create_test_pool();
        let a = account(&pool, "a", "1").await;
        let b = account(&pool, "b", "2").await;

        let sent = Database::send_friend_request(&pool, "a@x.com", b.account_id)
            .await
            .expect("Failed to send");
        assert_eq!(sent, (Relationship::Outgoing, true));

        let seen_by_b = Database::relationship(&pool, "b@x.com", a.account_id)
            .await
            .unwrap();
        assert_eq!(seen_by_b, Relationship::Incoming);

        let accepted = Database::accept_friend_request(&pool, "b@x.com", a.account_id)
            .await
            .expect("Failed to accept");
        assert_eq!(accepted, Relationship::Friend);

        assert_eq!(
            Database::relationship(&pool, "a@x.com", b.account_id).await.unwrap(),
            Relationship::Friend
        );
        assert_eq!(
            Database::relationship(&pool, "b@x.com", a.account_id).await.unwrap(),
            Relationship::Friend
        );

        let conn = pool.lock().await;
        let pending: i64 = conn
            .query_row("SELECT COUNT(*) FROM friend_requests", [], |row| row.get(0))
            .unwrap();
        assert_eq!(pending, 0);
    }

    #[tokio::test]
    async fn test_double_send_creates_one_request() {
        let pool = create_test_pool();
        account(&pool, "a", "1").await;
        let b = account(&pool, "b", "2").await;

        for created in [true, false] {
            let state = Database::send_friend_request(&pool, "a@x.com", b.account_id)
                .await
                .expect("Send should be idempotent");
            assert_eq!(state, (Relationship::Outgoing, created));
        }

        let requests = Database::list_friend_requests(&pool, "b@x.com").await.unwrap();
        assert_eq!(requests.incoming.len(), 1);
        assert!(requests.outgoing.is_empty());
    }

    #[tokio::test]
    async fn test_send_while_incoming_or_friends_conflicts() {
        let pool = create_test_pool();
        let a = account(&pool, "a", "1").await;
        let b = account(&pool, "b", "2").await;

        Database::send_friend_request(&pool, "a@x.com", b.account_id)
            .await
            .unwrap();
        let reverse = Database::send_friend_request(&pool, "b@x.com", a.account_id).await;
        assert!(matches!(reverse, Err(AppError::Conflict(_))));

        Database::accept_friend_request(&pool, "b@x.com", a.account_id)
            .await
            .unwrap();
        let again = Database::send_friend_request(&pool, "a@x.com", b.account_id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cancel_and_reject() {
        let pool = create_test_pool();
        let a = account(&pool, "a", "1").await;
        let b = account(&pool, "b", "2").await;

        Database::send_friend_request(&pool, "a@x.com", b.account_id)
            .await
            .unwrap();
        let cancelled = Database::cancel_friend_request(&pool, "a@x.com", b.account_id)
            .await
            .unwrap();
        assert_eq!(cancelled, Relationship::Other);

        // Nothing left to cancel
        let missing = Database::cancel_friend_request(&pool, "a@x.com", b.account_id).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        Database::send_friend_request(&pool, "a@x.com", b.account_id)
            .await
            .unwrap();
        // The sender cannot reject their own request
        let wrong_side = Database::reject_friend_request(&pool, "a@x.com", b.account_id).await;
        assert!(matches!(wrong_side, Err(AppError::NotFound(_))));

        let rejected = Database::reject_friend_request(&pool, "b@x.com", a.account_id)
            .await
            .unwrap();
        assert_eq!(rejected, Relationship::Other);
        assert_eq!(
            Database::relationship(&pool, "a@x.com", b.account_id).await.unwrap(),
            Relationship::Other
        );
    }

    #[tokio::test]
    async fn test_remove_friend_twice_is_noop() {
        let pool = create_test_pool();
        let a = account(&pool, "a", "1").await;
        let b = account(&pool, "b", "2").await;
        befriend(&pool, &a, &b).await;

        let first = Database::remove_friend(&pool, "b@x.com", a.account_id)
            .await
            .expect("First removal failed");
        let second = Database::remove_friend(&pool, "b@x.com", a.account_id)
            .await
            .expect("Second removal should not fail");

        assert_eq!(first, Relationship::Other);
        assert_eq!(second, Relationship::Other);
        assert!(Database::list_friends(&pool, "a@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_self_targeting_rejected() {
        let pool = create_test_pool();
        let a = account(&pool, "a", "1").await;

        let result = Database::send_friend_request(&pool, "a@x.com", a.account_id).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_target_not_found() {
        let pool = create_test_pool();
        account(&pool, "a", "1").await;

        let result = Database::send_friend_request(&pool, "a@x.com", 4242).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_states_are_mutually_exclusive() {
        let pool = create_test_pool();
        let a = account(&pool, "a", "1").await;
        let b = account(&pool, "b", "2").await;

        let check = |expected_a: Relationship| {
            let pool = pool.clone();
            let (a_id, b_id) = (a.account_id, b.account_id);
            async move {
                let from_a = Database::relationship(&pool, "a@x.com", b_id).await.unwrap();
                let from_b = Database::relationship(&pool, "b@x.com", a_id).await.unwrap();
                assert_eq!(from_a, expected_a);
                assert_eq!(from_b, expected_a.mirrored());
            }
        };

        check(Relationship::Other).await;
        Database::send_friend_request(&pool, "a@x.com", b.account_id)
            .await
            .unwrap();
        check(Relationship::Outgoing).await;
        Database::accept_friend_request(&pool, "b@x.com", a.account_id)
            .await
            .unwrap();
        check(Relationship::Friend).await;
        Database::remove_friend(&pool, "a@x.com", b.account_id)
            .await
            .unwrap();
        check(Relationship::Other).await;
    }

    #[tokio::test]
    async fn test_list_friends_either_orientation() {
        let pool = create_test_pool();
        let a = account(&pool, "a", "1").await;
        let b = account(&pool, "b", "2").await;
        let c = account(&pool, "c", "3").await;
        // c (higher id) sends to a (lower id): stored ordered either way
        befriend(&pool, &c, &a).await;
        befriend(&pool, &a, &b).await;

        let friends = Database::list_friends(&pool, "a@x.com").await.unwrap();
        let ids: Vec<_> = friends.iter().map(|f| f.account_id).collect();
        assert_eq!(ids, vec![b.account_id, c.account_id]);

        let c_friends = Database::list_friends(&pool, "c@x.com").await.unwrap();
        assert_eq!(c_friends.len(), 1);
        assert_eq!(c_friends[0].account_id, a.account_id);
    }
}
