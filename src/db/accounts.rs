/// Account storage: registration, profile updates, cascading deletion and
/// the read-only discovery views (contacts, suggestions, search).
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

use super::models::{Account, AccountMatch, CreateAccountRequest, UpdateProfileRequest};
use super::{
    account_from_row, account_id_by_email, now_timestamp, summary_from_row, Database, DbPool,
    ACCOUNT_COLUMNS, SUMMARY_COLUMNS,
};
use crate::error::{AppError, Result};
use crate::social::relationship::RELATIONSHIP_SQL;
use crate::social::{normalize_email, normalize_username, AccountId, Relationship};

const DUPLICATE_IDENTITY: &str = "Email or username already exists";
const SEARCH_LIMIT: i64 = 20;

impl Database {
    /// Fails with `Conflict` when either the email or the username is taken.
    pub async fn check_available(pool: &DbPool, email: &str, username: &str) -> Result<()> {
        let email = normalize_email(email)?;
        let username = normalize_username(username)?;
        let conn = pool.lock().await;

        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1 OR username = ?2)",
            params![email, username],
            |row| row.get(0),
        )?;

        if taken {
            return Err(AppError::Conflict(DUPLICATE_IDENTITY.to_string()));
        }
        Ok(())
    }

    pub async fn create_account(pool: &DbPool, req: &CreateAccountRequest) -> Result<Account> {
        let email = normalize_email(&req.email)?;
        let username = normalize_username(&req.username)?;
        let conn = pool.lock().await;
        let join_date = now_timestamp();

        conn.execute(
            "INSERT INTO accounts (email, username, phone_number, fname, lname, join_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                email,
                username,
                req.phone_number.trim(),
                req.fname.trim(),
                req.lname.trim(),
                join_date
            ],
        )
        .map_err(|e| AppError::unique_or(e, DUPLICATE_IDENTITY))?;

        let account_id = conn.last_insert_rowid();
        log::info!("Account {} created for {}", account_id, email);
        load_account(&conn, account_id)
    }

    pub async fn get_account(pool: &DbPool, email: &str) -> Result<Account> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let account_id = account_id_by_email(&conn, &email)?;
        load_account(&conn, account_id)
    }

    pub async fn get_account_by_id(pool: &DbPool, account_id: AccountId) -> Result<Account> {
        let conn = pool.lock().await;
        load_account(&conn, account_id)
    }

    /// Email is an attribute, so this touches a single column.
    pub async fn update_email(pool: &DbPool, email: &str, new_email: &str) -> Result<Account> {
        let email = normalize_email(email)?;
        let new_email = normalize_email(new_email)?;
        let conn = pool.lock().await;

        let updated = conn
            .execute(
                "UPDATE accounts SET email = ?1 WHERE email = ?2",
                params![new_email, email],
            )
            .map_err(|e| AppError::unique_or(e, "Email already exists"))?;

        if updated == 0 {
            return Err(AppError::not_found("Account not found"));
        }
        let account_id = account_id_by_email(&conn, &new_email)?;
        load_account(&conn, account_id)
    }

    /// Fields left as `None` keep their current value.
    pub async fn update_profile(
        pool: &DbPool,
        email: &str,
        req: &UpdateProfileRequest,
    ) -> Result<Account> {
        let email = normalize_email(email)?;
        let username = req.username.as_deref().map(normalize_username).transpose()?;
        let conn = pool.lock().await;

        let updated = conn
            .execute(
                "UPDATE accounts SET
                    username = COALESCE(?1, username),
                    fname = COALESCE(?2, fname),
                    lname = COALESCE(?3, lname),
                    phone_number = COALESCE(?4, phone_number),
                    profile_image = COALESCE(?5, profile_image)
                 WHERE email = ?6",
                params![
                    username,
                    req.fname.as_deref().map(str::trim),
                    req.lname.as_deref().map(str::trim),
                    req.phone_number.as_deref().map(str::trim),
                    req.profile_image,
                    email
                ],
            )
            .map_err(|e| AppError::unique_or(e, "Username already exists"))?;

        if updated == 0 {
            return Err(AppError::not_found("Account not found"));
        }
        let account_id = account_id_by_email(&conn, &email)?;
        load_account(&conn, account_id)
    }

    pub async fn update_profile_image(pool: &DbPool, email: &str, url: &str) -> Result<Account> {
        let req = UpdateProfileRequest {
            profile_image: Some(url.to_string()),
            ..Default::default()
        };
        Self::update_profile(pool, email, &req).await
    }

    /// `None` unregisters the device.
    pub async fn update_push_token(pool: &DbPool, email: &str, token: Option<&str>) -> Result<()> {
        let email = normalize_email(email)?;
        let token = token.map(str::trim).filter(|t| !t.is_empty());
        let conn = pool.lock().await;

        let updated = conn.execute(
            "UPDATE accounts SET push_token = ?1 WHERE email = ?2",
            params![token, email],
        )?;
        if updated == 0 {
            return Err(AppError::not_found("Account not found"));
        }
        Ok(())
    }

    /// Remove the account and everything it owns, authored or takes part in.
    /// All or nothing.
    pub async fn delete_account(pool: &DbPool, email: &str) -> Result<()> {
        let email = normalize_email(email)?;
        let mut conn = pool.lock().await;
        let tx = conn.transaction()?;
        let account_id = account_id_by_email(&tx, &email)?;

        tx.execute(
            "DELETE FROM comment_reactions
             WHERE account_id = ?1
                OR comment_id IN (
                    SELECT comment_id FROM comments
                    WHERE account_id = ?1
                       OR post_id IN (SELECT post_id FROM posts WHERE account_id = ?1))",
            params![account_id],
        )?;
        tx.execute(
            "DELETE FROM comments
             WHERE account_id = ?1
                OR post_id IN (SELECT post_id FROM posts WHERE account_id = ?1)",
            params![account_id],
        )?;
        tx.execute(
            "DELETE FROM post_reactions
             WHERE account_id = ?1
                OR post_id IN (SELECT post_id FROM posts WHERE account_id = ?1)",
            params![account_id],
        )?;
        tx.execute("DELETE FROM posts WHERE account_id = ?1", params![account_id])?;
        tx.execute(
            "DELETE FROM friends WHERE account_id1 = ?1 OR account_id2 = ?1",
            params![account_id],
        )?;
        tx.execute(
            "DELETE FROM friend_requests WHERE sender_id = ?1 OR receiver_id = ?1",
            params![account_id],
        )?;
        tx.execute(
            "DELETE FROM messages WHERE sender_id = ?1 OR receiver_id = ?1",
            params![account_id],
        )?;
        tx.execute("DELETE FROM accounts WHERE account_id = ?1", params![account_id])?;

        tx.commit()?;
        log::info!("Account {} deleted", account_id);
        Ok(())
    }

    /// Accounts whose phone number is in `numbers`, minus the viewer and
    /// anyone already a friend.
    pub async fn contacts_from_numbers(
        pool: &DbPool,
        email: &str,
        numbers: &[String],
    ) -> Result<Vec<AccountMatch>> {
        let email = normalize_email(email)?;
        let numbers: BTreeSet<&str> = numbers
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();

        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;
        if numbers.is_empty() {
            return Ok(vec![]);
        }

        // One JSON array parameter keeps large address books under SQLite's variable limit.
        let numbers = serde_json::to_string(&numbers)
            .map_err(|e| AppError::validation(format!("Invalid phone numbers: {}", e)))?;
        let sql = format!(
            "SELECT * FROM (
                SELECT {summary}, {relationship} AS relationship
                FROM accounts a
                WHERE a.account_id <> ?1
                  AND a.phone_number IN (SELECT value FROM json_each(?2))
             ) WHERE relationship <> 'friend'
             ORDER BY username",
            summary = SUMMARY_COLUMNS,
            relationship = RELATIONSHIP_SQL
        );

        let mut stmt = conn.prepare(&sql)?;
        let matches = stmt
            .query_map(params![viewer, numbers], |row| match_from_row(row, false))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(matches)
    }

    /// Friends of friends, minus the viewer and existing friends, ranked by
    /// how many friends they share with the viewer.
    pub async fn friend_suggestions(pool: &DbPool, email: &str) -> Result<Vec<AccountMatch>> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;

        let sql = format!(
            "WITH mine AS (
                SELECT CASE WHEN account_id1 = ?1 THEN account_id2 ELSE account_id1 END AS friend_id
                FROM friends WHERE account_id1 = ?1 OR account_id2 = ?1
             ),
             candidates AS (
                SELECT CASE WHEN p.account_id1 = mine.friend_id THEN p.account_id2
                            ELSE p.account_id1 END AS candidate_id,
                       mine.friend_id AS via
                FROM mine
                JOIN friends p ON p.account_id1 = mine.friend_id OR p.account_id2 = mine.friend_id
             )
             SELECT {summary}, {relationship} AS relationship, COUNT(DISTINCT c.via) AS mutual
             FROM candidates c
             JOIN accounts a ON a.account_id = c.candidate_id
             WHERE a.account_id <> ?1
               AND a.account_id NOT IN (SELECT friend_id FROM mine)
             GROUP BY a.account_id
             ORDER BY mutual DESC, a.username",
            summary = SUMMARY_COLUMNS,
            relationship = RELATIONSHIP_SQL
        );

        let mut stmt = conn.prepare(&sql)?;
        let matches = stmt
            .query_map(params![viewer], |row| match_from_row(row, true))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(matches)
    }

    /// Prefix search over username and names.
    pub async fn search_accounts(
        pool: &DbPool,
        email: &str,
        query: &str,
    ) -> Result<Vec<AccountMatch>> {
        let email = normalize_email(email)?;
        let query = query.trim().to_lowercase();
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;
        if query.is_empty() {
            return Ok(vec![]);
        }

        let pattern = format!("{}%", escape_like(&query));
        let sql = format!(
            "SELECT {summary}, {relationship} AS relationship
             FROM accounts a
             WHERE a.account_id <> ?1
               AND (a.username LIKE ?2 ESCAPE '\\'
                    OR LOWER(a.fname) LIKE ?2 ESCAPE '\\'
                    OR LOWER(a.lname) LIKE ?2 ESCAPE '\\')
             ORDER BY a.username
             LIMIT ?3",
            summary = SUMMARY_COLUMNS,
            relationship = RELATIONSHIP_SQL
        );

        let mut stmt = conn.prepare(&sql)?;
        let matches = stmt
            .query_map(params![viewer, pattern, SEARCH_LIMIT], |row| {
                match_from_row(row, false)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(matches)
    }
}

fn load_account(conn: &Connection, account_id: AccountId) -> Result<Account> {
    let sql = format!("SELECT {} FROM accounts WHERE account_id = ?1", ACCOUNT_COLUMNS);
    conn.query_row(&sql, params![account_id], account_from_row)
        .optional()?
        .ok_or_else(|| AppError::not_found("Account not found"))
}

fn match_from_row(row: &Row<'_>, with_mutual: bool) -> rusqlite::Result<AccountMatch> {
    let relationship: String = row.get(5)?;
    Ok(AccountMatch {
        account: summary_from_row(row, 0)?,
        relationship: Relationship::from_str(&relationship).unwrap_or(Relationship::Other),
        mutual_friends: if with_mutual { Some(row.get(6)?) } else { None },
    })
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{account, befriend};
    use super::super::{create_test_pool, models::CreatePostRequest};
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_account() {
        let pool = create_test_pool();
        let created = Database::create_account(
            &pool,
            &CreateAccountRequest {
                email: " Alice@X.com ".to_string(),
                phone_number: "555-0001".to_string(),
                username: "Alice".to_string(),
                fname: "Alice".to_string(),
                lname: "Liddell".to_string(),
            },
        )
        .await
        .expect("Failed to create account");

        assert_eq!(created.email, "alice@x.com");
        assert_eq!(created.username, "alice");
        assert!(created.account_id > 0);

        let fetched = Database::get_account(&pool, "ALICE@x.com")
            .await
            .expect("Failed to get account");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_email_or_username_conflicts() {
        let pool = create_test_pool();
        account(&pool, "alice", "1").await;

        let same_username = Database::create_account(
            &pool,
            &CreateAccountRequest {
                email: "other@x.com".to_string(),
                phone_number: String::new(),
                username: "ALICE".to_string(),
                fname: String::new(),
                lname: String::new(),
            },
        )
        .await;
        assert!(matches!(same_username, Err(AppError::Conflict(_))));

        let availability = Database::check_available(&pool, "alice@x.com", "fresh").await;
        assert!(matches!(availability, Err(AppError::Conflict(_))));

        Database::check_available(&pool, "fresh@x.com", "fresh")
            .await
            .expect("Fresh identity should be available");
    }

    #[tokio::test]
    async fn test_update_email_keeps_account_id() {
        let pool = create_test_pool();
        let alice = account(&pool, "alice", "1").await;
        let bob = account(&pool, "bob", "2").await;
        befriend(&pool, &alice, &bob).await;

        let updated = Database::update_email(&pool, "alice@x.com", "New@X.com")
            .await
            .expect("Failed to update email");
        assert_eq!(updated.account_id, alice.account_id);
        assert_eq!(updated.email, "new@x.com");

        // Relations follow the id, not the email
        let friends = Database::list_friends(&pool, "new@x.com").await.unwrap();
        assert_eq!(friends.len(), 1);

        let old = Database::get_account(&pool, "alice@x.com").await;
        assert!(matches!(old, Err(AppError::NotFound(_))));

        let taken = Database::update_email(&pool, "new@x.com", "bob@x.com").await;
        assert!(matches!(taken, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let pool = create_test_pool();
        account(&pool, "alice", "1").await;

        let updated = Database::update_profile(
            &pool,
            "alice@x.com",
            &UpdateProfileRequest {
                fname: Some("Al".to_string()),
                profile_image: Some("/uploads/me.png".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update profile");

        assert_eq!(updated.fname, "Al");
        assert_eq!(updated.lname, "Test");
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.profile_image.as_deref(), Some("/uploads/me.png"));

        let replaced = Database::update_profile_image(&pool, "alice@x.com", "/uploads/new.png")
            .await
            .expect("Failed to set image");
        assert_eq!(replaced.profile_image.as_deref(), Some("/uploads/new.png"));
        assert_eq!(replaced.fname, "Al");
    }

    #[tokio::test]
    async fn test_push_token_round_trip() {
        let pool = create_test_pool();
        account(&pool, "alice", "1").await;

        Database::update_push_token(&pool, "alice@x.com", Some("tok"))
            .await
            .unwrap();
        let stored = Database::get_account(&pool, "alice@x.com").await.unwrap();
        assert_eq!(stored.push_token.as_deref(), Some("tok"));

        Database::update_push_token(&pool, "alice@x.com", None)
            .await
            .unwrap();
        let cleared = Database::get_account(&pool, "alice@x.com").await.unwrap();
        assert!(cleared.push_token.is_none());

        let missing = Database::update_push_token(&pool, "ghost@x.com", Some("tok")).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_account_cascades() {
        let pool = create_test_pool();
        let alice = account(&pool, "alice", "1").await;
        let bob = account(&pool, "bob", "2").await;
        account(&pool, "carol", "3").await;
        befriend(&pool, &alice, &bob).await;
        Database::send_friend_request(&pool, "carol@x.com", alice.account_id)
            .await
            .unwrap();

        let alice_post = Database::create_post(
            &pool,
            &CreatePostRequest {
                email: "alice@x.com".to_string(),
                content: "mine".to_string(),
                visibility: None,
                image: None,
                location: None,
            },
        )
        .await
        .unwrap();
        let bob_post = Database::create_post(
            &pool,
            &CreatePostRequest {
                email: "bob@x.com".to_string(),
                content: "bob's".to_string(),
                visibility: None,
                image: None,
                location: None,
            },
        )
        .await
        .unwrap();

        // Bob comments on Alice's post, Alice comments on Bob's
        let on_alice = Database::create_comment(&pool, "bob@x.com", alice_post.post_id, "nice")
            .await
            .unwrap();
        Database::create_comment(&pool, "alice@x.com", bob_post.post_id, "thanks")
            .await
            .unwrap();
        Database::react_to_comment(&pool, "carol@x.com", on_alice.comment_id, "like")
            .await
            .unwrap();
        Database::react_to_post(&pool, "alice@x.com", bob_post.post_id, "like")
            .await
            .unwrap();
        Database::send_message(&pool, "bob@x.com", alice.account_id, "hi")
            .await
            .unwrap();

        Database::delete_account(&pool, "alice@x.com")
            .await
            .expect("Failed to delete account");

        let lookup = Database::get_account(&pool, "alice@x.com").await;
        assert!(matches!(lookup, Err(AppError::NotFound(_))));

        let conn = pool.lock().await;
        let count = |sql: &str| -> i64 { conn.query_row(sql, [], |row| row.get(0)).unwrap() };
        assert_eq!(count("SELECT COUNT(*) FROM posts"), 1);
        assert_eq!(count("SELECT COUNT(*) FROM comments"), 0);
        assert_eq!(count("SELECT COUNT(*) FROM comment_reactions"), 0);
        assert_eq!(count("SELECT COUNT(*) FROM post_reactions"), 0);
        assert_eq!(count("SELECT COUNT(*) FROM friends"), 0);
        assert_eq!(count("SELECT COUNT(*) FROM friend_requests"), 0);
        assert_eq!(count("SELECT COUNT(*) FROM messages"), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_account() {
        let pool = create_test_pool();
        let result = Database::delete_account(&pool, "ghost@x.com").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_contacts_exclude_self_and_friends() {
        let pool = create_test_pool();
        let alice = account(&pool, "alice", "100").await;
        let bob = account(&pool, "bob", "200").await;
        let carol = account(&pool, "carol", "300").await;
        let dave = account(&pool, "dave", "400").await;
        befriend(&pool, &alice, &bob).await;
        Database::send_friend_request(&pool, "dave@x.com", alice.account_id)
            .await
            .unwrap();

        let numbers = vec![
            "100".to_string(),
            "200".to_string(),
            " 300 ".to_string(),
            "400".to_string(),
            "999".to_string(),
        ];
        let matches = Database::contacts_from_numbers(&pool, "alice@x.com", &numbers)
            .await
            .expect("Lookup failed");

        let ids: Vec<_> = matches.iter().map(|m| m.account.account_id).collect();
        assert_eq!(ids, vec![carol.account_id, dave.account_id]);
        assert_eq!(matches[0].relationship, Relationship::Other);
        assert_eq!(matches[1].relationship, Relationship::Incoming);
    }

    #[tokio::test]
    async fn test_contacts_handle_large_address_books() {
        let pool = create_test_pool();
        account(&pool, "alice", "100").await;
        let bob = account(&pool, "bob", "555-0199").await;

        let mut numbers: Vec<String> = (0..40_000).map(|i| format!("000-{:05}", i)).collect();
        numbers.push("555-0199".to_string());
        numbers.push("555-0199".to_string());

        let matches = Database::contacts_from_numbers(&pool, "alice@x.com", &numbers)
            .await
            .expect("Lookup failed");

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].account.account_id, bob.account_id);
    }

    #[tokio::test]
    async fn test_friend_suggestions_rank_by_mutual_friends() {
        let pool = create_test_pool();
        let alice = account(&pool, "alice", "1").await;
        let bob = account(&pool, "bob", "2").await;
        let carol = account(&pool, "carol", "3").await;
        let dave = account(&pool, "dave", "4").await;
        let erin = account(&pool, "erin", "5").await;

        befriend(&pool, &alice, &bob).await;
        befriend(&pool, &alice, &carol).await;
        befriend(&pool, &bob, &carol).await;
        befriend(&pool, &bob, &dave).await;
        befriend(&pool, &carol, &dave).await;
        befriend(&pool, &carol, &erin).await;

        let suggestions = Database::friend_suggestions(&pool, "alice@x.com")
            .await
            .expect("Lookup failed");

        let ranked: Vec<_> = suggestions
            .iter()
            .map(|m| (m.account.account_id, m.mutual_friends))
            .collect();
        assert_eq!(
            ranked,
            vec![(dave.account_id, Some(2)), (erin.account_id, Some(1))]
        );
        assert!(suggestions
            .iter()
            .all(|m| m.relationship == Relationship::Other));
    }

    #[tokio::test]
    async fn test_search_accounts_by_prefix() {
        let pool = create_test_pool();
        let alice = account(&pool, "alice", "1").await;
        let albert = account(&pool, "albert", "2").await;
        account(&pool, "bob", "3").await;
        befriend(&pool, &alice, &albert).await;

        let found = Database::search_accounts(&pool, "bob@x.com", "AL")
            .await
            .expect("Search failed");
        let names: Vec<_> = found.iter().map(|m| m.account.username.as_str()).collect();
        assert_eq!(names, vec!["albert", "alice"]);

        let own = Database::search_accounts(&pool, "alice@x.com", "al")
            .await
            .expect("Search failed");
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].relationship, Relationship::Friend);

        let wildcard = Database::search_accounts(&pool, "alice@x.com", "%")
            .await
            .expect("Search failed");
        assert!(wildcard.is_empty());
    }
}
