/// Like/dislike storage for posts and comments.
///
/// Setting a reaction is one upsert against the (subject, account) key, so
/// an account can never hold a like and a dislike on the same subject.
use rusqlite::{params, Connection};

use super::comments::comment_post;
use super::posts::visible_post_owner;
use super::{account_id_by_email, now_timestamp, Database, DbPool};
use crate::error::{AppError, Result};
use crate::social::{normalize_email, AccountId, Aggregates, ReactionChoice, ReactionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTarget {
    Post,
    Comment,
}

impl ReactionTarget {
    fn table(&self) -> &'static str {
        match self {
            ReactionTarget::Post => "post_reactions",
            ReactionTarget::Comment => "comment_reactions",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            ReactionTarget::Post => "post_id",
            ReactionTarget::Comment => "comment_id",
        }
    }
}

impl Database {
    /// `reaction` is `like`, `dislike` or `none`. Returns the post's new tallies.
    pub async fn react_to_post(
        pool: &DbPool,
        email: &str,
        post_id: i64,
        reaction: &str,
    ) -> Result<Aggregates> {
        let choice = ReactionChoice::parse(reaction)?;
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;
        visible_post_owner(&conn, viewer, post_id)?;

        apply_reaction(&conn, ReactionTarget::Post, post_id, viewer, choice)
    }

    /// Same as `react_to_post`; the comment's post must be readable.
    pub async fn react_to_comment(
        pool: &DbPool,
        email: &str,
        comment_id: i64,
        reaction: &str,
    ) -> Result<Aggregates> {
        let choice = ReactionChoice::parse(reaction)?;
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;
        let post_id = comment_post(&conn, comment_id)?
            .ok_or_else(|| AppError::not_found("Comment not found"))?;
        visible_post_owner(&conn, viewer, post_id)?;

        apply_reaction(&conn, ReactionTarget::Comment, comment_id, viewer, choice)
    }
}

fn apply_reaction(
    conn: &Connection,
    target: ReactionTarget,
    subject: i64,
    account: AccountId,
    choice: ReactionChoice,
) -> Result<Aggregates> {
    match choice {
        ReactionChoice::Set(kind) => {
            let sql = format!(
                "INSERT INTO {table} ({key}, account_id, kind, reacted_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT ({key}, account_id)
                 DO UPDATE SET kind = excluded.kind, reacted_at = excluded.reacted_at",
                table = target.table(),
                key = target.key()
            );
            conn.execute(
                &sql,
                params![subject, account, kind.as_str(), now_timestamp()],
            )?;
        }
        ReactionChoice::Clear => {
            let sql = format!(
                "DELETE FROM {} WHERE {} = ?1 AND account_id = ?2",
                target.table(),
                target.key()
            );
            conn.execute(&sql, params![subject, account])?;
        }
    }

    let reactions = reactions_for(conn, target, subject)?;
    let stats = Aggregates::from_reactions(&reactions, account);
    Ok(match target {
        ReactionTarget::Post => stats.with_comments(comment_count(conn, subject)?),
        ReactionTarget::Comment => stats,
    })
}

fn reactions_for(
    conn: &Connection,
    target: ReactionTarget,
    subject: i64,
) -> Result<Vec<(AccountId, ReactionKind)>> {
    let sql = format!(
        "SELECT account_id, kind FROM {} WHERE {} = ?1",
        target.table(),
        target.key()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![subject], |row| {
            let kind: String = row.get(1)?;
            let kind = if kind == "dislike" {
                ReactionKind::Dislike
            } else {
                ReactionKind::Like
            };
            Ok((row.get(0)?, kind))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn comment_count(conn: &Connection, post_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
