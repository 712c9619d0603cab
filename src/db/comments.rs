/// Comment storage. Comments inherit the visibility of their post.
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{Comment, CommentView};
use super::posts::visible_post_owner;
use super::{account_id_by_email, now_timestamp, Database, DbPool};
use crate::error::{AppError, Result};
use crate::social::aggregation::{DISLIKE_COUNT_SQL, LIKE_COUNT_SQL, VIEWER_REACTION_RANK_SQL};
use crate::social::{normalize_email, require_text, AccountId, Aggregates, ViewerReaction};

impl Database {
    /// The commenter must be able to read the post.
    pub async fn create_comment(
        pool: &DbPool,
        email: &str,
        post_id: i64,
        content: &str,
    ) -> Result<Comment> {
        let email = normalize_email(email)?;
        let content = require_text("content", content)?;
        let conn = pool.lock().await;
        let author = account_id_by_email(&conn, &email)?;
        visible_post_owner(&conn, author, post_id)?;

        conn.execute(
            "INSERT INTO comments (post_id, account_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![post_id, author, content, now_timestamp()],
        )?;

        let comment_id = conn.last_insert_rowid();
        load_comment(&conn, comment_id)?.ok_or_else(|| AppError::not_found("Comment not found"))
    }

    /// Oldest first. `NotFound` unless the viewer can read the post.
    pub async fn comments_for_post(
        pool: &DbPool,
        email: &str,
        post_id: i64,
    ) -> Result<Vec<CommentView>> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;
        visible_post_owner(&conn, viewer, post_id)?;

        let sql = format!(
            "SELECT c.comment_id, c.post_id, c.account_id, a.username, c.content, c.created_at,
                    {likes}, {dislikes}, {rank}
             FROM comments c
             JOIN accounts a ON a.account_id = c.account_id
             LEFT JOIN comment_reactions r ON r.comment_id = c.comment_id
             WHERE c.post_id = ?2
             GROUP BY c.comment_id
             ORDER BY c.created_at ASC, c.comment_id ASC",
            likes = LIKE_COUNT_SQL,
            dislikes = DISLIKE_COUNT_SQL,
            rank = VIEWER_REACTION_RANK_SQL
        );

        let mut stmt = conn.prepare(&sql)?;
        let comments = stmt
            .query_map(params![viewer, post_id], |row| {
                Ok(CommentView {
                    comment: comment_from_row(row)?,
                    stats: Aggregates {
                        like_count: row.get(6)?,
                        dislike_count: row.get(7)?,
                        comment_count: None,
                        viewer_reaction: ViewerReaction::from_rank(row.get(8)?),
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    /// Allowed for the comment's author and the owner of the post.
    pub async fn delete_comment(pool: &DbPool, email: &str, comment_id: i64) -> Result<()> {
        let email = normalize_email(email)?;
        let mut conn = pool.lock().await;
        let tx = conn.transaction()?;
        let viewer = account_id_by_email(&tx, &email)?;

        let (author, post_owner) = comment_owners(&tx, comment_id)?
            .ok_or_else(|| AppError::not_found("Comment not found"))?;
        if viewer != author && viewer != post_owner {
            return Err(AppError::Forbidden(
                "Only the author or the post owner can delete a comment".into(),
            ));
        }

        tx.execute(
            "DELETE FROM comment_reactions WHERE comment_id = ?1",
            params![comment_id],
        )?;
        tx.execute("DELETE FROM comments WHERE comment_id = ?1", params![comment_id])?;
        tx.commit()?;
        Ok(())
    }
}

/// (comment author, post owner)
fn comment_owners(conn: &Connection, comment_id: i64) -> Result<Option<(AccountId, AccountId)>> {
    let owners = conn
        .query_row(
            "SELECT c.account_id, p.account_id
             FROM comments c JOIN posts p ON p.post_id = c.post_id
             WHERE c.comment_id = ?1",
            params![comment_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(owners)
}

/// Post the comment hangs off, if the comment exists.
pub(crate) fn comment_post(conn: &Connection, comment_id: i64) -> Result<Option<i64>> {
    let post_id = conn
        .query_row(
            "SELECT post_id FROM comments WHERE comment_id = ?1",
            params![comment_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(post_id)
}

fn load_comment(conn: &Connection, comment_id: i64) -> Result<Option<Comment>> {
    let comment = conn
        .query_row(
            "SELECT c.comment_id, c.post_id, c.account_id, a.username, c.content, c.created_at
             FROM comments c JOIN accounts a ON a.account_id = c.account_id
             WHERE c.comment_id = ?1",
            params![comment_id],
            comment_from_row,
        )
        .optional()?;
    Ok(comment)
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        comment_id: row.get(0)?,
        post_id: row.get(1)?,
        account_id: row.get(2)?,
        username: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}
