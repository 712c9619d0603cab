/// Post storage and the visibility-filtered read paths.
///
/// The feed filters in SQL with `VISIBLE_TO_VIEWER_SQL`; single-owner and
/// single-post reads fetch rows and apply `is_visible` in Rust. Both paths
/// encode the same rule.
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use super::friends::are_friends;
use super::models::{CreatePostRequest, Post, PostView};
use super::{account_id_by_email, ensure_account, now_timestamp, Database, DbPool};
use crate::error::{AppError, Result};
use crate::social::aggregation::{DISLIKE_COUNT_SQL, LIKE_COUNT_SQL, VIEWER_REACTION_RANK_SQL};
use crate::social::visibility::VISIBLE_TO_VIEWER_SQL;
use crate::social::{
    is_visible, normalize_email, require_text, AccountId, Aggregates, ViewerReaction, Visibility,
};

impl Database {
    pub async fn create_post(pool: &DbPool, req: &CreatePostRequest) -> Result<Post> {
        let email = normalize_email(&req.email)?;
        let content = require_text("content", &req.content)?;
        let visibility = match req.visibility.as_deref() {
            None => Visibility::Public,
            Some(tag) => Visibility::from_str(tag)
                .ok_or_else(|| AppError::validation(format!("Unknown visibility {:?}", tag)))?,
        };

        let conn = pool.lock().await;
        let owner = account_id_by_email(&conn, &email)?;
        let created_at = now_timestamp();

        conn.execute(
            "INSERT INTO posts (account_id, content, created_at, visibility, image, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                owner,
                content,
                created_at,
                visibility.as_str(),
                req.image,
                req.location
            ],
        )?;

        let post_id = conn.last_insert_rowid();
        load_post_view(&conn, owner, post_id)?
            .map(|view| view.post)
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    /// Every post the viewer may read, newest first.
    pub async fn feed(pool: &DbPool, email: &str) -> Result<Vec<PostView>> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;

        query_post_views(&conn, VISIBLE_TO_VIEWER_SQL, &[&viewer])
    }

    /// One account's posts, filtered for the viewer.
    pub async fn posts_by_account(
        pool: &DbPool,
        email: &str,
        owner: AccountId,
    ) -> Result<Vec<PostView>> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;
        ensure_account(&conn, owner)?;

        let friends = viewer != owner && are_friends(&conn, viewer, owner)?;
        let posts = query_post_views(&conn, "p.account_id = ?2", &[&viewer, &owner])?
            .into_iter()
            .filter(|view| is_visible(viewer, owner, view.post.visibility, friends))
            .collect();

        Ok(posts)
    }

    /// Absent and hidden posts both read as `NotFound`.
    pub async fn get_post(pool: &DbPool, email: &str, post_id: i64) -> Result<PostView> {
        let email = normalize_email(email)?;
        let conn = pool.lock().await;
        let viewer = account_id_by_email(&conn, &email)?;

        let view = load_post_view(&conn, viewer, post_id)?
            .ok_or_else(|| AppError::not_found("Post not found"))?;
        let owner = view.post.account_id;
        let friends = viewer != owner && are_friends(&conn, viewer, owner)?;

        if !is_visible(viewer, owner, view.post.visibility, friends) {
            return Err(AppError::not_found("Post not found"));
        }
        Ok(view)
    }

    /// Owner only. Comments go with the post, along with every reaction on
    /// the post and its comments.
    pub async fn delete_post(pool: &DbPool, email: &str, post_id: i64) -> Result<()> {
        let email = normalize_email(email)?;
        let mut conn = pool.lock().await;
        let tx = conn.transaction()?;
        let viewer = account_id_by_email(&tx, &email)?;

        let owner: AccountId = tx
            .query_row(
                "SELECT account_id FROM posts WHERE post_id = ?1",
                params![post_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("Post not found"))?;
        if owner != viewer {
            return Err(AppError::Forbidden("Only the owner can delete a post".into()));
        }

        tx.execute(
            "DELETE FROM comment_reactions
             WHERE comment_id IN (SELECT comment_id FROM comments WHERE post_id = ?1)",
            params![post_id],
        )?;
        tx.execute("DELETE FROM comments WHERE post_id = ?1", params![post_id])?;
        tx.execute("DELETE FROM post_reactions WHERE post_id = ?1", params![post_id])?;
        tx.execute("DELETE FROM posts WHERE post_id = ?1", params![post_id])?;

        tx.commit()?;
        log::info!("Post {} deleted by account {}", post_id, viewer);
        Ok(())
    }
}

/// Owner of `post_id` when the viewer may read it, `NotFound` otherwise.
pub(crate) fn visible_post_owner(
    conn: &Connection,
    viewer: AccountId,
    post_id: i64,
) -> Result<AccountId> {
    let row: Option<(AccountId, String)> = conn
        .query_row(
            "SELECT account_id, visibility FROM posts WHERE post_id = ?1",
            params![post_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (owner, visibility) = row.ok_or_else(|| AppError::not_found("Post not found"))?;
    let visibility = Visibility::from_stored(&visibility);
    let friends = visibility == Visibility::Friends
        && viewer != owner
        && are_friends(conn, viewer, owner)?;

    if !is_visible(viewer, owner, visibility, friends) {
        return Err(AppError::not_found("Post not found"));
    }
    Ok(owner)
}

fn post_view_sql(condition: &str) -> String {
    format!(
        "SELECT p.post_id, p.account_id, a.username, p.content, p.created_at, p.visibility,
                p.image, p.location,
                {likes}, {dislikes}, COUNT(DISTINCT c.comment_id), {rank}
         FROM posts p
         JOIN accounts a ON a.account_id = p.account_id
         LEFT JOIN post_reactions r ON r.post_id = p.post_id
         LEFT JOIN comments c ON c.post_id = p.post_id
         WHERE {condition}
         GROUP BY p.post_id
         ORDER BY p.created_at DESC, p.post_id DESC",
        likes = LIKE_COUNT_SQL,
        dislikes = DISLIKE_COUNT_SQL,
        rank = VIEWER_REACTION_RANK_SQL,
        condition = condition
    )
}

/// `condition` may reference `p`, `a`, the viewer as `?1` and further params.
fn query_post_views(
    conn: &Connection,
    condition: &str,
    args: &[&dyn ToSql],
) -> Result<Vec<PostView>> {
    let mut stmt = conn.prepare(&post_view_sql(condition))?;
    let views = stmt
        .query_map(args, post_view_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(views)
}

fn load_post_view(conn: &Connection, viewer: AccountId, post_id: i64) -> Result<Option<PostView>> {
    let mut views = query_post_views(conn, "p.post_id = ?2", &[&viewer, &post_id])?;
    Ok(views.pop())
}

fn post_view_from_row(row: &Row<'_>) -> rusqlite::Result<PostView> {
    let visibility: String = row.get(5)?;
    Ok(PostView {
        post: Post {
            post_id: row.get(0)?,
            account_id: row.get(1)?,
            username: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
            visibility: Visibility::from_stored(&visibility),
            image: row.get(6)?,
            location: row.get(7)?,
        },
        stats: Aggregates {
            like_count: row.get(8)?,
            dislike_count: row.get(9)?,
            comment_count: Some(row.get(10)?),
            viewer_reaction: ViewerReaction::from_rank(row.get(11)?),
        },
    })
}
