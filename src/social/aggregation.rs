/// Reaction and comment rollups for posts and comments.
///
/// An account holds at most one reaction per subject. Storage enforces this
/// with a (subject, account) primary key, so counting rows per kind is exact
/// as long as joins are grouped by the subject key.
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

/// What a client asks for: set a reaction, or clear it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChoice {
    Set(ReactionKind),
    Clear,
}

impl ReactionChoice {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "like" => Ok(ReactionChoice::Set(ReactionKind::Like)),
            "dislike" => Ok(ReactionChoice::Set(ReactionKind::Dislike)),
            "none" | "" => Ok(ReactionChoice::Clear),
            other => Err(AppError::validation(format!(
                "Unknown reaction {:?}, expected like, dislike or none",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerReaction {
    #[default]
    None,
    Liked,
    Disliked,
}

impl ViewerReaction {
    /// Like is checked before dislike.
    pub fn resolve(liked: bool, disliked: bool) -> Self {
        if liked {
            ViewerReaction::Liked
        } else if disliked {
            ViewerReaction::Disliked
        } else {
            ViewerReaction::None
        }
    }

    /// Decode the rank produced by `VIEWER_REACTION_RANK_SQL`.
    pub fn from_rank(rank: i64) -> Self {
        match rank {
            2 => ViewerReaction::Liked,
            1 => ViewerReaction::Disliked,
            _ => ViewerReaction::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregates {
    pub like_count: i64,
    pub dislike_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<i64>,
    pub viewer_reaction: ViewerReaction,
}

impl Aggregates {
    /// Fold raw (account, kind) reaction rows for one subject.
    pub fn from_reactions<'a, I>(reactions: I, viewer: i64) -> Self
    where
        I: IntoIterator<Item = &'a (i64, ReactionKind)>,
    {
        let mut stats = Aggregates::default();
        let (mut liked, mut disliked) = (false, false);

        for (account, kind) in reactions {
            match kind {
                ReactionKind::Like => {
                    stats.like_count += 1;
                    liked |= *account == viewer;
                }
                ReactionKind::Dislike => {
                    stats.dislike_count += 1;
                    disliked |= *account == viewer;
                }
            }
        }

        stats.viewer_reaction = ViewerReaction::resolve(liked, disliked);
        stats
    }

    pub fn with_comments(mut self, count: i64) -> Self {
        self.comment_count = Some(count);
        self
    }
}

/// Distinct like reactors, for reactions aliased as `r`.
pub const LIKE_COUNT_SQL: &str =
    "COUNT(DISTINCT CASE WHEN r.kind = 'like' THEN r.account_id END)";

/// Distinct dislike reactors, for reactions aliased as `r`.
pub const DISLIKE_COUNT_SQL: &str =
    "COUNT(DISTINCT CASE WHEN r.kind = 'dislike' THEN r.account_id END)";

/// 2 = liked, 1 = disliked, 0 = none for the viewer bound to `?1`.
pub const VIEWER_REACTION_RANK_SQL: &str = "COALESCE(MAX(CASE
    WHEN r.account_id = ?1 AND r.kind = 'like' THEN 2
    WHEN r.account_id = ?1 AND r.kind = 'dislike' THEN 1
    ELSE 0 END), 0)";
