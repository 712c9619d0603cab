/// Post visibility rules.
///
/// A post is readable by a viewer when any of these hold, checked in order:
/// - the post is `public`
/// - the viewer owns the post
/// - the post is `friends` and the viewer and owner are friends
///
/// Everything else is denied. `private` has no rule of its own; it is
/// simply a tag that only the owner rule can satisfy.
use serde::{Deserialize, Serialize};

use super::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Friends,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Friends => "friends",
            Visibility::Private => "private",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "friends" => Some(Visibility::Friends),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }

    /// Tag read back from storage. Unknown tags fall back to owner-only.
    pub fn from_stored(s: &str) -> Self {
        Self::from_str(s).unwrap_or(Visibility::Private)
    }
}

/// Single-resource check. `are_friends` is only consulted for `friends` posts.
pub fn is_visible(
    viewer: AccountId,
    owner: AccountId,
    visibility: Visibility,
    are_friends: bool,
) -> bool {
    visibility == Visibility::Public
        || owner == viewer
        || (visibility == Visibility::Friends && are_friends)
}

/// The same rule as `is_visible`, as a WHERE fragment for list queries.
/// Expects the post table aliased as `p` and the viewer's id bound to `?1`.
pub const VISIBLE_TO_VIEWER_SQL: &str = "(p.visibility = 'public'
    OR p.account_id = ?1
    OR (p.visibility = 'friends' AND EXISTS (
        SELECT 1 FROM friends f
        WHERE (f.account_id1 = ?1 AND f.account_id2 = p.account_id)
           OR (f.account_id1 = p.account_id AND f.account_id2 = ?1))))";

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Visibility; 3] = [Visibility::Public, Visibility::Friends, Visibility::Private];

    #[test]
    fn test_public_visible_to_anyone() {
        assert!(is_visible(2, 1, Visibility::Public, false));
    }

    #[test]
    fn test_owner_sees_every_tag() {
        for tag in ALL {
            assert!(is_visible(1, 1, tag, false));
        }
    }

    #[test]
    fn test_friends_tag_requires_friendship() {
        assert!(!is_visible(2, 1, Visibility::Friends, false));
        assert!(is_visible(2, 1, Visibility::Friends, true));
    }

    #[test]
    fn test_private_denied_even_to_friends() {
        assert!(!is_visible(2, 1, Visibility::Private, true));
    }

    #[test]
    fn test_predicate_matches_rule_table() {
        for tag in ALL {
            for are_friends in [false, true] {
                for viewer in [1, 2] {
                    let expected = tag == Visibility::Public
                        || viewer == 1
                        || (tag == Visibility::Friends && are_friends);
                    assert_eq!(is_visible(viewer, 1, tag, are_friends), expected);
                }
            }
        }
    }

    #[test]
    fn test_tag_parsing() {
        assert_eq!(Visibility::from_str(" Friends "), Some(Visibility::Friends));
        assert_eq!(Visibility::from_str("everyone"), None);
        assert_eq!(Visibility::from_stored("garbage"), Visibility::Private);
        for tag in ALL {
            assert_eq!(Visibility::from_str(tag.as_str()), Some(tag));
        }
    }
}
