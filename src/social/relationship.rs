/// Friendship state between two accounts, seen from one side.
///
/// Friendships are stored once per pair with the smaller id first, so a
/// pair can never be duplicated in reverse. Requests are directed and keyed
/// by (sender, receiver).
use serde::{Deserialize, Serialize};

use super::AccountId;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Friend,
    Outgoing,
    Incoming,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SendRequest,
    CancelRequest,
    AcceptRequest,
    RejectRequest,
    RemoveFriend,
}

impl Relationship {
    /// First match wins: friendship, then our request, then theirs.
    pub fn resolve(are_friends: bool, outgoing: bool, incoming: bool) -> Self {
        if are_friends {
            Relationship::Friend
        } else if outgoing {
            Relationship::Outgoing
        } else if incoming {
            Relationship::Incoming
        } else {
            Relationship::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Friend => "friend",
            Relationship::Outgoing => "outgoing",
            Relationship::Incoming => "incoming",
            Relationship::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "friend" => Some(Relationship::Friend),
            "outgoing" => Some(Relationship::Outgoing),
            "incoming" => Some(Relationship::Incoming),
            "other" => Some(Relationship::Other),
            _ => None,
        }
    }

    /// State after `transition`. Returning `self` means the transition is a no-op.
    pub fn apply(self, transition: Transition) -> Result<Relationship> {
        use Relationship::*;
        use Transition::*;

        match (self, transition) {
            (Other, SendRequest) => Ok(Outgoing),
            (Outgoing, SendRequest) => Ok(Outgoing),
            (Friend, SendRequest) => Err(AppError::Conflict("Already friends".into())),
            (Incoming, SendRequest) => Err(AppError::Conflict(
                "This account already sent you a friend request".into(),
            )),

            (Outgoing, CancelRequest) => Ok(Other),
            (_, CancelRequest) => Err(AppError::not_found("No outgoing friend request")),

            (Incoming, AcceptRequest) => Ok(Friend),
            (_, AcceptRequest) => Err(AppError::not_found("No incoming friend request")),

            (Incoming, RejectRequest) => Ok(Other),
            (_, RejectRequest) => Err(AppError::not_found("No incoming friend request")),

            (Friend, RemoveFriend) => Ok(Other),
            (state, RemoveFriend) => Ok(state),
        }
    }

    /// The same state as seen from the other account.
    pub fn mirrored(self) -> Self {
        match self {
            Relationship::Outgoing => Relationship::Incoming,
            Relationship::Incoming => Relationship::Outgoing,
            other => other,
        }
    }
}

/// Storage order for a friendship row.
pub fn ordered_pair(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// `resolve` as a SQL expression. Binds the viewer to `?1` and expects the
/// other account's id in `a.account_id`.
pub const RELATIONSHIP_SQL: &str = "CASE
    WHEN EXISTS (SELECT 1 FROM friends f
                 WHERE (f.account_id1 = ?1 AND f.account_id2 = a.account_id)
                    OR (f.account_id1 = a.account_id AND f.account_id2 = ?1)) THEN 'friend'
    WHEN EXISTS (SELECT 1 FROM friend_requests fr
                 WHERE fr.sender_id = ?1 AND fr.receiver_id = a.account_id) THEN 'outgoing'
    WHEN EXISTS (SELECT 1 FROM friend_requests fr
                 WHERE fr.sender_id = a.account_id AND fr.receiver_id = ?1) THEN 'incoming'
    ELSE 'other' END";

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [Relationship; 4] = [
        Relationship::Friend,
        Relationship::Outgoing,
        Relationship::Incoming,
        Relationship::Other,
    ];

    #[test]
    fn test_resolve_priority() {
        assert_eq!(Relationship::resolve(true, true, true), Relationship::Friend);
        assert_eq!(Relationship::resolve(false, true, true), Relationship::Outgoing);
        assert_eq!(Relationship::resolve(false, false, true), Relationship::Incoming);
        assert_eq!(Relationship::resolve(false, false, false), Relationship::Other);
    }

    #[test]
    fn test_request_lifecycle() {
        let sent = Relationship::Other.apply(Transition::SendRequest).unwrap();
        assert_eq!(sent, Relationship::Outgoing);
        assert_eq!(
            sent.apply(Transition::CancelRequest).unwrap(),
            Relationship::Other
        );

        let incoming = sent.mirrored();
        assert_eq!(
            incoming.apply(Transition::AcceptRequest).unwrap(),
            Relationship::Friend
        );
        assert_eq!(
            incoming.apply(Transition::RejectRequest).unwrap(),
            Relationship::Other
        );
        assert_eq!(
            Relationship::Friend.apply(Transition::RemoveFriend).unwrap(),
            Relationship::Other
        );
    }

    #[test]
    fn test_send_is_preempted_by_existing_relation() {
        assert!(matches!(
            Relationship::Friend.apply(Transition::SendRequest),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            Relationship::Incoming.apply(Transition::SendRequest),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(
            Relationship::Outgoing.apply(Transition::SendRequest).unwrap(),
            Relationship::Outgoing
        );
    }

    #[test]
    fn test_remove_friend_is_idempotent() {
        for state in STATES {
            let once = state.apply(Transition::RemoveFriend).unwrap();
            let twice = once.apply(Transition::RemoveFriend).unwrap();
            assert_eq!(once, twice);
            assert_ne!(twice, Relationship::Friend);
        }
    }

    #[test]
    fn test_accept_and_reject_require_incoming() {
        for state in [Relationship::Friend, Relationship::Outgoing, Relationship::Other] {
            assert!(matches!(
                state.apply(Transition::AcceptRequest),
                Err(AppError::NotFound(_))
            ));
            assert!(matches!(
                state.apply(Transition::RejectRequest),
                Err(AppError::NotFound(_))
            ));
        }
    }

    #[test]
    fn test_mirrored_is_symmetric_for_friends() {
        assert_eq!(Relationship::Friend.mirrored(), Relationship::Friend);
        for state in STATES {
            assert_eq!(state.mirrored().mirrored(), state);
        }
    }

    #[test]
    fn test_ordered_pair() {
        assert_eq!(ordered_pair(7, 3), (3, 7));
        assert_eq!(ordered_pair(3, 7), (3, 7));
    }

    #[test]
    fn test_string_round_trip() {
        for state in STATES {
            assert_eq!(Relationship::from_str(state.as_str()), Some(state));
        }
        assert_eq!(Relationship::from_str("stranger"), None);
    }
}
