/// Social-graph rules shared by the REST and realtime layers.
/// Nothing in here touches storage directly; the db layer feeds these
/// functions rows and flags, and embeds the matching SQL fragments.
pub mod aggregation;
pub mod identity;
pub mod relationship;
pub mod visibility;

/// Opaque, storage-generated account key.
pub type AccountId = i64;

pub use aggregation::{Aggregates, ReactionChoice, ReactionKind, ViewerReaction};
pub use identity::{normalize_email, normalize_username, require_text};
pub use relationship::{ordered_pair, Relationship, Transition};
pub use visibility::{is_visible, Visibility};
