/// Data models for database operations.
/// Represents accounts, posts, comments, messages and the request/response DTOs.
use serde::{Deserialize, Serialize};

use crate::social::{AccountId, Aggregates, Relationship, Visibility};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub account_id: AccountId,
    pub email: String,
    pub username: String,
    pub phone_number: String,
    pub fname: String,
    pub lname: String,
    pub join_date: String,
    pub profile_image: Option<String>,
    #[serde(skip_serializing, default)]
    pub push_token: Option<String>,
}

/// Public face of an account, safe to show to other viewers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub username: String,
    pub fname: String,
    pub lname: String,
    pub profile_image: Option<String>,
}

/// Another account annotated from the viewer's side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMatch {
    #[serde(flatten)]
    pub account: AccountSummary,
    pub relationship: Relationship,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutual_friends: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub post_id: i64,
    pub account_id: AccountId,
    pub username: String,
    pub content: String,
    pub created_at: String,
    pub visibility: Visibility,
    pub image: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    #[serde(flatten)]
    pub stats: Aggregates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: i64,
    pub post_id: i64,
    pub account_id: AccountId,
    pub username: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(flatten)]
    pub stats: Aggregates,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub message_id: i64,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub content: String,
    pub sent_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub partner: AccountSummary,
    pub last_message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FriendRequests {
    pub incoming: Vec<AccountSummary>,
    pub outgoing: Vec<AccountSummary>,
}

// Request/Response DTOs
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckAvailabilityRequest {
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    pub username: String,
    #[serde(default)]
    pub fname: String,
    #[serde(default)]
    pub lname: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEmailRequest {
    pub new_email: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub fname: Option<String>,
    pub lname: Option<String>,
    pub phone_number: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PushTokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactsRequest {
    pub phone_numbers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendActionRequest {
    pub email: String,
    pub account_id: AccountId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelationshipResponse {
    pub account_id: AccountId,
    pub relationship: Relationship,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub email: String,
    pub content: String,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub email: String,
    pub post_id: i64,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactionRequest {
    pub email: String,
    pub reaction: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub email: String,
    pub receiver_id: AccountId,
    pub content: String,
}

/// `?email=` on reads performed on behalf of a viewer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewerQuery {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    /// Base64-encoded file contents
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}
