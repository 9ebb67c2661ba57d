//! JSON bodies exchanged over `/api`. The handlers serialize these and the
//! client controllers deserialize the same types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Comment, Post, User};
use crate::domain::{Board, Capacity, ParticipationStatus, PostStatus, VotePhase, VoteTally};

// --- Posts ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEnvelope {
    pub post: Post,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub vote_options: Vec<String>,
    #[serde(default)]
    pub vote_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_participants: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditPost {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: PostStatus,
}

// --- Comments ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentList {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditComment {
    #[serde(rename = "commentId")]
    pub comment_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CommentRef {
    #[serde(rename = "commentId")]
    pub comment_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEnvelope {
    pub comment: Comment,
    pub message: String,
}

/// Result of a delete. `removed` lists the comment and every reply under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDeleted {
    #[serde(rename = "commentId")]
    pub comment_id: i64,
    pub removed: Vec<i64>,
    pub message: String,
}

// --- Likes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentLikeStatus {
    pub comment_id: i64,
    pub liked: bool,
    pub like_count: i64,
}

// --- Votes ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub vote_option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSummary {
    #[serde(flatten)]
    pub tally: VoteTally,
    pub user_vote: Option<String>,
    pub vote_deadline: Option<DateTime<Utc>>,
    pub phase: VotePhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// --- Participation ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationSummary {
    pub status: Option<ParticipationStatus>,
    pub is_participating: bool,
    pub current_participants: i64,
    pub max_participants: Option<i64>,
    pub post_status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ParticipationSummary {
    pub fn capacity(&self) -> Capacity {
        Capacity {
            current: self.current_participants,
            max: self.max_participants,
        }
    }
}

// --- Accounts ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user: User,
    pub post_count: i64,
    pub comment_count: i64,
    pub recent_posts: Vec<Post>,
}

// --- Admin ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardCount {
    pub board: Board,
    pub posts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteStats {
    pub users: i64,
    pub boards: Vec<BoardCount>,
    pub comments: i64,
    pub votes: i64,
    pub participations: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
