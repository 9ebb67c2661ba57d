//! Client-side state controllers for the portal's detail pages.
//!
//! Each controller caches the view state for one post, issues one request
//! per user action through a [`PortalApi`], and turns every failure into an
//! [`Alert`]. There is no retry or offline queue.

pub mod busy;
pub mod comments;
pub mod detail;
pub mod error;
pub mod http;
pub mod participation;
pub mod votes;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::api::{
    CommentDeleted, CommentEnvelope, CommentLikeStatus, LikeStatus, ParticipationSummary,
    VoteSummary,
};
use crate::db::models::{Comment, Post};
use crate::domain::Board;

pub use busy::BusyFlag;
pub use comments::CommentController;
pub use detail::DetailPage;
pub use error::{Alert, AlertKind, ClientError};
pub use http::HttpPortal;
pub use participation::ParticipationController;
pub use votes::VoteController;

pub type ClientResult<T> = Result<T, ClientError>;

/// Addresses one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostRef {
    pub board: Board,
    pub id: i64,
}

impl PostRef {
    pub fn new(board: Board, id: i64) -> Self {
        Self { board, id }
    }
}

/// What an action did when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The request completed. Carries the server's message for display.
    Done(Option<String>),
    /// Ignored because the same control already had a request in flight.
    Skipped,
}

/// The calls the controllers make. [`HttpPortal`] is the real implementation.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// Whether a session is attached. Checked before any authenticated call.
    fn is_authenticated(&self) -> bool;

    async fn post(&self, post: PostRef) -> ClientResult<Post>;

    async fn like_status(&self, post: PostRef) -> ClientResult<LikeStatus>;
    async fn toggle_like(&self, post: PostRef) -> ClientResult<LikeStatus>;

    async fn participation(&self, post: PostRef) -> ClientResult<ParticipationSummary>;
    async fn toggle_participation(&self, post: PostRef) -> ClientResult<ParticipationSummary>;

    async fn vote_summary(&self, post: PostRef) -> ClientResult<VoteSummary>;
    async fn cast_vote(&self, post: PostRef, option: &str) -> ClientResult<VoteSummary>;

    async fn comments(&self, post: PostRef) -> ClientResult<Vec<Comment>>;
    async fn create_comment(
        &self,
        post: PostRef,
        content: &str,
        parent_id: Option<i64>,
    ) -> ClientResult<CommentEnvelope>;
    async fn edit_comment(
        &self,
        post: PostRef,
        comment_id: i64,
        content: &str,
    ) -> ClientResult<CommentEnvelope>;
    async fn delete_comment(&self, post: PostRef, comment_id: i64) -> ClientResult<CommentDeleted>;
    async fn toggle_comment_like(
        &self,
        post: PostRef,
        comment_id: i64,
    ) -> ClientResult<CommentLikeStatus>;
}
