use std::sync::Arc;

use super::{
    Alert, BusyFlag, ClientResult, CommentController, Outcome, ParticipationController, PortalApi,
    PostRef, VoteController,
};
use crate::api::{LikeStatus, ParticipationSummary, VoteSummary};
use crate::db::models::Post;

/// Everything a post detail page shows, with one controller per widget.
pub struct DetailPage<A> {
    api: Arc<A>,
    post_ref: PostRef,
    pub post: Post,
    pub like: LikeStatus,
    pub comments: CommentController<A>,
    pub votes: Option<VoteController<A>>,
    pub participation: Option<ParticipationController<A>>,
    like_busy: BusyFlag,
}

impl<A: PortalApi> DetailPage<A> {
    /// Fetches the post, then its like status, comments, tally and
    /// participation as one concurrent batch. Widgets the post does not use
    /// are skipped.
    pub async fn load(api: Arc<A>, post_ref: PostRef) -> Result<Self, Alert> {
        let post = api.post(post_ref).await?;

        let wants_votes = post.has_vote();
        let wants_participation = post.board.accepts_participants();

        let (like, comments, votes, participation) = tokio::join!(
            api.like_status(post_ref),
            api.comments(post_ref),
            optional(wants_votes, api.vote_summary(post_ref)),
            optional(wants_participation, api.participation(post_ref)),
        );
        let like = like?;
        let comments = comments?;
        let votes: Option<VoteSummary> = votes?;
        let participation: Option<ParticipationSummary> = participation?;

        tracing::debug!(
            post_id = post.id,
            comments = comments.len(),
            "detail page loaded"
        );

        Ok(Self {
            comments: CommentController::new(Arc::clone(&api), post_ref, comments),
            votes: votes.map(|s| VoteController::new(Arc::clone(&api), post_ref, s)),
            participation: participation
                .map(|s| ParticipationController::new(Arc::clone(&api), post_ref, s)),
            api,
            post_ref,
            post,
            like,
            like_busy: BusyFlag::new(),
        })
    }

    pub fn like_busy_flag(&self) -> BusyFlag {
        self.like_busy.clone()
    }

    /// Toggles the post like and takes the server's count.
    pub async fn toggle_like(&mut self) -> Result<Outcome, Alert> {
        let Some(_guard) = self.like_busy.try_begin() else {
            return Ok(Outcome::Skipped);
        };
        if !self.api.is_authenticated() {
            return Err(Alert::sign_in());
        }

        self.like = self.api.toggle_like(self.post_ref).await?;
        self.post.like_count = self.like.like_count;
        Ok(Outcome::Done(None))
    }
}

async fn optional<T, F>(wanted: bool, fut: F) -> ClientResult<Option<T>>
where
    F: std::future::Future<Output = ClientResult<T>>,
{
    if wanted {
        fut.await.map(Some)
    } else {
        Ok(None)
    }
}
