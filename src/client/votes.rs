use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{Alert, BusyFlag, Outcome, PortalApi, PostRef};
use crate::api::VoteSummary;
use crate::domain::vote::phase_at;
use crate::domain::VotePhase;

/// Vote bar state for one post.
///
/// Open/closed is derived from the deadline on every call; the server never
/// pushes the transition.
pub struct VoteController<A> {
    api: Arc<A>,
    post: PostRef,
    summary: VoteSummary,
    busy: BusyFlag,
}

impl<A: PortalApi> VoteController<A> {
    pub fn new(api: Arc<A>, post: PostRef, summary: VoteSummary) -> Self {
        Self {
            api,
            post,
            summary,
            busy: BusyFlag::new(),
        }
    }

    pub fn summary(&self) -> &VoteSummary {
        &self.summary
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn is_enabled(&self) -> bool {
        !self.summary.tally.vote_options.is_empty()
    }

    pub fn phase(&self, now: DateTime<Utc>) -> VotePhase {
        phase_at(self.summary.vote_deadline, now)
    }

    pub fn user_vote(&self) -> Option<&str> {
        self.summary.user_vote.as_deref()
    }

    /// `(option, count, percentage)` rows in declared order.
    pub fn rows(&self) -> Vec<(&str, i64, f64)> {
        self.summary.tally.rows()
    }

    /// Casts (or changes) the user's vote, then re-fetches the tally. The
    /// vote is already recorded once the cast succeeds, so a failed re-fetch
    /// keeps the summary the cast returned instead of raising an alert.
    pub async fn vote(&mut self, option: &str, now: DateTime<Utc>) -> Result<Outcome, Alert> {
        let Some(_guard) = self.busy.try_begin() else {
            return Ok(Outcome::Skipped);
        };
        if !self.api.is_authenticated() {
            return Err(Alert::sign_in());
        }
        if !self.is_enabled() {
            return Err(Alert::validation("Voting is not available for this post."));
        }
        if self.phase(now) == VotePhase::Closed {
            return Err(Alert::validation("Voting has ended."));
        }
        let option = option.trim();
        if option.is_empty() {
            return Err(Alert::validation("Please select an option."));
        }

        let cast = self.api.cast_vote(self.post, option).await?;
        let message = cast.message.clone();
        self.summary = match self.api.vote_summary(self.post).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(post_id = self.post.id, "tally refresh failed: {}", e);
                cast
            }
        };
        Ok(Outcome::Done(message))
    }
}
