use std::sync::Arc;

use super::{Alert, BusyFlag, Outcome, PortalApi, PostRef};
use crate::api::ParticipationSummary;
use crate::domain::{Capacity, PostStatus};

/// Registration toggle and progress bar for one activity.
pub struct ParticipationController<A> {
    api: Arc<A>,
    post: PostRef,
    summary: ParticipationSummary,
    busy: BusyFlag,
}

impl<A: PortalApi> ParticipationController<A> {
    pub fn new(api: Arc<A>, post: PostRef, summary: ParticipationSummary) -> Self {
        Self {
            api,
            post,
            summary,
            busy: BusyFlag::new(),
        }
    }

    pub fn summary(&self) -> &ParticipationSummary {
        &self.summary
    }

    pub fn capacity(&self) -> Capacity {
        self.summary.capacity()
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// Whether the toggle should be enabled. Cancelling is always possible;
    /// joining needs a published activity with a free seat.
    pub fn can_participate(&self) -> bool {
        self.summary.is_participating
            || (self.summary.post_status == PostStatus::Published && !self.capacity().is_full())
    }

    pub async fn participate(&mut self) -> Result<Outcome, Alert> {
        let Some(_guard) = self.busy.try_begin() else {
            return Ok(Outcome::Skipped);
        };
        if !self.api.is_authenticated() {
            return Err(Alert::sign_in());
        }
        if !self.can_participate() {
            let reason = if self.summary.post_status != PostStatus::Published {
                "This activity is not open for registration."
            } else {
                "This activity is full."
            };
            return Err(Alert::validation(reason));
        }

        let summary = self.api.toggle_participation(self.post).await?;
        let message = summary.message.clone();
        self.summary = summary;
        Ok(Outcome::Done(message))
    }
}
