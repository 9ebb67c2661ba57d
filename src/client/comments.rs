use std::sync::Arc;

use super::{Alert, BusyFlag, Outcome, PortalApi, PostRef};
use crate::db::models::Comment;
use crate::domain::CommentThread;

/// Holds a post's comments as one flat list and keeps it in step with the
/// server after each action.
pub struct CommentController<A> {
    api: Arc<A>,
    post: PostRef,
    comments: Vec<Comment>,
    busy: BusyFlag,
}

impl<A: PortalApi> CommentController<A> {
    pub fn new(api: Arc<A>, post: PostRef, comments: Vec<Comment>) -> Self {
        Self {
            api,
            post,
            comments,
            busy: BusyFlag::new(),
        }
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Top-level comments and their replies, for rendering.
    pub fn thread(&self) -> CommentThread<'_> {
        CommentThread::build(&self.comments)
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// Replaces the local list with the server's.
    pub async fn reload(&mut self) -> Result<(), Alert> {
        self.comments = self.api.comments(self.post).await?;
        Ok(())
    }

    pub async fn submit_comment(
        &mut self,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<Outcome, Alert> {
        let Some(_guard) = self.busy.try_begin() else {
            return Ok(Outcome::Skipped);
        };
        let content = content.trim();
        if content.is_empty() {
            return Err(Alert::validation("Please enter a comment."));
        }
        if !self.api.is_authenticated() {
            return Err(Alert::sign_in());
        }

        let created = self
            .api
            .create_comment(self.post, content, parent_id)
            .await?;
        self.comments.push(created.comment);
        Ok(Outcome::Done(Some(created.message)))
    }

    pub async fn edit_comment(&mut self, id: i64, content: &str) -> Result<Outcome, Alert> {
        let Some(_guard) = self.busy.try_begin() else {
            return Ok(Outcome::Skipped);
        };
        let content = content.trim();
        if content.is_empty() {
            return Err(Alert::validation("Please enter a comment."));
        }
        if !self.api.is_authenticated() {
            return Err(Alert::sign_in());
        }

        let updated = self.api.edit_comment(self.post, id, content).await?;
        if let Some(slot) = self.comments.iter_mut().find(|c| c.id == id) {
            *slot = updated.comment;
        }
        Ok(Outcome::Done(Some(updated.message)))
    }

    /// Removes the comment and every reply the server removed with it.
    pub async fn delete_comment(&mut self, id: i64) -> Result<Outcome, Alert> {
        let Some(_guard) = self.busy.try_begin() else {
            return Ok(Outcome::Skipped);
        };
        if !self.api.is_authenticated() {
            return Err(Alert::sign_in());
        }

        let deleted = self.api.delete_comment(self.post, id).await?;
        self.comments
            .retain(|c| c.id != id && !deleted.removed.contains(&c.id));
        Ok(Outcome::Done(Some(deleted.message)))
    }

    /// Moves the local counter one step in the direction the server reports
    /// through `liked`. The list is refreshed by [`Self::reload`].
    pub async fn toggle_like(&mut self, id: i64) -> Result<Outcome, Alert> {
        let Some(_guard) = self.busy.try_begin() else {
            return Ok(Outcome::Skipped);
        };
        if !self.api.is_authenticated() {
            return Err(Alert::sign_in());
        }

        let status = self.api.toggle_comment_like(self.post, id).await?;
        if let Some(comment) = self.comments.iter_mut().find(|c| c.id == id) {
            if status.liked {
                comment.like_count += 1;
            } else {
                comment.like_count = (comment.like_count - 1).max(0);
            }
        }
        Ok(Outcome::Done(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{sample_post, FakePortal};
    use crate::client::AlertKind;
    use crate::domain::Board;
    use std::sync::atomic::Ordering;

    fn controller(api: FakePortal) -> (Arc<FakePortal>, CommentController<FakePortal>) {
        let api = Arc::new(api);
        let ctl = CommentController::new(
            Arc::clone(&api),
            PostRef::new(Board::Activity, 1),
            Vec::new(),
        );
        (api, ctl)
    }

    #[tokio::test]
    async fn top_level_comment_lands_in_top_level_list() {
        let (_, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        let outcome = ctl.submit_comment("  hello  ", None).await.unwrap();
        assert_eq!(outcome, Outcome::Done(Some("Comment posted".into())));

        let thread = ctl.thread();
        assert_eq!(thread.top_level().len(), 1);
        assert_eq!(thread.top_level()[0].content, "hello");
        assert_eq!(thread.top_level()[0].parent_id, None);
    }

    #[tokio::test]
    async fn reply_is_listed_under_parent_only() {
        let (_, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        ctl.submit_comment("parent", None).await.unwrap();
        ctl.submit_comment("other", None).await.unwrap();
        let parent_id = ctl.comments()[0].id;
        ctl.submit_comment("reply", Some(parent_id)).await.unwrap();

        let thread = ctl.thread();
        assert_eq!(thread.top_level().len(), 2);
        assert!(thread.top_level().iter().all(|c| c.content != "reply"));
        assert_eq!(thread.replies(parent_id).len(), 1);
        assert_eq!(thread.replies(parent_id)[0].content, "reply");
    }

    #[tokio::test]
    async fn empty_content_never_reaches_server() {
        let (api, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        let alert = ctl.submit_comment("   ", None).await.unwrap_err();
        assert_eq!(alert.kind, AlertKind::Validation);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn anonymous_user_is_asked_to_sign_in() {
        let (api, mut ctl) = controller(FakePortal::anonymous(sample_post(Board::Activity)));
        let alert = ctl.submit_comment("hello", None).await.unwrap_err();
        assert_eq!(alert, Alert::sign_in());
        assert_eq!(api.call_count(), 0);
        assert!(ctl.comments().is_empty());
    }

    #[tokio::test]
    async fn server_failure_is_a_generic_alert_and_leaves_state() {
        let (api, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        api.fail_all.store(true, Ordering::SeqCst);
        let alert = ctl.submit_comment("hello", None).await.unwrap_err();
        assert_eq!(alert, Alert::failed());
        assert!(ctl.comments().is_empty());
        assert!(!ctl.busy_flag().is_busy());
    }

    #[tokio::test]
    async fn action_while_in_flight_is_skipped() {
        let (api, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        let flag = ctl.busy_flag();
        let held = flag.try_begin().unwrap();

        let outcome = ctl.submit_comment("hello", None).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(api.call_count(), 0);

        drop(held);
        assert!(matches!(
            ctl.submit_comment("hello", None).await.unwrap(),
            Outcome::Done(_)
        ));
    }

    #[tokio::test]
    async fn edit_replaces_matching_entry() {
        let (_, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        ctl.submit_comment("tpyo", None).await.unwrap();
        let id = ctl.comments()[0].id;

        ctl.edit_comment(id, "typo").await.unwrap();
        assert_eq!(ctl.comments().len(), 1);
        assert_eq!(ctl.comments()[0].content, "typo");
    }

    #[tokio::test]
    async fn delete_removes_comment_and_its_replies() {
        let (_, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        ctl.submit_comment("parent", None).await.unwrap();
        ctl.submit_comment("keep", None).await.unwrap();
        let parent = ctl.comments()[0].id;
        ctl.submit_comment("reply", Some(parent)).await.unwrap();

        ctl.delete_comment(parent).await.unwrap();
        let left: Vec<&str> = ctl.comments().iter().map(|c| c.content.as_str()).collect();
        assert_eq!(left, vec!["keep"]);
    }

    #[tokio::test]
    async fn like_toggle_twice_restores_count() {
        let (_, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        ctl.submit_comment("likeable", None).await.unwrap();
        let id = ctl.comments()[0].id;

        ctl.toggle_like(id).await.unwrap();
        assert_eq!(ctl.comments()[0].like_count, 1);
        ctl.toggle_like(id).await.unwrap();
        assert_eq!(ctl.comments()[0].like_count, 0);
    }

    #[tokio::test]
    async fn like_steps_local_count_by_server_direction() {
        let (api, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        ctl.submit_comment("popular", None).await.unwrap();
        let id = ctl.comments()[0].id;
        // Other members' likes stay invisible until the next reload
        api.state.lock().unwrap().comments[0].like_count = 4;

        ctl.toggle_like(id).await.unwrap();
        assert_eq!(ctl.comments()[0].like_count, 1);

        ctl.reload().await.unwrap();
        assert_eq!(ctl.comments()[0].like_count, 5);
    }

    #[tokio::test]
    async fn reload_picks_up_server_list() {
        let (api, mut ctl) = controller(FakePortal::new(sample_post(Board::Activity)));
        api.create_comment(PostRef::new(Board::Activity, 1), "from elsewhere", None)
            .await
            .unwrap();
        assert!(ctl.comments().is_empty());

        ctl.reload().await.unwrap();
        assert_eq!(ctl.comments().len(), 1);
    }
}
