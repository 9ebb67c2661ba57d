//! In-memory [`PortalApi`] for controller tests. Mimics the server's rules
//! for one signed-in user looking at one post.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{ClientError, ClientResult, PortalApi, PostRef};
use crate::api::{
    CommentDeleted, CommentEnvelope, CommentLikeStatus, LikeStatus, ParticipationSummary,
    VoteSummary,
};
use crate::db::models::{Comment, Post};
use crate::domain::vote::{check_ballot, phase_at};
use crate::domain::{Board, ParticipationStatus, PostStatus, VoteTally};

pub struct FakePortal {
    pub authenticated: bool,
    pub fail_all: AtomicBool,
    /// Fails only `vote_summary`, after any cast has gone through.
    pub fail_summary: AtomicBool,
    pub calls: AtomicUsize,
    pub state: Mutex<FakeState>,
}

pub struct FakeState {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub next_id: i64,
    pub post_liked: bool,
    pub liked_comments: HashSet<i64>,
    /// Other users' ballots, then ours under "me".
    pub ballots: BTreeMap<String, String>,
    pub status: Option<ParticipationStatus>,
    pub others_registered: i64,
}

pub fn sample_post(board: Board) -> Post {
    Post {
        id: 1,
        board,
        title: "Spring hike".into(),
        content: "Meet at the gate".into(),
        author_id: "author".into(),
        author_name: "author".into(),
        status: PostStatus::Published,
        vote_options: vec!["A".into(), "B".into()],
        vote_deadline: None,
        max_participants: Some(2),
        like_count: 0,
        created_at: "2026-03-01 10:00:00".into(),
        updated_at: "2026-03-01 10:00:00".into(),
    }
}

impl FakePortal {
    pub fn new(post: Post) -> Self {
        Self {
            authenticated: true,
            fail_all: AtomicBool::new(false),
            fail_summary: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            state: Mutex::new(FakeState {
                post,
                comments: Vec::new(),
                next_id: 1,
                post_liked: false,
                liked_comments: HashSet::new(),
                ballots: BTreeMap::new(),
                status: None,
                others_registered: 0,
            }),
        }
    }

    pub fn anonymous(post: Post) -> Self {
        Self {
            authenticated: false,
            ..Self::new(post)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> ClientResult<std::sync::MutexGuard<'_, FakeState>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 500,
                message: "Internal server error".into(),
            });
        }
        Ok(self.state.lock().unwrap())
    }
}

fn rejected(status: u16, message: impl ToString) -> ClientError {
    ClientError::Api {
        status,
        message: message.to_string(),
    }
}

impl FakeState {
    fn summary(&self) -> VoteSummary {
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for option in self.ballots.values() {
            *counts.entry(option.clone()).or_default() += 1;
        }
        VoteSummary {
            tally: VoteTally::from_counts(&self.post.vote_options, counts),
            user_vote: self.ballots.get("me").cloned(),
            vote_deadline: self.post.vote_deadline,
            phase: phase_at(self.post.vote_deadline, Utc::now()),
            message: None,
        }
    }

    fn participation(&self) -> ParticipationSummary {
        let mine = i64::from(self.status.is_some_and(ParticipationStatus::holds_seat));
        ParticipationSummary {
            status: self.status,
            is_participating: mine == 1,
            current_participants: self.others_registered + mine,
            max_participants: self.post.max_participants,
            post_status: self.post.status,
            message: None,
        }
    }
}

#[async_trait]
impl PortalApi for FakePortal {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn post(&self, _post: PostRef) -> ClientResult<Post> {
        Ok(self.enter()?.post.clone())
    }

    async fn like_status(&self, _post: PostRef) -> ClientResult<LikeStatus> {
        let s = self.enter()?;
        Ok(LikeStatus {
            liked: s.post_liked,
            like_count: s.post.like_count,
        })
    }

    async fn toggle_like(&self, _post: PostRef) -> ClientResult<LikeStatus> {
        let mut s = self.enter()?;
        s.post_liked = !s.post_liked;
        s.post.like_count += if s.post_liked { 1 } else { -1 };
        Ok(LikeStatus {
            liked: s.post_liked,
            like_count: s.post.like_count,
        })
    }

    async fn participation(&self, _post: PostRef) -> ClientResult<ParticipationSummary> {
        Ok(self.enter()?.participation())
    }

    async fn toggle_participation(&self, _post: PostRef) -> ClientResult<ParticipationSummary> {
        let mut s = self.enter()?;
        if s.status == Some(ParticipationStatus::Registered) {
            s.status = Some(ParticipationStatus::Cancelled);
        } else {
            let summary = s.participation();
            if summary.capacity().is_full() {
                return Err(rejected(409, "This activity is full"));
            }
            s.status = Some(ParticipationStatus::Registered);
        }
        let mut summary = s.participation();
        summary.message = Some("ok".into());
        Ok(summary)
    }

    async fn vote_summary(&self, _post: PostRef) -> ClientResult<VoteSummary> {
        let s = self.enter()?;
        if self.fail_summary.load(Ordering::SeqCst) {
            return Err(rejected(503, "Service unavailable"));
        }
        Ok(s.summary())
    }

    async fn cast_vote(&self, _post: PostRef, option: &str) -> ClientResult<VoteSummary> {
        let mut s = self.enter()?;
        check_ballot(&s.post.vote_options, s.post.vote_deadline, option, Utc::now())
            .map_err(|e| rejected(409, e))?;
        s.ballots.insert("me".into(), option.to_string());
        let mut summary = s.summary();
        summary.message = Some("Your vote has been recorded".into());
        Ok(summary)
    }

    async fn comments(&self, _post: PostRef) -> ClientResult<Vec<Comment>> {
        Ok(self.enter()?.comments.clone())
    }

    async fn create_comment(
        &self,
        post: PostRef,
        content: &str,
        parent_id: Option<i64>,
    ) -> ClientResult<CommentEnvelope> {
        let mut s = self.enter()?;
        if let Some(parent) = parent_id {
            if !s.comments.iter().any(|c| c.id == parent) {
                return Err(rejected(400, "Parent comment not found"));
            }
        }
        let id = s.next_id;
        s.next_id += 1;
        let comment = Comment {
            id,
            post_id: post.id,
            author_id: "me".into(),
            author_name: "me".into(),
            parent_id,
            content: content.to_string(),
            like_count: 0,
            created_at: "2026-03-01 10:00:00".into(),
            updated_at: "2026-03-01 10:00:00".into(),
        };
        s.comments.push(comment.clone());
        Ok(CommentEnvelope {
            comment,
            message: "Comment posted".into(),
        })
    }

    async fn edit_comment(
        &self,
        _post: PostRef,
        comment_id: i64,
        content: &str,
    ) -> ClientResult<CommentEnvelope> {
        let mut s = self.enter()?;
        let comment = s
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| rejected(404, "Not found"))?;
        comment.content = content.to_string();
        Ok(CommentEnvelope {
            comment: comment.clone(),
            message: "Comment updated".into(),
        })
    }

    async fn delete_comment(&self, _post: PostRef, comment_id: i64) -> ClientResult<CommentDeleted> {
        let mut s = self.enter()?;
        let mut removed = vec![comment_id];
        let mut i = 0;
        while i < removed.len() {
            let parent = removed[i];
            removed.extend(
                s.comments
                    .iter()
                    .filter(|c| c.parent_id == Some(parent))
                    .map(|c| c.id),
            );
            i += 1;
        }
        s.comments.retain(|c| !removed.contains(&c.id));
        Ok(CommentDeleted {
            comment_id,
            removed,
            message: "Comment deleted".into(),
        })
    }

    async fn toggle_comment_like(
        &self,
        _post: PostRef,
        comment_id: i64,
    ) -> ClientResult<CommentLikeStatus> {
        let mut s = self.enter()?;
        let liked = if s.liked_comments.remove(&comment_id) {
            false
        } else {
            s.liked_comments.insert(comment_id);
            true
        };
        let comment = s
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| rejected(404, "Not found"))?;
        comment.like_count += if liked { 1 } else { -1 };
        Ok(CommentLikeStatus {
            comment_id,
            liked,
            like_count: comment.like_count,
        })
    }
}
