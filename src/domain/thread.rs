use std::collections::HashMap;

use crate::db::models::Comment;

/// A flat comment list partitioned by `parent_id`.
///
/// Top-level comments keep the order they arrived in (the API returns them
/// oldest first). A reply is only reachable through its parent, so a reply
/// never shows up in the top-level list even when its parent is missing.
#[derive(Debug)]
pub struct CommentThread<'a> {
    top_level: Vec<&'a Comment>,
    replies: HashMap<i64, Vec<&'a Comment>>,
}

impl<'a> CommentThread<'a> {
    pub fn build(comments: &'a [Comment]) -> Self {
        let mut top_level = Vec::new();
        let mut replies: HashMap<i64, Vec<&'a Comment>> = HashMap::new();

        for comment in comments {
            match comment.parent_id {
                None => top_level.push(comment),
                Some(parent) => replies.entry(parent).or_default().push(comment),
            }
        }

        Self { top_level, replies }
    }

    pub fn top_level(&self) -> &[&'a Comment] {
        &self.top_level
    }

    pub fn replies(&self, parent_id: i64) -> &[&'a Comment] {
        self.replies
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reply_count(&self, parent_id: i64) -> usize {
        self.replies(parent_id).len()
    }

    /// Ids of every reply below `id`, at any depth.
    pub fn descendants(&self, id: i64) -> Vec<i64> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for reply in self.replies(current) {
                out.push(reply.id);
                stack.push(reply.id);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParentError {
    #[error("Parent comment not found")]
    Missing,
    #[error("Parent comment belongs to a different post")]
    OtherPost,
}

/// A reply's parent must exist and sit on the same post.
/// `parent_post_id` is `None` when the parent lookup found nothing.
pub fn check_parent(post_id: i64, parent_post_id: Option<i64>) -> Result<(), ParentError> {
    match parent_post_id {
        None => Err(ParentError::Missing),
        Some(p) if p != post_id => Err(ParentError::OtherPost),
        Some(_) => Ok(()),
    }
}
