//! Board rules that both the request handlers and the client controllers share.

pub mod board;
pub mod participation;
pub mod thread;
pub mod vote;

pub use board::{Board, PostStatus};
pub use participation::{Capacity, ParticipationStatus};
pub use thread::CommentThread;
pub use vote::{VotePhase, VoteTally};
