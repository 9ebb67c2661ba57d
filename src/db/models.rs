use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{Board, PostStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

impl User {
    pub const COLUMNS: &'static str = "id, username, display_name, bio, is_admin, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            display_name: row.get(2)?,
            bio: row.get(3)?,
            is_admin: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub board: Board,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub status: PostStatus,
    pub vote_options: Vec<String>,
    pub vote_deadline: Option<DateTime<Utc>>,
    pub max_participants: Option<i64>,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Post {
    /// Select list matching [`Post::from_row`]; expects `posts p JOIN users u`.
    pub const SELECT: &'static str = "SELECT p.id, p.board, p.title, p.content, p.author_id, \
         u.username, p.status, p.vote_options, p.vote_deadline, p.max_participants, \
         p.like_count, p.created_at, p.updated_at \
         FROM posts p JOIN users u ON u.id = p.author_id";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let options_json: String = row.get(7)?;
        let vote_options: Vec<String> = serde_json::from_str(&options_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

        let vote_deadline = row
            .get::<_, Option<String>>(8)?
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e))
                    })
            })
            .transpose()?;

        Ok(Post {
            id: row.get(0)?,
            board: parse_column(row, 1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            author_id: row.get(4)?,
            author_name: row.get(5)?,
            status: parse_column(row, 6)?,
            vote_options,
            vote_deadline,
            max_participants: row.get(9)?,
            like_count: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    pub fn has_vote(&self) -> bool {
        !self.vote_options.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: String,
    pub author_name: String,
    pub parent_id: Option<i64>,
    pub content: String,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Comment {
    /// Select list matching [`Comment::from_row`]; expects `comments c JOIN users u`.
    pub const SELECT: &'static str = "SELECT c.id, c.post_id, c.author_id, u.username, \
         c.parent_id, c.content, c.like_count, c.created_at, c.updated_at \
         FROM comments c JOIN users u ON u.id = c.author_id";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Comment {
            id: row.get(0)?,
            post_id: row.get(1)?,
            author_id: row.get(2)?,
            author_name: row.get(3)?,
            parent_id: row.get(4)?,
            content: row.get(5)?,
            like_count: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

/// Reads a TEXT column into any `FromStr` enum.
pub fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
