use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the three boards a post can live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    Activity,
    Project,
    Resource,
}

impl Board {
    pub const ALL: [Board; 3] = [Board::Activity, Board::Project, Board::Resource];

    /// Value stored in the `posts.board` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Board::Activity => "activity",
            Board::Project => "project",
            Board::Resource => "resource",
        }
    }

    /// Plural URL segment, e.g. `/api/activities/3`.
    pub fn segment(self) -> &'static str {
        match self {
            Board::Activity => "activities",
            Board::Project => "projects",
            Board::Resource => "resources",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.segment() == segment)
    }

    /// Only activities take registrations.
    pub fn accepts_participants(self) -> bool {
        self == Board::Activity
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Board {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| UnknownValue(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Closed,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Closed => "closed",
        }
    }
}

impl FromStr for PostStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "closed" => Ok(PostStatus::Closed),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value: {0}")]
pub struct UnknownValue(pub String);
