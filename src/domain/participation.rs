use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::board::{PostStatus, UnknownValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    Registered,
    Attended,
    Cancelled,
}

impl ParticipationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipationStatus::Registered => "registered",
            ParticipationStatus::Attended => "attended",
            ParticipationStatus::Cancelled => "cancelled",
        }
    }

    /// Registered and attended records take up a seat.
    pub fn holds_seat(self) -> bool {
        matches!(
            self,
            ParticipationStatus::Registered | ParticipationStatus::Attended
        )
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipationStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(ParticipationStatus::Registered),
            "attended" => Ok(ParticipationStatus::Attended),
            "cancelled" => Ok(ParticipationStatus::Cancelled),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Seats taken against an optional ceiling. `max = None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    pub current: i64,
    pub max: Option<i64>,
}

impl Capacity {
    pub fn is_full(&self) -> bool {
        self.max.is_some_and(|max| self.current >= max)
    }

    pub fn remaining(&self) -> Option<i64> {
        self.max.map(|max| (max - self.current).max(0))
    }

    /// Fill ratio for a progress bar, clamped to 0.0..=1.0.
    pub fn progress(&self) -> Option<f64> {
        self.max.map(|max| {
            if max <= 0 {
                1.0
            } else {
                (self.current as f64 / max as f64).clamp(0.0, 1.0)
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Register,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParticipationError {
    #[error("This activity is not open for registration")]
    NotOpen,
    #[error("This activity is full")]
    Full,
    #[error("Attendance has already been recorded")]
    AlreadyAttended,
}

/// Decides what a participate toggle does for a user's current record.
/// Cancelling is always allowed; registering needs a published post with a free seat.
pub fn next_action(
    current: Option<ParticipationStatus>,
    capacity: Capacity,
    post_status: PostStatus,
) -> Result<Toggle, ParticipationError> {
    match current {
        Some(ParticipationStatus::Registered) => Ok(Toggle::Cancel),
        Some(ParticipationStatus::Attended) => Err(ParticipationError::AlreadyAttended),
        None | Some(ParticipationStatus::Cancelled) => {
            if post_status != PostStatus::Published {
                Err(ParticipationError::NotOpen)
            } else if capacity.is_full() {
                Err(ParticipationError::Full)
            } else {
                Ok(Toggle::Register)
            }
        }
    }
}
