use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Voting is open until the deadline passes. Posts without a deadline never close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotePhase {
    Open,
    Closed,
}

pub fn phase_at(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> VotePhase {
    match deadline {
        Some(deadline) if now > deadline => VotePhase::Closed,
        _ => VotePhase::Open,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteError {
    #[error("Voting is not enabled for this post")]
    Disabled,
    #[error("Voting has closed")]
    Closed,
    #[error("Please select an option")]
    NoSelection,
    #[error("Unknown vote option")]
    UnknownOption,
}

/// Checks a ballot against the post's options and deadline.
pub fn check_ballot(
    options: &[String],
    deadline: Option<DateTime<Utc>>,
    choice: &str,
    now: DateTime<Utc>,
) -> Result<(), VoteError> {
    if options.is_empty() {
        return Err(VoteError::Disabled);
    }
    if phase_at(deadline, now) == VotePhase::Closed {
        return Err(VoteError::Closed);
    }
    if choice.trim().is_empty() {
        return Err(VoteError::NoSelection);
    }
    if !options.iter().any(|o| o == choice) {
        return Err(VoteError::UnknownOption);
    }
    Ok(())
}

/// Aggregate vote counts keyed by option text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub vote_options: Vec<String>,
    pub vote_results: BTreeMap<String, i64>,
    pub total_votes: i64,
}

impl VoteTally {
    /// Builds a tally from `(option_text, count)` rows. Every declared option
    /// gets an entry. Rows whose text no longer matches an option are dropped.
    pub fn from_counts<I>(options: &[String], rows: I) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut vote_results: BTreeMap<String, i64> =
            options.iter().map(|o| (o.clone(), 0)).collect();
        let mut total_votes = 0;

        for (option, count) in rows {
            if let Some(slot) = vote_results.get_mut(&option) {
                *slot += count;
                total_votes += count;
            }
        }

        Self {
            vote_options: options.to_vec(),
            vote_results,
            total_votes,
        }
    }

    pub fn count(&self, option: &str) -> i64 {
        self.vote_results.get(option).copied().unwrap_or(0)
    }

    /// Share of the total, 0.0 to 100.0.
    pub fn percentage(&self, option: &str) -> f64 {
        if self.total_votes == 0 {
            return 0.0;
        }
        self.count(option) as f64 * 100.0 / self.total_votes as f64
    }

    /// Options with their count and percentage, in declared order.
    pub fn rows(&self) -> Vec<(&str, i64, f64)> {
        self.vote_options
            .iter()
            .map(|o| (o.as_str(), self.count(o), self.percentage(o)))
            .collect()
    }
}
