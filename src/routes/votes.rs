use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{board_from, load_visible_post};
use crate::api::{Ballot, VoteSummary};
use crate::db::models::Post;
use crate::domain::vote::{check_ballot, phase_at};
use crate::domain::VoteTally;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, Json, MaybeUser, Path};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/{board}/{id}/vote", get(vote_summary).post(cast_vote))
}

async fn vote_summary(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((board, id)): Path<(String, i64)>,
) -> AppResult<Json<VoteSummary>> {
    let board = board_from(&board)?;
    let conn = state.db.get()?;
    let post = load_visible_post(&conn, board, id, user.as_ref())?;
    let summary = summarize(&conn, &post, user.as_ref().map(|u| u.id.as_str()), None)?;
    Ok(Json(summary))
}

/// POST with `{voteOption}`. A second ballot from the same user replaces the first.
async fn cast_vote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board, id)): Path<(String, i64)>,
    Json(ballot): Json<Ballot>,
) -> AppResult<Json<VoteSummary>> {
    let board = board_from(&board)?;
    let mut conn = state.db.get()?;
    let post = load_visible_post(&conn, board, id, Some(&user))?;

    let choice = ballot.vote_option.trim();
    check_ballot(&post.vote_options, post.vote_deadline, choice, Utc::now())?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let previous: Option<String> = tx
        .query_row(
            "SELECT option_text FROM votes WHERE post_id = ?1 AND user_id = ?2",
            params![id, user.id],
            |r| r.get(0),
        )
        .optional()?;
    tx.execute(
        "INSERT INTO votes (post_id, user_id, option_text) VALUES (?1, ?2, ?3)
         ON CONFLICT (post_id, user_id)
         DO UPDATE SET option_text = excluded.option_text, updated_at = datetime('now')",
        params![id, user.id, choice],
    )?;
    tx.commit()?;

    let message = match previous {
        Some(prev) if prev != choice => "Your vote has been changed",
        Some(_) => "You already voted for this option",
        None => "Your vote has been recorded",
    };
    tracing::info!(post_id = id, user = %user.username, option = choice, "vote cast");

    let summary = summarize(&conn, &post, Some(&user.id), Some(message.to_string()))?;
    Ok(Json(summary))
}

fn summarize(
    conn: &Connection,
    post: &Post,
    viewer: Option<&str>,
    message: Option<String>,
) -> AppResult<VoteSummary> {
    let mut stmt = conn.prepare(
        "SELECT option_text, COUNT(*) FROM votes WHERE post_id = ?1 GROUP BY option_text",
    )?;
    let rows = stmt
        .query_map(params![post.id], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<Result<Vec<(String, i64)>, _>>()?;

    let user_vote = match viewer {
        Some(uid) => conn
            .query_row(
                "SELECT option_text FROM votes WHERE post_id = ?1 AND user_id = ?2",
                params![post.id, uid],
                |r| r.get(0),
            )
            .optional()?,
        None => None,
    };

    Ok(VoteSummary {
        tally: VoteTally::from_counts(&post.vote_options, rows),
        user_vote,
        vote_deadline: post.vote_deadline,
        phase: phase_at(post.vote_deadline, Utc::now()),
        message,
    })
}
