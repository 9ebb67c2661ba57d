/// E2E tests for the detail page controllers.
/// These spin up a real server on an ephemeral port and talk to it over HTTP.
use std::sync::Arc;

use chrono::{Duration, Utc};

use clubhub::api::NewPost;
use clubhub::client::{AlertKind, DetailPage, HttpPortal, Outcome, PortalApi, PostRef};
use clubhub::config::Config;
use clubhub::domain::{Board, VotePhase};
use clubhub::state::AppState;
use clubhub::{db, routes};

struct TestServer {
    base_url: String,
    _tmp: tempfile::TempDir,
}

async fn spawn_server() -> TestServer {
    let tmp = tempfile::tempdir().unwrap();
    let pool = db::create_pool(&tmp.path().join("clubhub.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    let app = routes::app(AppState {
        db: pool,
        config: Config::default(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        _tmp: tmp,
    }
}

async fn signed_in(server: &TestServer, username: &str) -> HttpPortal {
    let mut portal = HttpPortal::new(&server.base_url);
    portal.register(username, "long enough password").await.unwrap();
    portal
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn activity_detail_page_round_trip() {
    let server = spawn_server().await;
    let organizer = signed_in(&server, "organizer").await;

    let post = organizer
        .create_post(
            Board::Activity,
            &NewPost {
                title: "Saturday cleanup".into(),
                content: "Meet at the park gate".into(),
                vote_options: vec!["Morning".into(), "Afternoon".into()],
                vote_deadline: Some(Utc::now() + Duration::days(3)),
                max_participants: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let api = Arc::new(signed_in(&server, "neighbor").await);
    let mut page = DetailPage::load(Arc::clone(&api), PostRef::new(Board::Activity, post.id))
        .await
        .unwrap();
    assert_eq!(page.post.title, "Saturday cleanup");
    assert!(page.comments.comments().is_empty());

    // Comment, then reply under it
    page.comments.submit_comment("Count me in", None).await.unwrap();
    let parent = page.comments.comments()[0].id;
    let outcome = page
        .comments
        .submit_comment("Bringing gloves", Some(parent))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Done(Some("Reply posted".into())));
    assert_eq!(page.comments.thread().replies(parent).len(), 1);

    // Vote, then change it
    let votes = page.votes.as_mut().unwrap();
    assert_eq!(votes.phase(Utc::now()), VotePhase::Open);
    votes.vote("Morning", Utc::now()).await.unwrap();
    votes.vote("Afternoon", Utc::now()).await.unwrap();
    assert_eq!(votes.user_vote(), Some("Afternoon"));
    assert_eq!(votes.summary().tally.total_votes, 1);
    assert_eq!(votes.summary().tally.percentage("Afternoon"), 100.0);

    // Register for one of the two seats
    let participation = page.participation.as_mut().unwrap();
    participation.participate().await.unwrap();
    assert!(participation.summary().is_participating);
    assert_eq!(participation.capacity().current, 1);
    assert_eq!(participation.capacity().remaining(), Some(1));

    // Like the post and a comment
    page.toggle_like().await.unwrap();
    assert!(page.like.liked);
    assert_eq!(page.like.like_count, 1);
    page.comments.toggle_like(parent).await.unwrap();
    assert_eq!(page.comments.comments()[0].like_count, 1);

    // A fresh load sees everything the server stored
    let reloaded = DetailPage::load(api, PostRef::new(Board::Activity, post.id))
        .await
        .unwrap();
    assert_eq!(reloaded.comments.comments().len(), 2);
    assert_eq!(reloaded.post.like_count, 1);
    assert_eq!(
        reloaded.votes.as_ref().unwrap().summary().tally.vote_results["Afternoon"],
        1
    );
    assert!(reloaded.participation.as_ref().unwrap().summary().is_participating);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn anonymous_and_rejected_actions_become_alerts() {
    let server = spawn_server().await;
    let author = signed_in(&server, "author").await;
    let post = author
        .create_post(
            Board::Resource,
            &NewPost {
                title: "Reading list".into(),
                content: "Books we liked".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let post_ref = PostRef::new(Board::Resource, post.id);

    let anonymous = Arc::new(HttpPortal::new(&server.base_url));
    let mut page = DetailPage::load(anonymous, post_ref).await.unwrap();
    assert!(page.votes.is_none());
    assert!(page.participation.is_none());

    let alert = page.comments.submit_comment("hello", None).await.unwrap_err();
    assert_eq!(alert.kind, AlertKind::SignIn);

    // A member who is not the author gets the server's refusal
    let author = Arc::new(author);
    let mut author_page = DetailPage::load(Arc::clone(&author), post_ref).await.unwrap();
    author_page.comments.submit_comment("Mine", None).await.unwrap();
    let comment_id = author_page.comments.comments()[0].id;

    let other = Arc::new(signed_in(&server, "other").await);
    let mut other_page = DetailPage::load(other, post_ref).await.unwrap();
    let alert = other_page
        .comments
        .edit_comment(comment_id, "not mine")
        .await
        .unwrap_err();
    assert_eq!(alert.kind, AlertKind::Rejected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_registrations_never_overfill() {
    let server = spawn_server().await;
    let organizer = signed_in(&server, "organizer").await;
    let post = organizer
        .create_post(
            Board::Activity,
            &NewPost {
                title: "Kayak trip".into(),
                content: "Three boats".into(),
                max_participants: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let post_ref = PostRef::new(Board::Activity, post.id);

    let mut members = Vec::new();
    for i in 0..12 {
        members.push(Arc::new(signed_in(&server, &format!("paddler{}", i)).await));
    }

    let handles: Vec<_> = members
        .iter()
        .map(|member| {
            let member = Arc::clone(member);
            tokio::spawn(async move { member.toggle_participation(post_ref).await })
        })
        .collect();

    let (mut registered, mut turned_away) = (0, 0);
    for handle in handles {
        match handle.await.unwrap() {
            Ok(summary) => {
                assert!(summary.is_participating);
                assert!(summary.current_participants <= 3);
                registered += 1;
            }
            Err(e) => {
                assert_eq!(e.status(), Some(409));
                turned_away += 1;
            }
        }
    }
    assert_eq!(registered, 3);
    assert_eq!(turned_away, 9);

    let stored = HttpPortal::new(&server.base_url)
        .participation(post_ref)
        .await
        .unwrap();
    assert_eq!(stored.current_participants, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_ballots_from_one_member_count_once() {
    let server = spawn_server().await;
    let organizer = signed_in(&server, "organizer").await;
    let post = organizer
        .create_post(
            Board::Project,
            &NewPost {
                title: "Logo vote".into(),
                content: "Pick one".into(),
                vote_options: vec!["Round".into(), "Square".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let post_ref = PostRef::new(Board::Project, post.id);

    let voter = Arc::new(signed_in(&server, "voter").await);
    let handles: Vec<_> = (0..10)
        .map(|i| {
            let voter = Arc::clone(&voter);
            let option = if i % 2 == 0 { "Round" } else { "Square" };
            tokio::spawn(async move { voter.cast_vote(post_ref, option).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let summary = voter.vote_summary(post_ref).await.unwrap();
    assert_eq!(summary.tally.total_votes, 1);
    let choice = summary.user_vote.unwrap();
    assert_eq!(summary.tally.vote_results[&choice], 1);
}
