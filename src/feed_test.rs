use super::*;
use crate::session::{AuthEvent, SessionHolder};
use crate::state::test_helpers::{MockBackend, post, session, user_id};
use domain::PostId;
use domain::error::FETCH_FAILED_MESSAGE;

fn controller(backend: &Arc<MockBackend>) -> FeedController {
    FeedController::new(backend.clone(), Some(session("a@b.com")))
}

// =========================================================================
// fetch
// =========================================================================

#[tokio::test]
async fn fetch_orders_newest_first() {
    let backend = Arc::new(MockBackend::new());
    backend.posts.lock().unwrap().extend([post("1", "old", 100), post("2", "new", 200)]);
    let feed = controller(&backend);

    assert_eq!(feed.fetch_posts().await, Ok(2));

    let state = feed.state();
    let contents: Vec<_> = state.posts.iter().map(|p| p.content.as_str()).collect();
    assert_eq!(contents, vec!["new", "old"]);
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn malformed_fetch_shows_reload_prompt_and_keeps_list() {
    let backend = Arc::new(MockBackend::new());
    backend.posts.lock().unwrap().push(post("1", "kept", 100));
    let feed = controller(&backend);
    feed.fetch_posts().await.unwrap();

    backend.malform("select_posts");
    let err = feed.fetch_posts().await.unwrap_err();

    assert!(matches!(err, FeedError::Fetch(_)));
    let state = feed.state();
    assert_eq!(state.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
    assert_eq!(state.posts.len(), 1);
}

#[tokio::test]
async fn fetch_without_session_is_skipped() {
    let backend = Arc::new(MockBackend::new());
    let feed = FeedController::new(backend.clone(), None);

    assert_eq!(feed.fetch_posts().await, Ok(0));
    assert!(backend.calls().is_empty());
}

// =========================================================================
// submit
// =========================================================================

#[tokio::test]
async fn blank_submissions_never_insert() {
    let backend = Arc::new(MockBackend::new());
    let feed = controller(&backend);

    assert_eq!(feed.submit_post("").await, Ok(None));
    assert_eq!(feed.submit_post("   ").await, Ok(None));
    assert_eq!(backend.count("insert_post"), 0);
}

#[tokio::test]
async fn submit_without_session_is_noop() {
    let backend = Arc::new(MockBackend::new());
    let feed = FeedController::new(backend.clone(), None);

    assert_eq!(feed.submit_post("hello").await, Ok(None));
    assert_eq!(backend.count("insert_post"), 0);
}

#[tokio::test]
async fn submit_trims_and_prepends_confirmed_row() {
    let backend = Arc::new(MockBackend::new());
    backend.posts.lock().unwrap().push(post("1", "old", 100));
    let feed = controller(&backend);
    feed.fetch_posts().await.unwrap();

    let created = feed.submit_post("  hello  ").await.unwrap().unwrap();

    assert_eq!(created.content, "hello");
    assert_eq!(created.user_id, user_id());
    let state = feed.state();
    assert_eq!(state.posts.iter().next().map(|p| p.content.as_str()), Some("hello"));
    assert_eq!(state.posts.len(), 2);
    assert!(!state.submitting);
}

#[tokio::test]
async fn submit_failure_shows_backend_message() {
    let backend = Arc::new(MockBackend::new());
    backend.fail("insert_post", 400, r#"{"message":"content too long"}"#);
    let feed = controller(&backend);

    let err = feed.submit_post("hello").await.unwrap_err();

    assert_eq!(err, FeedError::Submit("content too long".into()));
    let state = feed.state();
    assert_eq!(state.error.as_deref(), Some("content too long"));
    assert!(!state.submitting);
    assert!(state.posts.is_empty());
}

#[tokio::test]
async fn sample_post_on_empty_feed_appears_once() {
    let backend = Arc::new(MockBackend::new());
    let feed = controller(&backend);
    assert_eq!(feed.fetch_posts().await, Ok(0));

    feed.create_sample_post().await.unwrap();

    let posts = feed.state().posts.to_vec();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content, SAMPLE_POST_CONTENT);
    assert_eq!(backend.calls(), vec!["select_posts", "insert_post", "select_posts"]);
}

// =========================================================================
// profile bootstrap
// =========================================================================

#[tokio::test]
async fn bootstrap_failure_is_soft() {
    let backend = Arc::new(MockBackend::new());
    backend.fail("upsert_profile", 500, r#"{"message":"down"}"#);
    let feed = controller(&backend);

    let settled = feed.bootstrap_profile().await;

    assert_eq!(settled.soft, vec![FeedError::ProfileSync("down".into())]);
    assert_eq!(feed.state().error, None);
}

#[tokio::test]
async fn bootstrap_twice_keeps_one_profile() {
    let backend = Arc::new(MockBackend::new());
    let feed = controller(&backend);

    assert!(feed.bootstrap_profile().await.is_clean());
    assert!(feed.bootstrap_profile().await.is_clean());

    assert_eq!(backend.profiles.lock().unwrap().len(), 1);
}

// =========================================================================
// realtime
// =========================================================================

#[tokio::test]
async fn changes_patch_the_list() {
    let backend = Arc::new(MockBackend::new());
    backend.posts.lock().unwrap().extend([post("1", "one", 100), post("2", "two", 200)]);
    let feed = controller(&backend);
    feed.fetch_posts().await.unwrap();

    feed.apply_change(&ChangeEvent::Insert(post("3", "three", 300))).await;
    feed.apply_change(&ChangeEvent::Update(post("1", "one, edited", 100))).await;
    feed.apply_change(&ChangeEvent::Delete(PostId::new("2"))).await;

    let contents: Vec<_> = feed.state().posts.to_vec().into_iter().map(|p| p.content).collect();
    assert_eq!(contents, vec!["three", "one, edited"]);
    assert_eq!(backend.count("select_posts"), 1);
}

#[tokio::test]
async fn unrecognized_change_refetches() {
    let backend = Arc::new(MockBackend::new());
    let feed = controller(&backend);
    backend.posts.lock().unwrap().push(post("9", "from store", 100));

    let outcome = feed.apply_change(&ChangeEvent::Unrecognized("TRUNCATE".into())).await;

    assert_eq!(outcome, ApplyOutcome::NeedsRefetch);
    assert_eq!(feed.state().posts.len(), 1);
    assert_eq!(backend.count("select_posts"), 1);
}

#[tokio::test]
async fn follow_applies_changes_until_sign_out() {
    let backend = Arc::new(MockBackend::new());
    let sessions = SessionHolder::new();
    sessions.publish(AuthEvent::SignedIn, Some(session("a@b.com")));
    let feed = controller(&backend);
    let mut session_sub = sessions.subscribe();

    let subscription = feed.subscribe().await.unwrap().unwrap();
    let changes = backend.change_sender().unwrap();
    changes.send(ChangeEvent::Insert(post("1", "live", 100))).await.unwrap();

    let mut seen = Vec::new();
    let follower = feed.follow(subscription, &mut session_sub, |change, state| {
        seen.push((matches!(change, ChangeEvent::Insert(_)), state.posts.len()));
    });
    let driver = async {
        while feed.state().posts.is_empty() {
            tokio::task::yield_now().await;
        }
        sessions.publish(AuthEvent::SignedOut, None);
    };
    let (end, ()) = tokio::join!(follower, driver);

    assert_eq!(end, FollowEnd::IdentityChanged(None));
    assert_eq!(seen, vec![(true, 1)]);
    assert_eq!(feed.state().posts.to_vec()[0].content, "live");
    assert!(changes.is_closed());
}

#[tokio::test]
async fn follow_pushes_refreshed_token() {
    let backend = Arc::new(MockBackend::new());
    let sessions = SessionHolder::new();
    let feed = controller(&backend);
    let mut session_sub = sessions.subscribe();
    let subscription = feed.subscribe().await.unwrap().unwrap();
    let changes = backend.change_sender().unwrap();

    let mut refreshed = session("a@b.com");
    refreshed.access_token = "at-1".into();

    let follower = feed.follow(subscription, &mut session_sub, |_, _| {});
    let driver = async {
        sessions.publish(AuthEvent::TokenRefreshed, Some(refreshed));
        while feed.session().map(|s| s.access_token).as_deref() != Some("at-1") {
            tokio::task::yield_now().await;
        }
        drop(changes);
    };
    let (end, ()) = tokio::join!(follower, driver);

    assert_eq!(end, FollowEnd::ChannelClosed);
    assert_eq!(feed.session().unwrap().access_token, "at-1");
}

#[tokio::test]
async fn follow_keeps_channel_on_same_user_sign_in() {
    let backend = Arc::new(MockBackend::new());
    let sessions = SessionHolder::new();
    let feed = controller(&backend);
    let mut session_sub = sessions.subscribe();
    let subscription = feed.subscribe().await.unwrap().unwrap();
    let changes = backend.change_sender().unwrap();

    let mut again = session("a@b.com");
    again.access_token = "at-2".into();

    let follower = feed.follow(subscription, &mut session_sub, |_, _| {});
    let driver = async {
        sessions.publish(AuthEvent::SignedIn, Some(again));
        while feed.session().map(|s| s.access_token).as_deref() != Some("at-2") {
            tokio::task::yield_now().await;
        }
        drop(changes);
    };
    let (end, ()) = tokio::join!(follower, driver);

    assert_eq!(end, FollowEnd::ChannelClosed);
    assert_eq!(feed.session().unwrap().access_token, "at-2");
    assert_eq!(backend.count("subscribe_posts"), 1);
}
