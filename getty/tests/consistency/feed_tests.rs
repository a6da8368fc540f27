use super::support::*;

async fn seeded() -> (MemoryStore, SocialGraph<MemoryStore>, PostRepository<MemoryStore>) {
    let store = MemoryStore::new();
    let graph = SocialGraph::new(store.clone());
    let posts = PostRepository::new(store.clone());

    graph.follow("bob", "alice").await.unwrap();
    graph.follow("bob", "carol").await.unwrap();
    publish(&posts, "alice", day(2024, 1, 6)).await;
    publish(&posts, "alice", day(2024, 1, 5)).await;
    publish(&posts, "carol", day(2024, 1, 4)).await;
    publish(&posts, "bob", day(2024, 1, 7)).await;
    (store, graph, posts)
}

fn owners(posts: &[Post]) -> Vec<String> {
    posts
        .iter()
        .map(|post| format!("{}/{}", post.user_id, post.date_key))
        .collect()
}

#[tokio::test]
async fn feed_groups_posts_by_followed_user() {
    let (_, graph, posts) = seeded().await;
    let feed = FeedAggregator::new(graph, posts).get_home_feed("bob").await.unwrap();

    assert_eq!(
        owners(&feed.posts),
        vec!["alice/2024_01_05", "alice/2024_01_06", "carol/2024_01_04"]
    );
    assert!(feed.skipped.is_empty());
}

#[tokio::test]
async fn own_posts_come_first_when_requested() {
    let (_, graph, posts) = seeded().await;
    let feed = FeedAggregator::new(graph, posts)
        .with_own_posts(true)
        .get_home_feed("bob")
        .await
        .unwrap();

    assert_eq!(owners(&feed.posts)[0], "bob/2024_01_07");
    assert_eq!(feed.posts.len(), 4);
}

#[tokio::test]
async fn user_following_nobody_gets_an_empty_feed() {
    let store = MemoryStore::new();
    let feed = FeedAggregator::new(SocialGraph::new(store.clone()), PostRepository::new(store))
        .get_home_feed("newcomer")
        .await
        .unwrap();
    assert!(feed.posts.is_empty());
}

#[tokio::test]
async fn one_unreadable_user_fails_the_whole_feed_by_default() {
    let (store, graph, posts) = seeded().await;
    store.fail_path(posts_path("carol").unwrap(), FaultOp::Read);

    let err = FeedAggregator::new(graph, posts).get_home_feed("bob").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn best_effort_feed_skips_unreadable_users() {
    let (store, graph, posts) = seeded().await;
    store.fail_path(posts_path("carol").unwrap(), FaultOp::Read);

    let feed = FeedAggregator::new(graph, posts)
        .with_policy(FeedPolicy::BestEffort)
        .get_home_feed("bob")
        .await
        .unwrap();
    assert_eq!(owners(&feed.posts), vec!["alice/2024_01_05", "alice/2024_01_06"]);
    assert_eq!(feed.skipped.len(), 1);
    assert_eq!(feed.skipped[0].user_id, "carol");
}

#[tokio::test]
async fn illegal_ids_in_following_are_ignored() {
    let (store, graph, posts) = seeded().await;
    store
        .set(
            &friends_path("bob").unwrap(),
            json!({"id": "bob", "following": ["alice", "not/a/user"]}),
        )
        .await
        .unwrap();

    let feed = FeedAggregator::new(graph, posts).get_home_feed("bob").await.unwrap();
    assert_eq!(feed.posts.len(), 2);
}
