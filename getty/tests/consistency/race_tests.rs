use super::support::*;

async fn likes_after_two_concurrent_likers(strategy: LikeStrategy) -> Vec<String> {
    let memory = MemoryStore::new();
    publish(&PostRepository::new(memory.clone()), "alice", day(2024, 1, 5)).await;

    let store = InterleavingStore::new(memory.clone(), 2);
    let repo = PostRepository::new(store).with_strategy(strategy);
    let (first, second) = tokio::join!(
        repo.set_like("alice", "2024_01_05", "bob", true),
        repo.set_like("alice", "2024_01_05", "carol", true),
    );
    first.expect("bob's like");
    second.expect("carol's like");

    let mut likes = PostRepository::new(memory)
        .get_post("alice", "2024_01_05")
        .await
        .unwrap()
        .expect("post exists")
        .likes;
    likes.sort();
    likes
}

#[tokio::test]
async fn naive_likes_lose_an_update_under_interleaving() {
    let likes = likes_after_two_concurrent_likers(LikeStrategy::Naive).await;
    assert_eq!(likes.len(), 1, "last writer wins: {likes:?}");
}

#[tokio::test]
async fn conditional_likes_keep_both_updates() {
    let likes = likes_after_two_concurrent_likers(LikeStrategy::Conditional).await;
    assert_eq!(likes, vec!["bob".to_string(), "carol".to_string()]);
}

#[tokio::test]
async fn concurrent_comments_are_both_kept() {
    let memory = MemoryStore::new();
    publish(&PostRepository::new(memory.clone()), "alice", day(2024, 1, 5)).await;

    let repo = PostRepository::new(InterleavingStore::new(memory.clone(), 2));
    let (first, second) = tokio::join!(
        repo.add_comment("alice", "2024_01_05", "bob", "Bob", "one"),
        repo.add_comment("alice", "2024_01_05", "carol", "Carol", "two"),
    );
    first.unwrap();
    second.unwrap();

    let post = PostRepository::new(memory)
        .get_post("alice", "2024_01_05")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.comments.len(), 2);
}

#[tokio::test]
async fn concurrent_followers_of_one_user_are_both_recorded() {
    let memory = MemoryStore::new();
    let store = InterleavingStore::new(memory.clone(), 2);
    let graph = SocialGraph::new(store.clone());

    let (first, second) = tokio::join!(graph.follow("bob", "alice"), graph.follow("carol", "alice"));
    first.expect("bob follows");
    second.expect("carol follows");

    let mut followers = SocialGraph::new(memory.clone()).followers("alice").await.unwrap();
    followers.sort();
    assert_eq!(followers, vec!["bob".to_string(), "carol".to_string()]);
    assert!(store.writes() >= 2);
    assert!(SocialGraph::new(memory).audit("alice").await.unwrap().is_empty());
}
