use super::support::*;

#[tokio::test]
async fn reposting_the_same_day_replaces_the_post() {
    let store = MemoryStore::new();
    let repo = PostRepository::new(store.clone());
    let key = day(2024, 1, 5);

    publish(&repo, "alice", key).await;
    repo.set_like("alice", "2024_01_05", "bob", true).await.unwrap();
    repo.add_comment("alice", "2024_01_05", "bob", "Bob", "nice").await.unwrap();

    let replaced = repo
        .create_or_replace_post("alice", Some(key), draft("second try"))
        .await
        .unwrap();
    assert_eq!(replaced.user_prompt, "second try");
    assert!(replaced.likes.is_empty());
    assert!(replaced.comments.is_empty());

    let all = repo.get_all_posts("alice").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].user_prompt, "second try");
}

#[tokio::test]
async fn posts_are_listed_oldest_first_and_skip_foreign_keys() {
    let store = MemoryStore::new();
    let repo = PostRepository::new(store.clone());
    publish(&repo, "alice", day(2024, 2, 10)).await;
    publish(&repo, "alice", day(2023, 12, 31)).await;
    publish(&repo, "alice", day(2024, 2, 9)).await;
    store
        .set(&posts_path("alice").unwrap().child("drafts").unwrap(), json!({"note": "x"}))
        .await
        .unwrap();

    let keys: Vec<String> = repo
        .get_all_posts("alice")
        .await
        .unwrap()
        .iter()
        .map(|post| post.date_key.to_string())
        .collect();
    assert_eq!(keys, vec!["2023_12_31", "2024_02_09", "2024_02_10"]);
}

#[tokio::test]
async fn user_without_posts_has_an_empty_list() {
    let repo = PostRepository::new(MemoryStore::new());
    assert!(repo.get_all_posts("nobody").await.unwrap().is_empty());
    assert!(repo.get_post("nobody", "2024_01_01").await.unwrap().is_none());
    assert!(!repo.post_exists("nobody", "2024_01_01").await.unwrap());
}

#[tokio::test]
async fn non_date_post_ids_read_as_absent() {
    let repo = PostRepository::new(MemoryStore::new());
    publish(&repo, "alice", day(2024, 1, 5)).await;
    assert!(repo.get_post("alice", "yesterday").await.unwrap().is_none());
    assert!(!repo.user_has_liked("alice", "yesterday", "bob").await.unwrap());
}

#[tokio::test]
async fn unpadded_keys_resolve_to_the_same_post() {
    let repo = PostRepository::new(MemoryStore::new());
    publish(&repo, "alice", day(2024, 1, 5)).await;

    assert!(repo.post_exists("alice", "2024_1_5").await.unwrap());
    let post = repo.set_like("alice", "2024_1_5", "bob", true).await.unwrap();
    assert_eq!(post.date_key, day(2024, 1, 5));
    assert!(repo.user_has_liked("alice", "2024_01_05", "bob").await.unwrap());
}

#[tokio::test]
async fn likes_behave_as_a_set() {
    let store = MemoryStore::new();
    let repo = PostRepository::new(store.clone());
    publish(&repo, "alice", day(2024, 1, 5)).await;

    repo.set_like("alice", "2024_01_05", "bob", true).await.unwrap();
    let post = repo.set_like("alice", "2024_01_05", "bob", true).await.unwrap();
    assert_eq!(post.likes, vec!["bob".to_string()]);

    repo.set_like("alice", "2024_01_05", "carol", true).await.unwrap();
    let post = repo.set_like("alice", "2024_01_05", "bob", false).await.unwrap();
    assert_eq!(post.likes, vec!["carol".to_string()]);

    let post = repo.set_like("alice", "2024_01_05", "dave", false).await.unwrap();
    assert_eq!(post.likes, vec!["carol".to_string()]);
    assert!(!repo.user_has_liked("alice", "2024_01_05", "bob").await.unwrap());
}

#[tokio::test]
async fn liking_a_missing_post_is_not_found() {
    let store = MemoryStore::new();
    let repo = PostRepository::new(store.clone());

    let err = repo.set_like("alice", "2024_01_05", "bob", true).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.param(), "alice/2024_01_05");
    assert!(store.get(&posts_path("alice").unwrap()).await.unwrap().is_none());

    let err = repo.add_comment("alice", "tomorrow", "bob", "Bob", "hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn comments_append_in_order() {
    let repo = PostRepository::new(MemoryStore::new());
    publish(&repo, "alice", day(2024, 1, 5)).await;

    repo.add_comment("alice", "2024_01_05", "bob", "Bob", "first").await.unwrap();
    let post = repo
        .add_comment("alice", "2024_01_05", "carol", "Carol", "second")
        .await
        .unwrap();

    let texts: Vec<&str> = post.comments.iter().map(|comment| comment.comment.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert_eq!(post.comments[1].user_id, "carol");
    assert!(post.comments[0].time <= post.comments[1].time);
}

#[tokio::test]
async fn empty_comment_is_rejected() {
    let repo = PostRepository::new(MemoryStore::new());
    publish(&repo, "alice", day(2024, 1, 5)).await;

    let err = repo.add_comment("alice", "2024_01_05", "bob", "Bob", "   ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.param(), "comment");
}

#[tokio::test]
async fn image_without_payload_is_rejected() {
    let repo = PostRepository::new(MemoryStore::new());
    let mut empty_image = draft("prompt");
    empty_image.image = Some(PostImage {
        created: 1,
        source: ImageSource::B64 { b64: String::new() },
    });

    let err = repo
        .create_or_replace_post("alice", Some(day(2024, 1, 5)), empty_image)
        .await
        .unwrap_err();
    assert_eq!(err.param(), "image");
}

#[tokio::test]
async fn service_parses_the_creation_date() {
    let service = GettyService::new(MemoryStore::new(), &GettyConfig::default());

    let created = service.create_post("alice", Some("2024_2_29"), draft("leap")).await;
    let post = created.into_result().expect("post created");
    assert_eq!(post.date_key.to_string(), "2024_02_29");

    let rejected = service.create_post("alice", Some("2023_2_29"), draft("not a day")).await;
    let error = rejected.error().expect("invalid date rejected");
    assert_eq!(error.code, 400);
    assert_eq!(error.kind, "validation_error");
}

#[tokio::test]
async fn post_without_a_prompt_is_stored() {
    let store = MemoryStore::new();
    let repo = PostRepository::new(store.clone());
    let mut untitled = draft("untitled");
    untitled.user_prompt = String::new();

    let post = repo
        .create_or_replace_post("alice", Some(day(2024, 1, 5)), untitled)
        .await
        .unwrap();
    assert!(post.user_prompt.is_empty());

    store
        .set(
            &post_path("alice", "2024_01_06").unwrap(),
            json!({"user_id": "alice", "image": {"created": 1, "url": "https://img.example/bare.png"}}),
        )
        .await
        .unwrap();
    let all = repo.get_all_posts("alice").await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|post| post.user_prompt.is_empty()));
}
