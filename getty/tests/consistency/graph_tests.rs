use super::support::*;

#[tokio::test]
async fn follow_updates_both_records() {
    let store = MemoryStore::new();
    let graph = SocialGraph::new(store.clone());

    let initiator = graph.follow("bob", "alice").await.expect("follow");
    assert_eq!(initiator.id, "bob");
    assert_eq!(initiator.following, vec!["alice".to_string()]);

    assert!(graph.is_following("bob", "alice").await.unwrap());
    assert!(!graph.is_following("alice", "bob").await.unwrap());
    assert_eq!(graph.followers("alice").await.unwrap(), vec!["bob".to_string()]);
    assert!(graph.following("alice").await.unwrap().is_empty());

    let stored = friend_doc(&store, "alice").await.expect("alice record written");
    assert_eq!(stored["followers"], json!(["bob"]));
}

#[tokio::test]
async fn second_follow_is_a_conflict_and_writes_nothing() {
    let store = MemoryStore::new();
    let graph = SocialGraph::new(store.clone());
    graph.follow("bob", "alice").await.unwrap();
    let path = friends_path("alice").unwrap();
    let before = store.get_versioned(&path).await.unwrap().version;

    let err = graph.follow("bob", "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.message(), "already following");
    assert_eq!(store.get_versioned(&path).await.unwrap().version, before);
}

#[tokio::test]
async fn one_sided_edge_still_blocks_follow() {
    let store = MemoryStore::new();
    store
        .set(&friends_path("alice").unwrap(), json!({"id": "alice", "followers": ["bob"]}))
        .await
        .unwrap();
    let graph = SocialGraph::new(store);

    let err = graph.follow("bob", "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn unfollow_removes_both_sides_and_tolerates_missing_edges() {
    let store = MemoryStore::new();
    let graph = SocialGraph::new(store.clone());
    graph.follow("bob", "alice").await.unwrap();
    graph.follow("carol", "alice").await.unwrap();

    let record = graph.unfollow("bob", "alice").await.expect("unfollow");
    assert!(record.following.is_empty());
    assert_eq!(graph.followers("alice").await.unwrap(), vec!["carol".to_string()]);

    let again = graph.unfollow("bob", "alice").await.expect("repeat unfollow");
    assert!(again.following.is_empty());
}

#[tokio::test]
async fn malformed_ids_are_rejected_per_field() {
    let graph = SocialGraph::new(MemoryStore::new());

    let err = graph.follow("bob", "a/b").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.param(), "target_id");

    let err = graph.follow("", "alice").await.unwrap_err();
    assert_eq!(err.param(), "user_id");

    let err = graph.get_friend_record("bad.id").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn stored_duplicates_and_nulls_are_normalized() {
    let store = MemoryStore::new();
    store
        .set(
            &friends_path("alice").unwrap(),
            json!({"id": "alice", "followers": ["bob", "bob", "carol"], "following": null}),
        )
        .await
        .unwrap();
    let graph = SocialGraph::new(store);

    let record = graph.get_friend_record("alice").await.unwrap();
    assert_eq!(record.followers, vec!["bob".to_string(), "carol".to_string()]);
    assert!(record.following.is_empty());
}

#[tokio::test]
async fn sequential_mode_rolls_back_the_first_write() {
    let store = MemoryStore::new();
    let graph = SocialGraph::new(store.clone()).with_mode(WriteMode::Sequential);
    store.fail_path(friends_path("alice").unwrap(), FaultOp::Write);

    let err = graph.follow("bob", "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);

    store.clear_faults();
    assert!(friend_doc(&store, "bob").await.is_none(), "bob's record is restored to absent");
    assert!(!graph.is_following("bob", "alice").await.unwrap());
}

#[tokio::test]
async fn sequential_mode_reports_a_failed_rollback() {
    let store = MemoryStore::new();
    let graph = SocialGraph::new(store.clone()).with_mode(WriteMode::Sequential);
    store.fail_writes_after(1);

    let err = graph.follow("bob", "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PartialConsistency);
    let RepoError::PartialConsistency { written, failed, .. } = &err else {
        panic!("expected partial consistency, got {err:?}");
    };
    assert_eq!(written, &vec!["friends/bob".to_string()]);
    assert_eq!(failed, "friends/alice");

    store.clear_faults();
    let issues = graph.audit("bob").await.unwrap();
    assert_eq!(issues.len(), 1);
    assert!(matches!(issues[0], EdgeIssue::MissingFollower(_)));
}

#[tokio::test]
async fn atomic_mode_leaves_nothing_behind_on_failure() {
    let store = MemoryStore::new();
    let graph = SocialGraph::new(store.clone());
    store.fail_path(friends_path("alice").unwrap(), FaultOp::Write);

    let err = graph.follow("bob", "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    store.clear_faults();
    assert!(friend_doc(&store, "bob").await.is_none());
    assert!(friend_doc(&store, "alice").await.is_none());
}

#[tokio::test]
async fn audit_and_repair_restore_mirrored_edges() {
    let store = MemoryStore::new();
    store
        .set(
            &friends_path("bob").unwrap(),
            json!({"id": "bob", "following": ["alice"], "followers": ["dave"]}),
        )
        .await
        .unwrap();
    store
        .set(&friends_path("dave").unwrap(), json!({"id": "dave", "following": []}))
        .await
        .unwrap();
    let graph = SocialGraph::new(store.clone());

    let issues = graph.audit("bob").await.unwrap();
    assert_eq!(issues.len(), 2);
    assert!(issues.iter().any(|issue| matches!(issue, EdgeIssue::MissingFollower(edge) if edge.followee == "alice")));
    assert!(issues.iter().any(|issue| matches!(issue, EdgeIssue::StaleFollower(edge) if edge.follower == "dave")));

    let report = graph.repair("bob").await.unwrap();
    assert_eq!(report.added_followers.len(), 1);
    assert_eq!(report.removed_followers.len(), 1);

    assert_eq!(graph.followers("alice").await.unwrap(), vec!["bob".to_string()]);
    assert!(graph.followers("bob").await.unwrap().is_empty());
    assert!(graph.audit("bob").await.unwrap().is_empty());
    assert!(graph.repair("bob").await.unwrap().is_clean());
}

#[tokio::test]
async fn repair_does_not_resurrect_an_edge_unfollowed_mid_repair() {
    let store = MemoryStore::new();
    store
        .set(&friends_path("bob").unwrap(), json!({"id": "bob", "following": ["alice"]}))
        .await
        .unwrap();
    store
        .set(&friends_path("alice").unwrap(), json!({"id": "alice", "followers": []}))
        .await
        .unwrap();
    let racing = UnfollowBeforeCommit::new(store.clone(), "bob", "alice");

    let report = SocialGraph::new(racing.clone()).repair("bob").await.unwrap();
    assert!(racing.fired());
    assert!(report.is_clean());

    let graph = SocialGraph::new(store);
    assert!(graph.following("bob").await.unwrap().is_empty());
    assert!(graph.followers("alice").await.unwrap().is_empty());
    assert!(graph.audit("alice").await.unwrap().is_empty());
    assert!(graph.audit("bob").await.unwrap().is_empty());
}
