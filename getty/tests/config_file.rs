use std::io::Write;

use getty::{
    Calendar, FeedPolicy, GettyConfig, LikeStrategy, WriteMode,
    config::{ConfigError, StoreBackend},
};
use serial_test::serial;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_every_section_from_file() {
    let file = write_config(
        r#"
        [store]
        backend = "redis"
        url = "redis://cache:6379/2"
        prefix = "getty_test"

        [graph]
        write_mode = "sequential"
        max_retries = 2

        [posts]
        like_strategy = "naive"
        calendar = "utc"

        [feed]
        policy = "best_effort"
        include_own_posts = true

        [server]
        bind = "0.0.0.0:8080"
        "#,
    );

    let config = GettyConfig::load(file.path()).expect("config loads");
    assert_eq!(config.store.backend, StoreBackend::Redis);
    assert_eq!(config.store.redis_url().unwrap(), "redis://cache:6379/2");
    assert_eq!(config.store.prefix, "getty_test");
    assert_eq!(config.graph.write_mode, WriteMode::Sequential);
    assert_eq!(config.graph.max_retries, 2);
    assert_eq!(config.posts.like_strategy, LikeStrategy::Naive);
    assert_eq!(config.posts.calendar, Calendar::Utc);
    assert_eq!(config.feed.policy, FeedPolicy::BestEffort);
    assert!(config.feed.include_own_posts);
    assert_eq!(config.server.bind, "0.0.0.0:8080");
}

#[test]
fn explicit_path_must_exist() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.toml");
    let err = GettyConfig::discover(Some(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let file = write_config("[store\nbackend = ");
    assert!(matches!(GettyConfig::load(file.path()), Err(ConfigError::Parse(_))));
}

#[test]
#[serial]
fn redis_url_expands_environment_references() {
    let file = write_config("[store]\nurl = \"redis://${GETTY_TEST_HOST}:${GETTY_TEST_PORT}/\"\n");
    let config = GettyConfig::load(file.path()).unwrap();

    // SAFETY: tests touching the environment run serially.
    unsafe {
        std::env::set_var("GETTY_TEST_HOST", "cache.internal");
        std::env::set_var("GETTY_TEST_PORT", "6380");
    }
    assert_eq!(config.store.redis_url().unwrap(), "redis://cache.internal:6380/");

    unsafe {
        std::env::remove_var("GETTY_TEST_PORT");
    }
    let err = config.store.redis_url().unwrap_err();
    assert!(matches!(err, ConfigError::MissingEnv(ref name) if name == "GETTY_TEST_PORT"));

    unsafe {
        std::env::remove_var("GETTY_TEST_HOST");
    }
}
