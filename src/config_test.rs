use super::*;

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__SCENESYNC_TEST_NONEXISTENT_KEY__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__SCENESYNC_TEST_EP_VALID__", " 99 ") };
    let val: u64 = env_parse("__SCENESYNC_TEST_EP_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__SCENESYNC_TEST_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__SCENESYNC_TEST_EP_INVALID__", "notanumber") };
    let val: usize = env_parse("__SCENESYNC_TEST_EP_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__SCENESYNC_TEST_EP_INVALID__") };
}

#[test]
fn env_parse_bool() {
    unsafe { std::env::set_var("__SCENESYNC_TEST_EP_BOOL__", "false") };
    let val: bool = env_parse("__SCENESYNC_TEST_EP_BOOL__", true);
    assert!(!val);
    unsafe { std::env::remove_var("__SCENESYNC_TEST_EP_BOOL__") };
}

// =============================================================================
// SyncConfig
// =============================================================================

#[test]
fn sync_config_default_matches_constants() {
    let config = SyncConfig::default();
    assert_eq!(config.debounce, Duration::from_millis(DEFAULT_DEBOUNCE_MS));
    assert_eq!(config.merge_writes, DEFAULT_MERGE_WRITES);
    assert_eq!(config.queue_warn, DEFAULT_QUEUE_WARN);
    assert!(config.client_id.is_none());
}

#[test]
fn sync_config_default_debounce_is_800ms() {
    assert_eq!(SyncConfig::default().debounce, Duration::from_millis(800));
}

#[test]
fn sync_config_builders_override_fields() {
    let id = ClientId::generate();
    let config = SyncConfig::default()
        .with_debounce(Duration::from_millis(50))
        .with_client_id(id.clone());
    assert_eq!(config.debounce, Duration::from_millis(50));
    assert_eq!(config.client_id, Some(id));
}
