//! Tests for utility functions

use chrono::{TimeZone, Utc};
use kitchen_dispatch::util::{from_millis, init_tracing, to_millis, DEFAULT_LOG_DIRECTIVE};

#[test]
fn test_millis_keep_sub_second_precision() {
    let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
    assert_eq!(to_millis(&at), 1_700_000_000_123);
    assert_eq!(from_millis(1_700_000_000_123), Some(at));
    assert!(from_millis(i64::MIN).is_none());
}

#[test]
fn test_init_tracing_is_repeatable() {
    init_tracing(DEFAULT_LOG_DIRECTIVE);
    init_tracing("kitchen_dispatch=debug");
}
