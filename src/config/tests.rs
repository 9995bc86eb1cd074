//! Configuration Tests
//!
//! Covers defaults, legacy key handling and the startup validation rules.

#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::error::OverlayError;
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = PeerConfig::from_json(
            r#"{ "name": "peer1", "self_url": "http://localhost:8001/" }"#,
        )
        .expect("minimal config should load");

        assert_eq!(config.self_url, "http://localhost:8001");
        assert_eq!(config.search_ttl, 3);
        assert_eq!(config.search_fanout, 2);
        assert_eq!(config.max_fanout, 3);
        assert_eq!(config.rate_limit.requests_per_window, 100);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.health.interval(), Duration::from_secs(30));
        assert_eq!(config.health.failure_threshold, 3);
        assert_eq!(config.log_level(), tracing::Level::INFO);
        assert!(config.friends.is_empty());
    }

    #[test]
    fn test_legacy_friend_keys_are_folded_into_friends() {
        let config = PeerConfig::from_json(
            r#"{
                "name": "peer2",
                "self_url": "http://peer2:8002",
                "friend_primary": "http://peer1:8001",
                "friend_secondary": "http://peer3:8003/",
                "friends": ["http://peer1:8001"],
                "rate_limit": { "requests_per_minute": 10 },
                "health": { "health_check_interval": 5 }
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.friends,
            vec!["http://peer1:8001".to_string(), "http://peer3:8003".to_string()]
        );
        assert_eq!(config.rate_limit.requests_per_window, 10);
        assert_eq!(config.health.interval_secs, 5);
    }

    #[test]
    fn test_self_url_as_friend_is_rejected() {
        let result = PeerConfig::from_json(
            r#"{ "name": "p", "self_url": "http://a:1", "friends": ["http://a:1/"] }"#,
        );

        assert!(matches!(result, Err(OverlayError::Config(_))));
    }

    #[test]
    fn test_malformed_values_fail_validation() {
        let cases = [
            r#"{ "name": "p", "self_url": "not a url" }"#,
            r#"{ "name": "", "self_url": "http://a:1" }"#,
            r#"{ "name": "p", "self_url": "http://a:1", "max_fanout": 0 }"#,
            r#"{ "name": "p", "self_url": "http://a:1", "forward_timeout_ms": 900, "search_deadline_ms": 100 }"#,
            r#"{ "name": "p", "self_url": "http://a:1", "rate_limit": { "window_secs": 0 } }"#,
            r#"{ "name": "p", "self_url": "http://a:1", "health": { "failure_threshold": 0 } }"#,
            r#"{ "name": "p", "self_url": "http://a:1", "log_level": "loud" }"#,
            r#"{ "name": "p", "self_url": "http://a:1", "friends": ["ftp://b:2"] }"#,
            r#"{ "name": "p" }"#,
        ];

        for raw in cases {
            assert!(
                matches!(PeerConfig::from_json(raw), Err(OverlayError::Config(_))),
                "expected config error for {}",
                raw
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "name": "disk", "self_url": "http://127.0.0.1:9000", "bind_addr": "127.0.0.1:9000" }}"#
        )
        .unwrap();

        let config = PeerConfig::load(file.path()).unwrap();
        assert_eq!(config.name, "disk");
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = PeerConfig::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(OverlayError::Config(_))));
    }
}
