//! warlog.toml 통합 설정 테스트
//!
//! - warlog.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 파일 로드 / 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use warlog_core::config::WarlogConfig;
use warlog_core::error::{ConfigError, WarlogError};

// =============================================================================
// warlog.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../warlog.toml.example");
    let config = WarlogConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../warlog.toml.example");
    let config = WarlogConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_correct_collector_defaults() {
    let content = include_str!("../../../warlog.toml.example");
    let config = WarlogConfig::parse(content).expect("should parse");

    assert_eq!(config.collector.collection_interval_secs, 5);
    assert_eq!(config.collector.save_interval_secs, 3600);
    assert_eq!(config.collector.flush_tick_secs, 5);
    assert_eq!(config.collector.fetch_window_secs, 180);
    assert_eq!(config.collector.max_retries, 3);
    assert_eq!(config.collector.retry_delay_secs, 10);
    assert_eq!(config.collector.connection_ttl_secs, 30);
    assert_eq!(config.collector.cache_capacity, 100_000);
    assert_eq!(config.collector.logs_dir, "logs");
}

#[test]
fn example_config_lists_one_server() {
    let content = include_str!("../../../warlog.toml.example");
    let config = WarlogConfig::parse(content).expect("should parse");

    assert_eq!(config.servers.len(), 1);
    assert_eq!(config.servers[0].name, "server_1");
    assert!(config.servers[0].enabled);
}

// =============================================================================
// 파일 로드 테스트
// =============================================================================

#[tokio::test]
async fn load_reads_file_and_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("warlog.toml");
    tokio::fs::write(
        &path,
        r#"
[collector]
collection_interval_secs = 7
"#,
    )
    .await
    .expect("write config");

    let config = WarlogConfig::load(&path).await.expect("load");
    assert_eq!(config.collector.collection_interval_secs, 7);
}

#[tokio::test]
async fn load_missing_file_reports_file_not_found() {
    let err = WarlogConfig::load("/nonexistent/warlog.toml")
        .await
        .expect_err("should fail");
    match err {
        WarlogError::Config(ConfigError::FileNotFound { path }) => {
            assert!(path.contains("nonexistent"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_values_in_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("warlog.toml");
    tokio::fs::write(
        &path,
        r#"
[collector]
save_interval_secs = 10
"#,
    )
    .await
    .expect("write config");

    let err = WarlogConfig::load(&path).await.expect_err("should fail");
    assert!(matches!(
        err,
        WarlogError::Config(ConfigError::InvalidValue { .. })
    ));
}

// =============================================================================
// 파싱 에러 테스트
// =============================================================================

#[test]
fn malformed_toml_reports_parse_failed() {
    let err = WarlogConfig::parse("[collector\nbroken").expect_err("should fail");
    assert!(matches!(
        err,
        WarlogError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_log_level_fails_validation() {
    let config = WarlogConfig::parse("[general]\nlog_level = \"loud\"").expect("should parse");
    let err = config.validate().expect_err("should fail");
    assert!(err.to_string().contains("general.log_level"));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn env_var_overrides_file_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("warlog.toml");
    tokio::fs::write(
        &path,
        r#"
[collector]
logs_dir = "from_file"
"#,
    )
    .await
    .expect("write config");

    // SAFETY: serial 테스트에서만 환경변수를 변경하므로 데이터 레이스 없음
    unsafe {
        std::env::set_var("WARLOG_COLLECTOR_LOGS_DIR", "from_env");
    }
    let config = WarlogConfig::load(&path).await.expect("load");
    unsafe {
        std::env::remove_var("WARLOG_COLLECTOR_LOGS_DIR");
    }

    assert_eq!(config.collector.logs_dir, "from_env");
}

#[tokio::test]
#[serial_test::serial]
async fn env_override_rescues_invalid_file_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("warlog.toml");
    tokio::fs::write(
        &path,
        r#"
[collector]
save_interval_secs = 10
"#,
    )
    .await
    .expect("write config");

    // 검증은 오버라이드 적용 후에 한 번만 수행된다
    // SAFETY: serial 테스트에서만 환경변수를 변경하므로 데이터 레이스 없음
    unsafe {
        std::env::set_var("WARLOG_COLLECTOR_SAVE_INTERVAL_SECS", "3600");
    }
    let result = WarlogConfig::load(&path).await;
    unsafe {
        std::env::remove_var("WARLOG_COLLECTOR_SAVE_INTERVAL_SECS");
    }

    let config = result.expect("env override should rescue the file value");
    assert_eq!(config.collector.save_interval_secs, 3600);
}
