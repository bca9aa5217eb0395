//! 설정 관리 — warlog.toml 파싱 및 런타임 설정
//!
//! [`WarlogConfig`]는 수집기와 데몬의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`WARLOG_COLLECTOR_LOGS_DIR=/data/logs` 형식)
//! 3. 설정 파일 (`warlog.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), warlog_core::error::WarlogError> {
//! use warlog_core::config::WarlogConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = WarlogConfig::load("warlog.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = WarlogConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, WarlogError};

/// Warlog 통합 설정
///
/// `warlog.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarlogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 파이프라인 설정
    #[serde(default)]
    pub collector: CollectorSettings,
    /// 게임 서버 API 클라이언트 설정
    #[serde(default)]
    pub api: ApiConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 수집 대상 서버 목록
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl WarlogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, WarlogError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 파싱합니다 (환경변수 오버라이드, 검증 없음).
    ///
    /// 검증은 [`load`](Self::load)가 오버라이드 적용 후 한 번만 수행합니다.
    /// 파일 값이 단독으로는 유효하지 않아도 환경변수로 고칠 수 있습니다.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, WarlogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WarlogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                WarlogError::Config(ConfigError::ReadFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, WarlogError> {
        toml::from_str(toml_str).map_err(|e| {
            WarlogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `WARLOG_{SECTION}_{FIELD}`
    /// 예: `WARLOG_COLLECTOR_LOGS_DIR=/data/logs`
    ///
    /// 서버 목록은 구조가 중첩되어 있어 환경변수 오버라이드 대상이 아닙니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "WARLOG_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "WARLOG_GENERAL_LOG_FORMAT");

        // Collector
        override_u64(
            &mut self.collector.collection_interval_secs,
            "WARLOG_COLLECTOR_COLLECTION_INTERVAL_SECS",
        );
        override_u64(
            &mut self.collector.save_interval_secs,
            "WARLOG_COLLECTOR_SAVE_INTERVAL_SECS",
        );
        override_u64(
            &mut self.collector.flush_tick_secs,
            "WARLOG_COLLECTOR_FLUSH_TICK_SECS",
        );
        override_u64(
            &mut self.collector.fetch_window_secs,
            "WARLOG_COLLECTOR_FETCH_WINDOW_SECS",
        );
        override_u32(&mut self.collector.max_retries, "WARLOG_COLLECTOR_MAX_RETRIES");
        override_u64(
            &mut self.collector.retry_delay_secs,
            "WARLOG_COLLECTOR_RETRY_DELAY_SECS",
        );
        override_u64(
            &mut self.collector.connection_ttl_secs,
            "WARLOG_COLLECTOR_CONNECTION_TTL_SECS",
        );
        override_usize(
            &mut self.collector.cache_capacity,
            "WARLOG_COLLECTOR_CACHE_CAPACITY",
        );
        override_string(&mut self.collector.logs_dir, "WARLOG_COLLECTOR_LOGS_DIR");

        // API
        override_string(&mut self.api.default_host, "WARLOG_API_DEFAULT_HOST");
        override_u16(&mut self.api.default_port, "WARLOG_API_DEFAULT_PORT");
        override_u64(
            &mut self.api.connect_timeout_secs,
            "WARLOG_API_CONNECT_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.api.request_timeout_secs,
            "WARLOG_API_REQUEST_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.api.status_timeout_secs,
            "WARLOG_API_STATUS_TIMEOUT_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "WARLOG_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "WARLOG_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "WARLOG_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), WarlogError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 수집 주기 검증
        if self.collector.collection_interval_secs < 1 {
            return Err(ConfigError::InvalidValue {
                field: "collector.collection_interval_secs".to_owned(),
                reason: "must be at least 1 second".to_owned(),
            }
            .into());
        }
        if self.collector.save_interval_secs < 60 {
            return Err(ConfigError::InvalidValue {
                field: "collector.save_interval_secs".to_owned(),
                reason: "must be at least 60 seconds".to_owned(),
            }
            .into());
        }
        if self.collector.flush_tick_secs < 1 {
            return Err(ConfigError::InvalidValue {
                field: "collector.flush_tick_secs".to_owned(),
                reason: "must be at least 1 second".to_owned(),
            }
            .into());
        }
        if self.collector.fetch_window_secs < 1 {
            return Err(ConfigError::InvalidValue {
                field: "collector.fetch_window_secs".to_owned(),
                reason: "must be at least 1 second".to_owned(),
            }
            .into());
        }
        if self.collector.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collector.cache_capacity".to_owned(),
                reason: "must be greater than zero".to_owned(),
            }
            .into());
        }
        if self.collector.logs_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "collector.logs_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.api.default_host.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api.default_host".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        // 서버 목록 검증
        let mut seen = HashSet::new();
        for (idx, server) in self.servers.iter().enumerate() {
            if server.name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("servers[{idx}].name"),
                    reason: "must not be empty".to_owned(),
                }
                .into());
            }
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("servers[{idx}].name"),
                    reason: format!("duplicate server name '{}'", server.name),
                }
                .into());
            }
            if server.host.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("servers[{idx}].host"),
                    reason: "must not be empty".to_owned(),
                }
                .into());
            }
            if server.port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("servers[{idx}].port"),
                    reason: "must be a valid TCP port".to_owned(),
                }
                .into());
            }
            if server.password.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("servers[{idx}].password"),
                    reason: "must not be empty".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// 활성화된 서버 목록을 반환합니다.
    pub fn enabled_servers(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|s| s.enabled)
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 수집 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    /// 수집 주기 (초, 최소 1)
    pub collection_interval_secs: u64,
    /// 주기적 저장 간격 (초, 최소 60)
    pub save_interval_secs: u64,
    /// 플러시 루프 틱 간격 (초)
    pub flush_tick_secs: u64,
    /// 한 번의 수집에서 요청하는 조회 구간 (초)
    pub fetch_window_secs: u64,
    /// 서버별 수집 재시도 횟수
    pub max_retries: u32,
    /// 재시도 기본 지연 (초, 선형 증가)
    pub retry_delay_secs: u64,
    /// 연결 상태 캐시 유효 시간 (초)
    pub connection_ttl_secs: u64,
    /// 서버별 캐시 최대 엔트리 수
    pub cache_capacity: usize,
    /// 로그 저장 루트 디렉토리
    pub logs_dir: String,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            collection_interval_secs: 5,
            save_interval_secs: 3600,
            flush_tick_secs: 5,
            fetch_window_secs: 180,
            max_retries: 3,
            retry_delay_secs: 10,
            connection_ttl_secs: 30,
            cache_capacity: 100_000,
            logs_dir: "logs".to_owned(),
        }
    }
}

/// 게임 서버 API 클라이언트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API 게이트웨이 기본 호스트 (서버별 api_host가 없을 때 사용)
    pub default_host: String,
    /// API 게이트웨이 기본 포트
    pub default_port: u16,
    /// 연결 수립 제한 시간 (초)
    pub connect_timeout_secs: u64,
    /// 일반 요청 제한 시간 (초)
    pub request_timeout_secs: u64,
    /// 연결 상태 확인 제한 시간 (초)
    pub status_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_host: "127.0.0.1".to_owned(),
            default_port: 17080,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            status_timeout_secs: 10,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 스크레이프 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9090,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// 수집 대상 서버
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 서버 식별 이름 (저장 디렉토리 이름으로 사용, 고유해야 함)
    pub name: String,
    /// 게임 서버 API 호스트
    pub host: String,
    /// 게임 서버 API 포트
    pub port: u16,
    /// RCON 비밀번호
    pub password: String,
    /// 이 서버 전용 API 게이트웨이 호스트 (없으면 api.default_host)
    #[serde(default)]
    pub api_host: Option<String>,
    /// 이 서버 전용 API 게이트웨이 포트 (없으면 api.default_port)
    #[serde(default)]
    pub api_port: Option<u16>,
    /// 수집 대상 여부
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = WarlogConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.collector.collection_interval_secs, 5);
        assert_eq!(config.collector.save_interval_secs, 3600);
        assert_eq!(config.collector.fetch_window_secs, 180);
        assert_eq!(config.collector.max_retries, 3);
        assert!(config.servers.is_empty());
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = WarlogConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = WarlogConfig::parse("").unwrap();
        assert_eq!(config.collector.logs_dir, "logs");
        assert_eq!(config.api.connect_timeout_secs, 10);
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[collector]
collection_interval_secs = 15
"#;
        let config = WarlogConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.collector.collection_interval_secs, 15);
        assert_eq!(config.collector.save_interval_secs, 3600);
    }

    #[test]
    fn parse_full_toml_with_servers() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "json"

[collector]
collection_interval_secs = 10
save_interval_secs = 600
logs_dir = "/data/logs"

[[servers]]
name = "server_1"
host = "10.0.0.1"
port = 8080
password = "secret"

[[servers]]
name = "server_2"
host = "10.0.0.2"
port = 8080
password = "secret"
enabled = false
"#;
        let config = WarlogConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.servers.len(), 2);
        assert!(config.servers[0].enabled);
        assert!(!config.servers[1].enabled);
        assert_eq!(config.enabled_servers().count(), 1);
    }

    #[test]
    fn validate_rejects_short_collection_interval() {
        let mut config = WarlogConfig::default();
        config.collector.collection_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("collection_interval_secs"));
    }

    #[test]
    fn validate_rejects_short_save_interval() {
        let mut config = WarlogConfig::default();
        config.collector.save_interval_secs = 30;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("save_interval_secs"));
    }

    #[test]
    fn validate_rejects_missing_server_fields() {
        let toml = r#"
[[servers]]
name = "server_1"
host = ""
port = 8080
password = "secret"
"#;
        let config = WarlogConfig::parse(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("servers[0].host"));
    }

    #[test]
    fn validate_rejects_duplicate_server_names() {
        let toml = r#"
[[servers]]
name = "dup"
host = "10.0.0.1"
port = 8080
password = "a"

[[servers]]
name = "dup"
host = "10.0.0.2"
port = 8080
password = "b"
"#;
        let config = WarlogConfig::parse(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate server name"));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = WarlogConfig::default();
        config.general.log_level = "verbose".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial_test::serial]
    fn env_override_replaces_values() {
        // SAFETY: serial 테스트에서만 환경변수를 변경하므로 데이터 레이스 없음
        unsafe {
            std::env::set_var("WARLOG_COLLECTOR_LOGS_DIR", "/tmp/warlog-test");
            std::env::set_var("WARLOG_COLLECTOR_MAX_RETRIES", "5");
        }
        let mut config = WarlogConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.collector.logs_dir, "/tmp/warlog-test");
        assert_eq!(config.collector.max_retries, 5);
        unsafe {
            std::env::remove_var("WARLOG_COLLECTOR_LOGS_DIR");
            std::env::remove_var("WARLOG_COLLECTOR_MAX_RETRIES");
        }
    }

    #[test]
    #[serial_test::serial]
    fn env_override_ignores_unparsable_numbers() {
        // SAFETY: serial 테스트에서만 환경변수를 변경하므로 데이터 레이스 없음
        unsafe {
            std::env::set_var("WARLOG_COLLECTOR_MAX_RETRIES", "not-a-number");
        }
        let mut config = WarlogConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.collector.max_retries, 3);
        unsafe {
            std::env::remove_var("WARLOG_COLLECTOR_MAX_RETRIES");
        }
    }
}
