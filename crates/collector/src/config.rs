//! 수집기 설정
//!
//! [`CollectorConfig`]는 core의 [`CollectorSettings`](warlog_core::config::CollectorSettings)를
//! 기반으로 수집 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use warlog_core::config::WarlogConfig;
//! use warlog_collector::config::CollectorConfig;
//!
//! let core_config = WarlogConfig::default();
//! let config = CollectorConfig::from_core(&core_config);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CollectorError;

/// 설정 상한 — 운영 실수로 인한 과도한 값 방지
const MAX_COLLECTION_INTERVAL_SECS: u64 = 3600;
const MAX_FETCH_WINDOW_SECS: u64 = 86_400;
const MAX_RETRIES: u32 = 10;
const MAX_CACHE_CAPACITY: usize = 10_000_000;

/// 캐시 오버플로우 시 드롭 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropPolicy {
    /// 가장 오래된 엔트리를 드롭 (기본값)
    #[default]
    Oldest,
    /// 가장 최신 엔트리를 드롭 (새 유입 거부)
    Newest,
}

/// 수집 파이프라인 설정
///
/// core의 `CollectorSettings`에서 파생되며, 파이프라인 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// 수집 주기 (초)
    pub collection_interval_secs: u64,
    /// 주기적 저장 간격 (초)
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
    pub logs_dir: PathBuf,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 캐시 오버플로우 드롭 정책
    pub drop_policy: DropPolicy,
    /// 정지 시 백그라운드 루프 종료 대기 제한 (초)
    pub shutdown_timeout_secs: u64,
}

impl Default for CollectorConfig {
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
            logs_dir: PathBuf::from("logs"),
            drop_policy: DropPolicy::Oldest,
            shutdown_timeout_secs: 10,
        }
    }
}

impl CollectorConfig {
    /// core 설정에서 수집기 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &warlog_core::config::WarlogConfig) -> Self {
        let c = &core.collector;
        Self {
            collection_interval_secs: c.collection_interval_secs,
            save_interval_secs: c.save_interval_secs,
            flush_tick_secs: c.flush_tick_secs,
            fetch_window_secs: c.fetch_window_secs,
            max_retries: c.max_retries,
            retry_delay_secs: c.retry_delay_secs,
            connection_ttl_secs: c.connection_ttl_secs,
            cache_capacity: c.cache_capacity,
            logs_dir: PathBuf::from(&c.logs_dir),
            ..Self::default()
        }
    }

    /// 수집 주기를 `Duration`으로 반환합니다.
    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    /// 저장 간격을 `Duration`으로 반환합니다.
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    /// 플러시 틱 간격을 `Duration`으로 반환합니다.
    pub fn flush_tick(&self) -> Duration {
        Duration::from_secs(self.flush_tick_secs)
    }

    /// 연결 상태 캐시 유효 시간을 `Duration`으로 반환합니다.
    pub fn connection_ttl(&self) -> Duration {
        Duration::from_secs(self.connection_ttl_secs)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.collection_interval_secs == 0
            || self.collection_interval_secs > MAX_COLLECTION_INTERVAL_SECS
        {
            return Err(CollectorError::Config {
                field: "collection_interval_secs".to_owned(),
                reason: format!("must be in 1..={MAX_COLLECTION_INTERVAL_SECS}"),
            });
        }
        if self.save_interval_secs < 60 {
            return Err(CollectorError::Config {
                field: "save_interval_secs".to_owned(),
                reason: "must be at least 60 seconds".to_owned(),
            });
        }
        if self.flush_tick_secs == 0 {
            return Err(CollectorError::Config {
                field: "flush_tick_secs".to_owned(),
                reason: "must be at least 1 second".to_owned(),
            });
        }
        if self.fetch_window_secs == 0 || self.fetch_window_secs > MAX_FETCH_WINDOW_SECS {
            return Err(CollectorError::Config {
                field: "fetch_window_secs".to_owned(),
                reason: format!("must be in 1..={MAX_FETCH_WINDOW_SECS}"),
            });
        }
        if self.max_retries == 0 || self.max_retries > MAX_RETRIES {
            return Err(CollectorError::Config {
                field: "max_retries".to_owned(),
                reason: format!("must be in 1..={MAX_RETRIES}"),
            });
        }
        if self.cache_capacity == 0 || self.cache_capacity > MAX_CACHE_CAPACITY {
            return Err(CollectorError::Config {
                field: "cache_capacity".to_owned(),
                reason: format!("must be in 1..={MAX_CACHE_CAPACITY}"),
            });
        }
        if self.logs_dir.as_os_str().is_empty() {
            return Err(CollectorError::Config {
                field: "logs_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(CollectorError::Config {
                field: "shutdown_timeout_secs".to_owned(),
                reason: "must be at least 1 second".to_owned(),
            });
        }
        Ok(())
    }
}

/// 수집기 설정 빌더
///
/// 테스트와 임베딩 환경에서 개별 필드를 조정할 때 사용합니다.
#[derive(Debug, Default)]
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// 기본값으로 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 수집 주기를 설정합니다.
    pub fn collection_interval_secs(mut self, secs: u64) -> Self {
        self.config.collection_interval_secs = secs;
        self
    }

    /// 저장 간격을 설정합니다.
    pub fn save_interval_secs(mut self, secs: u64) -> Self {
        self.config.save_interval_secs = secs;
        self
    }

    /// 플러시 틱 간격을 설정합니다.
    pub fn flush_tick_secs(mut self, secs: u64) -> Self {
        self.config.flush_tick_secs = secs;
        self
    }

    /// 조회 구간을 설정합니다.
    pub fn fetch_window_secs(mut self, secs: u64) -> Self {
        self.config.fetch_window_secs = secs;
        self
    }

    /// 재시도 횟수를 설정합니다.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// 재시도 기본 지연을 설정합니다.
    pub fn retry_delay_secs(mut self, secs: u64) -> Self {
        self.config.retry_delay_secs = secs;
        self
    }

    /// 연결 상태 캐시 유효 시간을 설정합니다.
    pub fn connection_ttl_secs(mut self, secs: u64) -> Self {
        self.config.connection_ttl_secs = secs;
        self
    }

    /// 캐시 용량을 설정합니다.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// 로그 저장 루트 디렉토리를 설정합니다.
    pub fn logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.logs_dir = dir.into();
        self
    }

    /// 드롭 정책을 설정합니다.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.config.drop_policy = policy;
        self
    }

    /// 정지 대기 제한을 설정합니다.
    pub fn shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.config.shutdown_timeout_secs = secs;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<CollectorConfig, CollectorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
