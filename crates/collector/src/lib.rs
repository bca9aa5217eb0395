#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`source`]: 게임 서버 로그 소스 ([`LogSource`] trait + RCON HTTP API 구현)
//! - [`session`]: 서버별 연결 세션 (연결 상태 머신, TTL 캐시)
//! - [`retry`]: 수집 재시도 정책 (선형 백오프)
//! - [`cache`]: 서버별 인메모리 로그 캐시
//! - [`classify`]: 우선순위 기반 정규식 로그 분류기
//! - [`store`]: 파티션 구조 JSON 저장소 (중복 제거, 통계, 보존 기간 정리)
//! - [`collect`]: 주기 수집 루프
//! - [`flush`]: 주기 플러시 루프
//! - [`pipeline`]: 전체 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 수집기 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Sessions(HTTP) -> Collect loop -> Cache -> Flush loop -> Classifier -> Store
//!      |                |             |           |                       |
//!  상태 머신+TTL     재시도 정책    Mutex 보호   저장 간격/잔량 판단     원본+분류 뷰
//! ```

pub mod cache;
pub mod classify;
pub mod collect;
pub mod config;
pub mod error;
pub mod flush;
pub mod pipeline;
pub mod retry;
pub mod session;
pub mod source;
pub mod store;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{CollectorStatus, LogCollector, LogCollectorBuilder, ServerStatus};

// 설정
pub use config::{CollectorConfig, CollectorConfigBuilder, DropPolicy};

// 에러
pub use error::CollectorError;

// 분류기
pub use classify::LogClassifier;

// 소스
pub use source::{DynLogSource, HttpLogSource, LogSource, RawLogRecord};

// 세션
pub use session::{LinkState, ServerSession};

// 재시도
pub use retry::RetryPolicy;

// 캐시
pub use cache::LogCache;

// 저장소
pub use store::{LogStore, PartitionInfo, PersistOutcome, StoreStatistics};
