//! 파이프라인 trait — 모듈 생명주기 확장 포인트
//!
//! 장기 실행 모듈(수집 파이프라인 등)은 [`Pipeline`]을 구현하여
//! 데몬이 일관된 방식으로 시작/정지/상태 확인을 수행할 수 있게 합니다.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::WarlogError;

/// dyn 호환을 위한 boxed future 별칭
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum HealthStatus {
    /// 정상 동작 중
    Healthy,
    /// 동작 중이지만 주의 필요 (일부 서버 연결 끊김, 캐시 포화 등)
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// 동작 불가 상태인지 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded(reason) => write!(f, "degraded: {reason}"),
            HealthStatus::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 장기 실행 모듈의 생명주기 trait
///
/// # 생명주기
/// ```text
/// NotStarted → start() → Running → stop() → Stopped
/// ```
///
/// `start()`는 백그라운드 태스크를 띄운 뒤 즉시 반환해야 하며,
/// `stop()`은 graceful shutdown(잔여 데이터 플러시 포함)을 수행합니다.
pub trait Pipeline: Send + Sync {
    /// 모듈 이름
    fn name(&self) -> &str;

    /// 모듈을 시작합니다. 이미 실행 중이면 에러를 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), WarlogError>> + Send;

    /// 모듈을 정지합니다. 실행 중이 아니면 에러를 반환합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), WarlogError>> + Send;

    /// 모듈의 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}
