//! 에러 타입 — 도메인별 에러 정의

/// Warlog 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum WarlogError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 수집기 에러 (하위 크레이트에서 변환)
    #[error("collector error: {0}")]
    Collector(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파일 읽기 실패
    #[error("failed to read config '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중인 파이프라인을 다시 시작
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인을 정지
    #[error("pipeline not running")]
    NotRunning,

    /// 정지 제한 시간 초과
    #[error("pipeline shutdown timed out after {timeout_secs}s")]
    ShutdownTimeout { timeout_secs: u64 },
}
