//! 수집기 에러 타입
//!
//! [`CollectorError`]는 수집 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<CollectorError> for WarlogError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use warlog_core::error::WarlogError;

/// 수집 파이프라인 도메인 에러
///
/// 전송, 연결, 재시도 소진, 저장, 설정 등 파이프라인 내부의
/// 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// 게임 서버 연결 실패
    #[error("connect failed: {server}: {reason}")]
    ConnectFailed {
        /// 서버 이름
        server: String,
        /// 실패 사유
        reason: String,
    },

    /// 로그 조회 등 전송 계층 에러
    #[error("transport error: {server}: {reason}")]
    Transport {
        /// 서버 이름
        server: String,
        /// 에러 사유
        reason: String,
    },

    /// 재시도 소진
    #[error("retries exhausted for {server} after {attempts} attempts")]
    RetriesExhausted {
        /// 서버 이름
        server: String,
        /// 시도 횟수
        attempts: u32,
    },

    /// 저장소 에러
    #[error("storage error: {path}: {reason}")]
    Storage {
        /// 문제가 된 파일/디렉토리 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// HTTP 클라이언트 에러
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON 직렬화/역직렬화 에러
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<CollectorError> for WarlogError {
    fn from(err: CollectorError) -> Self {
        WarlogError::Collector(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        let err = CollectorError::Transport {
            server: "server_1".to_owned(),
            reason: "connection reset".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("server_1"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn retries_exhausted_display() {
        let err = CollectorError::RetriesExhausted {
            server: "server_1".to_owned(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "retries exhausted for server_1 after 3 attempts"
        );
    }

    #[test]
    fn converts_to_warlog_error() {
        let err = CollectorError::Config {
            field: "cache_capacity".to_owned(),
            reason: "must be greater than zero".to_owned(),
        };
        let top: WarlogError = err.into();
        assert!(matches!(top, WarlogError::Collector(_)));
        assert!(top.to_string().contains("cache_capacity"));
    }
}
