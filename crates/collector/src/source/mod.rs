//! 로그 소스 -- 게임 서버에서 관리 로그를 가져오는 전송 계층
//!
//! [`LogSource`]는 전송 계층의 확장 포인트입니다. 운영 환경에서는
//! [`HttpLogSource`]가 RCON HTTP API를 사용하고, 테스트에서는 mock 소스를
//! 주입합니다.
//!
//! `LogSource`는 RPITIT를 사용하므로 `dyn LogSource`가 불가합니다.
//! [`DynLogSource`]는 `BoxFuture`를 반환하여 서버별
//! `Box<dyn DynLogSource>`로 소스를 동적 관리할 수 있게 합니다.

mod http;

pub use http::HttpLogSource;

use std::future::Future;

use serde_json::Value;
use warlog_core::pipeline::BoxFuture;
use warlog_core::types::LogEntry;

use crate::error::CollectorError;

/// API가 반환한 원시 로그 레코드
///
/// 서버 빌드에 따라 `timestamp`/`Timestamp`, `message`/`Message` 키가
/// 섞여 있으므로 두 casing 모두 흡수합니다. 원본 페이로드 전체는
/// `raw`에 보존됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLogRecord {
    /// 이벤트 시각 (없으면 빈 문자열)
    pub timestamp: String,
    /// 메시지 본문 (없으면 빈 문자열)
    pub message: String,
    /// 원본 페이로드
    pub raw: Value,
}

impl RawLogRecord {
    /// API 응답의 엔트리 하나에서 레코드를 만듭니다.
    pub fn from_value(value: Value) -> Self {
        let field = |lower: &str, upper: &str| -> String {
            value
                .get(lower)
                .or_else(|| value.get(upper))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        Self {
            timestamp: field("timestamp", "Timestamp"),
            message: field("message", "Message"),
            raw: value,
        }
    }

    /// 서버 이름을 스탬프하여 [`LogEntry`]로 변환합니다.
    pub fn into_entry(self, server: &str) -> LogEntry {
        LogEntry {
            timestamp: self.timestamp,
            server: server.to_owned(),
            message: self.message,
            raw: Some(self.raw),
            collected_at: None,
        }
    }
}

/// 로그 소스 trait
///
/// 새로운 전송 방식을 지원하려면 이 trait을 구현합니다.
/// 연결 상태 판단과 TTL 캐시는 소스가 아니라
/// [`ServerSession`](crate::session::ServerSession)이 담당합니다.
/// `check_connection`은 항상 실제 확인을 수행해야 합니다.
pub trait LogSource: Send + Sync {
    /// 소스가 가리키는 엔드포인트 설명 (로깅용)
    fn endpoint(&self) -> &str;

    /// 게임 서버에 연결(세션 수립)합니다.
    fn connect(&mut self) -> impl Future<Output = Result<(), CollectorError>> + Send;

    /// 세션을 종료합니다. 이미 끊겨 있으면 no-op입니다.
    fn disconnect(&mut self) -> impl Future<Output = Result<(), CollectorError>> + Send;

    /// 연결 상태를 실제로 확인합니다 (캐시 없음).
    fn check_connection(&mut self) -> impl Future<Output = Result<bool, CollectorError>> + Send;

    /// 최근 `window_secs`초의 관리 로그를 가져옵니다.
    fn fetch_recent(
        &mut self,
        window_secs: u64,
    ) -> impl Future<Output = Result<Vec<RawLogRecord>, CollectorError>> + Send;
}

/// dyn 호환 로그 소스 trait
pub trait DynLogSource: Send + Sync {
    /// 소스가 가리키는 엔드포인트 설명 (로깅용)
    fn endpoint(&self) -> &str;

    /// 게임 서버에 연결합니다.
    fn connect(&mut self) -> BoxFuture<'_, Result<(), CollectorError>>;

    /// 세션을 종료합니다.
    fn disconnect(&mut self) -> BoxFuture<'_, Result<(), CollectorError>>;

    /// 연결 상태를 실제로 확인합니다.
    fn check_connection(&mut self) -> BoxFuture<'_, Result<bool, CollectorError>>;

    /// 최근 `window_secs`초의 관리 로그를 가져옵니다.
    fn fetch_recent(&mut self, window_secs: u64)
    -> BoxFuture<'_, Result<Vec<RawLogRecord>, CollectorError>>;
}

/// LogSource를 구현한 타입은 자동으로 DynLogSource도 구현됩니다.
impl<T: LogSource> DynLogSource for T {
    fn endpoint(&self) -> &str {
        LogSource::endpoint(self)
    }

    fn connect(&mut self) -> BoxFuture<'_, Result<(), CollectorError>> {
        Box::pin(LogSource::connect(self))
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<(), CollectorError>> {
        Box::pin(LogSource::disconnect(self))
    }

    fn check_connection(&mut self) -> BoxFuture<'_, Result<bool, CollectorError>> {
        Box::pin(LogSource::check_connection(self))
    }

    fn fetch_recent(
        &mut self,
        window_secs: u64,
    ) -> BoxFuture<'_, Result<Vec<RawLogRecord>, CollectorError>> {
        Box::pin(LogSource::fetch_recent(self, window_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_reads_lowercase_keys() {
        let record = RawLogRecord::from_value(json!({
            "timestamp": "1761193883",
            "message": "CONNECTED Alpha (1)",
            "extra": 42,
        }));
        assert_eq!(record.timestamp, "1761193883");
        assert_eq!(record.message, "CONNECTED Alpha (1)");
        assert_eq!(record.raw["extra"], 42);
    }

    #[test]
    fn record_falls_back_to_capitalized_keys() {
        let record = RawLogRecord::from_value(json!({
            "Timestamp": "1761193883",
            "Message": "VICTORY Allies",
        }));
        assert_eq!(record.timestamp, "1761193883");
        assert_eq!(record.message, "VICTORY Allies");
    }

    #[test]
    fn record_with_missing_keys_uses_empty_strings() {
        let record = RawLogRecord::from_value(json!({"other": true}));
        assert!(record.timestamp.is_empty());
        assert!(record.message.is_empty());
    }

    #[test]
    fn into_entry_stamps_server_and_keeps_raw() {
        let record = RawLogRecord::from_value(json!({
            "timestamp": "t1",
            "message": "m1",
            "extra": "kept",
        }));
        let entry = record.into_entry("server_1");
        assert_eq!(entry.server, "server_1");
        assert_eq!(entry.identity(), "t1_m1");
        assert_eq!(entry.raw.unwrap()["extra"], "kept");
        assert!(entry.collected_at.is_none());
    }
}
