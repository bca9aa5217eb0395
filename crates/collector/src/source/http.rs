//! RCON HTTP API 로그 소스
//!
//! 게임 서버 앞단의 RCON HTTP API 게이트웨이와 통신합니다.
//!
//! # 세션 API
//! - `POST /api/v2/connect` `{host, port, password}` → `{session_id}`
//! - `POST /api/v2/disconnect`
//! - `GET /api/v2/connection/status` → `{connected}`
//! - `GET /api/v2/logs?seconds=N` → `{entries: [...]}`
//!
//! 게임 서버의 주소와 비밀번호는 connect 본문으로 전달되며,
//! 이 소스 자체는 게이트웨이 주소(`api_host:api_port`)로 요청을 보냅니다.

use std::time::Duration;

use serde_json::Value;
use warlog_core::config::{ApiConfig, ServerConfig};

use crate::error::CollectorError;
use crate::source::{LogSource, RawLogRecord};

/// 요청/연결 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// 전송한 요청 수
    pub requests_sent: u64,
    /// 실패한 요청 수
    pub requests_failed: u64,
    /// 연결 시도 수
    pub connection_attempts: u64,
    /// 연결 실패 수
    pub connection_failures: u64,
}

/// RCON HTTP API 기반 로그 소스
pub struct HttpLogSource {
    /// 서버 이름 (에러 메시지용)
    name: String,
    /// 엔드포인트 설명 (로깅용)
    endpoint: String,
    /// 게이트웨이 base URL
    base_url: String,
    /// 게임 서버 주소 (connect 본문)
    host: String,
    /// 게임 서버 RCON 포트 (connect 본문)
    port: u16,
    /// RCON 비밀번호 (connect 본문)
    password: String,
    /// 일반 요청용 클라이언트
    client: reqwest::Client,
    /// 연결 상태 확인용 클라이언트 (짧은 제한 시간)
    status_client: reqwest::Client,
    /// 현재 세션 ID
    session_id: Option<String>,
    /// 요청/연결 통계
    stats: SourceStats,
}

impl HttpLogSource {
    /// 서버 설정과 API 설정으로 새 소스를 생성합니다.
    pub fn new(server: &ServerConfig, api: &ApiConfig) -> Result<Self, CollectorError> {
        let api_host = server
            .api_host
            .clone()
            .unwrap_or_else(|| api.default_host.clone());
        let api_port = server.api_port.unwrap_or(api.default_port);
        let base_url = format!("http://{api_host}:{api_port}");

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()?;
        let status_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(api.connect_timeout_secs.min(5)))
            .timeout(Duration::from_secs(api.status_timeout_secs))
            .build()?;

        Ok(Self {
            name: server.name.clone(),
            endpoint: format!("{base_url} -> {}:{}", server.host, server.port),
            base_url,
            host: server.host.clone(),
            port: server.port,
            password: server.password.clone(),
            client,
            status_client,
            session_id: None,
            stats: SourceStats::default(),
        })
    }

    /// 현재 세션 ID를 반환합니다.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// 요청/연결 통계를 반환합니다.
    pub fn stats(&self) -> SourceStats {
        self.stats
    }
}

impl LogSource for HttpLogSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&mut self) -> Result<(), CollectorError> {
        self.stats.connection_attempts += 1;
        tracing::debug!(server = %self.name, endpoint = %self.endpoint, "connecting");

        let response = self
            .client
            .post(format!("{}/api/v2/connect", self.base_url))
            .json(&serde_json::json!({
                "host": self.host,
                "port": self.port,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|e| {
                self.stats.connection_failures += 1;
                CollectorError::ConnectFailed {
                    server: self.name.clone(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            self.stats.connection_failures += 1;
            return Err(CollectorError::ConnectFailed {
                server: self.name.clone(),
                reason: format!("gateway returned status {status}"),
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            self.stats.connection_failures += 1;
            CollectorError::ConnectFailed {
                server: self.name.clone(),
                reason: format!("invalid connect response: {e}"),
            }
        })?;

        match body.get("session_id").and_then(Value::as_str) {
            Some(session_id) => {
                self.session_id = Some(session_id.to_owned());
                tracing::info!(server = %self.name, session_id, "connected");
                Ok(())
            }
            None => {
                self.stats.connection_failures += 1;
                Err(CollectorError::ConnectFailed {
                    server: self.name.clone(),
                    reason: "connect response has no session_id".to_owned(),
                })
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), CollectorError> {
        if self.session_id.is_none() {
            return Ok(());
        }

        let result = self
            .client
            .post(format!("{}/api/v2/disconnect", self.base_url))
            .send()
            .await;

        // 세션은 게이트웨이 응답과 무관하게 로컬에서 폐기합니다.
        self.session_id = None;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(server = %self.name, "disconnected");
                Ok(())
            }
            Ok(response) => {
                tracing::warn!(
                    server = %self.name,
                    status = %response.status(),
                    "disconnect returned non-success status"
                );
                Ok(())
            }
            Err(e) => Err(CollectorError::Transport {
                server: self.name.clone(),
                reason: format!("disconnect failed: {e}"),
            }),
        }
    }

    async fn check_connection(&mut self) -> Result<bool, CollectorError> {
        let response = self
            .status_client
            .get(format!("{}/api/v2/connection/status", self.base_url))
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                let body: Value = response.json().await.unwrap_or(Value::Null);
                Ok(body.get("connected").and_then(Value::as_bool).unwrap_or(false))
            }
            Ok(_) => Ok(false),
            Err(e) => {
                tracing::debug!(server = %self.name, error = %e, "connection status check failed");
                Ok(false)
            }
        }
    }

    async fn fetch_recent(&mut self, window_secs: u64) -> Result<Vec<RawLogRecord>, CollectorError> {
        self.stats.requests_sent += 1;

        let response = self
            .client
            .get(format!(
                "{}/api/v2/logs?seconds={window_secs}",
                self.base_url
            ))
            .send()
            .await
            .map_err(|e| {
                self.stats.requests_failed += 1;
                CollectorError::Transport {
                    server: self.name.clone(),
                    reason: format!("log fetch failed: {e}"),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            self.stats.requests_failed += 1;
            return Err(CollectorError::Transport {
                server: self.name.clone(),
                reason: format!("log fetch returned status {status}"),
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            self.stats.requests_failed += 1;
            CollectorError::Transport {
                server: self.name.clone(),
                reason: format!("invalid log response: {e}"),
            }
        })?;

        match body.get("entries").and_then(Value::as_array) {
            Some(entries) => Ok(entries
                .iter()
                .cloned()
                .map(RawLogRecord::from_value)
                .collect()),
            None => {
                tracing::warn!(server = %self.name, "log response has no entries field");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_config() -> ServerConfig {
        ServerConfig {
            name: "server_1".to_owned(),
            host: "10.0.0.5".to_owned(),
            port: 27015,
            password: "secret".to_owned(),
            api_host: None,
            api_port: None,
            enabled: true,
        }
    }

    #[test]
    fn base_url_uses_api_defaults() {
        let api = ApiConfig::default();
        let source = HttpLogSource::new(&server_config(), &api).unwrap();
        assert_eq!(source.base_url, "http://127.0.0.1:17080");
        assert!(source.endpoint().contains("10.0.0.5:27015"));
    }

    #[test]
    fn base_url_prefers_per_server_override() {
        let api = ApiConfig::default();
        let mut server = server_config();
        server.api_host = Some("gateway.lan".to_owned());
        server.api_port = Some(8080);
        let source = HttpLogSource::new(&server, &api).unwrap();
        assert_eq!(source.base_url, "http://gateway.lan:8080");
    }

    #[test]
    fn new_source_has_no_session() {
        let api = ApiConfig::default();
        let source = HttpLogSource::new(&server_config(), &api).unwrap();
        assert!(source.session_id().is_none());
        assert_eq!(source.stats(), SourceStats::default());
    }
}
