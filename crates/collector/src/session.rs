//! 서버 세션 -- 서버별 연결 상태 머신과 TTL 캐시
//!
//! [`ServerSession`]은 하나의 게임 서버에 대한 소스와 연결 상태를 묶습니다.
//! 연결 상태는 명시적 상태 머신([`LinkState`])으로 관리되며, 마지막 확인
//! 시각(monotonic `Instant`)과 TTL로 불필요한 실시간 확인을 줄입니다.
//!
//! # 상태 전이
//! ```text
//! Disconnected -> ensure_connected() -> CheckPending -> Connected
//!      ^                                     |
//!      +---------- 확인/연결 실패 ----------+
//! ```

use std::time::{Duration, Instant};

use crate::error::CollectorError;
use crate::source::{DynLogSource, RawLogRecord};

/// 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// 연결 없음 (초기 상태, 확인/연결 실패 후)
    Disconnected,
    /// 연결 확인됨 (TTL 이내에는 재확인 생략)
    Connected,
    /// 실시간 확인 진행 중
    CheckPending,
}

impl LinkState {
    /// 상태 이름을 반환합니다.
    pub fn as_str(self) -> &'static str {
        match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connected => "connected",
            LinkState::CheckPending => "check_pending",
        }
    }
}

/// 세션 수집 카운터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    /// 성공한 수집 수
    pub fetches_ok: u64,
    /// 실패한 수집 수
    pub fetches_failed: u64,
    /// 수집된 엔트리 수
    pub entries_collected: u64,
}

/// 서버별 연결 세션
///
/// 소스에 대한 모든 접근은 세션을 통해 이루어지며, 세션이 연결 보장과
/// 상태 추적을 담당합니다.
pub struct ServerSession {
    /// 서버 이름
    name: String,
    /// 전송 계층 소스
    source: Box<dyn DynLogSource>,
    /// 현재 연결 상태
    state: LinkState,
    /// 마지막으로 연결이 확인된 시각
    checked_at: Option<Instant>,
    /// 연결 상태 캐시 유효 시간
    ttl: Duration,
    /// 수집 카운터
    counters: SessionCounters,
    /// 마지막 에러 메시지
    last_error: Option<String>,
}

impl ServerSession {
    /// 새 세션을 생성합니다. 초기 상태는 `Disconnected`입니다.
    pub fn new(name: impl Into<String>, source: Box<dyn DynLogSource>, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            source,
            state: LinkState::Disconnected,
            checked_at: None,
            ttl,
            counters: SessionCounters::default(),
            last_error: None,
        }
    }

    /// 서버 이름을 반환합니다.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 소스 엔드포인트 설명을 반환합니다.
    pub fn endpoint(&self) -> &str {
        self.source.endpoint()
    }

    /// 현재 연결 상태를 반환합니다.
    pub fn link_state(&self) -> LinkState {
        self.state
    }

    /// 수집 카운터를 반환합니다.
    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// 마지막 에러 메시지를 반환합니다.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// TTL 이내에 확인된 연결인지 여부를 반환합니다 (실시간 확인 없음).
    pub fn is_connected_cached(&self) -> bool {
        self.state == LinkState::Connected
            && self
                .checked_at
                .is_some_and(|at| at.elapsed() < self.ttl)
    }

    /// 연결을 보장합니다.
    ///
    /// TTL 이내에 확인된 연결이면 즉시 반환합니다. 그렇지 않으면 실시간
    /// 확인을 수행하고, 끊겨 있으면 재연결을 시도합니다.
    pub async fn ensure_connected(&mut self) -> Result<(), CollectorError> {
        if self.is_connected_cached() {
            return Ok(());
        }

        self.state = LinkState::CheckPending;
        let alive = self.source.check_connection().await.unwrap_or(false);
        if alive {
            self.mark_connected();
            return Ok(());
        }

        tracing::info!(server = %self.name, "link down, reconnecting");
        match self.source.connect().await {
            Ok(()) => {
                self.mark_connected();
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.mark_disconnected(&e);
                Err(e)
            }
        }
    }

    /// 최근 `window_secs`초의 로그를 가져옵니다.
    ///
    /// 실패 시 확인 시각을 무효화하여 다음 `ensure_connected`가
    /// 실시간 확인을 수행하게 합니다.
    pub async fn fetch_recent(
        &mut self,
        window_secs: u64,
    ) -> Result<Vec<RawLogRecord>, CollectorError> {
        match self.source.fetch_recent(window_secs).await {
            Ok(records) => {
                self.counters.fetches_ok += 1;
                self.counters.entries_collected += records.len() as u64;
                Ok(records)
            }
            Err(e) => {
                self.counters.fetches_failed += 1;
                self.checked_at = None;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// 마지막 에러를 기록합니다 (수집 루프가 재시도 소진을 남길 때 사용).
    pub fn note_error(&mut self, error: &CollectorError) {
        self.last_error = Some(error.to_string());
    }

    /// 세션을 강제로 종료합니다 (재시도 소진, 정지 시).
    ///
    /// 소스 종료 실패는 경고로만 남기고 상태는 항상 `Disconnected`가 됩니다.
    pub async fn force_disconnect(&mut self) {
        if let Err(e) = self.source.disconnect().await {
            tracing::warn!(server = %self.name, error = %e, "disconnect failed");
        }
        self.state = LinkState::Disconnected;
        self.checked_at = None;
    }

    fn mark_connected(&mut self) {
        self.state = LinkState::Connected;
        self.checked_at = Some(Instant::now());
    }

    fn mark_disconnected(&mut self, error: &CollectorError) {
        self.state = LinkState::Disconnected;
        self.checked_at = None;
        self.last_error = Some(error.to_string());
    }
}
