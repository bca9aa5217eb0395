//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 게임 서버 관리 로그 한 건(`LogEntry`)과 분류 카테고리(`LogCategory`)를
//! 정의합니다. 디스크에 저장되는 JSON 형식이 곧 이 타입의 serde 표현이므로
//! 필드 이름 변경은 저장 포맷 호환성을 깨뜨립니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 원본(전체) 뷰 파일 이름 접두어
pub const RAW_FILE_PREFIX: &str = "hll_logs";

/// 관리 로그 엔트리
///
/// 게임 서버 API에서 수집된 로그 한 건을 나타냅니다.
/// 일부 서버 빌드는 `Timestamp`/`Message`처럼 대문자 키를 반환하므로
/// 역직렬화 시 alias로 흡수합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 서버가 부여한 이벤트 시각 (서버 문자열 그대로 보존)
    #[serde(alias = "Timestamp")]
    pub timestamp: String,
    /// 수집 대상 서버 이름 (수집 시점에 스탬프)
    #[serde(default)]
    pub server: String,
    /// 로그 메시지 본문
    #[serde(alias = "Message")]
    pub message: String,
    /// API가 반환한 원본 페이로드 전체
    #[serde(rename = "raw_data", default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
    /// 수집기가 이 엔트리를 처음 저장한 시각
    #[serde(rename = "CollectedAt", default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<DateTime<Utc>>,
}

impl LogEntry {
    /// 새 엔트리를 생성합니다. `collected_at`은 저장 시점에 스탬프됩니다.
    pub fn new(
        server: impl Into<String>,
        timestamp: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            server: server.into(),
            message: message.into(),
            raw: None,
            collected_at: None,
        }
    }

    /// 중복 제거에 사용되는 복합 식별자 (`{timestamp}_{message}`)
    ///
    /// 타임스탬프와 메시지가 모두 같은 서로 다른 두 이벤트는
    /// 하나로 병합됩니다. 저장 포맷 계약의 일부입니다.
    pub fn identity(&self) -> String {
        format!("{}_{}", self.timestamp, self.message)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.timestamp, self.server, self.message)
    }
}

/// 로그 분류 카테고리
///
/// 분류기는 카테고리 선언 순서대로 패턴을 검사하며, 첫 매칭이 승리합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// 킬/팀킬 이벤트
    Kill,
    /// 채팅 메시지
    Chat,
    /// 플레이어 접속/접속 해제
    PlayerConnection,
    /// 매치/라운드 시작·종료, 승패
    MatchStatus,
    /// 팀 변경
    TeamSwitch,
    /// 어느 패턴에도 매칭되지 않은 나머지
    Other,
}

impl LogCategory {
    /// 우선순위 순서의 전체 카테고리 목록
    pub const ALL: [LogCategory; 6] = [
        LogCategory::Kill,
        LogCategory::Chat,
        LogCategory::PlayerConnection,
        LogCategory::MatchStatus,
        LogCategory::TeamSwitch,
        LogCategory::Other,
    ];

    /// 분류 뷰 파일 이름 접두어
    pub fn file_prefix(self) -> &'static str {
        match self {
            LogCategory::Kill => "kills",
            LogCategory::Chat => "chat",
            LogCategory::PlayerConnection => "players",
            LogCategory::MatchStatus => "matches",
            LogCategory::TeamSwitch => "teams",
            LogCategory::Other => "other",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogCategory::Kill => "kill",
            LogCategory::Chat => "chat",
            LogCategory::PlayerConnection => "player_connection",
            LogCategory::MatchStatus => "match_status",
            LogCategory::TeamSwitch => "team_switch",
            LogCategory::Other => "other",
        };
        write!(f, "{name}")
    }
}
