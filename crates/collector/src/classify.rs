//! 로그 분류기 -- 우선순위 기반 정규식 분류
//!
//! [`LogClassifier`]는 관리 로그 메시지를 정규식 패턴으로 검사하여
//! 카테고리([`LogCategory`])를 결정합니다.
//!
//! # 분류 규칙
//! - 카테고리 선언 순서대로 패턴을 검사하며, **첫 매칭이 승리**합니다
//!   (Kill > Chat > PlayerConnection > MatchStatus > TeamSwitch).
//! - 모든 패턴은 대소문자 무시, 비앵커(unanchored) 검색입니다.
//! - 어느 패턴에도 매칭되지 않으면 [`LogCategory::Other`]입니다.
//!
//! 패턴은 분류기 생성 시 한 번만 컴파일됩니다.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use warlog_core::types::{LogCategory, LogEntry};

use crate::error::CollectorError;

/// 킬/팀킬 패턴
const KILL_PATTERNS: &[&str] = &[r"KILL:.*->.*with", r"TEAM KILL:.*->.*with"];

/// 채팅 패턴
const CHAT_PATTERNS: &[&str] = &[r"CHAT\[.*\]\[.*\]:"];

/// 접속/접속 해제 패턴
const CONNECTION_PATTERNS: &[&str] = &[r"CONNECTED.*\(", r"DISCONNECTED.*\("];

/// 매치 상태 패턴
const MATCH_PATTERNS: &[&str] = &[
    r"MATCH.*START",
    r"MATCH.*END",
    r"ROUND.*START",
    r"ROUND.*END",
    r"GAME.*START",
    r"GAME.*END",
    r"VICTORY",
    r"DEFEAT",
    r"WIN",
];

/// 팀 변경 패턴
const TEAM_SWITCH_PATTERNS: &[&str] = &[r"TEAMSWITCH.*\(.*>.*\)"];

/// 우선순위 기반 정규식 로그 분류기
///
/// 분류는 전체 함수(total function)입니다. 어떤 입력이든 정확히 하나의
/// 카테고리가 결정되며, 같은 입력은 항상 같은 결과를 냅니다.
pub struct LogClassifier {
    /// 우선순위 순서의 (카테고리, 컴파일된 패턴 목록) 쌍
    patterns: Vec<(LogCategory, Vec<Regex>)>,
}

impl LogClassifier {
    /// 내장 패턴으로 새 분류기를 생성합니다.
    pub fn new() -> Result<Self, CollectorError> {
        let sets: [(LogCategory, &[&str]); 5] = [
            (LogCategory::Kill, KILL_PATTERNS),
            (LogCategory::Chat, CHAT_PATTERNS),
            (LogCategory::PlayerConnection, CONNECTION_PATTERNS),
            (LogCategory::MatchStatus, MATCH_PATTERNS),
            (LogCategory::TeamSwitch, TEAM_SWITCH_PATTERNS),
        ];

        let mut patterns = Vec::with_capacity(sets.len());
        for (category, raw) in sets {
            let compiled = raw
                .iter()
                .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                .collect::<Result<Vec<_>, _>>()?;
            patterns.push((category, compiled));
        }

        Ok(Self { patterns })
    }

    /// 메시지 하나를 분류합니다.
    pub fn classify(&self, message: &str) -> LogCategory {
        for (category, regexes) in &self.patterns {
            if regexes.iter().any(|re| re.is_match(message)) {
                return *category;
            }
        }
        LogCategory::Other
    }

    /// 배치를 카테고리별로 분류합니다.
    ///
    /// 반환 맵은 항상 여섯 카테고리 전부를 키로 가지며 (빈 카테고리는 빈
    /// Vec), 각 카테고리 내에서 입력 순서가 유지됩니다. 카테고리별 결과를
    /// 이어 붙이면 입력 배치가 멀티셋으로 복원됩니다.
    pub fn classify_batch(&self, entries: &[LogEntry]) -> HashMap<LogCategory, Vec<LogEntry>> {
        let mut result: HashMap<LogCategory, Vec<LogEntry>> = LogCategory::ALL
            .iter()
            .map(|c| (*c, Vec::new()))
            .collect();

        for entry in entries {
            let category = self.classify(&entry.message);
            if let Some(bucket) = result.get_mut(&category) {
                bucket.push(entry.clone());
            }
        }

        result
    }

    /// 배치의 카테고리별 개수를 집계합니다.
    pub fn statistics(&self, entries: &[LogEntry]) -> HashMap<LogCategory, usize> {
        let mut counts: HashMap<LogCategory, usize> =
            LogCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for entry in entries {
            *counts.entry(self.classify(&entry.message)).or_insert(0) += 1;
        }
        counts
    }

    /// 특정 카테고리의 엔트리만 골라냅니다.
    pub fn filter_by(&self, entries: &[LogEntry], category: LogCategory) -> Vec<LogEntry> {
        entries
            .iter()
            .filter(|e| self.classify(&e.message) == category)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LogClassifier {
        LogClassifier::new().unwrap()
    }

    fn entry(message: &str) -> LogEntry {
        LogEntry::new("server_1", "1761193883", message)
    }

    #[test]
    fn classifies_kill_messages() {
        let c = classifier();
        assert_eq!(
            c.classify(
                "[2:58 min (1761193883)] KILL: esc5(Allies/76561198287323037) -> \
                 ICE Tea(Axis/76561199130443107) with M1 GARAND"
            ),
            LogCategory::Kill
        );
        assert_eq!(
            c.classify("TEAM KILL: Alpha(Axis/123) -> Bravo(Axis/456) with MG42"),
            LogCategory::Kill
        );
    }

    #[test]
    fn classifies_chat_messages() {
        let c = classifier();
        assert_eq!(
            c.classify("CHAT[Team][Alpha(Allies/76561198000000000)]: push left flank"),
            LogCategory::Chat
        );
    }

    #[test]
    fn classifies_connection_messages() {
        let c = classifier();
        assert_eq!(
            c.classify("CONNECTED Alpha (76561198000000000)"),
            LogCategory::PlayerConnection
        );
        assert_eq!(
            c.classify("DISCONNECTED Bravo (76561198000000001)"),
            LogCategory::PlayerConnection
        );
    }

    #[test]
    fn classifies_match_status_messages() {
        let c = classifier();
        assert_eq!(
            c.classify("MATCH START SAINTE-MERE-EGLISE WARFARE"),
            LogCategory::MatchStatus
        );
        assert_eq!(
            c.classify("MATCH ENDED 'SME Warfare' ALLIED VICTORY"),
            LogCategory::MatchStatus
        );
        assert_eq!(c.classify("AXIS DEFEAT"), LogCategory::MatchStatus);
    }

    #[test]
    fn classifies_team_switch_messages() {
        let c = classifier();
        assert_eq!(
            c.classify("TEAMSWITCH Alpha (Axis > Allies)"),
            LogCategory::TeamSwitch
        );
    }

    #[test]
    fn unmatched_messages_fall_back_to_other() {
        let c = classifier();
        assert_eq!(c.classify("BAN: Alpha banned for 2 hours"), LogCategory::Other);
        assert_eq!(c.classify(""), LogCategory::Other);
    }

    #[test]
    fn classification_is_case_insensitive() {
        let c = classifier();
        assert_eq!(
            c.classify("kill: a(Allies/1) -> b(Axis/2) with Kar98"),
            LogCategory::Kill
        );
        assert_eq!(
            c.classify("connected Alpha (123)"),
            LogCategory::PlayerConnection
        );
    }

    #[test]
    fn kill_takes_precedence_over_match_status() {
        // "VICTORY" 단어가 섞여 있어도 KILL 패턴이 먼저 검사됨
        let c = classifier();
        assert_eq!(
            c.classify("KILL: Victory(Allies/1) -> Defeat(Axis/2) with WIN rifle"),
            LogCategory::Kill
        );
    }

    #[test]
    fn chat_takes_precedence_over_connection() {
        let c = classifier();
        assert_eq!(
            c.classify("CHAT[Unit][Alpha(Allies/1)]: he DISCONNECTED (lag)"),
            LogCategory::Chat
        );
    }

    #[test]
    fn classify_batch_contains_all_categories() {
        let c = classifier();
        let result = c.classify_batch(&[entry("CONNECTED Alpha (1)")]);
        assert_eq!(result.len(), 6);
        assert_eq!(result[&LogCategory::PlayerConnection].len(), 1);
        assert!(result[&LogCategory::Kill].is_empty());
        assert!(result[&LogCategory::Other].is_empty());
    }

    #[test]
    fn classify_batch_preserves_order_and_multiset() {
        let c = classifier();
        let batch = vec![
            entry("CONNECTED Alpha (1)"),
            entry("KILL: a(Allies/1) -> b(Axis/2) with M1"),
            entry("DISCONNECTED Alpha (1)"),
            entry("something unusual"),
        ];
        let result = c.classify_batch(&batch);

        let conn = &result[&LogCategory::PlayerConnection];
        assert_eq!(conn.len(), 2);
        assert!(conn[0].message.starts_with("CONNECTED"));
        assert!(conn[1].message.starts_with("DISCONNECTED"));

        let total: usize = result.values().map(Vec::len).sum();
        assert_eq!(total, batch.len());
    }

    #[test]
    fn statistics_counts_per_category() {
        let c = classifier();
        let batch = vec![
            entry("KILL: a(Allies/1) -> b(Axis/2) with M1"),
            entry("TEAM KILL: c(Axis/3) -> d(Axis/4) with MG42"),
            entry("unmatched"),
        ];
        let stats = c.statistics(&batch);
        assert_eq!(stats[&LogCategory::Kill], 2);
        assert_eq!(stats[&LogCategory::Other], 1);
        assert_eq!(stats[&LogCategory::Chat], 0);
    }

    #[test]
    fn filter_by_returns_matching_entries_only() {
        let c = classifier();
        let batch = vec![
            entry("CONNECTED Alpha (1)"),
            entry("KILL: a(Allies/1) -> b(Axis/2) with M1"),
        ];
        let kills = c.filter_by(&batch, LogCategory::Kill);
        assert_eq!(kills.len(), 1);
        assert!(kills[0].message.starts_with("KILL:"));
    }
}
