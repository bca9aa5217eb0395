//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `warlog_`
//! - 모듈명: `collector_`, `cache_`, `store_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(warlog_core::metrics::COLLECTOR_ENTRIES_COLLECTED_TOTAL).increment(1);
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 서버 레이블 키
pub const LABEL_SERVER: &str = "server";

/// 분류 카테고리 레이블 키 (kill, chat, player_connection, ...)
pub const LABEL_CATEGORY: &str = "category";

// ─── Collector 메트릭 ──────────────────────────────────────────────

/// Collector: 수집된 전체 로그 수 (counter, label: server)
pub const COLLECTOR_ENTRIES_COLLECTED_TOTAL: &str = "warlog_collector_entries_collected_total";

/// Collector: 수집 실패 수 (counter, label: server)
pub const COLLECTOR_FETCH_FAILURES_TOTAL: &str = "warlog_collector_fetch_failures_total";

/// Collector: 재시도 횟수 (counter, label: server)
pub const COLLECTOR_RETRIES_TOTAL: &str = "warlog_collector_retries_total";

/// Collector: 수집 틱 소요 시간 (histogram, 초)
pub const COLLECTOR_TICK_DURATION_SECONDS: &str = "warlog_collector_tick_duration_seconds";

// ─── Cache 메트릭 ──────────────────────────────────────────────────

/// Cache: 현재 캐시 내 로그 수 (gauge)
pub const CACHE_DEPTH: &str = "warlog_cache_depth";

/// Cache: 용량 초과로 버려진 로그 수 (counter, label: server)
pub const CACHE_DROPPED_TOTAL: &str = "warlog_cache_dropped_total";

// ─── Store 메트릭 ──────────────────────────────────────────────────

/// Store: 디스크에 기록된 로그 수 (counter, label: server, category)
pub const STORE_ENTRIES_WRITTEN_TOTAL: &str = "warlog_store_entries_written_total";

/// Store: 중복으로 건너뛴 로그 수 (counter, label: server)
pub const STORE_DUPLICATES_SKIPPED_TOTAL: &str = "warlog_store_duplicates_skipped_total";

/// Store: 플러시 소요 시간 (histogram, 초)
pub const STORE_FLUSH_DURATION_SECONDS: &str = "warlog_store_flush_duration_seconds";

/// Store: 플러시 실패로 유실된 로그 수 (counter, label: server)
pub const STORE_FLUSH_FAILURES_TOTAL: &str = "warlog_store_flush_failures_total";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "warlog_daemon_uptime_seconds";

/// 히스토그램 버킷 (초) — 수집/플러시 지연 시간용
pub const DURATION_BUCKETS: [f64; 8] = [0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0];

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다. recorder가 없어도 no-op으로 안전합니다.
pub fn describe_all() {
    // Collector
    describe_counter!(
        COLLECTOR_ENTRIES_COLLECTED_TOTAL,
        "Total number of admin log entries collected from game servers"
    );
    describe_counter!(
        COLLECTOR_FETCH_FAILURES_TOTAL,
        "Total number of failed collection attempts after retry exhaustion"
    );
    describe_counter!(
        COLLECTOR_RETRIES_TOTAL,
        "Total number of collection retries"
    );
    describe_histogram!(
        COLLECTOR_TICK_DURATION_SECONDS,
        "Time to complete one collection tick across all servers in seconds"
    );

    // Cache
    describe_gauge!(CACHE_DEPTH, "Number of log entries currently cached");
    describe_counter!(
        CACHE_DROPPED_TOTAL,
        "Total number of cached entries dropped due to capacity limits"
    );

    // Store
    describe_counter!(
        STORE_ENTRIES_WRITTEN_TOTAL,
        "Total number of new log entries written to disk"
    );
    describe_counter!(
        STORE_DUPLICATES_SKIPPED_TOTAL,
        "Total number of entries skipped as duplicates during persistence"
    );
    describe_histogram!(
        STORE_FLUSH_DURATION_SECONDS,
        "Time to flush cached entries to disk in seconds"
    );
    describe_counter!(
        STORE_FLUSH_FAILURES_TOTAL,
        "Total number of entries lost to failed flushes"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Warlog daemon uptime in seconds");
}
