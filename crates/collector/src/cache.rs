//! 로그 캐시 -- 서버별 인메모리 버퍼링
//!
//! [`LogCache`]는 수집 루프가 넣고 플러시 루프가 비우는 공유 캐시입니다.
//! 서버 이름을 키로 세그먼트를 나누어, 한 서버의 배치 추가와 드레인이
//! 다른 서버와 간섭하지 않습니다.
//!
//! # 잠금 규칙
//! 내부 mutex는 추가/드레인의 짧은 구간에서만 잡습니다.
//! 네트워크나 디스크 I/O 중에는 절대 잡지 않습니다.
//!
//! # 오버플로우 정책
//! 세그먼트가 용량을 초과하면:
//! - [`DropPolicy::Oldest`](crate::config::DropPolicy::Oldest): 가장 오래된 엔트리를 드롭
//! - [`DropPolicy::Newest`](crate::config::DropPolicy::Newest): 새 유입을 거부

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use metrics::{counter, gauge};
use warlog_core::metrics::{CACHE_DEPTH, CACHE_DROPPED_TOTAL, LABEL_SERVER};
use warlog_core::types::LogEntry;

use crate::config::DropPolicy;

struct CacheInner {
    /// 서버별 세그먼트
    segments: HashMap<String, VecDeque<LogEntry>>,
    /// 총 유입 엔트리 카운터
    total_received: u64,
    /// 드롭된 엔트리 카운터 (통계용)
    dropped: u64,
}

/// 서버별 인메모리 로그 캐시
///
/// 세그먼트 용량이 초과되면 설정된 드롭 정책에 따라 엔트리를 제거합니다.
pub struct LogCache {
    inner: Mutex<CacheInner>,
    /// 세그먼트당 최대 용량
    capacity: usize,
    /// 드롭 정책
    drop_policy: DropPolicy,
}

impl LogCache {
    /// 새 로그 캐시를 생성합니다.
    pub fn new(capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                segments: HashMap::new(),
                total_received: 0,
                dropped: 0,
            }),
            capacity,
            drop_policy,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 한 서버의 배치를 원자적으로 추가합니다.
    ///
    /// 드롭이 발생한 엔트리 수를 반환합니다.
    pub fn append(&self, server: &str, batch: Vec<LogEntry>) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let mut dropped_now = 0usize;
        let depth;
        {
            let mut inner = self.lock();
            inner.total_received += batch.len() as u64;
            let segment = inner.segments.entry(server.to_owned()).or_default();

            for entry in batch {
                if segment.len() >= self.capacity {
                    match self.drop_policy {
                        DropPolicy::Oldest => {
                            segment.pop_front();
                            segment.push_back(entry);
                        }
                        DropPolicy::Newest => {}
                    }
                    dropped_now += 1;
                } else {
                    segment.push_back(entry);
                }
            }

            inner.dropped += dropped_now as u64;
            depth = inner.segments.values().map(VecDeque::len).sum::<usize>();
        }

        if dropped_now > 0 {
            tracing::warn!(
                server,
                dropped = dropped_now,
                capacity = self.capacity,
                "cache segment full, dropped entries"
            );
            counter!(CACHE_DROPPED_TOTAL, LABEL_SERVER => server.to_owned())
                .increment(dropped_now as u64);
        }
        gauge!(CACHE_DEPTH).set(depth as f64);

        dropped_now
    }

    /// 한 서버의 세그먼트를 드레인합니다.
    pub fn drain(&self, server: &str) -> Vec<LogEntry> {
        let mut inner = self.lock();
        let drained = inner
            .segments
            .get_mut(server)
            .map(|segment| segment.drain(..).collect())
            .unwrap_or_default();
        let depth = inner.segments.values().map(VecDeque::len).sum::<usize>();
        drop(inner);
        gauge!(CACHE_DEPTH).set(depth as f64);
        drained
    }

    /// 모든 세그먼트를 원자적으로 스냅샷하고 비웁니다.
    ///
    /// 반환된 배치들은 호출자가 잠금 없이 처리합니다.
    pub fn drain_all(&self) -> HashMap<String, Vec<LogEntry>> {
        let mut inner = self.lock();
        let drained: HashMap<String, Vec<LogEntry>> = inner
            .segments
            .iter_mut()
            .filter(|(_, segment)| !segment.is_empty())
            .map(|(server, segment)| (server.clone(), segment.drain(..).collect()))
            .collect();
        drop(inner);
        gauge!(CACHE_DEPTH).set(0.0);
        drained
    }

    /// 전체 캐시 깊이를 반환합니다.
    pub fn depth(&self) -> usize {
        self.lock().segments.values().map(VecDeque::len).sum()
    }

    /// 한 서버의 세그먼트 깊이를 반환합니다.
    pub fn depth_for(&self, server: &str) -> usize {
        self.lock()
            .segments
            .get(server)
            .map_or(0, VecDeque::len)
    }

    /// 플러시할 엔트리가 있는지 확인합니다.
    pub fn has_pending(&self) -> bool {
        self.lock().segments.values().any(|s| !s.is_empty())
    }

    /// 지금까지 드롭된 엔트리 수를 반환합니다.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// 총 유입 엔트리 수를 반환합니다.
    pub fn total_received(&self) -> u64 {
        self.lock().total_received
    }

    /// 세그먼트당 최대 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 가장 가득 찬 세그먼트의 사용률을 0.0~1.0 범위로 반환합니다.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        let max_depth = self
            .lock()
            .segments
            .values()
            .map(VecDeque::len)
            .max()
            .unwrap_or(0);
        max_depth as f64 / self.capacity as f64
    }
}
