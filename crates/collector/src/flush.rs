//! 플러시 루프 -- 캐시의 배치를 주기적으로 저장소에 반영
//!
//! 짧은 주기로 깨어나 저장 간격이 지났거나 캐시에 대기 중인 엔트리가
//! 있으면 플러시합니다. 배치는 mutex 밖에서 직렬화/저장되며, 저장에
//! 실패한 배치는 에러를 남기고 버려집니다 (수집은 계속됩니다).

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::broadcast;
use warlog_core::metrics::{
    LABEL_SERVER, STORE_FLUSH_DURATION_SECONDS, STORE_FLUSH_FAILURES_TOTAL,
};

use crate::config::CollectorConfig;
use crate::pipeline::CollectorContext;

/// 한 번의 플러시 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FlushReport {
    /// 저장된 엔트리 수 (중복 제외 전 배치 크기 기준)
    pub flushed: usize,
    /// 저장 실패로 버려진 엔트리 수
    pub dropped: usize,
}

/// 플러시 루프를 실행합니다. 정지 신호를 받으면 반환합니다.
///
/// 최종 플러시는 여기서 하지 않습니다. 정지 절차가 수집 루프 종료 후
/// 명시적으로 [`flush_all`]을 호출합니다.
///
/// `shutdown_rx`는 태스크 스폰 전에 구독한 수신기여야 합니다.
pub(crate) async fn run_flush_loop(
    ctx: Arc<CollectorContext>,
    config: CollectorConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(config.flush_tick());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let save_interval = config.save_interval();
    let mut last_save = Instant::now();

    tracing::info!(
        tick_secs = config.flush_tick_secs,
        save_interval_secs = config.save_interval_secs,
        "flush loop started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if last_save.elapsed() >= save_interval || ctx.cache.has_pending() {
                    flush_all(&ctx).await;
                    last_save = Instant::now();
                }
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("flush loop stopping");
                break;
            }
        }
    }
}

/// 캐시의 모든 배치를 꺼내 서버별로 저장합니다.
///
/// 저장 실패는 해당 서버의 배치만 버리고 다른 서버 처리는 계속합니다.
pub(crate) async fn flush_all(ctx: &CollectorContext) -> FlushReport {
    let batches = ctx.cache.drain_all();
    if batches.is_empty() {
        return FlushReport::default();
    }

    let start = Instant::now();
    let mut report = FlushReport::default();
    for (server, batch) in batches {
        let size = batch.len();
        match ctx.store.persist(&server, batch).await {
            Ok(outcome) => {
                report.flushed += size;
                tracing::info!(
                    server = %server,
                    batch = size,
                    new = outcome.new_raw,
                    duplicates = outcome.duplicates,
                    "batch persisted"
                );
            }
            Err(e) => {
                report.dropped += size;
                counter!(STORE_FLUSH_FAILURES_TOTAL, LABEL_SERVER => server.clone())
                    .increment(1);
                tracing::error!(
                    server = %server,
                    batch = size,
                    error = %e,
                    "persist failed, dropping batch"
                );
            }
        }
    }
    histogram!(STORE_FLUSH_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
    report
}
