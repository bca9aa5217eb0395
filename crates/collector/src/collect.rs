//! 수집 루프 -- 주기적으로 모든 서버에서 로그를 가져와 캐시에 적재
//!
//! 틱마다 서버별 태스크를 fan-out하고, 각 태스크는 재시도 정책 아래에서
//! 연결 보장과 로그 조회를 수행합니다. 한 서버의 실패는 다른 서버의
//! 수집을 막지 않으며, 재시도가 소진된 서버는 강제로 연결을 끊고 해당
//! 틱에서 빈 배치를 냅니다.
//!
//! 정지 신호는 틱 사이와 재시도 대기 중에 관찰됩니다.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use warlog_core::metrics::{
    COLLECTOR_ENTRIES_COLLECTED_TOTAL, COLLECTOR_FETCH_FAILURES_TOTAL, COLLECTOR_RETRIES_TOTAL,
    COLLECTOR_TICK_DURATION_SECONDS, LABEL_SERVER,
};
use warlog_core::types::LogEntry;

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::pipeline::CollectorContext;
use crate::retry::RetryPolicy;
use crate::session::ServerSession;

/// 수집 루프를 실행합니다. 정지 신호를 받으면 반환합니다.
///
/// `shutdown_rx`는 태스크 스폰 전에 구독한 수신기여야 합니다. 스폰된
/// 태스크 안에서 구독하면 첫 폴링 전에 보낸 정지 신호를 놓칩니다.
pub(crate) async fn run_collection_loop(
    ctx: Arc<CollectorContext>,
    config: CollectorConfig,
    shutdown: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(config.collection_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let policy = RetryPolicy::new(
        config.max_retries,
        std::time::Duration::from_secs(config.retry_delay_secs),
    );

    tracing::info!(
        servers = ctx.sessions.len(),
        interval_secs = config.collection_interval_secs,
        "collection loop started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_tick(&ctx, &config, policy, &shutdown).await;
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("collection loop stopping");
                break;
            }
        }
    }
}

/// 한 번의 수집 틱: 모든 서버에 fan-out하고 결과를 캐시에 적재합니다.
async fn run_tick(
    ctx: &Arc<CollectorContext>,
    config: &CollectorConfig,
    policy: RetryPolicy,
    shutdown: &broadcast::Sender<()>,
) {
    let start = Instant::now();
    let mut tasks: JoinSet<(String, Vec<LogEntry>)> = JoinSet::new();

    for (name, session) in &ctx.sessions {
        let name = name.clone();
        let session = session.clone();
        let shutdown_rx = shutdown.subscribe();
        let window = config.fetch_window_secs;
        tasks.spawn(async move {
            let entries = collect_server(&name, &session, policy, window, shutdown_rx).await;
            (name, entries)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((server, entries)) if !entries.is_empty() => {
                counter!(COLLECTOR_ENTRIES_COLLECTED_TOTAL, LABEL_SERVER => server.clone())
                    .increment(entries.len() as u64);
                tracing::debug!(server = %server, count = entries.len(), "collected entries");
                ctx.cache.append(&server, entries);
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "collection task panicked"),
        }
    }

    let elapsed = start.elapsed();
    histogram!(COLLECTOR_TICK_DURATION_SECONDS).record(elapsed.as_secs_f64());
    if elapsed > config.collection_interval() {
        tracing::warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            interval_secs = config.collection_interval_secs,
            "collection tick exceeded interval"
        );
    }
}

/// 한 서버에서 재시도 정책 아래 로그를 수집합니다.
///
/// 세션 mutex는 연결 보장과 조회 동안만 잡으며, 재시도 대기 중에는
/// 놓습니다. 재시도 소진 시 강제로 연결을 끊고 빈 배치를 반환합니다.
pub(crate) async fn collect_server(
    name: &str,
    session: &tokio::sync::Mutex<ServerSession>,
    policy: RetryPolicy,
    window_secs: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Vec<LogEntry> {
    for attempt in policy.attempts() {
        let result = {
            let mut session = session.lock().await;
            match session.ensure_connected().await {
                Ok(()) => session.fetch_recent(window_secs).await,
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(records) => {
                return records
                    .into_iter()
                    .map(|r| r.into_entry(name))
                    .collect();
            }
            Err(e) => {
                tracing::warn!(
                    server = name,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    error = %e,
                    "collection attempt failed"
                );
                if policy.is_last_attempt(attempt) {
                    break;
                }
                counter!(COLLECTOR_RETRIES_TOTAL, LABEL_SERVER => name.to_owned()).increment(1);
                tokio::select! {
                    _ = tokio::time::sleep(policy.delay_for(attempt)) => {}
                    _ = shutdown_rx.recv() => {
                        tracing::debug!(server = name, "retry interrupted by shutdown");
                        return Vec::new();
                    }
                }
            }
        }
    }

    counter!(COLLECTOR_FETCH_FAILURES_TOTAL, LABEL_SERVER => name.to_owned()).increment(1);
    let exhausted = CollectorError::RetriesExhausted {
        server: name.to_owned(),
        attempts: policy.max_attempts(),
    };
    tracing::error!(error = %exhausted, "disconnecting server");
    let mut session = session.lock().await;
    session.note_error(&exhausted);
    session.force_disconnect().await;
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::MockSource;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn session_with(mock: MockSource) -> tokio::sync::Mutex<ServerSession> {
        tokio::sync::Mutex::new(ServerSession::new(
            "server_1",
            Box::new(mock),
            Duration::from_secs(30),
        ))
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn collect_returns_stamped_entries() {
        let mut mock = MockSource::new();
        mock.check_results.push_back(true);
        mock.fetch_results.push_back(Ok(vec![
            MockSource::record("t1", "m1"),
            MockSource::record("t2", "m2"),
        ]));
        let session = session_with(mock);
        let (shutdown, _) = broadcast::channel(1);

        let entries =
            collect_server("server_1", &session, fast_policy(3), 180, shutdown.subscribe()).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].server, "server_1");
        assert_eq!(entries[0].identity(), "t1_m1");
    }

    #[tokio::test]
    async fn collect_retries_then_succeeds() {
        let mut mock = MockSource::new();
        mock.check_results.push_back(true);
        mock.fetch_results.push_back(Err("timeout".to_owned()));
        // 실패 후 ensure가 다시 확인
        mock.check_results.push_back(true);
        mock.fetch_results
            .push_back(Ok(vec![MockSource::record("t1", "m1")]));
        let calls = mock.calls.clone();
        let session = session_with(mock);
        let (shutdown, _) = broadcast::channel(1);

        let entries =
            collect_server("server_1", &session, fast_policy(3), 180, shutdown.subscribe()).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(calls.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_disconnect_and_yield_empty_batch() {
        let mut mock = MockSource::new();
        for _ in 0..3 {
            mock.check_results.push_back(true);
            mock.fetch_results.push_back(Err("timeout".to_owned()));
        }
        let calls = mock.calls.clone();
        let session = session_with(mock);
        let (shutdown, _) = broadcast::channel(1);

        let entries =
            collect_server("server_1", &session, fast_policy(3), 180, shutdown.subscribe()).await;
        assert!(entries.is_empty());
        assert_eq!(calls.fetches.load(Ordering::SeqCst), 3);
        assert_eq!(calls.disconnects.load(Ordering::SeqCst), 1);
        let session = session.lock().await;
        assert_eq!(session.link_state(), crate::session::LinkState::Disconnected);
        assert_eq!(
            session.last_error(),
            Some("retries exhausted for server_1 after 3 attempts")
        );
    }

    #[tokio::test]
    async fn shutdown_interrupts_retry_wait() {
        let mut mock = MockSource::new();
        mock.check_results.push_back(true);
        mock.fetch_results.push_back(Err("timeout".to_owned()));
        let session = session_with(mock);
        let (shutdown, _) = broadcast::channel(1);
        let shutdown_rx = shutdown.subscribe();

        // 긴 재시도 지연 중에 정지 신호를 보냄
        let slow_policy = RetryPolicy::new(3, Duration::from_secs(60));
        let handle = tokio::spawn(async move {
            collect_server("server_1", &session, slow_policy, 180, shutdown_rx).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.send(()).unwrap();

        let entries = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("collect_server should return promptly")
            .unwrap();
        assert!(entries.is_empty());
    }
}
