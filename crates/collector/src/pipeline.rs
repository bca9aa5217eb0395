//! 수집 파이프라인 오케스트레이션
//!
//! [`LogCollector`]는 서버 세션, 캐시, 저장소를 묶어
//! [`warlog_core::Pipeline`] 생명주기를 구현합니다. `start()`는 수집
//! 루프와 플러시 루프를 백그라운드 태스크로 띄우고, `stop()`은 정지
//! 신호 후 태스크 종료를 기다린 뒤 최종 플러시와 세션 정리를 수행합니다.
//!
//! 전역 상태는 없습니다. 모든 공유 자원은 [`CollectorContext`]에 모여
//! `Arc`로 두 루프에 전달됩니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use warlog_core::config::WarlogConfig;
use warlog_core::error::{PipelineError, WarlogError};
use warlog_core::pipeline::{HealthStatus, Pipeline};

use crate::cache::LogCache;
use crate::classify::LogClassifier;
use crate::collect;
use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::flush;
use crate::session::{ServerSession, SessionCounters};
use crate::source::{DynLogSource, HttpLogSource};
use crate::store::{LogStore, PartitionInfo, StoreStatistics};

/// 캐시 사용률이 이 값을 넘으면 건강 상태가 `Degraded`가 됩니다.
const CACHE_DEGRADED_THRESHOLD: f64 = 0.8;

/// 수집 루프와 플러시 루프가 공유하는 자원
pub(crate) struct CollectorContext {
    /// 서버 이름 -> 세션
    pub sessions: HashMap<String, Arc<tokio::sync::Mutex<ServerSession>>>,
    /// 서버별 인메모리 캐시
    pub cache: LogCache,
    /// 파티션 저장소
    pub store: LogStore,
}

/// 파이프라인 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectorState {
    NotStarted,
    Running,
    Stopped,
}

/// 서버 하나의 현재 상태 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    /// 서버 이름
    pub name: String,
    /// 소스 엔드포인트 설명
    pub endpoint: String,
    /// 연결 상태 이름
    pub link_state: &'static str,
    /// 캐시에 대기 중인 엔트리 수
    pub cached_entries: usize,
    /// 성공한 수집 수
    pub fetches_ok: u64,
    /// 실패한 수집 수
    pub fetches_failed: u64,
    /// 수집된 엔트리 수
    pub entries_collected: u64,
    /// 마지막 에러 메시지
    pub last_error: Option<String>,
    /// 현재 시각 파티션의 원본 파일 정보
    pub current_file: PartitionInfo,
}

/// 수집기 전체 상태 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct CollectorStatus {
    /// 실행 중 여부
    pub running: bool,
    /// 캐시 전체 잔량
    pub cache_depth: usize,
    /// 용량 초과로 버려진 엔트리 수
    pub cache_dropped: u64,
    /// 서버별 상태
    pub servers: Vec<ServerStatus>,
}

/// 로그 수집 파이프라인
///
/// [`LogCollectorBuilder`]로 생성합니다.
pub struct LogCollector {
    config: CollectorConfig,
    ctx: Arc<CollectorContext>,
    state: CollectorState,
    shutdown: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl LogCollector {
    /// 빌더를 반환합니다.
    pub fn builder() -> LogCollectorBuilder {
        LogCollectorBuilder::new()
    }

    /// 수집기 설정을 반환합니다.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// 현재 상태 스냅샷을 수집합니다.
    pub async fn status(&self) -> CollectorStatus {
        let mut servers = Vec::with_capacity(self.ctx.sessions.len());
        for (name, session) in &self.ctx.sessions {
            let session = session.lock().await;
            let SessionCounters {
                fetches_ok,
                fetches_failed,
                entries_collected,
            } = session.counters();
            servers.push(ServerStatus {
                name: name.clone(),
                endpoint: session.endpoint().to_owned(),
                link_state: session.link_state().as_str(),
                cached_entries: self.ctx.cache.depth_for(name),
                fetches_ok,
                fetches_failed,
                entries_collected,
                last_error: session.last_error().map(str::to_owned),
                current_file: self.ctx.store.current_file_info(name).await,
            });
        }
        servers.sort_by(|a, b| a.name.cmp(&b.name));

        CollectorStatus {
            running: self.state == CollectorState::Running,
            cache_depth: self.ctx.cache.depth(),
            cache_dropped: self.ctx.cache.dropped(),
            servers,
        }
    }

    /// 캐시의 모든 배치를 즉시 저장합니다. 저장된 엔트리 수를 반환합니다.
    pub async fn force_flush(&self) -> usize {
        flush::flush_all(&self.ctx).await.flushed
    }

    /// 서버별 저장소 통계를 수집합니다.
    pub async fn statistics(
        &self,
    ) -> Result<HashMap<String, StoreStatistics>, CollectorError> {
        let mut stats = HashMap::with_capacity(self.ctx.sessions.len());
        for name in self.ctx.sessions.keys() {
            stats.insert(name.clone(), self.ctx.store.statistics(name).await?);
        }
        Ok(stats)
    }

    /// 보존 기간이 지난 파일을 모든 서버에서 정리합니다.
    /// 삭제된 파일 수를 반환합니다.
    pub async fn cleanup(&self, days_to_keep: u32) -> Result<usize, CollectorError> {
        let mut removed = 0;
        for name in self.ctx.sessions.keys() {
            removed += self.ctx.store.cleanup(name, days_to_keep).await?;
        }
        Ok(removed)
    }

    /// 정지 신호를 보내고 루프 태스크 종료를 기다립니다.
    async fn join_tasks(&mut self) -> Result<(), PipelineError> {
        // 구독자가 없어도 에러가 아니다
        let _ = self.shutdown.send(());

        let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
        let tasks = std::mem::take(&mut self.tasks);
        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        let joined = tokio::time::timeout(timeout, async {
            for task in tasks {
                if let Err(e) = task.await {
                    if !e.is_cancelled() {
                        tracing::error!(error = %e, "loop task failed");
                    }
                }
            }
        })
        .await;

        match joined {
            Ok(()) => Ok(()),
            Err(_) => {
                for abort in aborts {
                    abort.abort();
                }
                Err(PipelineError::ShutdownTimeout {
                    timeout_secs: self.config.shutdown_timeout_secs,
                })
            }
        }
    }

    /// 모든 세션을 best-effort로 종료합니다.
    async fn disconnect_all(&self) {
        for session in self.ctx.sessions.values() {
            session.lock().await.force_disconnect().await;
        }
    }
}

impl Pipeline for LogCollector {
    fn name(&self) -> &str {
        "log-collector"
    }

    async fn start(&mut self) -> Result<(), WarlogError> {
        if self.state == CollectorState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        tracing::info!(
            servers = self.ctx.sessions.len(),
            logs_dir = %self.config.logs_dir.display(),
            "starting log collector"
        );

        // 스폰 전에 구독해야 스폰 직후의 정지 신호도 전달된다
        self.tasks.push(tokio::spawn(collect::run_collection_loop(
            self.ctx.clone(),
            self.config.clone(),
            self.shutdown.clone(),
            self.shutdown.subscribe(),
        )));
        self.tasks.push(tokio::spawn(flush::run_flush_loop(
            self.ctx.clone(),
            self.config.clone(),
            self.shutdown.subscribe(),
        )));

        self.state = CollectorState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), WarlogError> {
        if self.state != CollectorState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping log collector");
        let join_result = self.join_tasks().await;
        if let Err(e) = &join_result {
            tracing::warn!(error = %e, "loop tasks did not stop in time");
        }

        // 정지 중에도 캐시 잔량은 항상 저장한다
        let report = flush::flush_all(&self.ctx).await;
        if report.flushed + report.dropped > 0 {
            tracing::info!(
                flushed = report.flushed,
                dropped = report.dropped,
                "final flush complete"
            );
        }

        self.disconnect_all().await;
        self.state = CollectorState::Stopped;
        tracing::info!("log collector stopped");

        join_result.map_err(WarlogError::from)
    }

    async fn health_check(&self) -> HealthStatus {
        if self.state != CollectorState::Running {
            return HealthStatus::Unhealthy("collector not running".to_owned());
        }

        let mut disconnected = 0usize;
        for session in self.ctx.sessions.values() {
            if !session.lock().await.is_connected_cached() {
                disconnected += 1;
            }
        }
        if disconnected > 0 {
            return HealthStatus::Degraded(format!("{disconnected} servers disconnected"));
        }

        let utilization = self.ctx.cache.utilization();
        if utilization > CACHE_DEGRADED_THRESHOLD {
            return HealthStatus::Degraded(format!(
                "cache utilization {:.0}%",
                utilization * 100.0
            ));
        }

        HealthStatus::Healthy
    }
}

/// [`LogCollector`] 빌더
///
/// 설정과 서버별 소스를 등록한 뒤 [`build`](Self::build)로 수집기를
/// 생성합니다. 테스트에서는 mock 소스를, 데몬에서는
/// [`with_http_sources`](Self::with_http_sources)로 HTTP 소스를 등록합니다.
pub struct LogCollectorBuilder {
    config: CollectorConfig,
    sources: Vec<(String, Box<dyn DynLogSource>)>,
}

impl LogCollectorBuilder {
    /// 기본 설정으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: CollectorConfig::default(),
            sources: Vec::new(),
        }
    }

    /// 수집기 설정을 지정합니다.
    pub fn config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// 서버 소스를 등록합니다. 같은 이름이 이미 있으면 교체합니다.
    pub fn source(mut self, name: impl Into<String>, source: Box<dyn DynLogSource>) -> Self {
        let name = name.into();
        self.sources.retain(|(existing, _)| *existing != name);
        self.sources.push((name, source));
        self
    }

    /// 설정의 활성 서버마다 HTTP 소스를 생성해 등록합니다.
    pub fn with_http_sources(mut self, core: &WarlogConfig) -> Result<Self, CollectorError> {
        for server in core.enabled_servers() {
            let source = HttpLogSource::new(server, &core.api)?;
            self = self.source(server.name.clone(), Box::new(source));
        }
        Ok(self)
    }

    /// 수집기를 생성합니다.
    ///
    /// 설정을 검증하고 분류기를 컴파일합니다. 등록된 소스가 없으면
    /// 에러를 반환합니다.
    pub fn build(self) -> Result<LogCollector, CollectorError> {
        self.config.validate()?;
        if self.sources.is_empty() {
            return Err(CollectorError::Config {
                field: "servers".to_owned(),
                reason: "at least one enabled server is required".to_owned(),
            });
        }

        let classifier = LogClassifier::new()?;
        let store = LogStore::new(self.config.logs_dir.clone(), classifier);
        let cache = LogCache::new(self.config.cache_capacity, self.config.drop_policy);

        let ttl = self.config.connection_ttl();
        let sessions = self
            .sources
            .into_iter()
            .map(|(name, source)| {
                let session = ServerSession::new(name.clone(), source, ttl);
                (name, Arc::new(tokio::sync::Mutex::new(session)))
            })
            .collect();

        let (shutdown, _) = broadcast::channel(1);
        Ok(LogCollector {
            config: self.config,
            ctx: Arc::new(CollectorContext {
                sessions,
                cache,
                store,
            }),
            state: CollectorState::NotStarted,
            shutdown,
            tasks: Vec::new(),
        })
    }
}

impl Default for LogCollectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
