//! 로그 저장소 -- 파티션 구조 JSON 저장, 중복 제거, 통계, 보존 기간 정리
//!
//! 디스크 레이아웃:
//! ```text
//! <logs_dir>/<server>/<yy_mm>/<dd>/<prefix>_<YYYY-MM-DD>_<HH>.json
//! ```
//!
//! 파티션 하나는 엔트리 배열을 담은 JSON 파일입니다. 원본 뷰(`hll_logs`
//! 접두어)와 카테고리별 뷰(`kills`, `chat`, ...)가 같은 디렉토리에
//! 나란히 저장됩니다.
//!
//! # 중복 제거
//! 엔트리 식별자는 `{timestamp}_{message}`입니다. 같은 파티션 안에서
//! 동일 식별자는 원본 뷰와 카테고리별 뷰 모두에서 한 번만 저장됩니다.
//! 동일 배치를 두 번 저장해도 아무것도 추가되지 않습니다 (멱등).
//!
//! # 손상 파일
//! 읽을 수 없거나 파싱할 수 없는 파티션은 경고 후 빈 파티션으로
//! 취급됩니다. 다음 저장이 파일을 유효한 내용으로 덮어씁니다.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use metrics::counter;
use warlog_core::metrics::{
    LABEL_CATEGORY, LABEL_SERVER, STORE_DUPLICATES_SKIPPED_TOTAL, STORE_ENTRIES_WRITTEN_TOTAL,
};
use warlog_core::types::{LogCategory, LogEntry, RAW_FILE_PREFIX};

use crate::classify::LogClassifier;
use crate::error::CollectorError;

/// 저장 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    /// 원본 뷰에 새로 기록된 엔트리 수
    pub new_raw: usize,
    /// 중복으로 건너뛴 엔트리 수
    pub duplicates: usize,
    /// 카테고리별로 새로 기록된 엔트리 수 (빈 카테고리는 생략)
    pub per_category: HashMap<LogCategory, usize>,
}

/// 현재 파티션 파일 정보
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PartitionInfo {
    /// 파일 경로
    pub path: PathBuf,
    /// 존재 여부
    pub exists: bool,
    /// 파일 크기 (바이트)
    pub size_bytes: u64,
    /// 엔트리 수
    pub entry_count: usize,
}

/// 서버별 저장소 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreStatistics {
    /// 전체 파일 수
    pub total_files: usize,
    /// 전체 파일 크기 (바이트)
    pub total_size_bytes: u64,
    /// 전체 엔트리 수
    pub total_entries: usize,
    /// 파일 이름에서 파싱한 날짜 범위 (최소, 최대)
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// 파티션 구조 JSON 저장소
pub struct LogStore {
    /// 저장 루트 디렉토리
    root: PathBuf,
    /// 카테고리 뷰 생성에 사용하는 분류기
    classifier: LogClassifier,
}

impl LogStore {
    /// 새 저장소를 생성합니다.
    pub fn new(root: impl Into<PathBuf>, classifier: LogClassifier) -> Self {
        Self {
            root: root.into(),
            classifier,
        }
    }

    /// 저장 루트 디렉토리를 반환합니다.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_path(&self, server: &str, prefix: &str, now: &DateTime<Local>) -> PathBuf {
        self.root
            .join(server)
            .join(format!("{:02}_{:02}", now.year() % 100, now.month()))
            .join(format!("{:02}", now.day()))
            .join(format!("{prefix}_{}.json", now.format("%Y-%m-%d_%H")))
    }

    /// 배치를 현재 파티션에 저장합니다.
    ///
    /// 1. 원본 뷰 로드, 기존/배치 내 중복 제거, 생존 엔트리에
    ///    `collected_at` 스탬프 후 병합 저장
    /// 2. 생존 엔트리를 분류하여 카테고리별 뷰에 같은 방식으로 병합 저장
    pub async fn persist(
        &self,
        server: &str,
        batch: Vec<LogEntry>,
    ) -> Result<PersistOutcome, CollectorError> {
        if batch.is_empty() {
            return Ok(PersistOutcome::default());
        }

        let now = Local::now();
        let raw_path = self.partition_path(server, RAW_FILE_PREFIX, &now);

        let existing = load_partition(&raw_path).await;
        let mut seen: HashSet<String> = existing.iter().map(LogEntry::identity).collect();

        let collected_at = Utc::now();
        let mut new_entries = Vec::new();
        let mut duplicates = 0usize;
        for mut entry in batch {
            if seen.insert(entry.identity()) {
                entry.collected_at = Some(collected_at);
                new_entries.push(entry);
            } else {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            counter!(STORE_DUPLICATES_SKIPPED_TOTAL, LABEL_SERVER => server.to_owned())
                .increment(duplicates as u64);
        }

        if new_entries.is_empty() {
            tracing::debug!(server, duplicates, "no new entries to persist");
            return Ok(PersistOutcome {
                new_raw: 0,
                duplicates,
                per_category: HashMap::new(),
            });
        }

        let new_raw = new_entries.len();
        let mut merged = existing;
        merged.extend(new_entries.iter().cloned());
        write_partition(&raw_path, &merged).await?;

        // 같은 생존 배치를 분류하여 카테고리별 뷰를 갱신
        let mut per_category = HashMap::new();
        for (category, entries) in self.classifier.classify_batch(&new_entries) {
            if entries.is_empty() {
                continue;
            }

            let path = self.partition_path(server, category.file_prefix(), &now);
            let existing = load_partition(&path).await;
            let ids: HashSet<String> = existing.iter().map(LogEntry::identity).collect();
            let appended: Vec<LogEntry> = entries
                .into_iter()
                .filter(|e| !ids.contains(&e.identity()))
                .collect();
            if appended.is_empty() {
                continue;
            }

            counter!(
                STORE_ENTRIES_WRITTEN_TOTAL,
                LABEL_SERVER => server.to_owned(),
                LABEL_CATEGORY => category.to_string()
            )
            .increment(appended.len() as u64);
            per_category.insert(category, appended.len());

            let mut merged = existing;
            merged.extend(appended);
            write_partition(&path, &merged).await?;
        }

        tracing::info!(server, new = new_raw, duplicates, "persisted batch");
        Ok(PersistOutcome {
            new_raw,
            duplicates,
            per_category,
        })
    }

    /// 현재 원본 파티션 파일 정보를 반환합니다.
    pub async fn current_file_info(&self, server: &str) -> PartitionInfo {
        let path = self.partition_path(server, RAW_FILE_PREFIX, &Local::now());
        match tokio::fs::metadata(&path).await {
            Ok(meta) => {
                let entry_count = load_partition(&path).await.len();
                PartitionInfo {
                    exists: true,
                    size_bytes: meta.len(),
                    entry_count,
                    path,
                }
            }
            Err(_) => PartitionInfo {
                exists: false,
                size_bytes: 0,
                entry_count: 0,
                path,
            },
        }
    }

    /// 서버의 저장소 통계를 집계합니다.
    ///
    /// 날짜 범위는 파일 이름에 들어 있는 `YYYY-MM-DD` 토큰에서 파싱합니다.
    pub async fn statistics(&self, server: &str) -> Result<StoreStatistics, CollectorError> {
        let mut stats = StoreStatistics::default();

        for file in self.partition_files(server).await? {
            let meta = match tokio::fs::metadata(&file).await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            stats.total_files += 1;
            stats.total_size_bytes += meta.len();
            stats.total_entries += load_partition(&file).await.len();

            if let Some(date) = filename_date(&file) {
                stats.date_range = Some(match stats.date_range {
                    None => (date, date),
                    Some((min, max)) => (min.min(date), max.max(date)),
                });
            }
        }

        Ok(stats)
    }

    /// 보존 기간이 지난 파일을 삭제합니다.
    ///
    /// 파일 이름에 들어 있는 날짜가 `days_to_keep`일보다 오래된 파일을
    /// 삭제하고, 비게 된 일/월 디렉토리를 제거합니다. 날짜를 파싱할 수
    /// 없는 파일은 건드리지 않습니다. 삭제된 파일 수를 반환합니다.
    pub async fn cleanup(&self, server: &str, days_to_keep: u32) -> Result<usize, CollectorError> {
        let cutoff = Local::now().date_naive() - chrono::Days::new(u64::from(days_to_keep));
        let mut removed = 0usize;

        for file in self.partition_files(server).await? {
            let Some(date) = filename_date(&file) else {
                continue;
            };
            if date >= cutoff {
                continue;
            }
            match tokio::fs::remove_file(&file).await {
                Ok(()) => {
                    tracing::debug!(path = %file.display(), "removed expired log file");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "failed to remove file");
                }
            }
        }

        self.remove_empty_dirs(server).await;

        if removed > 0 {
            tracing::info!(server, removed, days_to_keep, "cleanup finished");
        }
        Ok(removed)
    }

    /// 서버 디렉토리 아래의 모든 파티션 파일을 나열합니다.
    async fn partition_files(&self, server: &str) -> Result<Vec<PathBuf>, CollectorError> {
        let server_dir = self.root.join(server);
        let mut files = Vec::new();
        if tokio::fs::metadata(&server_dir).await.is_err() {
            return Ok(files);
        }

        let mut months = read_dir(&server_dir).await?;
        while let Some(month) = next_entry(&mut months, &server_dir).await? {
            if !month.path().is_dir() {
                continue;
            }
            let month_path = month.path();
            let mut days = read_dir(&month_path).await?;
            while let Some(day) = next_entry(&mut days, &month_path).await? {
                if !day.path().is_dir() {
                    continue;
                }
                let day_path = day.path();
                let mut entries = read_dir(&day_path).await?;
                while let Some(entry) = next_entry(&mut entries, &day_path).await? {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        files.push(path);
                    }
                }
            }
        }
        Ok(files)
    }

    /// 비어 있는 일/월 디렉토리를 제거합니다. 실패는 경고로만 남깁니다.
    async fn remove_empty_dirs(&self, server: &str) {
        let server_dir = self.root.join(server);
        let Ok(mut months) = tokio::fs::read_dir(&server_dir).await else {
            return;
        };

        while let Ok(Some(month)) = months.next_entry().await {
            let month_path = month.path();
            if !month_path.is_dir() {
                continue;
            }
            let Ok(mut days) = tokio::fs::read_dir(&month_path).await else {
                continue;
            };
            while let Ok(Some(day)) = days.next_entry().await {
                let day_path = day.path();
                if day_path.is_dir() {
                    // 비어 있지 않으면 실패하는 remove_dir에 의존
                    let _ = tokio::fs::remove_dir(&day_path).await;
                }
            }
            let _ = tokio::fs::remove_dir(&month_path).await;
        }
    }
}

/// 파티션 파일을 읽습니다. 없거나 손상된 파일은 빈 파티션으로 취급합니다.
async fn load_partition(path: &Path) -> Vec<LogEntry> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read partition, treating as empty");
            return Vec::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt partition, treating as empty");
            Vec::new()
        }
    }
}

/// 파티션 전체를 임시 파일에 쓴 뒤 rename으로 교체합니다.
async fn write_partition(path: &Path, entries: &[LogEntry]) -> Result<(), CollectorError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CollectorError::Storage {
                path: parent.display().to_string(),
                reason: format!("failed to create partition dir: {e}"),
            })?;
    }

    let json = serde_json::to_vec_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| CollectorError::Storage {
            path: tmp.display().to_string(),
            reason: format!("failed to write partition: {e}"),
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CollectorError::Storage {
            path: path.display().to_string(),
            reason: format!("failed to replace partition: {e}"),
        })
}

/// 파일 이름 stem에서 `YYYY-MM-DD` 토큰을 찾아 파싱합니다.
///
/// 접두어에 밑줄이 몇 개 들어 있든 동작합니다
/// (`hll_logs_2025-10-23_14`, `kills_2025-10-23_14` 둘 다 지원).
fn filename_date(path: &Path) -> Option<NaiveDate> {
    path.file_stem()?
        .to_str()?
        .split('_')
        .find_map(|token| NaiveDate::parse_from_str(token, "%Y-%m-%d").ok())
}

async fn read_dir(path: &Path) -> Result<tokio::fs::ReadDir, CollectorError> {
    tokio::fs::read_dir(path)
        .await
        .map_err(|e| CollectorError::Storage {
            path: path.display().to_string(),
            reason: format!("failed to read dir: {e}"),
        })
}

async fn next_entry(
    dir: &mut tokio::fs::ReadDir,
    parent: &Path,
) -> Result<Option<tokio::fs::DirEntry>, CollectorError> {
    dir.next_entry().await.map_err(|e| CollectorError::Storage {
        path: parent.display().to_string(),
        reason: format!("failed to iterate dir: {e}"),
    })
}
