//! 킬피드 파이프라인 오케스트레이션
//!
//! 킬피드 파일은 게임 로그와 달리 위치 추적이 어렵습니다 (서버가 파일을
//! 재작성하거나 순서를 바꾸는 경우가 있음). 그래서 증분 읽기 대신 서버별
//! 원본 줄 중복 제거 집합으로 이미 처리한 레코드를 걸러냅니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use deadwatch_core::error::DeadwatchError;
use deadwatch_core::event::{KillEvent, ServerEvent};
use deadwatch_core::metrics as metric_names;
use deadwatch_core::pipeline::{FileSource, HealthStatus, Pipeline, StateStore};
use deadwatch_core::types::{FeedKind, KillRecord, PvpStats, ServerEndpoint};

use crate::config::KillfeedPipelineConfig;
use crate::dedup::SeenLines;
use crate::error::KillfeedError;
use crate::parser::KillRecordParser;
use crate::stats::StatsBook;

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// worker가 공유하는 진행 카운터 (health check용)
#[derive(Debug, Default)]
struct WorkerStats {
    cycles: AtomicU64,
    records_parsed: AtomicU64,
    ingest_errors: AtomicU64,
    consecutive_errors: AtomicU64,
}

/// 수집 1회의 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillfeedReport {
    /// 새로 파싱된 레코드 수
    pub records_parsed: usize,
    /// 형식이 깨져 건너뛴 줄 수
    pub malformed_lines: usize,
    /// 중복으로 건너뛴 줄 수
    pub duplicates_skipped: usize,
    /// 자살 레코드 수
    pub suicides: usize,
    /// 소스에 파일이 없어 사이클을 건너뛴 경우
    pub skipped: bool,
}

/// 서버 1대의 킬피드를 담당하는 수집 단위
pub struct KillfeedWorker<F, S> {
    endpoint: ServerEndpoint,
    config: KillfeedPipelineConfig,
    parser: KillRecordParser,
    source: Arc<F>,
    store: Arc<S>,
    seen: SeenLines,
    stats_book: StatsBook,
    cycles_since_save: usize,
    event_tx: mpsc::Sender<ServerEvent>,
    stats: Arc<WorkerStats>,
}

impl<F, S> KillfeedWorker<F, S>
where
    F: FileSource,
    S: StateStore,
{
    fn new(
        endpoint: ServerEndpoint,
        config: KillfeedPipelineConfig,
        source: Arc<F>,
        store: Arc<S>,
        event_tx: mpsc::Sender<ServerEvent>,
        stats: Arc<WorkerStats>,
    ) -> Self {
        let parser = KillRecordParser::new(config.max_distance);
        let seen = SeenLines::new(config.dedup_capacity);
        Self {
            endpoint,
            config,
            parser,
            source,
            store,
            seen,
            stats_book: StatsBook::new(),
            cycles_since_save: 0,
            event_tx,
            stats,
        }
    }

    /// 저장소에서 통계 장부를 복원합니다. 실패는 경고로만 처리합니다.
    async fn restore_state(&mut self) {
        match self.store.load_stats(&self.endpoint.key).await {
            Ok(entries) if !entries.is_empty() => {
                tracing::info!(
                    server = %self.endpoint.key,
                    players = entries.len(),
                    "restored pvp stats from store"
                );
                self.stats_book = StatsBook::from_entries(entries);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(
                    server = %self.endpoint.key,
                    error = %err,
                    "failed to restore pvp stats, starting fresh"
                );
            }
        }
    }

    /// 수집 사이클 1회를 수행합니다.
    pub async fn ingest_once(&mut self) -> Result<KillfeedReport, KillfeedError> {
        let key = self.endpoint.key.clone();
        let trace_id = uuid::Uuid::new_v4().to_string();

        let content = self
            .source
            .fetch(&self.endpoint, FeedKind::Killfeed)
            .await
            .map_err(|err| {
                metrics::counter!(
                    metric_names::SOURCE_FETCHES_TOTAL,
                    metric_names::LABEL_SERVER => key.slug(),
                    metric_names::LABEL_MODULE => "killfeed",
                    metric_names::LABEL_RESULT => "error",
                )
                .increment(1);
                KillfeedError::Fetch {
                    server: key.to_string(),
                    reason: err.to_string(),
                }
            })?;
        metrics::counter!(
            metric_names::SOURCE_FETCHES_TOTAL,
            metric_names::LABEL_SERVER => key.slug(),
            metric_names::LABEL_MODULE => "killfeed",
            metric_names::LABEL_RESULT => "ok",
        )
        .increment(1);

        let Some(content) = content else {
            tracing::debug!(server = %key, "killfeed not present yet, skipping cycle");
            metrics::counter!(
                metric_names::SOURCE_CYCLES_SKIPPED_TOTAL,
                metric_names::LABEL_SERVER => key.slug(),
                metric_names::LABEL_MODULE => "killfeed",
            )
            .increment(1);
            return Ok(KillfeedReport {
                skipped: true,
                ..Default::default()
            });
        };

        let mut report = KillfeedReport::default();
        let mut new_records: Vec<KillRecord> = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.seen.contains(line) {
                report.duplicates_skipped += 1;
                continue;
            }

            match self.parser.parse_line(line) {
                Ok(record) => {
                    self.seen.insert(line);
                    if record.is_suicide {
                        report.suicides += 1;
                        metrics::counter!(
                            metric_names::KILLFEED_SUICIDES_TOTAL,
                            metric_names::LABEL_SERVER => key.slug(),
                        )
                        .increment(1);
                    }
                    self.stats_book.apply(&record);
                    new_records.push(record);
                    report.records_parsed += 1;
                }
                Err(err) => {
                    // 깨진 줄도 중복 집합에 넣어 매 사이클 재경고를 막음
                    self.seen.insert(line);
                    report.malformed_lines += 1;
                    metrics::counter!(
                        metric_names::KILLFEED_MALFORMED_LINES_TOTAL,
                        metric_names::LABEL_SERVER => key.slug(),
                    )
                    .increment(1);
                    tracing::warn!(server = %key, error = %err, "skipping malformed killfeed line");
                }
            }
        }

        if report.duplicates_skipped > 0 {
            metrics::counter!(
                metric_names::KILLFEED_DUPLICATES_SKIPPED_TOTAL,
                metric_names::LABEL_SERVER => key.slug(),
            )
            .increment(report.duplicates_skipped as u64);
        }

        for record in &new_records {
            self.event_tx
                .send(ServerEvent::Kill(KillEvent::new(
                    key.clone(),
                    record.clone(),
                    trace_id.clone(),
                )))
                .await
                .map_err(|err| KillfeedError::Channel(err.to_string()))?;
        }

        if !new_records.is_empty() {
            metrics::counter!(
                metric_names::KILLFEED_RECORDS_PARSED_TOTAL,
                metric_names::LABEL_SERVER => key.slug(),
            )
            .increment(new_records.len() as u64);
            if let Err(err) = self.store.append_kills(&key, &new_records).await {
                tracing::warn!(server = %key, error = %err, "failed to append kill records");
            }
        }

        self.cycles_since_save += 1;
        if self.cycles_since_save >= self.config.stats_save_interval && !new_records.is_empty() {
            self.cycles_since_save = 0;
            if let Err(err) = self
                .store
                .save_stats(&key, &self.stats_book.to_entries())
                .await
            {
                // 저장 실패는 치명적이지 않음, 메모리 장부가 우선
                tracing::warn!(server = %key, error = %err, "failed to persist pvp stats");
            }
        }

        self.stats
            .records_parsed
            .fetch_add(report.records_parsed as u64, Ordering::Relaxed);

        tracing::debug!(
            server = %key,
            parsed = report.records_parsed,
            malformed = report.malformed_lines,
            duplicates = report.duplicates_skipped,
            "killfeed cycle complete"
        );
        Ok(report)
    }

    /// 현재 플레이어별 통계 스냅샷을 반환합니다.
    pub fn stats(&self) -> Vec<(String, PvpStats)> {
        self.stats_book.to_entries()
    }

    /// worker 메인 루프. 취소 토큰이 내려올 때까지 주기적으로 수집합니다.
    async fn run(mut self, cancel: CancellationToken) {
        self.restore_state().await;
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.config.poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(server = %self.endpoint.key, "killfeed worker shutting down");
                    return;
                }
                _ = interval.tick() => {
                    self.stats.cycles.fetch_add(1, Ordering::Relaxed);
                    match self.ingest_once().await {
                        Ok(_) => {
                            self.stats.consecutive_errors.store(0, Ordering::Relaxed);
                        }
                        Err(err) => {
                            self.stats.ingest_errors.fetch_add(1, Ordering::Relaxed);
                            self.stats.consecutive_errors.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(
                                server = %self.endpoint.key,
                                error = %err,
                                "killfeed cycle failed"
                            );
                        }
                    }
                }
            }
        }
    }
}

/// 킬피드 파이프라인
///
/// core의 `Pipeline` trait을 구현하여 `deadwatch-daemon`에서 로그 파이프라인과
/// 동일한 생명주기로 관리됩니다.
pub struct KillfeedPipeline<F, S> {
    config: KillfeedPipelineConfig,
    state: PipelineState,
    servers: Vec<ServerEndpoint>,
    source: Arc<F>,
    store: Arc<S>,
    event_tx: mpsc::Sender<ServerEvent>,
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    worker_stats: Vec<(String, Arc<WorkerStats>)>,
}

impl<F, S> KillfeedPipeline<F, S>
where
    F: FileSource + 'static,
    S: StateStore + 'static,
{
    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 단일 서버에 대한 worker를 만듭니다.
    ///
    /// 파이프라인을 기동하지 않고 수집 사이클을 직접 구동할 때 사용합니다
    /// (run-once 경로, 통합 테스트).
    pub fn worker_for(&self, endpoint: &ServerEndpoint) -> KillfeedWorker<F, S> {
        KillfeedWorker::new(
            endpoint.clone(),
            self.config.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            self.event_tx.clone(),
            Arc::new(WorkerStats::default()),
        )
    }
}

impl<F, S> Pipeline for KillfeedPipeline<F, S>
where
    F: FileSource + 'static,
    S: StateStore + 'static,
{
    fn name(&self) -> &str {
        "killfeed"
    }

    async fn start(&mut self) -> Result<(), DeadwatchError> {
        if self.state == PipelineState::Running {
            return Err(deadwatch_core::error::PipelineError::AlreadyRunning.into());
        }

        tracing::info!(servers = self.servers.len(), "starting killfeed pipeline");

        self.cancel = CancellationToken::new();
        self.worker_stats.clear();
        for endpoint in &self.servers {
            let stats = Arc::new(WorkerStats::default());
            self.worker_stats
                .push((endpoint.key.slug(), Arc::clone(&stats)));
            let worker = KillfeedWorker::new(
                endpoint.clone(),
                self.config.clone(),
                Arc::clone(&self.source),
                Arc::clone(&self.store),
                self.event_tx.clone(),
                stats,
            );
            let cancel = self.cancel.clone();
            self.tasks.push(tokio::spawn(worker.run(cancel)));
        }

        self.state = PipelineState::Running;
        tracing::info!("killfeed pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DeadwatchError> {
        if self.state != PipelineState::Running {
            return Err(deadwatch_core::error::PipelineError::NotRunning.into());
        }

        tracing::info!("stopping killfeed pipeline");
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    tracing::warn!(error = %err, "killfeed worker ended abnormally");
                }
            }
        }
        for (server, stats) in &self.worker_stats {
            tracing::info!(
                server = %server,
                cycles = stats.cycles.load(Ordering::Relaxed),
                records = stats.records_parsed.load(Ordering::Relaxed),
                errors = stats.ingest_errors.load(Ordering::Relaxed),
                "killfeed worker summary"
            );
        }

        self.state = PipelineState::Stopped;
        tracing::info!("killfeed pipeline stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                let failing: Vec<String> = self
                    .worker_stats
                    .iter()
                    .filter(|(_, stats)| stats.consecutive_errors.load(Ordering::Relaxed) >= 3)
                    .map(|(server, _)| server.clone())
                    .collect();
                if failing.is_empty() {
                    HealthStatus::Healthy
                } else if failing.len() < self.worker_stats.len() {
                    HealthStatus::Degraded(format!(
                        "killfeed failing for servers: {}",
                        failing.join(", ")
                    ))
                } else {
                    HealthStatus::Unhealthy("killfeed failing for all servers".to_owned())
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 킬피드 파이프라인 빌더
pub struct KillfeedPipelineBuilder<F, S> {
    config: KillfeedPipelineConfig,
    servers: Vec<ServerEndpoint>,
    source: Arc<F>,
    store: Arc<S>,
    event_tx: Option<mpsc::Sender<ServerEvent>>,
}

impl<F, S> KillfeedPipelineBuilder<F, S>
where
    F: FileSource + 'static,
    S: StateStore + 'static,
{
    /// 새 빌더를 생성합니다.
    pub fn new(source: F, store: S) -> Self {
        Self {
            config: KillfeedPipelineConfig::default(),
            servers: Vec::new(),
            source: Arc::new(source),
            store: Arc::new(store),
            event_tx: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: KillfeedPipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 수집 대상 서버 목록을 지정합니다.
    pub fn servers(mut self, servers: Vec<ServerEndpoint>) -> Self {
        self.servers = servers;
        self
    }

    /// 외부 이벤트 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다. 로그 파이프라인과
    /// 같은 채널을 공유할 때 사용합니다.
    pub fn event_sender(mut self, tx: mpsc::Sender<ServerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `KillfeedPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<ServerEvent>>`: 이벤트 수신 채널
    ///   (외부 event_sender를 설정한 경우 None)
    #[allow(clippy::type_complexity)]
    pub fn build(
        self,
    ) -> Result<(KillfeedPipeline<F, S>, Option<mpsc::Receiver<ServerEvent>>), KillfeedError> {
        self.config.validate()?;

        let (event_tx, event_rx) = if let Some(tx) = self.event_tx {
            (tx, None)
        } else {
            let (tx, rx) = mpsc::channel(self.config.event_channel_capacity);
            (tx, Some(rx))
        };

        let pipeline = KillfeedPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            servers: self.servers,
            source: self.source,
            store: self.store,
            event_tx,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            worker_stats: Vec::new(),
        };

        Ok((pipeline, event_rx))
    }
}
