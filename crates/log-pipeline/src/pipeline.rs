//! 파이프라인 오케스트레이션 -- 수집/분류/상태 전이/집계의 전체 흐름을 관리합니다.
//!
//! [`LogIngestPipeline`]은 core의 [`Pipeline`](deadwatch_core::pipeline::Pipeline)
//! trait을 구현하여 `deadwatch-daemon`에서 다른 모듈과 동일한 생명주기로
//! 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! FileSource -> FileTracker(plan) -> PatternSet -> ConnectionTracker -> counters
//!            -> mpsc(ServerEvent) -> downstream
//! ```
//! 서버마다 독립된 worker 태스크가 하나씩 돌며, 한 서버의 수집 실패는
//! 다른 서버에 영향을 주지 않습니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use deadwatch_core::error::DeadwatchError;
use deadwatch_core::event::{
    ConnectionEvent, ConnectionKind, PresenceEvent, ServerEvent, WorldEvent,
};
use deadwatch_core::metrics as metric_names;
use deadwatch_core::pipeline::{FileSource, HealthStatus, Pipeline, StateStore};
use deadwatch_core::types::{FeedKind, ServerCounts, ServerEndpoint};

use crate::config::IngestConfig;
use crate::connection::{ConnectionNotice, ConnectionTracker, Outcome, SuppressionPolicy};
use crate::counters;
use crate::dispatch;
use crate::error::LogPipelineError;
use crate::patterns::{LogEvent, PatternSet};
use crate::tracker::{FileTracker, ReadPlan};

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
    lines_processed: AtomicU64,
    ingest_errors: AtomicU64,
    consecutive_errors: AtomicU64,
}

/// 수집 1회의 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// 이번에 처리한 신규 라인 수
    pub new_lines: usize,
    /// 분류된 이벤트 수
    pub events_classified: usize,
    /// 채널로 전달한 이벤트 수 (presence 포함)
    pub events_emitted: usize,
    /// 파일 리셋 여부
    pub reset: bool,
    /// 콜드 스타트 여부 (알림 억제)
    pub cold_start: bool,
    /// 소스에 파일이 없어 사이클을 건너뛴 경우
    pub skipped: bool,
}

/// 서버 1대를 담당하는 수집 단위
///
/// 파일 상태 추적기와 접속 상태 머신을 소유하며, [`ServerWorker::ingest_once`]가
/// 수집 사이클 1회를 수행합니다.
pub struct ServerWorker<F, S> {
    endpoint: ServerEndpoint,
    config: IngestConfig,
    patterns: Arc<PatternSet>,
    source: Arc<F>,
    store: Arc<S>,
    tracker: FileTracker,
    connections: ConnectionTracker,
    max_players: u32,
    commits_since_save: usize,
    event_tx: mpsc::Sender<ServerEvent>,
    stats: Arc<WorkerStats>,
}

impl<F, S> ServerWorker<F, S>
where
    F: FileSource,
    S: StateStore,
{
    fn new(
        endpoint: ServerEndpoint,
        config: IngestConfig,
        patterns: Arc<PatternSet>,
        source: Arc<F>,
        store: Arc<S>,
        event_tx: mpsc::Sender<ServerEvent>,
        stats: Arc<WorkerStats>,
    ) -> Self {
        let policy = SuppressionPolicy::new(config.suppression_window_secs);
        let connections = ConnectionTracker::new(policy, config.track_beacon);
        let tracker = FileTracker::new(config.reset_tail_lines);
        Self {
            endpoint,
            config,
            patterns,
            source,
            store,
            tracker,
            connections,
            max_players: ServerCounts::DEFAULT_MAX_PLAYERS,
            commits_since_save: 0,
            event_tx,
            stats,
        }
    }

    /// 저장소에서 이전 파일 상태를 복원합니다. 실패는 경고로만 처리합니다.
    async fn restore_state(&mut self) {
        match self
            .store
            .load_ingest_state(&self.endpoint.key, FeedKind::GameLog)
            .await
        {
            Ok(Some(state)) => {
                tracing::info!(
                    server = %self.endpoint.key,
                    line_count = state.line_count,
                    "restored ingest state from store"
                );
                self.tracker
                    .seed(self.endpoint.key.clone(), FeedKind::GameLog, state);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    server = %self.endpoint.key,
                    error = %err,
                    "failed to restore ingest state, starting fresh"
                );
            }
        }
    }

    /// 수집 사이클 1회를 수행합니다.
    ///
    /// 회전 검사 -> 읽기 구간 선택 -> 콜드/핫 모드 결정 -> 라인별 분류 ->
    /// 이벤트 배치 전달 -> 상태 커밋 (사이클당 정확히 한 번) 순서입니다.
    pub async fn ingest_once(&mut self) -> Result<IngestReport, LogPipelineError> {
        let started = Instant::now();
        let key = self.endpoint.key.clone();
        let trace_id = uuid::Uuid::new_v4().to_string();

        let content = self
            .source
            .fetch(&self.endpoint, FeedKind::GameLog)
            .await
            .map_err(|err| {
                metrics::counter!(
                    metric_names::SOURCE_FETCHES_TOTAL,
                    metric_names::LABEL_SERVER => key.slug(),
                    metric_names::LABEL_MODULE => "log-pipeline",
                    metric_names::LABEL_RESULT => "error",
                )
                .increment(1);
                LogPipelineError::Fetch {
                    server: key.to_string(),
                    reason: err.to_string(),
                }
            })?;
        metrics::counter!(
            metric_names::SOURCE_FETCHES_TOTAL,
            metric_names::LABEL_SERVER => key.slug(),
            metric_names::LABEL_MODULE => "log-pipeline",
            metric_names::LABEL_RESULT => "ok",
        )
        .increment(1);

        let Some(content) = content else {
            tracing::debug!(server = %key, "game log not present yet, skipping cycle");
            metrics::counter!(
                metric_names::SOURCE_CYCLES_SKIPPED_TOTAL,
                metric_names::LABEL_SERVER => key.slug(),
                metric_names::LABEL_MODULE => "log-pipeline",
            )
            .increment(1);
            return Ok(IngestReport {
                skipped: true,
                ..Default::default()
            });
        };

        let file_size = content.len() as u64;
        let lines: Vec<&str> = content.lines().collect();

        let had_prior_state = self.tracker.state(&key, FeedKind::GameLog).is_some();
        let plan = self.tracker.plan(&key, FeedKind::GameLog, file_size, &lines);
        let from_line = match plan {
            ReadPlan::Reset => {
                if had_prior_state {
                    tracing::warn!(
                        server = %key,
                        file_size,
                        total_lines = lines.len(),
                        "log file rotation detected, resetting player state"
                    );
                    metrics::counter!(
                        metric_names::LOG_PIPELINE_FILE_RESETS_TOTAL,
                        metric_names::LABEL_SERVER => key.slug(),
                    )
                    .increment(1);
                }
                self.connections.reset();
                0
            }
            ReadPlan::Continue { from_line } => from_line,
        };

        let new_lines = &lines[from_line..];
        let cold_start = new_lines.len() > self.config.cold_start_lines;
        if cold_start {
            tracing::info!(
                server = %key,
                new_lines = new_lines.len(),
                threshold = self.config.cold_start_lines,
                "cold start: processing silently without notifications"
            );
        }

        let mut report = IngestReport {
            new_lines: new_lines.len(),
            reset: plan == ReadPlan::Reset,
            cold_start,
            ..Default::default()
        };

        let now = Utc::now();
        for batch in new_lines.chunks(self.config.batch_size.max(1)) {
            for line in batch {
                let Some(event) = self.patterns.classify(line) else {
                    continue;
                };
                report.events_classified += 1;
                metrics::counter!(
                    metric_names::LOG_PIPELINE_EVENTS_CLASSIFIED_TOTAL,
                    metric_names::LABEL_SERVER => key.slug(),
                    metric_names::LABEL_EVENT_KIND => event.kind_name(),
                )
                .increment(1);
                self.handle_event(&event, now, cold_start, &trace_id, &mut report)
                    .await?;
            }
        }

        // 오래 방치된 Disconnected 항목 정리
        let swept = self.connections.sweep_stale(
            now,
            ChronoDuration::hours(self.config.stale_disconnect_hours as i64),
        );
        if swept > 0 {
            tracing::info!(server = %key, swept, "removed stale disconnected players");
        }

        // 집계는 전체 스캔으로 항상 다시 계산하여 전달 (콜드 스타트 포함)
        let counts = counters::recompute(&self.connections, self.max_players);
        metrics::gauge!(
            metric_names::LOG_PIPELINE_PLAYERS_ONLINE,
            metric_names::LABEL_SERVER => key.slug(),
        )
        .set(counts.player_count as f64);
        metrics::gauge!(
            metric_names::LOG_PIPELINE_PLAYERS_QUEUED,
            metric_names::LABEL_SERVER => key.slug(),
        )
        .set(counts.queue_count as f64);
        self.emit(
            ServerEvent::Presence(PresenceEvent::new(
                key.clone(),
                self.endpoint.name.clone(),
                counts,
                trace_id.clone(),
            )),
            &mut report,
        )
        .await?;

        // 상태 커밋은 사이클당 정확히 한 번
        let last_line = lines.last().map(|l| (*l).to_owned()).unwrap_or_default();
        let committed = self.tracker.commit(
            key.clone(),
            FeedKind::GameLog,
            file_size,
            lines.len(),
            last_line,
        );
        self.commits_since_save += 1;
        if self.commits_since_save >= self.config.state_save_interval {
            self.commits_since_save = 0;
            if let Err(err) = self
                .store
                .save_ingest_state(&key, FeedKind::GameLog, &committed)
                .await
            {
                // 저장 실패는 치명적이지 않음, 메모리 상태가 우선
                tracing::warn!(server = %key, error = %err, "failed to persist ingest state");
            }
        }

        metrics::counter!(
            metric_names::LOG_PIPELINE_LINES_PROCESSED_TOTAL,
            metric_names::LABEL_SERVER => key.slug(),
        )
        .increment(report.new_lines as u64);
        metrics::histogram!(
            metric_names::LOG_PIPELINE_INGEST_DURATION_SECONDS,
            metric_names::LABEL_SERVER => key.slug(),
        )
        .record(started.elapsed().as_secs_f64());

        self.stats
            .lines_processed
            .fetch_add(report.new_lines as u64, Ordering::Relaxed);

        tracing::debug!(
            server = %key,
            new_lines = report.new_lines,
            classified = report.events_classified,
            emitted = report.events_emitted,
            reset = report.reset,
            cold = report.cold_start,
            "ingest cycle complete"
        );
        Ok(report)
    }

    /// 분류된 이벤트 하나를 상태 머신과 전달 규칙에 적용합니다.
    async fn handle_event(
        &mut self,
        event: &LogEvent,
        now: chrono::DateTime<Utc>,
        cold_start: bool,
        trace_id: &str,
        report: &mut IngestReport,
    ) -> Result<(), LogPipelineError> {
        let key = &self.endpoint.key;

        // 서버 설정 라인은 집계 상한만 갱신
        if let LogEvent::MaxPlayerCount { count } = event {
            if *count != self.max_players {
                tracing::info!(server = %key, max_players = count, "observed server player cap");
                self.max_players = *count;
            }
            return Ok(());
        }

        // 접속 수명주기
        match self.connections.apply(event, now) {
            Outcome::Applied { notice, .. } => {
                metrics::counter!(
                    metric_names::LOG_PIPELINE_TRANSITIONS_APPLIED_TOTAL,
                    metric_names::LABEL_SERVER => key.slug(),
                    metric_names::LABEL_EVENT_KIND => event.kind_name(),
                )
                .increment(1);
                if let Some(notice) = notice {
                    if !cold_start {
                        let (player_id, name, kind) = match notice {
                            ConnectionNotice::Joined { player_id, name } => {
                                (player_id, name, ConnectionKind::Joined)
                            }
                            ConnectionNotice::Left { player_id, name } => {
                                (player_id, name, ConnectionKind::Left)
                            }
                        };
                        self.emit(
                            ServerEvent::Connection(ConnectionEvent::new(
                                key.clone(),
                                player_id,
                                name,
                                kind,
                                trace_id.to_owned(),
                            )),
                            report,
                        )
                        .await?;
                    }
                }
                return Ok(());
            }
            Outcome::Suppressed => {
                metrics::counter!(
                    metric_names::LOG_PIPELINE_DUPLICATES_SUPPRESSED_TOTAL,
                    metric_names::LABEL_SERVER => key.slug(),
                )
                .increment(1);
                return Ok(());
            }
            Outcome::Rejected { .. } => {
                metrics::counter!(
                    metric_names::LOG_PIPELINE_TRANSITIONS_REJECTED_TOTAL,
                    metric_names::LABEL_SERVER => key.slug(),
                    metric_names::LABEL_EVENT_KIND => event.kind_name(),
                )
                .increment(1);
                return Ok(());
            }
            Outcome::Ignored => {}
        }

        // 월드 이벤트
        if !cold_start && dispatch::is_user_visible(event) {
            if let Some((kind, name, coords)) = dispatch::world_event_payload(event) {
                self.emit(
                    ServerEvent::World(WorldEvent::new(
                        key.clone(),
                        kind,
                        name,
                        coords,
                        trace_id.to_owned(),
                    )),
                    report,
                )
                .await?;
            }
        }
        Ok(())
    }

    /// 현재 집계 스냅샷을 반환합니다.
    pub fn counts(&self) -> ServerCounts {
        counters::recompute(&self.connections, self.max_players)
    }

    async fn emit(
        &self,
        event: ServerEvent,
        report: &mut IngestReport,
    ) -> Result<(), LogPipelineError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|err| LogPipelineError::Channel(err.to_string()))?;
        report.events_emitted += 1;
        Ok(())
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
                    tracing::info!(server = %self.endpoint.key, "worker shutting down");
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
                                "ingest cycle failed"
                            );
                        }
                    }
                }
            }
        }
    }
}

/// 로그 수집 파이프라인
///
/// core의 `Pipeline` trait을 구현하여 `deadwatch-daemon`에서
/// 다른 모듈과 동일한 생명주기(start/stop/health_check)로 관리됩니다.
///
/// # 사용 예시
/// ```ignore
/// use deadwatch_log_pipeline::LogIngestPipelineBuilder;
///
/// let (mut pipeline, event_rx) = LogIngestPipelineBuilder::new(source, store)
///     .config(config)
///     .servers(endpoints)
///     .build()?;
///
/// pipeline.start().await?;
/// ```
pub struct LogIngestPipeline<F, S> {
    config: IngestConfig,
    state: PipelineState,
    servers: Vec<ServerEndpoint>,
    patterns: Arc<PatternSet>,
    source: Arc<F>,
    store: Arc<S>,
    event_tx: mpsc::Sender<ServerEvent>,
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    worker_stats: Vec<(String, Arc<WorkerStats>)>,
}

impl<F, S> LogIngestPipeline<F, S>
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

    /// 추적 중인 서버 수를 반환합니다.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// 단일 서버에 대한 worker를 만듭니다.
    ///
    /// 파이프라인을 기동하지 않고 수집 사이클을 직접 구동할 때 사용합니다
    /// (run-once 경로, 통합 테스트).
    pub fn worker_for(&self, endpoint: &ServerEndpoint) -> ServerWorker<F, S> {
        ServerWorker::new(
            endpoint.clone(),
            self.config.clone(),
            Arc::clone(&self.patterns),
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            self.event_tx.clone(),
            Arc::new(WorkerStats::default()),
        )
    }
}

impl<F, S> Pipeline for LogIngestPipeline<F, S>
where
    F: FileSource + 'static,
    S: StateStore + 'static,
{
    fn name(&self) -> &str {
        "log-pipeline"
    }

    async fn start(&mut self) -> Result<(), DeadwatchError> {
        if self.state == PipelineState::Running {
            return Err(deadwatch_core::error::PipelineError::AlreadyRunning.into());
        }

        tracing::info!(servers = self.servers.len(), "starting log pipeline");

        self.cancel = CancellationToken::new();
        self.worker_stats.clear();
        for endpoint in &self.servers {
            let stats = Arc::new(WorkerStats::default());
            self.worker_stats
                .push((endpoint.key.slug(), Arc::clone(&stats)));
            let worker = ServerWorker::new(
                endpoint.clone(),
                self.config.clone(),
                Arc::clone(&self.patterns),
                Arc::clone(&self.source),
                Arc::clone(&self.store),
                self.event_tx.clone(),
                stats,
            );
            let cancel = self.cancel.clone();
            self.tasks.push(tokio::spawn(worker.run(cancel)));
        }

        self.state = PipelineState::Running;
        tracing::info!("log pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DeadwatchError> {
        if self.state != PipelineState::Running {
            return Err(deadwatch_core::error::PipelineError::NotRunning.into());
        }

        tracing::info!("stopping log pipeline");
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    tracing::warn!(error = %err, "worker task ended abnormally");
                }
            }
        }
        for (server, stats) in &self.worker_stats {
            tracing::info!(
                server = %server,
                cycles = stats.cycles.load(Ordering::Relaxed),
                lines = stats.lines_processed.load(Ordering::Relaxed),
                errors = stats.ingest_errors.load(Ordering::Relaxed),
                "worker summary"
            );
        }

        self.state = PipelineState::Stopped;
        tracing::info!("log pipeline stopped");
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
                        "ingest failing for servers: {}",
                        failing.join(", ")
                    ))
                } else {
                    HealthStatus::Unhealthy("ingest failing for all servers".to_owned())
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 로그 수집 파이프라인 빌더
pub struct LogIngestPipelineBuilder<F, S> {
    config: IngestConfig,
    servers: Vec<ServerEndpoint>,
    source: Arc<F>,
    store: Arc<S>,
    event_tx: Option<mpsc::Sender<ServerEvent>>,
}

impl<F, S> LogIngestPipelineBuilder<F, S>
where
    F: FileSource + 'static,
    S: StateStore + 'static,
{
    /// 새 빌더를 생성합니다.
    pub fn new(source: F, store: S) -> Self {
        Self {
            config: IngestConfig::default(),
            servers: Vec::new(),
            source: Arc::new(source),
            store: Arc::new(store),
            event_tx: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: IngestConfig) -> Self {
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
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다. 킬피드 파이프라인과
    /// 같은 채널을 공유할 때 사용합니다.
    pub fn event_sender(mut self, tx: mpsc::Sender<ServerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `LogIngestPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<ServerEvent>>`: 이벤트 수신 채널
    ///   (외부 event_sender를 설정한 경우 None)
    #[allow(clippy::type_complexity)]
    pub fn build(
        self,
    ) -> Result<(LogIngestPipeline<F, S>, Option<mpsc::Receiver<ServerEvent>>), LogPipelineError>
    {
        self.config.validate()?;
        let patterns = Arc::new(PatternSet::new()?);

        let (event_tx, event_rx) = if let Some(tx) = self.event_tx {
            (tx, None)
        } else {
            let (tx, rx) = mpsc::channel(self.config.event_channel_capacity);
            (tx, Some(rx))
        };

        let pipeline = LogIngestPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            servers: self.servers,
            patterns,
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

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use deadwatch_core::types::{FileIngestState, KillRecord, PvpStats, ServerKey};

    use super::*;

    /// 교체 가능한 고정 문자열을 돌려주는 테스트용 소스
    struct FixedSource {
        content: Mutex<Option<String>>,
    }

    impl FixedSource {
        fn new(content: impl Into<String>) -> Self {
            Self {
                content: Mutex::new(Some(content.into())),
            }
        }

        fn absent() -> Self {
            Self {
                content: Mutex::new(None),
            }
        }

        fn set(&self, content: impl Into<String>) {
            *self.content.lock().unwrap() = Some(content.into());
        }
    }

    impl FileSource for FixedSource {
        async fn fetch(
            &self,
            _endpoint: &ServerEndpoint,
            _kind: FeedKind,
        ) -> Result<Option<String>, DeadwatchError> {
            Ok(self.content.lock().unwrap().clone())
        }
    }

    /// 인메모리 상태 저장소
    #[derive(Default)]
    struct MemoryStore {
        ingest: Mutex<HashMap<(ServerKey, FeedKind), FileIngestState>>,
    }

    impl StateStore for MemoryStore {
        async fn load_ingest_state(
            &self,
            key: &ServerKey,
            kind: FeedKind,
        ) -> Result<Option<FileIngestState>, DeadwatchError> {
            Ok(self
                .ingest
                .lock()
                .unwrap()
                .get(&(key.clone(), kind))
                .cloned())
        }

        async fn save_ingest_state(
            &self,
            key: &ServerKey,
            kind: FeedKind,
            state: &FileIngestState,
        ) -> Result<(), DeadwatchError> {
            self.ingest
                .lock()
                .unwrap()
                .insert((key.clone(), kind), state.clone());
            Ok(())
        }

        async fn load_stats(
            &self,
            _key: &ServerKey,
        ) -> Result<Vec<(String, PvpStats)>, DeadwatchError> {
            Ok(Vec::new())
        }

        async fn save_stats(
            &self,
            _key: &ServerKey,
            _stats: &[(String, PvpStats)],
        ) -> Result<(), DeadwatchError> {
            Ok(())
        }

        async fn append_kills(
            &self,
            _key: &ServerKey,
            _records: &[KillRecord],
        ) -> Result<(), DeadwatchError> {
            Ok(())
        }
    }

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint {
            key: ServerKey::new(7, "test-server"),
            name: "Test Server".to_owned(),
            log_path: "/logs/Deadside.log".to_owned(),
            killfeed_path: "/logs/killfeed".to_owned(),
        }
    }

    fn build_pipeline(
        source: FixedSource,
    ) -> (
        LogIngestPipeline<FixedSource, MemoryStore>,
        mpsc::Receiver<ServerEvent>,
    ) {
        let (pipeline, rx) = LogIngestPipelineBuilder::new(source, MemoryStore::default())
            .servers(vec![endpoint()])
            .build()
            .unwrap();
        (pipeline, rx.unwrap())
    }

    fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn builder_creates_pipeline() {
        let (pipeline, _rx) = build_pipeline(FixedSource::absent());
        assert_eq!(pipeline.state_name(), "initialized");
        assert_eq!(pipeline.server_count(), 1);
    }

    #[test]
    fn builder_with_external_event_sender_returns_no_receiver() {
        let (tx, _rx) = mpsc::channel(16);
        let (_pipeline, rx) =
            LogIngestPipelineBuilder::new(FixedSource::absent(), MemoryStore::default())
                .event_sender(tx)
                .build()
                .unwrap();
        assert!(rx.is_none());
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = IngestConfig {
            batch_size: 0,
            ..IngestConfig::default()
        };
        let result = LogIngestPipelineBuilder::new(FixedSource::absent(), MemoryStore::default())
            .config(config)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn pipeline_lifecycle() {
        use deadwatch_core::error::PipelineError;

        let (mut pipeline, _rx) = build_pipeline(FixedSource::absent());

        assert!(!pipeline.health_check().await.is_healthy());
        // 기동 전 중지는 NotRunning
        assert!(matches!(
            pipeline.stop().await,
            Err(DeadwatchError::Pipeline(PipelineError::NotRunning))
        ));

        pipeline.start().await.unwrap();
        assert_eq!(pipeline.state_name(), "running");
        assert!(pipeline.health_check().await.is_healthy());
        // 실행 중 재기동은 AlreadyRunning
        assert!(matches!(
            pipeline.start().await,
            Err(DeadwatchError::Pipeline(PipelineError::AlreadyRunning))
        ));

        pipeline.stop().await.unwrap();
        assert_eq!(pipeline.state_name(), "stopped");
        assert!(!pipeline.health_check().await.is_healthy());
        // 중지 후 재중지도 NotRunning
        assert!(matches!(
            pipeline.stop().await,
            Err(DeadwatchError::Pipeline(PipelineError::NotRunning))
        ));
    }

    #[tokio::test]
    async fn absent_file_skips_cycle() {
        let (pipeline, mut rx) = build_pipeline(FixedSource::absent());
        let mut worker = pipeline.worker_for(&endpoint());
        let report = worker.ingest_once().await.unwrap();
        assert!(report.skipped);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn join_without_resolvable_name_emits_presence_only() {
        let content = "LogOnline: Warning: Player |aa11 successfully registered!\n";
        let (pipeline, mut rx) = build_pipeline(FixedSource::new(content));
        let mut worker = pipeline.worker_for(&endpoint());

        let report = worker.ingest_once().await.unwrap();
        assert_eq!(report.new_lines, 1);
        assert_eq!(report.events_classified, 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::Presence(p) => assert_eq!(p.counts.player_count, 1),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn named_join_emits_connection_notice() {
        let content = "LogNet: Join request: /Game/Maps/world_0/World_0?Name=Bob&eosid=|aa11\n\
                       LogOnline: Warning: Player |aa11 successfully registered!\n";
        let (pipeline, mut rx) = build_pipeline(FixedSource::new(content));
        let mut worker = pipeline.worker_for(&endpoint());
        worker.ingest_once().await.unwrap();

        let events = drain(&mut rx);
        let joins: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ServerEvent::Connection(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].player_name, "Bob");
        assert_eq!(joins[0].kind, ConnectionKind::Joined);

        let counts = worker.counts();
        assert_eq!(counts.player_count, 1);
        assert_eq!(counts.queue_count, 0);
    }

    #[tokio::test]
    async fn repeat_ingest_of_same_file_does_not_double_count() {
        let content = "LogNet: Join request: /Game/Maps/world_0/World_0?Name=Bob&eosid=|aa11\n\
                       LogOnline: Warning: Player |aa11 successfully registered!\n";
        let (pipeline, mut rx) = build_pipeline(FixedSource::new(content));
        let mut worker = pipeline.worker_for(&endpoint());

        let first = worker.ingest_once().await.unwrap();
        assert_eq!(first.new_lines, 2);
        drain(&mut rx);

        let second = worker.ingest_once().await.unwrap();
        assert_eq!(second.new_lines, 0);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::Presence(p) => {
                assert_eq!(p.counts.player_count, 1);
                assert_eq!(p.counts.queue_count, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rotation_resets_player_state() {
        let mut big = String::new();
        for i in 0..20 {
            big.push_str(&format!(
                "LogOnline: Warning: Player |aa{i:02} successfully registered!\n"
            ));
        }
        for _ in 0..200 {
            big.push_str("LogTemp: filler line that matches nothing interesting\n");
        }

        let (pipeline, mut rx) = build_pipeline(FixedSource::new(big));
        let mut worker = pipeline.worker_for(&endpoint());
        worker.ingest_once().await.unwrap();
        drain(&mut rx);

        // 파일이 훨씬 작은 내용으로 교체됨
        worker.source.set("LogTemp: fresh file after rotation\n");
        let report = worker.ingest_once().await.unwrap();
        assert!(report.reset);

        let events = drain(&mut rx);
        match events.last() {
            Some(ServerEvent::Presence(p)) => {
                assert_eq!(p.counts.player_count, 0);
                assert_eq!(p.counts.queue_count, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cold_start_suppresses_notifications_but_updates_counts() {
        let mut content = String::new();
        for _ in 0..1100 {
            content.push_str("LogTemp: filler\n");
        }
        content
            .push_str("LogNet: Join request: /Game/Maps/world_0/World_0?Name=Bob&eosid=|aa11\n");
        content.push_str("LogOnline: Warning: Player |aa11 successfully registered!\n");

        let (pipeline, mut rx) = build_pipeline(FixedSource::new(content));
        let mut worker = pipeline.worker_for(&endpoint());
        let report = worker.ingest_once().await.unwrap();
        assert!(report.cold_start);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::Presence(p) => assert_eq!(p.counts.player_count, 1),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn max_player_count_flows_into_presence() {
        let content = "LogSFPS: session opts playersmaxcount=60\n";
        let (pipeline, mut rx) = build_pipeline(FixedSource::new(content));
        let mut worker = pipeline.worker_for(&endpoint());
        worker.ingest_once().await.unwrap();
        let events = drain(&mut rx);
        match &events[0] {
            ServerEvent::Presence(p) => assert_eq!(p.counts.max_players, 60),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn only_ready_missions_emit_world_events() {
        let content = "LogSFPS: Mission GA_Military_03_Mis_01 switched to READY\n\
                       LogSFPS: Mission GA_Sawmill_02_Mis_1 switched to WAITING\n";
        let (pipeline, mut rx) = build_pipeline(FixedSource::new(content));
        let mut worker = pipeline.worker_for(&endpoint());
        worker.ingest_once().await.unwrap();

        let events = drain(&mut rx);
        let world: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ServerEvent::World(w) => Some(w),
                _ => None,
            })
            .collect();
        assert_eq!(world.len(), 1);
        assert_eq!(world[0].name, "Military Base Alpha");
    }

    #[tokio::test]
    async fn ingest_state_is_persisted_on_save_interval() {
        let config = IngestConfig {
            state_save_interval: 1,
            ..IngestConfig::default()
        };
        let (pipeline, mut rx) = {
            let (p, r) = LogIngestPipelineBuilder::new(
                FixedSource::new("LogTemp: hello\n"),
                MemoryStore::default(),
            )
            .config(config)
            .servers(vec![endpoint()])
            .build()
            .unwrap();
            (p, r.unwrap())
        };
        let mut worker = pipeline.worker_for(&endpoint());
        worker.ingest_once().await.unwrap();
        drain(&mut rx);

        let saved = worker
            .store
            .load_ingest_state(&endpoint().key, FeedKind::GameLog)
            .await
            .unwrap();
        assert!(saved.is_some());
        assert_eq!(saved.unwrap().line_count, 1);
    }
}
