//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `deadwatch_`
//! - 모듈명: `log_pipeline_`, `killfeed_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use deadwatch_core::metrics;
//! use metrics::counter;
//!
//! counter!(deadwatch_core::metrics::LOG_PIPELINE_LINES_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 서버 레이블 키 (ServerKey의 slug)
pub const LABEL_SERVER: &str = "server";

/// 이벤트 종류 레이블 키 (queue_join, player_joined, disconnect, ...)
pub const LABEL_EVENT_KIND: &str = "event_kind";

/// 모듈 레이블 키
pub const LABEL_MODULE: &str = "module";

/// 결과 레이블 키 (ok, error)
pub const LABEL_RESULT: &str = "result";

// ─── Log Pipeline 메트릭 ────────────────────────────────────────────

/// Log Pipeline: 처리된 전체 로그 줄 수 (counter, label: server)
pub const LOG_PIPELINE_LINES_PROCESSED_TOTAL: &str = "deadwatch_log_pipeline_lines_processed_total";

/// Log Pipeline: 분류된 이벤트 수 (counter, labels: server, event_kind)
pub const LOG_PIPELINE_EVENTS_CLASSIFIED_TOTAL: &str =
    "deadwatch_log_pipeline_events_classified_total";

/// Log Pipeline: 적용된 상태 전이 수 (counter, label: server)
pub const LOG_PIPELINE_TRANSITIONS_APPLIED_TOTAL: &str =
    "deadwatch_log_pipeline_transitions_applied_total";

/// Log Pipeline: 거부된 상태 전이 수 (counter, label: server)
pub const LOG_PIPELINE_TRANSITIONS_REJECTED_TOTAL: &str =
    "deadwatch_log_pipeline_transitions_rejected_total";

/// Log Pipeline: 억제된 중복 이벤트 수 (counter, label: server)
pub const LOG_PIPELINE_DUPLICATES_SUPPRESSED_TOTAL: &str =
    "deadwatch_log_pipeline_duplicates_suppressed_total";

/// Log Pipeline: 탐지된 파일 리셋(로테이션) 수 (counter, label: server)
pub const LOG_PIPELINE_FILE_RESETS_TOTAL: &str = "deadwatch_log_pipeline_file_resets_total";

/// Log Pipeline: 현재 접속 중 인원 (gauge, label: server)
pub const LOG_PIPELINE_PLAYERS_ONLINE: &str = "deadwatch_log_pipeline_players_online";

/// Log Pipeline: 현재 대기열 인원 (gauge, label: server)
pub const LOG_PIPELINE_PLAYERS_QUEUED: &str = "deadwatch_log_pipeline_players_queued";

/// Log Pipeline: 수집 사이클 처리 시간 (histogram, 초)
pub const LOG_PIPELINE_INGEST_DURATION_SECONDS: &str =
    "deadwatch_log_pipeline_ingest_duration_seconds";

// ─── Killfeed 메트릭 ────────────────────────────────────────────────

/// Killfeed: 파싱된 킬 레코드 수 (counter, label: server)
pub const KILLFEED_RECORDS_PARSED_TOTAL: &str = "deadwatch_killfeed_records_parsed_total";

/// Killfeed: 형식 오류로 건너뛴 줄 수 (counter, label: server)
pub const KILLFEED_MALFORMED_LINES_TOTAL: &str = "deadwatch_killfeed_malformed_lines_total";

/// Killfeed: 중복으로 제거된 줄 수 (counter, label: server)
pub const KILLFEED_DUPLICATES_SKIPPED_TOTAL: &str = "deadwatch_killfeed_duplicates_skipped_total";

/// Killfeed: 집계된 자살 수 (counter, label: server)
pub const KILLFEED_SUICIDES_TOTAL: &str = "deadwatch_killfeed_suicides_total";

// ─── Source 메트릭 ──────────────────────────────────────────────────

/// Source: 파일 수집 시도 수 (counter, labels: server, result)
pub const SOURCE_FETCHES_TOTAL: &str = "deadwatch_source_fetches_total";

/// Source: 재시도 소진으로 건너뛴 사이클 수 (counter, label: server)
pub const SOURCE_CYCLES_SKIPPED_TOTAL: &str = "deadwatch_source_cycles_skipped_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "deadwatch_daemon_uptime_seconds";

/// Daemon: 감시 중인 서버 수 (gauge)
pub const DAEMON_SERVERS_TRACKED: &str = "deadwatch_daemon_servers_tracked";

/// Daemon: 빌드 정보 (gauge, 항상 1, labels: version, commit, rust_version)
pub const DAEMON_BUILD_INFO: &str = "deadwatch_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 수집 사이클 처리 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 60s 범위 (콜드 스타트 백로그 포함)
pub const INGEST_DURATION_BUCKETS: [f64; 9] =
    [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 10.0, 60.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// `metrics::describe_counter!()`, `describe_gauge!()`, `describe_histogram!()`을
/// 호출하여 Prometheus HELP 텍스트를 설정합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `deadwatch-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Log Pipeline
    describe_counter!(
        LOG_PIPELINE_LINES_PROCESSED_TOTAL,
        "Total number of game log lines processed"
    );
    describe_counter!(
        LOG_PIPELINE_EVENTS_CLASSIFIED_TOTAL,
        "Total number of log lines matched by a pattern, by event kind"
    );
    describe_counter!(
        LOG_PIPELINE_TRANSITIONS_APPLIED_TOTAL,
        "Total number of player state transitions applied"
    );
    describe_counter!(
        LOG_PIPELINE_TRANSITIONS_REJECTED_TOTAL,
        "Total number of invalid player state transitions rejected"
    );
    describe_counter!(
        LOG_PIPELINE_DUPLICATES_SUPPRESSED_TOTAL,
        "Total number of duplicate connection events suppressed"
    );
    describe_counter!(
        LOG_PIPELINE_FILE_RESETS_TOTAL,
        "Total number of log file rotations detected"
    );
    describe_gauge!(
        LOG_PIPELINE_PLAYERS_ONLINE,
        "Number of players currently joined, per server"
    );
    describe_gauge!(
        LOG_PIPELINE_PLAYERS_QUEUED,
        "Number of players currently queued or connecting, per server"
    );
    describe_histogram!(
        LOG_PIPELINE_INGEST_DURATION_SECONDS,
        "Time to process one log ingestion cycle in seconds"
    );

    // Killfeed
    describe_counter!(
        KILLFEED_RECORDS_PARSED_TOTAL,
        "Total number of killfeed CSV records parsed"
    );
    describe_counter!(
        KILLFEED_MALFORMED_LINES_TOTAL,
        "Total number of malformed killfeed CSV lines skipped"
    );
    describe_counter!(
        KILLFEED_DUPLICATES_SKIPPED_TOTAL,
        "Total number of already-seen killfeed lines skipped"
    );
    describe_counter!(
        KILLFEED_SUICIDES_TOTAL,
        "Total number of suicide records aggregated"
    );

    // Source
    describe_counter!(
        SOURCE_FETCHES_TOTAL,
        "Total number of remote file fetch attempts, by result"
    );
    describe_counter!(
        SOURCE_CYCLES_SKIPPED_TOTAL,
        "Total number of ingestion cycles skipped after fetch retries were exhausted"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Deadwatch daemon uptime in seconds");
    describe_gauge!(
        DAEMON_SERVERS_TRACKED,
        "Number of servers currently being tracked"
    );
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version/commit labels)"
    );
}
