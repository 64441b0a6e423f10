//! 에러 타입 — 도메인별 에러 정의

/// Deadwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DeadwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 원격 파일 수집 에러
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중인 파이프라인을 다시 시작
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인을 중지
    #[error("pipeline not running")]
    NotRunning,

    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 채널 수신 실패
    #[error("channel receive failed: {0}")]
    ChannelRecv(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 지원하지 않는 형식
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 파싱 실패
    #[error("parse failed at line {line}: {reason}")]
    Failed { line: usize, reason: String },

    /// 필드 누락
    #[error("missing field '{field}' in record")]
    MissingField { field: String },
}

/// 원격 파일 수집 에러
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// 연결/전송 실패 (재시도 대상)
    #[error("fetch failed for {path}: {reason}")]
    FetchFailed { path: String, reason: String },

    /// 재시도 소진
    #[error("fetch gave up after {attempts} attempts: {path}")]
    RetriesExhausted { path: String, attempts: u32 },
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 읽기 실패
    #[error("load failed: {0}")]
    Load(String),

    /// 쓰기 실패
    #[error("save failed: {0}")]
    Save(String),

    /// 직렬화 실패
    #[error("serialization failed: {0}")]
    Serialization(String),
}
