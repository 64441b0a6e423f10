//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for DeadwatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use deadwatch_core::error::{DeadwatchError, PipelineError};

/// 로그 파이프라인 도메인 에러
///
/// 패턴 분류, 파일 상태 추적, 원격 수집, 채널 통신 등 파이프라인 내부의
/// 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 패턴 라이브러리 구성 실패
    #[error("pattern error: {name}: {reason}")]
    Pattern {
        /// 문제가 된 패턴 이름
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 파일 상태 추적 에러
    #[error("tracker error: {path}: {reason}")]
    Tracker {
        /// 추적 대상 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 원격 로그 수집 실패
    #[error("fetch error: {server}: {reason}")]
    Fetch {
        /// 대상 서버 키
        server: String,
        /// 에러 사유
        reason: String,
    },

    /// 상태 저장소 에러
    #[error("state store error: {reason}")]
    Store {
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for DeadwatchError {
    fn from(err: LogPipelineError) -> Self {
        DeadwatchError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}
