//! 킬피드 에러 타입
//!
//! [`KillfeedError`]는 킬피드 수집/파싱/통계 집계에서 발생하는 모든 에러를
//! 표현합니다. `From<KillfeedError> for DeadwatchError` 변환으로 상위 레이어에서
//! `?` 연산자로 전파할 수 있습니다.

use deadwatch_core::error::{DeadwatchError, PipelineError};

/// 킬피드 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum KillfeedError {
    /// CSV 레코드 파싱 실패
    #[error("parse error: {reason}: {line}")]
    Parse {
        /// 실패 사유
        reason: String,
        /// 원본 줄
        line: String,
    },

    /// 원격 킬피드 수집 실패
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
}

impl From<KillfeedError> for DeadwatchError {
    fn from(err: KillfeedError) -> Self {
        DeadwatchError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}
