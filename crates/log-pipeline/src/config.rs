//! 로그 파이프라인 설정
//!
//! [`IngestConfig`]는 core의 [`LogPipelineConfig`](deadwatch_core::config::LogPipelineConfig)를
//! 기반으로 로그 수집 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use deadwatch_core::config::DeadwatchConfig;
//! use deadwatch_log_pipeline::config::IngestConfig;
//!
//! let core_config = DeadwatchConfig::default();
//! let config = IngestConfig::from_core(&core_config.log_pipeline);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::LogPipelineError;

/// 로그 수집 파이프라인 설정
///
/// core의 `LogPipelineConfig`에서 파생되며, 파이프라인 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 서버별 수집 주기 (초)
    pub poll_interval_secs: u64,
    /// 중복 이벤트 억제 윈도우 (초)
    pub suppression_window_secs: u64,
    /// 비콘 접속(Connecting) 상태 추적 여부
    pub track_beacon: bool,
    /// 이 줄 수를 넘는 신규 라인은 콜드 스타트로 처리 (알림 억제)
    pub cold_start_lines: usize,
    /// 핫 경로 배치 크기
    pub batch_size: usize,
    /// 파일 상태를 저장소에 기록하는 커밋 간격
    pub state_save_interval: usize,
    /// Disconnected 상태 보존 시간 (시간 단위, 초과 시 정리)
    pub stale_disconnect_hours: u64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 이벤트 채널 용량
    pub event_channel_capacity: usize,
    /// 파일 리셋 판정 시 꼬리 비교에 사용하는 최대 라인 수
    pub reset_tail_lines: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 180,
            suppression_window_secs: 45,
            track_beacon: true,
            cold_start_lines: 1000,
            batch_size: 500,
            state_save_interval: 10,
            stale_disconnect_hours: 24,
            event_channel_capacity: 1024,
            reset_tail_lines: 50,
        }
    }
}

impl IngestConfig {
    /// core의 `LogPipelineConfig`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &deadwatch_core::config::LogPipelineConfig) -> Self {
        Self {
            enabled: core.enabled,
            poll_interval_secs: core.poll_interval_secs,
            suppression_window_secs: core.suppression_window_secs,
            track_beacon: core.track_beacon,
            cold_start_lines: core.cold_start_lines,
            batch_size: core.batch_size,
            state_save_interval: core.state_save_interval,
            stale_disconnect_hours: core.stale_disconnect_hours,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MAX_POLL_INTERVAL_SECS: u64 = 3600; // 1 hour
        const MAX_SUPPRESSION_WINDOW_SECS: u64 = 600;
        const MAX_BATCH_SIZE: usize = 100_000;
        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;

        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(LogPipelineError::Config {
                field: "poll_interval_secs".to_owned(),
                reason: format!("must be 1-{}", MAX_POLL_INTERVAL_SECS),
            });
        }

        if self.suppression_window_secs == 0
            || self.suppression_window_secs > MAX_SUPPRESSION_WINDOW_SECS
        {
            return Err(LogPipelineError::Config {
                field: "suppression_window_secs".to_owned(),
                reason: format!("must be 1-{}", MAX_SUPPRESSION_WINDOW_SECS),
            });
        }

        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(LogPipelineError::Config {
                field: "batch_size".to_owned(),
                reason: format!("must be 1-{}", MAX_BATCH_SIZE),
            });
        }

        if self.cold_start_lines == 0 {
            return Err(LogPipelineError::Config {
                field: "cold_start_lines".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.state_save_interval == 0 {
            return Err(LogPipelineError::Config {
                field: "state_save_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.stale_disconnect_hours == 0 {
            return Err(LogPipelineError::Config {
                field: "stale_disconnect_hours".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.event_channel_capacity == 0 || self.event_channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(LogPipelineError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_CHANNEL_CAPACITY),
            });
        }

        if self.reset_tail_lines == 0 {
            return Err(LogPipelineError::Config {
                field: "reset_tail_lines".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 수집 파이프라인 설정 빌더
#[derive(Default)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 활성화 여부를 설정합니다.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// 수집 주기(초)를 설정합니다.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    /// 중복 억제 윈도우(초)를 설정합니다.
    pub fn suppression_window_secs(mut self, secs: u64) -> Self {
        self.config.suppression_window_secs = secs;
        self
    }

    /// 비콘 접속 추적 여부를 설정합니다.
    pub fn track_beacon(mut self, track: bool) -> Self {
        self.config.track_beacon = track;
        self
    }

    /// 콜드 스타트 기준 라인 수를 설정합니다.
    pub fn cold_start_lines(mut self, lines: usize) -> Self {
        self.config.cold_start_lines = lines;
        self
    }

    /// 배치 크기를 설정합니다.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// 상태 저장 커밋 간격을 설정합니다.
    pub fn state_save_interval(mut self, interval: usize) -> Self {
        self.config.state_save_interval = interval;
        self
    }

    /// Disconnected 보존 시간을 설정합니다.
    pub fn stale_disconnect_hours(mut self, hours: u64) -> Self {
        self.config.stale_disconnect_hours = hours;
        self
    }

    /// 이벤트 채널 용량을 설정합니다.
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    /// 설정을 검증하고 `IngestConfig`를 생성합니다.
    pub fn build(self) -> Result<IngestConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = IngestConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = deadwatch_core::config::LogPipelineConfig {
            enabled: true,
            poll_interval_secs: 60,
            suppression_window_secs: 30,
            track_beacon: false,
            cold_start_lines: 2000,
            batch_size: 250,
            state_save_interval: 5,
            stale_disconnect_hours: 12,
        };
        let config = IngestConfig::from_core(&core);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.suppression_window_secs, 30);
        assert!(!config.track_beacon);
        assert_eq!(config.batch_size, 250);
        // 확장 필드는 기본값
        assert_eq!(config.event_channel_capacity, 1024);
        assert_eq!(config.reset_tail_lines, 50);
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let config = IngestConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_suppression_window() {
        let config = IngestConfig {
            suppression_window_secs: 601,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let config = IngestConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = IngestConfigBuilder::new()
            .poll_interval_secs(60)
            .suppression_window_secs(30)
            .track_beacon(false)
            .batch_size(100)
            .build()
            .unwrap();
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.suppression_window_secs, 30);
        assert!(!config.track_beacon);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = IngestConfigBuilder::new().state_save_interval(0).build();
        assert!(result.is_err());
    }
}
