//! 킬피드 파이프라인 설정
//!
//! core의 [`KillfeedConfig`](deadwatch_core::config::KillfeedConfig)를 확장하여
//! 파이프라인 내부 동작(채널 용량, 중복 제거 상한)을 함께 설정합니다.

use crate::error::KillfeedError;

/// 킬피드 파이프라인 설정
#[derive(Debug, Clone)]
pub struct KillfeedPipelineConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수집 주기 (초)
    pub poll_interval_secs: u64,
    /// 저장 시 킬 거리 상한 (미터)
    pub max_distance: f64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 이벤트 채널 용량
    pub event_channel_capacity: usize,
    /// 서버별 중복 제거 집합의 최대 크기
    pub dedup_capacity: usize,
    /// 통계를 저장소에 기록하는 수집 사이클 간격
    pub stats_save_interval: usize,
}

impl Default for KillfeedPipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 300,
            max_distance: 5_000.0,
            event_channel_capacity: 1024,
            dedup_capacity: 10_000,
            stats_save_interval: 1,
        }
    }
}

impl KillfeedPipelineConfig {
    /// core 설정에서 파이프라인 설정을 만듭니다.
    pub fn from_core(core: &deadwatch_core::config::KillfeedConfig) -> Self {
        Self {
            enabled: core.enabled,
            poll_interval_secs: core.poll_interval_secs,
            max_distance: core.max_distance,
            ..Self::default()
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), KillfeedError> {
        const MAX_POLL_INTERVAL_SECS: u64 = 3600; // 1 hour
        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;

        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(KillfeedError::Config {
                field: "poll_interval_secs".to_owned(),
                reason: format!("must be 1-{}", MAX_POLL_INTERVAL_SECS),
            });
        }

        if !self.max_distance.is_finite() || self.max_distance <= 0.0 {
            return Err(KillfeedError::Config {
                field: "max_distance".to_owned(),
                reason: "must be a positive finite number".to_owned(),
            });
        }

        if self.event_channel_capacity == 0 || self.event_channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(KillfeedError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_CHANNEL_CAPACITY),
            });
        }

        if self.dedup_capacity == 0 {
            return Err(KillfeedError::Config {
                field: "dedup_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.stats_save_interval == 0 {
            return Err(KillfeedError::Config {
                field: "stats_save_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 킬피드 설정 빌더
#[derive(Debug, Default)]
pub struct KillfeedPipelineConfigBuilder {
    config: KillfeedPipelineConfig,
}

impl KillfeedPipelineConfigBuilder {
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

    /// 거리 상한(미터)을 설정합니다.
    pub fn max_distance(mut self, meters: f64) -> Self {
        self.config.max_distance = meters;
        self
    }

    /// 이벤트 채널 용량을 설정합니다.
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    /// 중복 제거 집합의 최대 크기를 설정합니다.
    pub fn dedup_capacity(mut self, capacity: usize) -> Self {
        self.config.dedup_capacity = capacity;
        self
    }

    /// 통계 저장 간격(사이클)을 설정합니다.
    pub fn stats_save_interval(mut self, interval: usize) -> Self {
        self.config.stats_save_interval = interval;
        self
    }

    /// 설정을 검증하고 반환합니다.
    pub fn build(self) -> Result<KillfeedPipelineConfig, KillfeedError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(KillfeedPipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn from_core_copies_shared_fields() {
        let core = deadwatch_core::config::KillfeedConfig {
            enabled: false,
            poll_interval_secs: 60,
            max_distance: 3_000.0,
        };
        let config = KillfeedPipelineConfig::from_core(&core);
        assert!(!config.enabled);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.max_distance, 3_000.0);
        // 확장 필드는 기본값 유지
        assert_eq!(config.event_channel_capacity, 1024);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let result = KillfeedPipelineConfigBuilder::new()
            .poll_interval_secs(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn non_positive_max_distance_is_rejected() {
        let result = KillfeedPipelineConfigBuilder::new().max_distance(0.0).build();
        assert!(result.is_err());

        let result = KillfeedPipelineConfigBuilder::new()
            .max_distance(f64::NAN)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_sets_extended_fields() {
        let config = KillfeedPipelineConfigBuilder::new()
            .dedup_capacity(500)
            .stats_save_interval(5)
            .build()
            .unwrap();
        assert_eq!(config.dedup_capacity, 500);
        assert_eq!(config.stats_save_interval, 5);
    }
}
