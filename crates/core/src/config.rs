//! 설정 관리 — deadwatch.toml 파싱 및 런타임 설정
//!
//! [`DeadwatchConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DEADWATCH_LOG_PIPELINE_POLL_INTERVAL_SECS=60` 형식)
//! 3. 설정 파일 (`deadwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), deadwatch_core::error::DeadwatchError> {
//! use deadwatch_core::config::DeadwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DeadwatchConfig::load("deadwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DeadwatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DeadwatchError};
use crate::types::{ServerEndpoint, ServerKey};

/// Deadwatch 통합 설정
///
/// `deadwatch.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeadwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 감시 대상 서버 목록
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
    /// 로그 파이프라인 설정
    #[serde(default)]
    pub log_pipeline: LogPipelineConfig,
    /// 킬피드 설정
    #[serde(default)]
    pub killfeed: KillfeedConfig,
    /// 원격 소스 설정
    #[serde(default)]
    pub source: SourceConfig,
}

impl DeadwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DeadwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DeadwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeadwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DeadwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DeadwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            DeadwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DEADWATCH_{SECTION}_{FIELD}`
    /// 예: `DEADWATCH_GENERAL_LOG_LEVEL=debug`
    /// 서버 목록은 배열이므로 환경변수 오버라이드 대상이 아닙니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DEADWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DEADWATCH_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "DEADWATCH_GENERAL_DATA_DIR");
        override_string(
            &mut self.general.metrics_bind,
            "DEADWATCH_GENERAL_METRICS_BIND",
        );

        // Log Pipeline
        override_bool(
            &mut self.log_pipeline.enabled,
            "DEADWATCH_LOG_PIPELINE_ENABLED",
        );
        override_u64(
            &mut self.log_pipeline.poll_interval_secs,
            "DEADWATCH_LOG_PIPELINE_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.log_pipeline.suppression_window_secs,
            "DEADWATCH_LOG_PIPELINE_SUPPRESSION_WINDOW_SECS",
        );
        override_bool(
            &mut self.log_pipeline.track_beacon,
            "DEADWATCH_LOG_PIPELINE_TRACK_BEACON",
        );
        override_usize(
            &mut self.log_pipeline.cold_start_lines,
            "DEADWATCH_LOG_PIPELINE_COLD_START_LINES",
        );
        override_usize(
            &mut self.log_pipeline.batch_size,
            "DEADWATCH_LOG_PIPELINE_BATCH_SIZE",
        );
        override_usize(
            &mut self.log_pipeline.state_save_interval,
            "DEADWATCH_LOG_PIPELINE_STATE_SAVE_INTERVAL",
        );
        override_u64(
            &mut self.log_pipeline.stale_disconnect_hours,
            "DEADWATCH_LOG_PIPELINE_STALE_DISCONNECT_HOURS",
        );

        // Killfeed
        override_bool(&mut self.killfeed.enabled, "DEADWATCH_KILLFEED_ENABLED");
        override_u64(
            &mut self.killfeed.poll_interval_secs,
            "DEADWATCH_KILLFEED_POLL_INTERVAL_SECS",
        );
        override_f64(
            &mut self.killfeed.max_distance,
            "DEADWATCH_KILLFEED_MAX_DISTANCE",
        );

        // Source
        override_u32(
            &mut self.source.fetch_retries,
            "DEADWATCH_SOURCE_FETCH_RETRIES",
        );
        override_u64(
            &mut self.source.fetch_timeout_secs,
            "DEADWATCH_SOURCE_FETCH_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DeadwatchError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 서버 목록 검증: 키 중복과 빈 식별자 금지
        let mut seen = HashSet::new();
        for server in &self.servers {
            if server.server_id.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "servers.server_id".to_owned(),
                    reason: "server_id must not be empty".to_owned(),
                }
                .into());
            }
            if !seen.insert((server.guild_id, server.server_id.as_str())) {
                return Err(ConfigError::InvalidValue {
                    field: "servers".to_owned(),
                    reason: format!(
                        "duplicate server key: {}/{}",
                        server.guild_id, server.server_id
                    ),
                }
                .into());
            }
        }

        if self.log_pipeline.enabled {
            if self.log_pipeline.poll_interval_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "log_pipeline.poll_interval_secs".to_owned(),
                    reason: "must be greater than zero".to_owned(),
                }
                .into());
            }
            if self.log_pipeline.suppression_window_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "log_pipeline.suppression_window_secs".to_owned(),
                    reason: "must be greater than zero".to_owned(),
                }
                .into());
            }
            if self.log_pipeline.batch_size == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "log_pipeline.batch_size".to_owned(),
                    reason: "must be greater than zero".to_owned(),
                }
                .into());
            }
        }

        if self.killfeed.enabled {
            if self.killfeed.poll_interval_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "killfeed.poll_interval_secs".to_owned(),
                    reason: "must be greater than zero".to_owned(),
                }
                .into());
            }
            if self.killfeed.max_distance <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: "killfeed.max_distance".to_owned(),
                    reason: "must be greater than zero".to_owned(),
                }
                .into());
            }
        }

        if self.source.fetch_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "source.fetch_retries".to_owned(),
                reason: "must be greater than zero".to_owned(),
            }
            .into());
        }

        Ok(())
    }

    /// 설정된 서버 목록을 엔드포인트로 변환합니다.
    pub fn endpoints(&self) -> Vec<ServerEndpoint> {
        self.servers
            .iter()
            .map(|s| ServerEndpoint {
                key: ServerKey::new(s.guild_id, s.server_id.clone()),
                name: s.name.clone(),
                log_path: s.log_path.clone(),
                killfeed_path: s.killfeed_path.clone(),
            })
            .collect()
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리 (수집 상태, 통계 저장 위치)
    pub data_dir: String,
    /// Prometheus 메트릭 수신 주소
    pub metrics_bind: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            data_dir: "/var/lib/deadwatch".to_owned(),
            metrics_bind: "127.0.0.1:9184".to_owned(),
        }
    }
}

/// 감시 대상 서버 하나의 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 길드(커뮤니티) ID
    pub guild_id: u64,
    /// 길드 내 서버 식별자
    pub server_id: String,
    /// 표시용 서버 이름
    pub name: String,
    /// 게임 로그 파일 경로
    pub log_path: String,
    /// 킬피드 CSV 디렉토리 경로
    pub killfeed_path: String,
}

/// 로그 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogPipelineConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수집 주기 (초)
    pub poll_interval_secs: u64,
    /// 중복 이벤트 억제 윈도우 (초)
    pub suppression_window_secs: u64,
    /// 비콘(CONNECTING) 상태 추적 여부
    pub track_beacon: bool,
    /// 이 줄 수를 넘는 백로그는 콜드 스타트로 처리 (알림 억제)
    pub cold_start_lines: usize,
    /// 핫 패스 배치 크기
    pub batch_size: usize,
    /// 수집 상태를 저장소에 쓰는 주기 (커밋 횟수)
    pub state_save_interval: usize,
    /// DISCONNECTED 상태를 정리하는 기준 나이 (시간)
    pub stale_disconnect_hours: u64,
}

impl Default for LogPipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 180,
            suppression_window_secs: 45,
            track_beacon: true,
            cold_start_lines: 1_000,
            batch_size: 500,
            state_save_interval: 10,
            stale_disconnect_hours: 24,
        }
    }
}

/// 킬피드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KillfeedConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수집 주기 (초)
    pub poll_interval_secs: u64,
    /// 저장 시 킬 거리 상한 (미터)
    pub max_distance: f64,
}

impl Default for KillfeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 300,
            max_distance: 5_000.0,
        }
    }
}

/// 원격 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// 파일 수집 재시도 횟수
    pub fetch_retries: u32,
    /// 파일 수집 타임아웃 (초)
    pub fetch_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            fetch_retries: 3,
            fetch_timeout_secs: 30,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = DeadwatchConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(config.servers.is_empty());
        assert!(config.log_pipeline.enabled);
        assert_eq!(config.log_pipeline.suppression_window_secs, 45);
        assert!(config.log_pipeline.track_beacon);
        assert_eq!(config.log_pipeline.cold_start_lines, 1_000);
        assert!(config.killfeed.enabled);
        assert_eq!(config.killfeed.poll_interval_secs, 300);
        assert_eq!(config.source.fetch_retries, 3);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = DeadwatchConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = DeadwatchConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.log_pipeline.batch_size, 500);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[log_pipeline]
suppression_window_secs = 30
track_beacon = false
"#;
        let config = DeadwatchConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.log_pipeline.suppression_window_secs, 30);
        assert!(!config.log_pipeline.track_beacon);
        assert_eq!(config.log_pipeline.cold_start_lines, 1_000);
    }

    #[test]
    fn from_str_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"
data_dir = "/opt/deadwatch/data"
metrics_bind = "0.0.0.0:9184"

[[servers]]
guild_id = 1219706687980568769
server_id = "emerald-eu"
name = "Emerald EU"
log_path = "Logs/Deadside.log"
killfeed_path = "killfeed/"

[[servers]]
guild_id = 1219706687980568769
server_id = "emerald-us"
name = "Emerald US"
log_path = "Logs/Deadside.log"
killfeed_path = "killfeed/"

[log_pipeline]
poll_interval_secs = 60
suppression_window_secs = 60
cold_start_lines = 2000
batch_size = 250
state_save_interval = 5
stale_disconnect_hours = 12

[killfeed]
poll_interval_secs = 120
max_distance = 4000.0

[source]
fetch_retries = 5
fetch_timeout_secs = 10
"#;
        let config = DeadwatchConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].server_id, "emerald-eu");
        assert_eq!(config.log_pipeline.poll_interval_secs, 60);
        assert_eq!(config.log_pipeline.suppression_window_secs, 60);
        assert_eq!(config.killfeed.max_distance, 4000.0);
        assert_eq!(config.source.fetch_retries, 5);

        let endpoints = config.endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[1].name, "Emerald US");
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = DeadwatchConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            DeadwatchError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = DeadwatchConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = DeadwatchConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_duplicate_server_key() {
        let mut config = DeadwatchConfig::default();
        config.servers = vec![
            ServerConfig {
                guild_id: 1,
                server_id: "a".to_owned(),
                ..Default::default()
            },
            ServerConfig {
                guild_id: 1,
                server_id: "a".to_owned(),
                ..Default::default()
            },
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate server key"));
    }

    #[test]
    fn validate_rejects_empty_server_id() {
        let mut config = DeadwatchConfig::default();
        config.servers = vec![ServerConfig {
            guild_id: 1,
            ..Default::default()
        }];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server_id"));
    }

    #[test]
    fn validate_rejects_zero_suppression_window() {
        let mut config = DeadwatchConfig::default();
        config.log_pipeline.suppression_window_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("suppression_window_secs"));
    }

    #[test]
    fn validate_skips_pipeline_checks_when_disabled() {
        let mut config = DeadwatchConfig::default();
        config.log_pipeline.enabled = false;
        config.log_pipeline.poll_interval_secs = 0;
        // 비활성화 상태면 해당 섹션 검증을 건너뜀
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_nonpositive_max_distance() {
        let mut config = DeadwatchConfig::default();
        config.killfeed.max_distance = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_distance"));
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_DEADWATCH_STR", "overridden") };
        override_string(&mut val, "TEST_DEADWATCH_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_DEADWATCH_STR") };
    }

    #[test]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = false;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_DEADWATCH_BOOL_BAD", "not-a-bool") };
        override_bool(&mut val, "TEST_DEADWATCH_BOOL_BAD");
        assert!(!val); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_DEADWATCH_BOOL_BAD") };
    }

    #[test]
    fn env_override_u64_valid() {
        let mut val = 45u64;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_DEADWATCH_U64", "60") };
        override_u64(&mut val, "TEST_DEADWATCH_U64");
        assert_eq!(val, 60);
        unsafe { std::env::remove_var("TEST_DEADWATCH_U64") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_DEADWATCH_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = DeadwatchConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = DeadwatchConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(
            config.log_pipeline.suppression_window_secs,
            parsed.log_pipeline.suppression_window_secs
        );
        assert_eq!(config.killfeed.max_distance, parsed.killfeed.max_distance);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = DeadwatchConfig::from_file("/nonexistent/path/deadwatch.toml").await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            DeadwatchError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
