#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`patterns`]: 게임 로그 라인 분류 (정규식 패턴 테이블, 우선순위 순서 보장)
//! - [`connection`]: 플레이어 접속 수명주기 상태 머신 (억제 정책, 감사 로그)
//! - [`tracker`]: 파일 증분 읽기 및 회전(리셋) 감지
//! - [`counters`]: 전체 상태 스캔 기반 인원 집계
//! - [`dispatch`]: 분류 결과의 사용자 노출 여부 판정 및 월드 이벤트 변환
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! FileSource -> FileTracker -> PatternSet -> ConnectionTracker -> counters -> downstream
//!     |             |              |               |                  |
//!  원격/로컬    회전 감지       분류 테이블     상태 머신 + 억제     전체 스캔 집계
//! ```

pub mod config;
pub mod connection;
pub mod counters;
pub mod dispatch;
pub mod error;
pub mod patterns;
pub mod pipeline;
pub mod tracker;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{IngestReport, LogIngestPipeline, LogIngestPipelineBuilder, ServerWorker};

// 설정
pub use config::{IngestConfig, IngestConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 패턴 분류
pub use patterns::{LogEvent, MissionState, PatternSet};

// 접속 상태 머신
pub use connection::{
    ConnectionNotice, ConnectionTracker, Outcome, PlayerConnection, SuppressionPolicy,
};

// 파일 추적
pub use tracker::{FileTracker, ReadPlan};
