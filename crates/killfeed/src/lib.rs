#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`parser`]: 세미콜론 구분 9필드 CSV 레코드 파싱과 정규화
//! - [`stats`]: 플레이어별 PvP 통계 집계 (킬/데스/연속 킬/거리)
//! - [`dedup`]: 원본 줄 기반 중복 제거 집합
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입

pub mod config;
pub mod dedup;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod stats;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{KillfeedPipeline, KillfeedPipelineBuilder, KillfeedReport, KillfeedWorker};

// 설정
pub use config::{KillfeedPipelineConfig, KillfeedPipelineConfigBuilder};

// 에러
pub use error::KillfeedError;

// 파서
pub use parser::KillRecordParser;

// 통계
pub use stats::StatsBook;
