//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.
//! 각 모듈은 이 타입들을 사용하여 이벤트와 데이터를 교환합니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 서버 식별 키
///
/// (길드, 서버) 쌍을 하나의 복합 키로 나타냅니다.
/// 모든 서버별 상태 맵의 키로 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerKey {
    /// 길드(커뮤니티) ID
    pub guild_id: u64,
    /// 길드 내 서버 식별자
    pub server_id: String,
}

impl ServerKey {
    pub fn new(guild_id: u64, server_id: impl Into<String>) -> Self {
        Self {
            guild_id,
            server_id: server_id.into(),
        }
    }

    /// 파일 경로 등에 쓸 수 있는 안정적인 슬러그를 반환합니다.
    pub fn slug(&self) -> String {
        format!("{}_{}", self.guild_id, self.server_id)
    }
}

impl fmt::Display for ServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.server_id)
    }
}

/// 원격 서버 접속 정보
///
/// 로그 파일과 킬피드 CSV를 가져올 대상 서버를 기술합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEndpoint {
    /// 서버 키
    pub key: ServerKey,
    /// 표시용 서버 이름
    pub name: String,
    /// 게임 로그 파일 경로
    pub log_path: String,
    /// 킬피드 CSV 디렉토리 경로
    pub killfeed_path: String,
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.key)
    }
}

/// 플레이어 접속 상태
///
/// 접속 수명주기 상태 머신의 상태입니다.
/// 허용되는 전이는 log-pipeline의 전이 테이블이 결정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// 관측된 적 없거나 완전히 떠난 상태
    #[default]
    Offline,
    /// 접속 대기열에 있음
    Queued,
    /// 비콘 핸드셰이크 진행 중 (대기열과 합류 사이)
    Connecting,
    /// 서버에 합류함
    Joined,
    /// 접속 종료됨 (재합류 가능)
    Disconnected,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Queued => write!(f, "queued"),
            Self::Connecting => write!(f, "connecting"),
            Self::Joined => write!(f, "joined"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// 서버별 실시간 집계
///
/// 전체 상태 스캔으로만 다시 계산됩니다. 증분 갱신은 하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCounts {
    /// 대기열 인원 (queued + connecting)
    pub queue_count: usize,
    /// 접속 중 인원
    pub player_count: usize,
    /// 서버 최대 인원 (로그에서 관측될 때까지 기본값)
    pub max_players: u32,
}

impl ServerCounts {
    pub const DEFAULT_MAX_PLAYERS: u32 = 50;
}

impl Default for ServerCounts {
    fn default() -> Self {
        Self {
            queue_count: 0,
            player_count: 0,
            max_players: Self::DEFAULT_MAX_PLAYERS,
        }
    }
}

impl fmt::Display for ServerCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({} in queue)",
            self.player_count, self.max_players, self.queue_count,
        )
    }
}

/// 추적 대상 파일 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// 게임 서버 로그 (Deadside.log)
    GameLog,
    /// 킬피드 CSV
    Killfeed,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GameLog => write!(f, "game_log"),
            Self::Killfeed => write!(f, "killfeed"),
        }
    }
}

/// 파일 수집 상태
///
/// (서버, 파일 종류)당 하나씩 유지되며 로테이션 탐지의 근거가 됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIngestState {
    /// 마지막으로 관측한 파일 크기 (바이트)
    pub file_size: u64,
    /// 마지막으로 처리한 줄 수
    pub line_count: usize,
    /// 마지막 줄 내용 (핑거프린트)
    pub last_line: String,
    /// 마지막 갱신 시각
    pub last_updated: DateTime<Utc>,
}

impl FileIngestState {
    pub fn new(file_size: u64, line_count: usize, last_line: impl Into<String>) -> Self {
        Self {
            file_size,
            line_count,
            last_line: last_line.into(),
            last_updated: Utc::now(),
        }
    }
}

/// 킬 이벤트 레코드
///
/// CSV 한 줄에서 파싱된 불변 레코드입니다.
/// 서버별로 원본 줄(raw_line) 동일성 기준으로 중복 제거됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillRecord {
    /// 이벤트 발생 시각
    pub timestamp: DateTime<Utc>,
    /// 킬러 표시 이름
    pub killer: String,
    /// 킬러 플레이어 ID
    pub killer_id: String,
    /// 희생자 표시 이름
    pub victim: String,
    /// 희생자 플레이어 ID
    pub victim_id: String,
    /// 무기 또는 사망 원인 (정규화된 값)
    pub weapon: String,
    /// 교전 거리 (미터, [0, 5000] 범위로 고정)
    pub distance: f64,
    /// 킬러 플랫폼 (PC, PS5, XSX)
    pub killer_platform: String,
    /// 희생자 플랫폼
    pub victim_platform: String,
    /// 자살 여부
    pub is_suicide: bool,
    /// 원본 CSV 줄
    pub raw_line: String,
}

impl fmt::Display for KillRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_suicide {
            write!(f, "{} ({})", self.victim, self.weapon)
        } else {
            write!(
                f,
                "{} -> {} [{}] {:.0}m",
                self.killer, self.victim, self.weapon, self.distance,
            )
        }
    }
}

/// 플레이어 PvP 통계
///
/// (길드, 서버, 플레이어)당 하나씩 집계됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PvpStats {
    pub kills: u64,
    pub deaths: u64,
    pub suicides: u64,
    /// 킬/데스 비율. deaths가 0이면 kills 값 그대로입니다.
    pub kdr: f64,
    pub current_streak: u64,
    pub best_streak: u64,
    /// 누적 킬 거리 (미터)
    pub total_distance: f64,
    /// 최장 킬 거리 (미터)
    pub personal_best_distance: f64,
}

impl PvpStats {
    /// kills/deaths에서 KDR을 다시 계산합니다.
    pub fn recompute_kdr(&mut self) {
        self.kdr = if self.deaths > 0 {
            self.kills as f64 / self.deaths.max(1) as f64
        } else {
            self.kills as f64
        };
    }
}
