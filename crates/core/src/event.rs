//! 이벤트 시스템 — 모듈 간 통신의 기본 단위
//!
//! 파이프라인에서 데몬으로 흐르는 모든 통신은 이벤트 기반 메시지 패싱으로
//! 수행됩니다. [`EventMetadata`]는 모든 이벤트에 공통으로 포함되는
//! 메타데이터이며, [`Event`] trait은 모든 이벤트 타입이 구현해야 하는
//! 인터페이스입니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{KillRecord, ServerCounts, ServerKey};

// --- 모듈명 상수 ---

/// 로그 파이프라인 모듈명
pub const MODULE_LOG_PIPELINE: &str = "log-pipeline";
/// 킬피드 모듈명
pub const MODULE_KILLFEED: &str = "killfeed";
/// 데몬 모듈명
pub const MODULE_DAEMON: &str = "daemon";

// --- 이벤트 타입 상수 ---

/// 접속 수명주기 이벤트 타입
pub const EVENT_TYPE_CONNECTION: &str = "connection";
/// 월드 이벤트 타입 (미션, 에어드랍 등)
pub const EVENT_TYPE_WORLD: &str = "world";
/// 서버 인원 갱신 이벤트 타입
pub const EVENT_TYPE_PRESENCE: &str = "presence";
/// 킬피드 이벤트 타입
pub const EVENT_TYPE_KILL: &str = "kill";

/// 이벤트 메타데이터 — 모든 이벤트에 공통으로 포함되는 추적 정보
///
/// 각 이벤트의 발생 시각, 생성 모듈, 분산 추적 ID를 담고 있어
/// 이벤트 흐름을 추적하고 디버깅할 수 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: DateTime<Utc>,
    /// 이벤트를 생성한 모듈명 (예: "log-pipeline", "killfeed")
    pub source_module: String,
    /// 분산 추적 ID — 같은 수집 사이클의 이벤트를 연결합니다
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    ///
    /// 같은 수집 사이클에서 동일한 추적 ID를 유지할 때 사용합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id를 생성하여 메타데이터를 만듭니다.
    ///
    /// 새로운 수집 사이클의 시작점에서 사용합니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            self.timestamp.timestamp(),
            self.source_module,
            self.trace_id,
        )
    }
}

/// 모든 이벤트가 구현해야 하는 기본 trait
///
/// 각 모듈은 자체 이벤트 타입을 정의하고 이 trait을 구현합니다.
/// `Send + Sync + 'static` 바운드로 `tokio::mpsc` 채널을 통한
/// 안전한 전송을 보장합니다.
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터 (timestamp, source_module, trace_id)
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명 (로깅 및 라우팅에 사용)
    fn event_type(&self) -> &str;
}

/// 접속 수명주기 알림 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionKind {
    /// 플레이어가 서버에 합류함
    Joined,
    /// 플레이어가 서버를 떠남
    Left,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined => write!(f, "joined"),
            Self::Left => write!(f, "left"),
        }
    }
}

/// 사용자에게 보이는 접속/이탈 이벤트
///
/// 상태 머신 전이가 실제로 적용되고 표시 이름이 해석된 경우에만 생성됩니다.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 대상 서버
    pub server: ServerKey,
    /// 플레이어 ID
    pub player_id: String,
    /// 해석된 표시 이름
    pub player_name: String,
    /// 합류/이탈 구분
    pub kind: ConnectionKind,
}

impl ConnectionEvent {
    pub fn new(
        server: ServerKey,
        player_id: impl Into<String>,
        player_name: impl Into<String>,
        kind: ConnectionKind,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_LOG_PIPELINE, trace_id),
            server,
            player_id: player_id.into(),
            player_name: player_name.into(),
            kind,
        }
    }
}

impl Event for ConnectionEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_CONNECTION
    }
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionEvent[{}] server={} player={} kind={}",
            &self.id[..8.min(self.id.len())],
            self.server,
            self.player_name,
            self.kind,
        )
    }
}

/// 월드 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEventKind {
    /// 미션이 READY 상태로 전환됨
    MissionReady,
    /// 에어드랍 비행/대기
    Airdrop,
    /// 헬리콥터 추락 스폰
    HeliCrash,
    /// 트레이더 스폰
    Trader,
}

impl fmt::Display for WorldEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissionReady => write!(f, "mission_ready"),
            Self::Airdrop => write!(f, "airdrop"),
            Self::HeliCrash => write!(f, "helicrash"),
            Self::Trader => write!(f, "trader"),
        }
    }
}

/// 월드 이벤트 (미션, 에어드랍, 헬리 추락, 트레이더)
#[derive(Debug, Clone)]
pub struct WorldEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 대상 서버
    pub server: ServerKey,
    /// 이벤트 종류
    pub kind: WorldEventKind,
    /// 정규화된 표시 이름 (미션명 등, 없으면 빈 문자열)
    pub name: String,
    /// 월드 좌표 (로그에 있을 경우)
    pub coords: Option<(f64, f64)>,
}

impl WorldEvent {
    pub fn new(
        server: ServerKey,
        kind: WorldEventKind,
        name: impl Into<String>,
        coords: Option<(f64, f64)>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_LOG_PIPELINE, trace_id),
            server,
            kind,
            name: name.into(),
            coords,
        }
    }
}

impl Event for WorldEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_WORLD
    }
}

impl fmt::Display for WorldEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WorldEvent[{}] server={} kind={} name={}",
            &self.id[..8.min(self.id.len())],
            self.server,
            self.kind,
            self.name,
        )
    }
}

/// 서버 인원 갱신 이벤트
///
/// 전체 상태 스캔으로 다시 계산된 집계가 변경될 때마다 생성됩니다.
#[derive(Debug, Clone)]
pub struct PresenceEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 대상 서버
    pub server: ServerKey,
    /// 표시용 서버 이름
    pub server_name: String,
    /// 다시 계산된 집계
    pub counts: ServerCounts,
}

impl PresenceEvent {
    pub fn new(
        server: ServerKey,
        server_name: impl Into<String>,
        counts: ServerCounts,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_LOG_PIPELINE, trace_id),
            server,
            server_name: server_name.into(),
            counts,
        }
    }

    /// 프레즌스 표시줄 텍스트를 만듭니다.
    pub fn label(&self) -> String {
        format!("📈 {}: {}", self.server_name, self.counts)
    }
}

impl Event for PresenceEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_PRESENCE
    }
}

impl fmt::Display for PresenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PresenceEvent[{}] server={} counts={}",
            &self.id[..8.min(self.id.len())],
            self.server,
            self.counts,
        )
    }
}

/// 킬피드 이벤트
#[derive(Debug, Clone)]
pub struct KillEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 대상 서버
    pub server: ServerKey,
    /// 파싱된 킬 레코드
    pub record: KillRecord,
}

impl KillEvent {
    pub fn new(server: ServerKey, record: KillRecord, trace_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_KILLFEED, trace_id),
            server,
            record,
        }
    }
}

impl Event for KillEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_KILL
    }
}

impl fmt::Display for KillEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KillEvent[{}] server={} {}",
            &self.id[..8.min(self.id.len())],
            self.server,
            self.record,
        )
    }
}

/// 파이프라인에서 데몬으로 전달되는 이벤트 묶음
///
/// 단일 mpsc 채널로 모든 이벤트 종류를 전달하기 위한 래퍼입니다.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Connection(ConnectionEvent),
    World(WorldEvent),
    Presence(PresenceEvent),
    Kill(KillEvent),
}

impl Event for ServerEvent {
    fn event_id(&self) -> &str {
        match self {
            Self::Connection(e) => e.event_id(),
            Self::World(e) => e.event_id(),
            Self::Presence(e) => e.event_id(),
            Self::Kill(e) => e.event_id(),
        }
    }

    fn metadata(&self) -> &EventMetadata {
        match self {
            Self::Connection(e) => e.metadata(),
            Self::World(e) => e.metadata(),
            Self::Presence(e) => e.metadata(),
            Self::Kill(e) => e.metadata(),
        }
    }

    fn event_type(&self) -> &str {
        match self {
            Self::Connection(e) => e.event_type(),
            Self::World(e) => e.event_type(),
            Self::Presence(e) => e.event_type(),
            Self::Kill(e) => e.event_type(),
        }
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => e.fmt(f),
            Self::World(e) => e.fmt(f),
            Self::Presence(e) => e.fmt(f),
            Self::Kill(e) => e.fmt(f),
        }
    }
}
