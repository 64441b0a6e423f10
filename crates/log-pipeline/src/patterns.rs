//! 게임 로그 라인 분류 패턴 라이브러리
//!
//! Deadside 서버 로그의 한 줄을 0개 또는 1개의 구조화된 이벤트로 분류합니다.
//! 패턴은 생성 시 한 번만 컴파일되며, 카테고리별로 가장 구체적인(최신 세대)
//! 패턴을 먼저 시도합니다. 첫 매치가 승리하며, 매치되지 않은 라인은 에러가
//! 아니라 단순히 무시됩니다.
//!
//! # 사용 예시
//! ```ignore
//! use deadwatch_log_pipeline::patterns::{LogEvent, PatternSet};
//!
//! let patterns = PatternSet::new()?;
//! let line = "LogNet: Join request: /Game/Maps/world_0/World_0?Name=Bob&eosid=|abc123";
//! if let Some(LogEvent::QueueJoin { player_name, .. }) = patterns.classify(line) {
//!     assert_eq!(player_name, "Bob");
//! }
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::error::LogPipelineError;

/// 게임 로그 타임스탬프 형식: `2024.01.15-12.00.00:123`
const LOG_TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H.%M.%S:%3f";

/// 미션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionState {
    /// 미션 활성화 (사용자에게 알림)
    Ready,
    /// 대기 중
    Waiting,
    /// 초기 상태로 복귀
    Initial,
}

impl MissionState {
    fn from_capture(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "READY" => Some(Self::Ready),
            "WAITING" => Some(Self::Waiting),
            "INITIAL" => Some(Self::Initial),
            _ => None,
        }
    }
}

/// 분류된 로그 이벤트
///
/// 각 variant는 해당 패턴 카테고리의 캡처 필드를 타입으로 표현합니다.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    /// 플레이어가 접속 대기열에 진입 (이름 + id)
    QueueJoin {
        player_name: String,
        player_id: String,
    },
    /// 비콘 접속 (중간 단계, id만)
    BeaconJoin { player_id: String },
    /// 플레이어 등록 완료 (id만, 이름은 아직 모를 수 있음)
    PlayerRegistered { player_id: String },
    /// 플레이어 접속 종료 (두 가지 로그 변형, 하나의 의미)
    PlayerDisconnected { player_id: String },
    /// 미션 상태 전환
    MissionSwitch {
        mission: String,
        state: MissionState,
    },
    /// 미션 리스폰 타이머
    MissionRespawn { mission: String, seconds: u64 },
    /// 차량 스폰 (현재 총 대수 포함)
    VehicleAdded { vehicle: String, total: u64 },
    /// 차량 제거 (현재 총 대수 포함)
    VehicleDeleted { vehicle: String, total: u64 },
    /// 서버 최대 플레이어 수
    MaxPlayerCount { count: u32 },
    /// 보급 투하
    Airdrop {
        at: Option<DateTime<Utc>>,
        coords: Option<(f64, f64)>,
    },
    /// 헬리콥터 추락
    HeliCrash {
        at: Option<DateTime<Utc>>,
        coords: Option<(f64, f64)>,
    },
    /// 상인 등장
    Trader {
        at: Option<DateTime<Utc>>,
        coords: Option<(f64, f64)>,
    },
}

impl LogEvent {
    /// 메트릭 라벨과 중복 억제 키에 사용하는 카테고리 이름을 반환합니다.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::QueueJoin { .. } => "queue_join",
            Self::BeaconJoin { .. } => "beacon_join",
            Self::PlayerRegistered { .. } => "player_registered",
            Self::PlayerDisconnected { .. } => "player_disconnected",
            Self::MissionSwitch { .. } => "mission_switch",
            Self::MissionRespawn { .. } => "mission_respawn",
            Self::VehicleAdded { .. } => "vehicle_added",
            Self::VehicleDeleted { .. } => "vehicle_deleted",
            Self::MaxPlayerCount { .. } => "max_player_count",
            Self::Airdrop { .. } => "airdrop",
            Self::HeliCrash { .. } => "heli_crash",
            Self::Trader { .. } => "trader",
        }
    }
}

/// 컴파일된 패턴 테이블
///
/// 접속 라이프사이클 패턴을 먼저 시도하고 (최신 세대 우선),
/// 그 다음 월드 이벤트 패턴을 시도합니다.
pub struct PatternSet {
    /// 대기열 진입, 1세대 (가장 구체적)
    queue_join: Regex,
    /// 대기열 진입, 2세대 폴백 (platformid 변형 허용)
    queue_join_fallback: Regex,
    beacon_join: Regex,
    player_registered: Regex,
    /// 접속 종료 변형 1: CloseBunch
    disconnect_close_bunch: Regex,
    /// 접속 종료 변형 2: UNetConnection::Close
    disconnect_net_close: Regex,
    mission_switch: Regex,
    mission_respawn: Regex,
    vehicle_add: Regex,
    vehicle_del: Regex,
    max_player_count: Regex,
    airdrop: Regex,
    heli_crash: Regex,
    trader: Regex,
}

impl PatternSet {
    /// 모든 패턴을 컴파일합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        let compile = |name: &str, pattern: &str| -> Result<Regex, LogPipelineError> {
            Regex::new(pattern).map_err(|e| LogPipelineError::Pattern {
                name: name.to_owned(),
                reason: e.to_string(),
            })
        };

        Ok(Self {
            queue_join: compile(
                "queue_join",
                r"(?i)LogNet: Join request: /Game/Maps/world_\d+/World_\d+\?.*Name=([^&?]+).*eosid=\|([a-f0-9]+)",
            )?,
            queue_join_fallback: compile(
                "queue_join_fallback",
                r"(?i)LogNet: Join request:.*Name=([^&\s]+).*(?:platformid=(?:PS5|XSX|PC):(\w+)|eosid=\|(\w+))",
            )?,
            beacon_join: compile(
                "beacon_join",
                r"(?i)LogBeacon: Beacon Join SFPSOnlineBeaconClient EOS:\|([a-f0-9]+)",
            )?,
            player_registered: compile(
                "player_registered",
                r"(?i)LogOnline: Warning: Player \|([a-f0-9]+) successfully registered!",
            )?,
            disconnect_close_bunch: compile(
                "disconnect_close_bunch",
                r"(?i)UChannel::Close: Sending CloseBunch.*UniqueId: (?:EOS:|PS5:)\|?(\w+)",
            )?,
            disconnect_net_close: compile(
                "disconnect_net_close",
                r"(?i)UNetConnection::Close:.*UniqueId: EOS:\|([a-f0-9]+)",
            )?,
            mission_switch: compile(
                "mission_switch",
                r"(?i)LogSFPS: Mission (GA_[A-Za-z0-9_]*_[Mm]is[_0-9]*) switched to (READY|WAITING|INITIAL)",
            )?,
            mission_respawn: compile(
                "mission_respawn",
                r"(?i)LogSFPS: Mission (GA_[A-Za-z0-9_]*_[Mm]is[_0-9]*) will respawn in (\d+)",
            )?,
            vehicle_add: compile(
                "vehicle_add",
                r"(?i)LogSFPS: \[ASFPSGameMode::NewVehicle_Add\] Add vehicle (BP_SFPSVehicle_[A-Za-z0-9_]+) Total (\d+)",
            )?,
            vehicle_del: compile(
                "vehicle_del",
                r"(?i)LogSFPS: \[ASFPSGameMode::NewVehicle_Del\] Del vehicle (BP_SFPSVehicle_[A-Za-z0-9_]+) Total (\d+)",
            )?,
            max_player_count: compile(
                "max_player_count",
                r"(?i)LogSFPS:.*playersmaxcount=(\d+)",
            )?,
            airdrop: compile(
                "airdrop",
                r"(?i)\[(\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2}:\d{3})\].*AirDrop.*switched.*to.*(?:Flying|Waiting)(?:.*X=([\d.-]+).*Y=([\d.-]+))?",
            )?,
            heli_crash: compile(
                "heli_crash",
                r"(?i)\[(\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2}:\d{3})\].*HeliCrash.*(?:spawned|switched.*to.*INITIAL)(?:.*X=([\d.-]+).*Y=([\d.-]+))?",
            )?,
            trader: compile(
                "trader",
                r"(?i)\[(\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2}:\d{3})\].*Trader.*(?:spawn|switched.*to.*(?:INITIAL|Active))(?:.*X=([\d.-]+).*Y=([\d.-]+))?",
            )?,
        })
    }

    /// 한 줄을 분류합니다. 첫 매치가 승리하며, 매치되지 않으면 `None`입니다.
    pub fn classify(&self, line: &str) -> Option<LogEvent> {
        // 접속 라이프사이클 패턴 (최신 세대 우선)
        if let Some(caps) = self.queue_join.captures(line) {
            return Some(LogEvent::QueueJoin {
                player_name: caps[1].to_owned(),
                player_id: caps[2].to_ascii_lowercase(),
            });
        }
        if let Some(caps) = self.queue_join_fallback.captures(line) {
            // id는 platformid 또는 eosid 중 매치된 쪽
            let player_id = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_ascii_lowercase())?;
            return Some(LogEvent::QueueJoin {
                player_name: caps[1].to_owned(),
                player_id,
            });
        }
        if let Some(caps) = self.beacon_join.captures(line) {
            return Some(LogEvent::BeaconJoin {
                player_id: caps[1].to_ascii_lowercase(),
            });
        }
        if let Some(caps) = self.player_registered.captures(line) {
            return Some(LogEvent::PlayerRegistered {
                player_id: caps[1].to_ascii_lowercase(),
            });
        }
        if let Some(caps) = self.disconnect_close_bunch.captures(line) {
            return Some(LogEvent::PlayerDisconnected {
                player_id: caps[1].to_ascii_lowercase(),
            });
        }
        if let Some(caps) = self.disconnect_net_close.captures(line) {
            return Some(LogEvent::PlayerDisconnected {
                player_id: caps[1].to_ascii_lowercase(),
            });
        }

        // 월드 이벤트 패턴
        if let Some(caps) = self.mission_switch.captures(line) {
            let state = MissionState::from_capture(&caps[2])?;
            return Some(LogEvent::MissionSwitch {
                mission: caps[1].to_owned(),
                state,
            });
        }
        if let Some(caps) = self.mission_respawn.captures(line) {
            return Some(LogEvent::MissionRespawn {
                mission: caps[1].to_owned(),
                seconds: caps[2].parse().ok()?,
            });
        }
        if let Some(caps) = self.vehicle_add.captures(line) {
            return Some(LogEvent::VehicleAdded {
                vehicle: caps[1].to_owned(),
                total: caps[2].parse().ok()?,
            });
        }
        if let Some(caps) = self.vehicle_del.captures(line) {
            return Some(LogEvent::VehicleDeleted {
                vehicle: caps[1].to_owned(),
                total: caps[2].parse().ok()?,
            });
        }
        if let Some(caps) = self.max_player_count.captures(line) {
            return Some(LogEvent::MaxPlayerCount {
                count: caps[1].parse().ok()?,
            });
        }
        if let Some(caps) = self.airdrop.captures(line) {
            return Some(LogEvent::Airdrop {
                at: parse_log_timestamp(&caps[1]),
                coords: extract_coords(&caps),
            });
        }
        if let Some(caps) = self.heli_crash.captures(line) {
            return Some(LogEvent::HeliCrash {
                at: parse_log_timestamp(&caps[1]),
                coords: extract_coords(&caps),
            });
        }
        if let Some(caps) = self.trader.captures(line) {
            return Some(LogEvent::Trader {
                at: parse_log_timestamp(&caps[1]),
                coords: extract_coords(&caps),
            });
        }

        None
    }
}

/// `[2024.01.15-12.00.00:123]` 형식의 로그 타임스탬프를 파싱합니다.
fn parse_log_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, LOG_TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
}

/// 캡처 그룹 2, 3에서 X/Y 좌표를 추출합니다. 둘 다 있어야 유효합니다.
fn extract_coords(caps: &regex::Captures<'_>) -> Option<(f64, f64)> {
    let x: f64 = caps.get(2)?.as_str().parse().ok()?;
    let y: f64 = caps.get(3)?.as_str().parse().ok()?;
    Some((x, y))
}

/// 미션 키를 표시용 이름으로 변환합니다.
///
/// 알려진 키는 매핑 테이블을 사용하고, 그 외에는 접두사/접미사를 제거한 뒤
/// 타이틀 케이스로 변환합니다.
pub fn mission_display_name(raw: &str) -> String {
    let mapped = match raw {
        // Military bases
        "GA_Military_03_Mis_01" => Some("Military Base Alpha"),
        "GA_Military_04_Mis1" => Some("Military Base Bravo"),
        "GA_Military_04_Mis_2" => Some("Military Base Charlie"),
        "GA_Military_02_mis1" => Some("Military Outpost Delta"),
        "GA_Military_05_Mis_1" => Some("Military Base Echo"),
        "GA_Military_01_Mis_1" => Some("Military Base Foxtrot"),
        // Industrial zones
        "GA_Ind_02_Mis_1" => Some("Industrial Complex Alpha"),
        "GA_Ind_01_Mis_1" => Some("Industrial Complex Beta"),
        "GA_PromZone_Mis_01" => Some("Industrial Zone Beta"),
        "GA_PromZone_Mis_02" => Some("Industrial Zone Gamma"),
        "GA_KhimMash_Mis_01" => Some("Chemical Plant Alpha"),
        "GA_KhimMash_Mis_02" => Some("Chemical Plant Beta"),
        // Settlements
        "GA_Bochki_Mis_1" => Some("Bochki Settlement"),
        "GA_Krasnoe_Mis_1" => Some("Krasnoe Settlement"),
        "GA_Dubovoe_0_Mis_1" => Some("Dubovoe Settlement"),
        "GA_Settle_09_Mis_1" => Some("Northern Settlement"),
        "GA_Settle_05_ChernyLog_mis1" => Some("Cherny Log Settlement"),
        "GA_Beregovoy_mis1" => Some("Beregovoy Settlement"),
        // Resource sites
        "GA_Sawmill_03_Mis_01" => Some("Sawmill Complex Alpha"),
        "GA_Sawmill_01_mis1" => Some("Sawmill Complex Beta"),
        "GA_Sawmill_02_Mis_1" => Some("Sawmill Complex Gamma"),
        "GA_Lighthouse_02_mis1" => Some("Lighthouse Compound"),
        "GA_Bunker_01_mis1" => Some("Underground Bunker"),
        // Special locations
        "GA_Airport_mis_01_Enc2" => Some("Airport Terminal"),
        "GA_Voron_Enc_1" => Some("Voron Stronghold"),
        _ => None,
    };
    if let Some(name) = mapped {
        return name.to_owned();
    }

    // 기계적 폴백: 접두사/미션 접미사 제거 후 타이틀 케이스
    let cleaned = raw
        .replace("GA_", "")
        .replace("_Mis_", " ")
        .replace("_mis", " ")
        .replace("_01", "")
        .replace("_02", "")
        .replace("_03", "")
        .replace("_1", "")
        .replace("_2", "")
        .replace("_3", "")
        .replace("_Enc", " Encounter");
    title_case(&cleaned.replace('_', " "))
}

/// 차량 키를 표시용 이름으로 변환합니다.
pub fn vehicle_display_name(raw: &str) -> String {
    if raw.is_empty() {
        return "Military Vehicle".to_owned();
    }
    let mapped = match raw {
        "BP_Vehicle_Car_01_C" => Some("Civilian Car"),
        "BP_Vehicle_Car_02_C" => Some("Sports Car"),
        "BP_Vehicle_Car_03_C" => Some("Off-Road Vehicle"),
        "BP_Vehicle_Truck_01_C" => Some("Cargo Truck"),
        "BP_Vehicle_Truck_02_C" => Some("Military Truck"),
        "BP_Vehicle_APC_01_C" => Some("Armored Personnel Carrier"),
        "BP_Vehicle_Helicopter_01_C" => Some("Transport Helicopter"),
        "BP_Vehicle_Helicopter_02_C" => Some("Attack Helicopter"),
        "BP_Vehicle_Bike_01_C" => Some("Motorcycle"),
        "BP_Vehicle_Quad_01_C" => Some("ATV Quad Bike"),
        "BP_Vehicle_Boat_01_C" => Some("Patrol Boat"),
        "BP_Vehicle_Boat_02_C" => Some("Speed Boat"),
        _ => None,
    };
    if let Some(name) = mapped {
        return name.to_owned();
    }

    let cleaned = raw
        .replace("BP_SFPSVehicle_", "")
        .replace("BP_Vehicle_", "")
        .replace("_C", "")
        .replace("_01", "")
        .replace("_02", "");
    if cleaned.is_empty() {
        "Military Vehicle".to_owned()
    } else {
        title_case(&cleaned.replace('_', " "))
    }
}

/// 공백으로 구분된 각 단어의 첫 글자를 대문자로 변환합니다.
fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
