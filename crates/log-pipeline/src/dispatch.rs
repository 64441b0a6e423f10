//! 이벤트 전달 규칙
//!
//! 어떤 월드 이벤트 종류가 사용자에게 보이는지를 한 곳에서 결정합니다.
//! 미션은 READY 전환만 알리고, 보급/헬기 추락/상인은 항상 알립니다.
//! 차량 증감, 리스폰 타이머, 서버 설정 라인은 내부 상태 갱신 전용입니다.
//! 접속 이벤트의 알림 게이팅은 상태 머신([`crate::connection`])이 담당합니다.

use deadwatch_core::event::WorldEventKind;

use crate::patterns::{LogEvent, MissionState, mission_display_name};

/// 분류된 이벤트가 사용자 알림 대상인지 판정합니다.
pub fn is_user_visible(event: &LogEvent) -> bool {
    match event {
        LogEvent::MissionSwitch { state, .. } => *state == MissionState::Ready,
        LogEvent::Airdrop { .. } | LogEvent::HeliCrash { .. } | LogEvent::Trader { .. } => true,
        LogEvent::MissionRespawn { .. }
        | LogEvent::VehicleAdded { .. }
        | LogEvent::VehicleDeleted { .. }
        | LogEvent::MaxPlayerCount { .. } => false,
        // 접속 이벤트는 상태 머신의 게이팅 결과를 따름
        LogEvent::QueueJoin { .. }
        | LogEvent::BeaconJoin { .. }
        | LogEvent::PlayerRegistered { .. }
        | LogEvent::PlayerDisconnected { .. } => false,
    }
}

/// 사용자에게 보이는 월드 이벤트의 페이로드를 만듭니다.
///
/// [`is_user_visible`]이 참인 월드 이벤트에 대해서만 `Some`을 반환합니다.
pub fn world_event_payload(event: &LogEvent) -> Option<(WorldEventKind, String, Option<(f64, f64)>)> {
    match event {
        LogEvent::MissionSwitch { mission, state } if *state == MissionState::Ready => Some((
            WorldEventKind::MissionReady,
            mission_display_name(mission),
            None,
        )),
        LogEvent::Airdrop { coords, .. } => {
            Some((WorldEventKind::Airdrop, "Airdrop".to_owned(), *coords))
        }
        LogEvent::HeliCrash { coords, .. } => Some((
            WorldEventKind::HeliCrash,
            "Helicopter Crash".to_owned(),
            *coords,
        )),
        LogEvent::Trader { coords, .. } => {
            Some((WorldEventKind::Trader, "Trader".to_owned(), *coords))
        }
        _ => None,
    }
}
