//! 서버별 실시간 집계
//!
//! `ServerCounts`는 오직 전체 스캔으로만 다시 계산됩니다. 전이에 따라
//! 증감시키는 방식은 전이 거부/억제와 상호작용하여 표류하기 쉬우므로
//! 쓰지 않습니다. [`recompute`]가 `ServerCounts`의 유일한 작성자입니다.

use deadwatch_core::types::{PlayerState, ServerCounts};

use crate::connection::ConnectionTracker;

/// 플레이어 상태 테이블 전체를 스캔하여 집계를 다시 계산합니다.
///
/// 대기열 수는 `Queued`와 `Connecting`을 모두 포함합니다.
pub fn recompute(tracker: &ConnectionTracker, max_players: u32) -> ServerCounts {
    let mut queue_count = 0;
    let mut player_count = 0;
    for player in tracker.players() {
        match player.state {
            PlayerState::Queued | PlayerState::Connecting => queue_count += 1,
            PlayerState::Joined => player_count += 1,
            PlayerState::Offline | PlayerState::Disconnected => {}
        }
    }
    ServerCounts {
        queue_count,
        player_count,
        max_players,
    }
}
