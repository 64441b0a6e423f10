//! 플레이어 접속 상태 머신
//!
//! 서버 1대당 [`ConnectionTracker`] 1개가 플레이어별 접속 수명주기
//! (`Offline -> Queued -> Connecting -> Joined -> Disconnected`)를 추적합니다.
//!
//! 규칙:
//! - 같은 플레이어의 같은 종류 이벤트가 억제 윈도우 내에 반복되면 전이 유효성
//!   검사 이전에 먼저 드롭합니다 (업스트림 재전송 흡수).
//! - 허용되지 않은 전이는 warning 로그 후 무시합니다. 치명적 에러가 아닙니다.
//! - `player_registered`는 `Offline`에서 직접 수락됩니다 (대기열 이벤트 유실
//!   허용). 직접 합류도 player_count에 반영되어야 합니다.
//! - 합류 알림은 전이 성공 + 이름 해석 가능일 때만, 퇴장 알림은 이전 상태가
//!   `Joined`였을 때만 발생합니다.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use deadwatch_core::types::PlayerState;

use crate::patterns::LogEvent;

/// 플레이어당 보존하는 전이 감사 기록의 최대 개수
const MAX_AUDIT_ENTRIES: usize = 50;

/// 중복 이벤트 억제 정책
///
/// 같은 플레이어에 대해 같은 종류의 이벤트가 윈도우 내에 다시 관측되면
/// 중복으로 판정합니다.
#[derive(Debug, Clone)]
pub struct SuppressionPolicy {
    window: Duration,
}

impl SuppressionPolicy {
    /// 초 단위 윈도우로 정책을 생성합니다.
    pub fn new(window_secs: u64) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
        }
    }

    /// 윈도우 길이를 반환합니다.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// 마지막으로 적용된 이벤트와 비교하여 중복 여부를 판정합니다.
    pub fn is_duplicate(
        &self,
        last_event: Option<&(&'static str, DateTime<Utc>)>,
        kind: &'static str,
        now: DateTime<Utc>,
    ) -> bool {
        match last_event {
            Some((last_kind, last_at)) => *last_kind == kind && now - *last_at < self.window,
            None => false,
        }
    }
}

/// 전이 감사 기록 한 건
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: PlayerState,
    pub to: PlayerState,
    pub kind: &'static str,
    pub at: DateTime<Utc>,
}

/// 플레이어 접속 레코드
///
/// 첫 이벤트 관측 시 생성되고, 오래된 `Disconnected` 정리 또는 서버 리셋
/// 때만 제거됩니다.
#[derive(Debug, Clone)]
pub struct PlayerConnection {
    /// 플레이어 ID (EOS id, 소문자)
    pub player_id: String,
    /// 표시 이름 (queue_join에서 역채움)
    pub player_name: Option<String>,
    /// 현재 상태
    pub state: PlayerState,
    /// 마지막으로 적용된 이벤트 (종류, 시각)
    last_event: Option<(&'static str, DateTime<Utc>)>,
    /// 마지막 갱신 시각
    pub updated_at: DateTime<Utc>,
    /// 전이 감사 기록 (최신 `MAX_AUDIT_ENTRIES`건)
    transitions: Vec<Transition>,
}

impl PlayerConnection {
    fn new(player_id: String, now: DateTime<Utc>) -> Self {
        Self {
            player_id,
            player_name: None,
            state: PlayerState::Offline,
            last_event: None,
            updated_at: now,
            transitions: Vec::new(),
        }
    }

    /// 전이 감사 기록을 반환합니다.
    pub fn audit_log(&self) -> &[Transition] {
        &self.transitions
    }
}

/// 사용자에게 전달할 접속 알림
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionNotice {
    /// 합류 (이름 해석 성공 시에만)
    Joined { player_id: String, name: String },
    /// 퇴장 (이전 상태가 Joined였을 때만)
    Left { player_id: String, name: String },
}

/// 이벤트 적용 결과
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 전이 적용됨. 알림이 필요하면 포함됩니다.
    Applied {
        from: PlayerState,
        to: PlayerState,
        notice: Option<ConnectionNotice>,
    },
    /// 억제 윈도우 내 중복으로 드롭됨
    Suppressed,
    /// 현재 상태에서 허용되지 않는 전이 (no-op)
    Rejected { from: PlayerState },
    /// 접속 수명주기와 무관한 이벤트이거나 비활성화된 패턴
    Ignored,
}

/// 서버 1대의 플레이어 접속 상태 추적기
pub struct ConnectionTracker {
    players: HashMap<String, PlayerConnection>,
    policy: SuppressionPolicy,
    /// 비콘(Connecting) 상태 추적 여부. false면 beacon_join은 무시됩니다.
    track_beacon: bool,
    /// 외부 소스(킬 레코드 등)에서 학습한 이름 색인
    name_index: HashMap<String, String>,
}

impl ConnectionTracker {
    /// 새 추적기를 생성합니다.
    pub fn new(policy: SuppressionPolicy, track_beacon: bool) -> Self {
        Self {
            players: HashMap::new(),
            policy,
            track_beacon,
            name_index: HashMap::new(),
        }
    }

    /// 분류된 로그 이벤트를 상태 머신에 적용합니다.
    ///
    /// 접속 수명주기 이벤트가 아니면 `Ignored`를 반환합니다.
    pub fn apply(&mut self, event: &LogEvent, now: DateTime<Utc>) -> Outcome {
        let (player_id, target, captured_name) = match event {
            LogEvent::QueueJoin {
                player_id,
                player_name,
            } => (player_id, PlayerState::Queued, Some(player_name.clone())),
            LogEvent::BeaconJoin { player_id } => {
                if !self.track_beacon {
                    return Outcome::Ignored;
                }
                (player_id, PlayerState::Connecting, None)
            }
            LogEvent::PlayerRegistered { player_id } => (player_id, PlayerState::Joined, None),
            LogEvent::PlayerDisconnected { player_id } => {
                (player_id, PlayerState::Disconnected, None)
            }
            _ => return Outcome::Ignored,
        };
        let kind = event.kind_name();

        let record = self
            .players
            .entry(player_id.clone())
            .or_insert_with(|| PlayerConnection::new(player_id.clone(), now));

        // 중복 억제는 전이 유효성보다 먼저 검사
        if self.policy.is_duplicate(record.last_event.as_ref(), kind, now) {
            tracing::debug!(player = %player_id, event = kind, "duplicate event suppressed");
            return Outcome::Suppressed;
        }

        let from = record.state;
        if !transition_allowed(from, target) {
            tracing::warn!(
                player = %player_id,
                event = kind,
                from = %from,
                to = %target,
                "transition rejected, state unchanged"
            );
            return Outcome::Rejected { from };
        }

        record.state = target;
        record.last_event = Some((kind, now));
        record.updated_at = now;
        if let Some(name) = captured_name {
            record.player_name = Some(name);
        }
        record.transitions.push(Transition {
            from,
            to: target,
            kind,
            at: now,
        });
        if record.transitions.len() > MAX_AUDIT_ENTRIES {
            record.transitions.remove(0);
        }

        let notice = match target {
            PlayerState::Joined => self
                .resolve_name(player_id)
                .map(|name| ConnectionNotice::Joined {
                    player_id: player_id.clone(),
                    name: name.to_owned(),
                }),
            PlayerState::Disconnected if from == PlayerState::Joined => {
                let name = self
                    .resolve_name(player_id)
                    .unwrap_or(player_id.as_str())
                    .to_owned();
                Some(ConnectionNotice::Left {
                    player_id: player_id.clone(),
                    name,
                })
            }
            _ => None,
        };

        Outcome::Applied {
            from,
            to: target,
            notice,
        }
    }

    /// 이름 해석: 캡처된 이름 -> 외부 색인 순서로 시도합니다.
    pub fn resolve_name(&self, player_id: &str) -> Option<&str> {
        if let Some(name) = self
            .players
            .get(player_id)
            .and_then(|r| r.player_name.as_deref())
        {
            return Some(name);
        }
        self.name_index.get(player_id).map(String::as_str)
    }

    /// 외부 소스(킬 레코드의 killer/victim 등)에서 이름을 학습합니다.
    pub fn learn_name(&mut self, player_id: impl Into<String>, name: impl Into<String>) {
        self.name_index.insert(player_id.into(), name.into());
    }

    /// 플레이어 레코드를 조회합니다.
    pub fn player(&self, player_id: &str) -> Option<&PlayerConnection> {
        self.players.get(player_id)
    }

    /// 모든 플레이어 레코드를 순회합니다.
    pub fn players(&self) -> impl Iterator<Item = &PlayerConnection> {
        self.players.values()
    }

    /// 추적 중인 플레이어 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// 추적 중인 플레이어가 없으면 true입니다.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// `max_age`보다 오래된 `Disconnected` 레코드를 제거합니다.
    ///
    /// 제거된 레코드 수를 반환합니다.
    pub fn sweep_stale(&mut self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let before = self.players.len();
        self.players.retain(|_, record| {
            record.state != PlayerState::Disconnected || now - record.updated_at <= max_age
        });
        before - self.players.len()
    }

    /// 모든 플레이어 상태를 초기화합니다 (파일 리셋 경로).
    pub fn reset(&mut self) {
        self.players.clear();
    }
}

/// 이벤트별 허용 전이 테이블
fn transition_allowed(from: PlayerState, to: PlayerState) -> bool {
    use PlayerState::*;
    match to {
        Queued => matches!(from, Offline | Disconnected),
        Connecting => matches!(from, Offline | Queued | Disconnected),
        Joined => matches!(from, Offline | Queued | Connecting | Disconnected),
        Disconnected => matches!(from, Queued | Connecting | Joined),
        Offline => false,
    }
}
