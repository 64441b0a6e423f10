//! 파일 상태 추적기
//!
//! 원격 로그 파일의 (크기, 라인 수, 마지막 라인)을 이전 관측과 비교하여
//! 파일이 회전(rotation)했는지 판정합니다. 네트워크나 디스크 I/O 없이
//! 순수한 결정 함수와 인메모리 저장만 수행하므로 독립적으로 테스트할 수
//! 있습니다. 영속화는 파이프라인이 `StateStore`를 통해 배치로 처리합니다.

use std::collections::HashMap;

use chrono::Utc;
use deadwatch_core::types::{FeedKind, FileIngestState, ServerKey};

/// 회전 판정: 크기 또는 라인 수가 이 비율 이상 줄면 리셋
const DROP_RESET_RATIO: f64 = 0.90;
/// 크기가 이 비율 이상 줄고 마지막 라인도 사라졌으면 리셋
const SHRINK_SUSPECT_RATIO: f64 = 0.20;

/// 읽기 계획
///
/// `Reset`이면 호출자는 파일 전체를 읽고, `Continue`면 `from_line` 이후의
/// 라인만 읽습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPlan {
    /// 파일이 회전했거나 첫 관측 -- 전체를 읽음
    Reset,
    /// 이어서 읽음 (`from_line`번째 라인부터, 0-기준)
    Continue {
        /// 이전에 처리한 라인 수
        from_line: usize,
    },
}

/// (서버, 피드)별 파일 수집 상태 추적기
pub struct FileTracker {
    states: HashMap<(ServerKey, FeedKind), FileIngestState>,
    /// 회전 판정 시 꼬리 비교에 사용하는 최대 라인 수
    reset_tail_lines: usize,
}

impl FileTracker {
    /// 새 추적기를 생성합니다.
    pub fn new(reset_tail_lines: usize) -> Self {
        Self {
            states: HashMap::new(),
            reset_tail_lines,
        }
    }

    /// 저장소에서 복원한 상태를 주입합니다.
    pub fn seed(&mut self, key: ServerKey, kind: FeedKind, state: FileIngestState) {
        self.states.insert((key, kind), state);
    }

    /// 현재 저장된 상태를 반환합니다.
    pub fn state(&self, key: &ServerKey, kind: FeedKind) -> Option<&FileIngestState> {
        self.states.get(&(key.clone(), kind))
    }

    /// 새 관측과 저장된 상태를 비교하여 읽기 계획을 결정합니다.
    ///
    /// # 판정 규칙 (순서대로)
    /// 1. 저장된 상태 없음 -> `Reset` (첫 관측, 전체 처리)
    /// 2. 저장된 라인 수 > 현재 라인 수 -> `Reset` (강제)
    /// 3. 크기 또는 라인 수가 90% 이상 감소 -> `Reset`
    /// 4. 크기가 20% 이상 감소했고 저장된 마지막 라인이 파일 꼬리
    ///    (마지막 `reset_tail_lines`줄)에 없음 -> `Reset`
    /// 5. 그 외 -> `Continue { from_line: 저장된 라인 수 }`
    pub fn plan(
        &self,
        key: &ServerKey,
        kind: FeedKind,
        file_size: u64,
        lines: &[&str],
    ) -> ReadPlan {
        let Some(prev) = self.state(key, kind) else {
            return ReadPlan::Reset;
        };

        let total_lines = lines.len();

        if prev.line_count > total_lines {
            tracing::debug!(
                server = %key,
                stored = prev.line_count,
                current = total_lines,
                "stored line count exceeds file, forcing reset"
            );
            return ReadPlan::Reset;
        }

        let size_drop = drop_ratio(prev.file_size, file_size);
        let line_drop = drop_ratio(prev.line_count as u64, total_lines as u64);
        if size_drop >= DROP_RESET_RATIO || line_drop >= DROP_RESET_RATIO {
            return ReadPlan::Reset;
        }

        if size_drop >= SHRINK_SUSPECT_RATIO && !prev.last_line.is_empty() {
            let tail_start = total_lines.saturating_sub(self.reset_tail_lines);
            let tail = &lines[tail_start..];
            if !tail.iter().any(|line| *line == prev.last_line) {
                return ReadPlan::Reset;
            }
        }

        ReadPlan::Continue {
            from_line: prev.line_count,
        }
    }

    /// 수집 완료 후 새 상태를 기록합니다. 수집 1회당 정확히 한 번 호출됩니다.
    pub fn commit(
        &mut self,
        key: ServerKey,
        kind: FeedKind,
        file_size: u64,
        line_count: usize,
        last_line: String,
    ) -> FileIngestState {
        let state = FileIngestState {
            file_size,
            line_count,
            last_line,
            last_updated: Utc::now(),
        };
        self.states.insert((key, kind), state.clone());
        state
    }

    /// 서버의 저장 상태를 제거합니다.
    pub fn forget(&mut self, key: &ServerKey, kind: FeedKind) {
        self.states.remove(&(key.clone(), kind));
    }
}

/// 이전 값 대비 감소 비율을 반환합니다. 증가했으면 0.0입니다.
fn drop_ratio(prev: u64, current: u64) -> f64 {
    if prev == 0 || current >= prev {
        return 0.0;
    }
    (prev - current) as f64 / prev as f64
}
