//! 원본 줄 중복 제거 집합
//!
//! 킬피드 파일은 매 사이클 전체를 다시 읽으므로, 이미 처리한 줄을 걸러낼
//! 삽입 순서 기반 집합이 필요합니다. 용량을 넘으면 가장 오래된 항목부터
//! 버립니다. 서버가 파일을 잘라내도 최근 레코드는 중복 판정이 유지됩니다.

use std::collections::{HashSet, VecDeque};

/// 용량이 제한된 삽입 순서 중복 제거 집합
#[derive(Debug, Clone)]
pub struct SeenLines {
    set: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenLines {
    pub fn new(capacity: usize) -> Self {
        Self {
            set: HashSet::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// 줄이 이미 처리됐는지 확인합니다.
    pub fn contains(&self, line: &str) -> bool {
        self.set.contains(line)
    }

    /// 줄을 집합에 넣습니다. 용량 초과 시 가장 오래된 항목을 퇴출합니다.
    pub fn insert(&mut self, line: &str) {
        if self.set.contains(line) {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.set.insert(line.to_owned());
        self.order.push_back(line.to_owned());
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
