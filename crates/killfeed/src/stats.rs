//! PvP 통계 집계
//!
//! 킬 레코드를 (서버, 플레이어)별 [`PvpStats`]에 누적합니다. 책임은 순수한
//! 집계만이며 저장은 파이프라인이 [`StateStore`](deadwatch_core::pipeline::StateStore)를
//! 통해 수행합니다.

use std::collections::HashMap;

use deadwatch_core::types::{KillRecord, PvpStats};

/// 서버 1대의 플레이어별 통계 장부
#[derive(Debug, Default, Clone)]
pub struct StatsBook {
    entries: HashMap<String, PvpStats>,
}

impl StatsBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장소에서 불러온 항목으로 장부를 복원합니다.
    pub fn from_entries(entries: Vec<(String, PvpStats)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// 저장용 스냅샷을 만듭니다. 순서는 플레이어 이름 기준으로 고정됩니다.
    pub fn to_entries(&self) -> Vec<(String, PvpStats)> {
        let mut entries: Vec<(String, PvpStats)> = self
            .entries
            .iter()
            .map(|(name, stats)| (name.clone(), stats.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// 킬 레코드 하나를 장부에 반영합니다.
    ///
    /// 자살은 희생자의 suicides만 올리고 연속 킬을 끊습니다. 일반 킬은
    /// 킬러의 킬/연속 킬/거리 기록을, 희생자의 데스를 갱신합니다.
    pub fn apply(&mut self, record: &KillRecord) {
        if record.is_suicide {
            let victim = self.entries.entry(record.victim.clone()).or_default();
            victim.suicides += 1;
            victim.current_streak = 0;
            victim.recompute_kdr();
            return;
        }

        let killer = self.entries.entry(record.killer.clone()).or_default();
        killer.kills += 1;
        killer.current_streak += 1;
        killer.best_streak = killer.best_streak.max(killer.current_streak);
        if record.distance > 0.0 {
            killer.total_distance += record.distance;
            if record.distance > killer.personal_best_distance {
                killer.personal_best_distance = record.distance;
            }
        }
        killer.recompute_kdr();

        let victim = self.entries.entry(record.victim.clone()).or_default();
        victim.deaths += 1;
        victim.current_streak = 0;
        victim.recompute_kdr();
    }

    /// 플레이어의 통계를 조회합니다.
    pub fn get(&self, player: &str) -> Option<&PvpStats> {
        self.entries.get(player)
    }

    /// 집계된 플레이어 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn kill(killer: &str, victim: &str, distance: f64) -> KillRecord {
        KillRecord {
            timestamp: Utc::now(),
            killer: killer.to_owned(),
            killer_id: format!("{killer}-id"),
            victim: victim.to_owned(),
            victim_id: format!("{victim}-id"),
            weapon: "AKM".to_owned(),
            distance,
            killer_platform: "PC".to_owned(),
            victim_platform: "PC".to_owned(),
            is_suicide: false,
            raw_line: String::new(),
        }
    }

    fn suicide(victim: &str) -> KillRecord {
        KillRecord {
            timestamp: Utc::now(),
            killer: victim.to_owned(),
            killer_id: format!("{victim}-id"),
            victim: victim.to_owned(),
            victim_id: format!("{victim}-id"),
            weapon: "Menu Suicide".to_owned(),
            distance: 0.0,
            killer_platform: "PC".to_owned(),
            victim_platform: "PC".to_owned(),
            is_suicide: true,
            raw_line: String::new(),
        }
    }

    #[test]
    fn kill_updates_both_sides() {
        let mut book = StatsBook::new();
        book.apply(&kill("Alice", "Bob", 120.0));

        let alice = book.get("Alice").unwrap();
        assert_eq!(alice.kills, 1);
        assert_eq!(alice.deaths, 0);
        assert_eq!(alice.current_streak, 1);
        assert_eq!(alice.personal_best_distance, 120.0);
        assert_eq!(alice.total_distance, 120.0);

        let bob = book.get("Bob").unwrap();
        assert_eq!(bob.deaths, 1);
        assert_eq!(bob.kills, 0);
    }

    #[test]
    fn death_resets_streak() {
        let mut book = StatsBook::new();
        book.apply(&kill("Alice", "Bob", 50.0));
        book.apply(&kill("Alice", "Bob", 60.0));
        assert_eq!(book.get("Alice").unwrap().current_streak, 2);

        book.apply(&kill("Bob", "Alice", 10.0));
        let alice = book.get("Alice").unwrap();
        assert_eq!(alice.current_streak, 0);
        assert_eq!(alice.best_streak, 2);
    }

    #[test]
    fn suicide_counts_only_suicides() {
        let mut book = StatsBook::new();
        book.apply(&kill("Alice", "Bob", 50.0));
        book.apply(&suicide("Alice"));

        let alice = book.get("Alice").unwrap();
        assert_eq!(alice.suicides, 1);
        assert_eq!(alice.kills, 1);
        assert_eq!(alice.deaths, 0);
        assert_eq!(alice.current_streak, 0);
    }

    #[test]
    fn personal_best_only_grows() {
        let mut book = StatsBook::new();
        book.apply(&kill("Alice", "Bob", 300.0));
        book.apply(&kill("Alice", "Bob", 150.0));
        let alice = book.get("Alice").unwrap();
        assert_eq!(alice.personal_best_distance, 300.0);
        assert_eq!(alice.total_distance, 450.0);
    }

    #[test]
    fn zero_distance_does_not_touch_distance_stats() {
        let mut book = StatsBook::new();
        book.apply(&kill("Alice", "Bob", 0.0));
        let alice = book.get("Alice").unwrap();
        assert_eq!(alice.personal_best_distance, 0.0);
        assert_eq!(alice.total_distance, 0.0);
        assert_eq!(alice.kills, 1);
    }

    #[test]
    fn kdr_with_and_without_deaths() {
        let mut book = StatsBook::new();
        for _ in 0..10 {
            book.apply(&kill("Alice", "Bob", 10.0));
        }
        assert_eq!(book.get("Alice").unwrap().kdr, 10.0);

        for _ in 0..4 {
            book.apply(&kill("Bob", "Alice", 10.0));
        }
        assert_eq!(book.get("Alice").unwrap().kdr, 2.5);
    }

    #[test]
    fn snapshot_round_trip_is_stable() {
        let mut book = StatsBook::new();
        book.apply(&kill("Zoe", "Alice", 10.0));
        book.apply(&kill("Alice", "Zoe", 20.0));

        let entries = book.to_entries();
        assert_eq!(entries[0].0, "Alice");
        assert_eq!(entries[1].0, "Zoe");

        let restored = StatsBook::from_entries(entries);
        assert_eq!(restored.get("Alice").unwrap().kills, 1);
        assert_eq!(restored.len(), 2);
    }
}
