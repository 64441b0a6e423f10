//! 킬피드 CSV 레코드 파서
//!
//! 서버가 남기는 킬피드 파일의 한 줄은 세미콜론으로 구분된 9개 필드입니다:
//!
//! ```text
//! Timestamp;Killer;KillerID;Victim;VictimID;WeaponOrCause;Distance;KillerPlatform;VictimPlatform
//! ```
//!
//! 파서는 거리 고정(clamp), 자살 판정, 무기명 정규화까지 수행한
//! [`KillRecord`]를 돌려줍니다. 형식이 깨진 줄은 에러로 보고되고 호출자가
//! 건너뜁니다.

use chrono::{DateTime, NaiveDateTime, Utc};

use deadwatch_core::types::KillRecord;

use crate::error::KillfeedError;

/// 킬피드 타임스탬프 1차 형식 (게임 로그와 동일 계열)
const TIMESTAMP_FORMAT_PRIMARY: &str = "%Y.%m.%d-%H.%M.%S";
/// 킬피드 타임스탬프 2차 형식 (일부 서버 설정)
const TIMESTAMP_FORMAT_FALLBACK: &str = "%Y-%m-%d %H:%M:%S";

/// 메뉴 자살의 원본 원인 문자열
const CAUSE_MENU_SUICIDE: &str = "suicide_by_relocation";
/// 낙사의 원본 원인 문자열
const CAUSE_FALLING: &str = "falling";

const FIELD_COUNT: usize = 9;

/// 킬피드 레코드 파서
///
/// 거리 상한은 설정에서 받아 레코드 단위로 고정합니다.
#[derive(Debug, Clone)]
pub struct KillRecordParser {
    max_distance: f64,
}

impl KillRecordParser {
    pub fn new(max_distance: f64) -> Self {
        Self { max_distance }
    }

    /// CSV 한 줄을 파싱합니다.
    ///
    /// # Errors
    /// 필드 수가 맞지 않거나 플레이어 이름이 비어 있으면
    /// [`KillfeedError::Parse`]를 반환합니다.
    pub fn parse_line(&self, line: &str) -> Result<KillRecord, KillfeedError> {
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() != FIELD_COUNT {
            return Err(KillfeedError::Parse {
                reason: format!("expected {} fields, got {}", FIELD_COUNT, fields.len()),
                line: line.to_owned(),
            });
        }

        let killer = fields[1].trim();
        let victim = fields[3].trim();
        if killer.is_empty() || victim.is_empty() {
            return Err(KillfeedError::Parse {
                reason: "empty player name".to_owned(),
                line: line.to_owned(),
            });
        }

        let timestamp = parse_timestamp(fields[0].trim());
        let raw_weapon = fields[5].trim();
        let distance = parse_distance(fields[6].trim(), self.max_distance);

        let is_suicide =
            killer == victim || raw_weapon.eq_ignore_ascii_case(CAUSE_MENU_SUICIDE);
        let weapon = if is_suicide {
            normalize_suicide_cause(raw_weapon)
        } else {
            raw_weapon.to_owned()
        };

        Ok(KillRecord {
            timestamp,
            killer: killer.to_owned(),
            killer_id: fields[2].trim().to_owned(),
            victim: victim.to_owned(),
            victim_id: fields[4].trim().to_owned(),
            weapon,
            distance,
            killer_platform: fields[7].trim().to_owned(),
            victim_platform: fields[8].trim().to_owned(),
            is_suicide,
            raw_line: line.to_owned(),
        })
    }
}

/// 두 형식을 순서대로 시도하고, 모두 실패하면 현재 시각을 사용합니다.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    for format in [TIMESTAMP_FORMAT_PRIMARY, TIMESTAMP_FORMAT_FALLBACK] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_utc();
        }
    }
    tracing::debug!(raw, "unparseable killfeed timestamp, using current time");
    Utc::now()
}

/// 거리 필드를 파싱합니다. 숫자가 아니면 0.0, 범위는 [0, max]로 고정합니다.
fn parse_distance(raw: &str, max: f64) -> f64 {
    let value = raw.parse::<f64>().unwrap_or(0.0);
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, max)
}

/// 자살 레코드의 원인 문자열을 표시용으로 정규화합니다.
fn normalize_suicide_cause(raw: &str) -> String {
    if raw.eq_ignore_ascii_case(CAUSE_MENU_SUICIDE) {
        "Menu Suicide".to_owned()
    } else if raw.eq_ignore_ascii_case(CAUSE_FALLING) {
        "Falling".to_owned()
    } else {
        "Suicide".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> KillRecordParser {
        KillRecordParser::new(5_000.0)
    }

    fn line(fields: [&str; 9]) -> String {
        fields.join(";")
    }

    #[test]
    fn parses_regular_kill() {
        let raw = line([
            "2024.01.15-12.30.45",
            "Alice",
            "aaa111",
            "Bob",
            "bbb222",
            "AKM",
            "145.7",
            "PC",
            "PS5",
        ]);
        let record = parser().parse_line(&raw).unwrap();
        assert_eq!(record.killer, "Alice");
        assert_eq!(record.victim, "Bob");
        assert_eq!(record.weapon, "AKM");
        assert_eq!(record.distance, 145.7);
        assert!(!record.is_suicide);
        assert_eq!(record.killer_platform, "PC");
        assert_eq!(record.victim_platform, "PS5");
        assert_eq!(record.raw_line, raw);
    }

    #[test]
    fn primary_timestamp_format_is_parsed() {
        let raw = line([
            "2024.01.15-12.30.45",
            "Alice",
            "a",
            "Bob",
            "b",
            "AKM",
            "10",
            "PC",
            "PC",
        ]);
        let record = parser().parse_line(&raw).unwrap();
        assert_eq!(record.timestamp.to_rfc3339(), "2024-01-15T12:30:45+00:00");
    }

    #[test]
    fn fallback_timestamp_format_is_parsed() {
        let raw = line([
            "2024-01-15 12:30:45",
            "Alice",
            "a",
            "Bob",
            "b",
            "AKM",
            "10",
            "PC",
            "PC",
        ]);
        let record = parser().parse_line(&raw).unwrap();
        assert_eq!(record.timestamp.to_rfc3339(), "2024-01-15T12:30:45+00:00");
    }

    #[test]
    fn garbage_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let raw = line(["not-a-date", "Alice", "a", "Bob", "b", "AKM", "10", "PC", "PC"]);
        let record = parser().parse_line(&raw).unwrap();
        assert!(record.timestamp >= before);
    }

    #[test]
    fn self_kill_is_suicide() {
        let raw = line([
            "2024.01.15-12.30.45",
            "Alice",
            "a",
            "Alice",
            "a",
            "Grenade",
            "0",
            "PC",
            "PC",
        ]);
        let record = parser().parse_line(&raw).unwrap();
        assert!(record.is_suicide);
        assert_eq!(record.weapon, "Suicide");
    }

    #[test]
    fn menu_suicide_is_normalized() {
        let raw = line([
            "2024.01.15-12.30.45",
            "Alice",
            "a",
            "Alice",
            "a",
            "Suicide_by_relocation",
            "0",
            "PC",
            "PC",
        ]);
        let record = parser().parse_line(&raw).unwrap();
        assert!(record.is_suicide);
        assert_eq!(record.weapon, "Menu Suicide");
    }

    #[test]
    fn menu_suicide_cause_marks_suicide_even_with_distinct_names() {
        // 일부 서버 빌드는 메뉴 자살에서 killer 칸에 다른 값을 남김
        let raw = line([
            "2024.01.15-12.30.45",
            "Alice",
            "a",
            "Bob",
            "b",
            "suicide_by_relocation",
            "0",
            "PC",
            "PC",
        ]);
        let record = parser().parse_line(&raw).unwrap();
        assert!(record.is_suicide);
        assert_eq!(record.weapon, "Menu Suicide");
    }

    #[test]
    fn falling_suicide_keeps_falling_label() {
        let raw = line([
            "2024.01.15-12.30.45",
            "Bob",
            "b",
            "Bob",
            "b",
            "Falling",
            "0",
            "PC",
            "PC",
        ]);
        let record = parser().parse_line(&raw).unwrap();
        assert!(record.is_suicide);
        assert_eq!(record.weapon, "Falling");
    }

    #[test]
    fn distance_is_clamped_to_max() {
        let raw = line([
            "2024.01.15-12.30.45",
            "Alice",
            "a",
            "Bob",
            "b",
            "SVD",
            "99999",
            "PC",
            "PC",
        ]);
        let record = parser().parse_line(&raw).unwrap();
        assert_eq!(record.distance, 5_000.0);
    }

    #[test]
    fn invalid_distance_becomes_zero() {
        for bad in ["abc", "", "N/A", "-12.5"] {
            let raw = line([
                "2024.01.15-12.30.45",
                "Alice",
                "a",
                "Bob",
                "b",
                "SVD",
                bad,
                "PC",
                "PC",
            ]);
            let record = parser().parse_line(&raw).unwrap();
            assert!(
                record.distance == 0.0,
                "distance {:?} should clamp to 0.0",
                bad
            );
        }
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        let err = parser().parse_line("2024.01.15-12.30.45;Alice;Bob").unwrap_err();
        assert!(matches!(err, KillfeedError::Parse { .. }));
    }

    #[test]
    fn empty_player_name_is_rejected() {
        let raw = line([
            "2024.01.15-12.30.45",
            "",
            "a",
            "Bob",
            "b",
            "AKM",
            "10",
            "PC",
            "PC",
        ]);
        assert!(parser().parse_line(&raw).is_err());

        let raw = line([
            "2024.01.15-12.30.45",
            "Alice",
            "a",
            "  ",
            "b",
            "AKM",
            "10",
            "PC",
            "PC",
        ]);
        assert!(parser().parse_line(&raw).is_err());
    }
}
