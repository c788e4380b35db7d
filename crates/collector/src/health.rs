//! 건강도 점수 계산
//!
//! 메타데이터에서 0~100 범위의 결정적 점수를 계산합니다.
//!
//! | 항목 | 점수 |
//! |------|------|
//! | 마지막 릴리스 180일 미만 | 40 |
//! | 365일 미만 | 30 |
//! | 730일 미만 | 20 |
//! | 그 이상 | 5 |
//! | 릴리스 시각 없음/파싱 불가 | 0 |
//! | 저장소 URL 있음 | +20 |
//! | 설명 있음 | +10 |
//! | 라이선스 있음 (정규화 후) | +10 |

use chrono::{DateTime, NaiveDateTime, Utc};
use stackscout_core::types::PackageMetadata;

/// 점수 상한
pub const MAX_SCORE: u8 = 100;

const REPOSITORY_POINTS: u32 = 20;
const DESCRIPTION_POINTS: u32 = 10;
const LICENSE_POINTS: u32 = 10;

/// (기준 일수, 점수) -- 나이가 기준 일수 미만이면 해당 점수
const RECENCY_TIERS: [(i64, u32); 3] = [(180, 40), (365, 30), (730, 20)];
const STALE_POINTS: u32 = 5;

/// 타임존 없는 ISO 날짜-시각 형식 (PyPI `upload_time` 등)
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// 건강도 점수 계산기
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthScorer;

impl HealthScorer {
    /// 새 점수 계산기를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 현재 시각 기준으로 점수를 계산합니다.
    pub fn score(&self, meta: &PackageMetadata) -> u8 {
        self.score_at(meta, Utc::now())
    }

    /// 주어진 시각 기준으로 점수를 계산합니다.
    pub fn score_at(&self, meta: &PackageMetadata, now: DateTime<Utc>) -> u8 {
        let mut total = recency_points(meta.last_release.as_deref(), now);
        if is_present(meta.repository.as_deref()) {
            total += REPOSITORY_POINTS;
        }
        if is_present(meta.description.as_deref()) {
            total += DESCRIPTION_POINTS;
        }
        if is_present(meta.license.as_deref()) {
            total += LICENSE_POINTS;
        }
        total.min(u32::from(MAX_SCORE)) as u8
    }
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn recency_points(last_release: Option<&str>, now: DateTime<Utc>) -> u32 {
    let Some(released) = last_release.and_then(parse_release_time) else {
        return 0;
    };
    let age_days = (now - released).num_days();
    RECENCY_TIERS
        .iter()
        .find(|(limit, _)| age_days < *limit)
        .map(|(_, points)| *points)
        .unwrap_or(STALE_POINTS)
}

/// 릴리스 시각 문자열을 파싱합니다.
///
/// RFC 3339 (타임존 포함) 또는 타임존 없는 ISO 날짜-시각(UTC로 간주)을 받습니다.
/// 날짜만 있는 값과 그 밖의 형식은 `None`입니다.
pub fn parse_release_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use stackscout_core::types::Source;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn meta(last_release: Option<String>) -> PackageMetadata {
        PackageMetadata {
            name: "requests".to_owned(),
            version: "2.32.3".to_owned(),
            source: Source::Pypi,
            license: None,
            description: None,
            repository: None,
            last_release,
        }
    }

    fn days_ago(days: i64) -> Option<String> {
        Some((now() - Duration::days(days)).to_rfc3339())
    }

    #[test]
    fn fresh_release_with_everything_scores_80() {
        let m = PackageMetadata {
            license: Some("MIT".to_owned()),
            description: Some("HTTP for Humans".to_owned()),
            repository: Some("https://github.com/psf/requests".to_owned()),
            ..meta(days_ago(10))
        };
        assert_eq!(HealthScorer.score_at(&m, now()), 80);
    }

    #[test]
    fn recency_tiers() {
        let s = HealthScorer;
        assert_eq!(s.score_at(&meta(days_ago(0)), now()), 40);
        assert_eq!(s.score_at(&meta(days_ago(179)), now()), 40);
        assert_eq!(s.score_at(&meta(days_ago(180)), now()), 30);
        assert_eq!(s.score_at(&meta(days_ago(364)), now()), 30);
        assert_eq!(s.score_at(&meta(days_ago(365)), now()), 20);
        assert_eq!(s.score_at(&meta(days_ago(729)), now()), 20);
        assert_eq!(s.score_at(&meta(days_ago(730)), now()), 5);
        assert_eq!(s.score_at(&meta(days_ago(5000)), now()), 5);
    }

    #[test]
    fn future_release_counts_as_fresh() {
        assert_eq!(HealthScorer.score_at(&meta(days_ago(-30)), now()), 40);
    }

    #[test]
    fn missing_or_unparseable_release_scores_zero_recency() {
        let s = HealthScorer;
        assert_eq!(s.score_at(&meta(None), now()), 0);
        assert_eq!(s.score_at(&meta(Some("yesterday".to_owned())), now()), 0);
        assert_eq!(s.score_at(&meta(Some("2025-05-30".to_owned())), now()), 0);
    }

    #[test]
    fn naive_timestamps_are_treated_as_utc() {
        let parsed = parse_release_time("2025-05-22T15:37:49").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 5, 22, 15, 37, 49).unwrap());
        assert!(parse_release_time("2025-05-22T15:37:49.123456").is_some());
        assert!(parse_release_time("2025-05-22T15:37:49.123456Z").is_some());
        assert!(parse_release_time("2025-05-22T15:37:49+09:00").is_some());
    }

    #[test]
    fn blank_fields_earn_nothing() {
        let m = PackageMetadata {
            license: Some("  ".to_owned()),
            description: Some(String::new()),
            repository: Some(" ".to_owned()),
            ..meta(None)
        };
        assert_eq!(HealthScorer.score_at(&m, now()), 0);
    }

    #[test]
    fn unknown_license_still_counts() {
        let m = PackageMetadata {
            license: Some("Unknown".to_owned()),
            ..meta(None)
        };
        assert_eq!(HealthScorer.score_at(&m, now()), 10);
    }

    proptest! {
        #[test]
        fn score_is_always_within_bounds(
            release in proptest::option::of(".{0,30}"),
            offset_days in -4000i64..4000,
            use_offset in any::<bool>(),
            license in proptest::option::of(".{0,10}"),
            description in proptest::option::of(".{0,10}"),
            repository in proptest::option::of(".{0,10}"),
        ) {
            let last_release = if use_offset { days_ago(offset_days) } else { release };
            let m = PackageMetadata {
                license,
                description,
                repository,
                ..meta(last_release)
            };
            let score = HealthScorer.score_at(&m, now());
            prop_assert!(score <= MAX_SCORE);
        }
    }
}
