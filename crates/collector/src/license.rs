//! 라이선스 정규화
//!
//! 레지스트리가 보고하는 자유 형식 라이선스 문자열을 표준 식별자
//! (`MIT`, `Apache-2.0`, `GPL-3.0` 등)로 변환합니다.
//!
//! 규칙은 순서대로 평가되며 처음 일치한 규칙이 결과를 결정합니다.
//! 모든 비교는 앞뒤 공백을 제거한 뒤 대소문자를 무시하고 수행합니다.
//!
//! # 불변식
//!
//! 정규화는 멱등입니다: `normalize(normalize(x)) == normalize(x)`.
//! 이를 위해 모든 표준 식별자는 자기 자신으로 정규화되어야 하며,
//! [`LicenseNormalizer::new`]가 생성 시점에 이를 검증합니다.

use stackscout_core::config::LicenseRuleConfig;

use crate::error::CollectorError;

/// 빈 입력에 대한 정규화 결과
pub const UNKNOWN_LICENSE: &str = "Unknown";

/// 규칙 매칭 방식
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatcher {
    /// 나열된 문구 중 하나와 정확히 일치
    Exact(Vec<String>),
    /// 나열된 부분 문자열을 모두 포함
    ContainsAll(Vec<String>),
}

impl RuleMatcher {
    fn matches(&self, lowered: &str) -> bool {
        match self {
            Self::Exact(phrases) => phrases.iter().any(|p| p == lowered),
            Self::ContainsAll(parts) => parts.iter().all(|p| lowered.contains(p.as_str())),
        }
    }
}

/// 정규화 규칙 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRule {
    canonical: String,
    matcher: RuleMatcher,
}

impl LicenseRule {
    /// 정확히 일치하는 문구 목록으로 규칙을 생성합니다.
    pub fn exact(canonical: &str, phrases: &[&str]) -> Self {
        Self {
            canonical: canonical.to_owned(),
            matcher: RuleMatcher::Exact(lower_all(phrases.iter().copied())),
        }
    }

    /// 모두 포함되어야 하는 부분 문자열 목록으로 규칙을 생성합니다.
    pub fn contains_all(canonical: &str, parts: &[&str]) -> Self {
        Self {
            canonical: canonical.to_owned(),
            matcher: RuleMatcher::ContainsAll(lower_all(parts.iter().copied())),
        }
    }

    /// 설정 파일의 규칙 표현에서 생성합니다.
    pub fn from_config(rule: &LicenseRuleConfig) -> Result<Self, CollectorError> {
        let canonical = rule.canonical.trim();
        if canonical.is_empty() {
            return Err(CollectorError::Config {
                field: "license.rules.canonical".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        let matcher = match (rule.exact.is_empty(), rule.contains.is_empty()) {
            (false, true) => RuleMatcher::Exact(lower_all(rule.exact.iter().map(String::as_str))),
            (true, false) => {
                RuleMatcher::ContainsAll(lower_all(rule.contains.iter().map(String::as_str)))
            }
            _ => {
                return Err(CollectorError::Config {
                    field: format!("license.rules[{canonical}]"),
                    reason: "exactly one of 'exact' or 'contains' must be set".to_owned(),
                });
            }
        };
        Ok(Self {
            canonical: canonical.to_owned(),
            matcher,
        })
    }

    /// 표준 식별자
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// 매칭 방식
    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }
}

fn lower_all<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    items
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 기본 규칙 표
///
/// 정확 일치 규칙이 모두 부분 문자열 규칙보다 앞에 옵니다.
/// 부분 문자열 규칙 안에서는 더 구체적인 규칙(LGPL, AGPL)이 GPL보다 앞에 옵니다.
fn default_rules() -> Vec<LicenseRule> {
    vec![
        // ─── 정확 일치 ───
        LicenseRule::exact(
            "MIT",
            &["mit", "mit license", "the mit license", "expat", "mit/expat"],
        ),
        LicenseRule::exact(
            "Apache-2.0",
            &[
                "apache-2.0",
                "apache 2.0",
                "apache 2",
                "apache2",
                "apache license 2.0",
                "apache license, version 2.0",
                "apache license version 2.0",
                "apache software license",
                "asl 2.0",
            ],
        ),
        LicenseRule::exact(
            "AGPL-3.0",
            &[
                "agpl-3.0",
                "agpl-3.0-only",
                "agpl-3.0-or-later",
                "agplv3",
                "gnu affero general public license v3",
                "gnu affero general public license v3.0",
            ],
        ),
        LicenseRule::exact(
            "LGPL-2.1",
            &[
                "lgpl-2.1",
                "lgpl-2.1-only",
                "lgpl-2.1-or-later",
                "lgplv2.1",
                "gnu lesser general public license v2.1",
            ],
        ),
        LicenseRule::exact(
            "LGPL-2.0",
            &[
                "lgpl-2.0",
                "lgpl-2.0-only",
                "lgpl-2.0-or-later",
                "lgpl-2.0+",
                "lgplv2",
                "lgplv2+",
                "gnu library general public license v2",
                "gnu library or lesser general public license (lgpl)",
            ],
        ),
        LicenseRule::exact(
            "LGPL-3.0",
            &[
                "lgpl-3.0",
                "lgpl-3.0-only",
                "lgpl-3.0-or-later",
                "lgplv3",
                "gnu lesser general public license v3.0",
                "gnu lesser general public license v3 (lgplv3)",
            ],
        ),
        LicenseRule::exact(
            "GPL-3.0",
            &[
                "gpl-3.0",
                "gpl-3.0-only",
                "gpl-3.0-or-later",
                "gplv3",
                "gpl v3",
                "gnu gpl v3",
                "gnu general public license v3.0",
                "gnu general public license v3 (gplv3)",
            ],
        ),
        LicenseRule::exact(
            "GPL-2.0",
            &[
                "gpl-2.0",
                "gpl-2.0-only",
                "gpl-2.0-or-later",
                "gplv2",
                "gpl v2",
                "gnu gpl v2",
                "gnu general public license v2.0",
                "gnu general public license v2 (gplv2)",
            ],
        ),
        LicenseRule::exact(
            "BSD-3-Clause",
            &[
                "bsd-3-clause",
                "bsd 3-clause",
                "bsd 3-clause license",
                "bsd-3",
                "new bsd license",
                "modified bsd license",
                "bsd 3-clause \"new\" or \"revised\" license",
            ],
        ),
        LicenseRule::exact(
            "BSD-4-Clause",
            &[
                "bsd-4-clause",
                "bsd 4-clause",
                "bsd 4-clause license",
                "original bsd license",
            ],
        ),
        LicenseRule::exact(
            "0BSD",
            &["0bsd", "bsd zero clause license", "zero-clause bsd"],
        ),
        LicenseRule::exact(
            "BSD-2-Clause",
            &[
                "bsd-2-clause",
                "bsd 2-clause",
                "bsd 2-clause license",
                "simplified bsd license",
                "freebsd license",
                "bsd 2-clause \"simplified\" license",
            ],
        ),
        LicenseRule::exact(
            "MPL-2.0",
            &["mpl-2.0", "mpl 2.0", "mozilla public license 2.0"],
        ),
        LicenseRule::exact("ISC", &["isc", "isc license", "isc license (iscl)"]),
        // ─── 부분 문자열 ───
        LicenseRule::contains_all("MIT", &["mit license"]),
        LicenseRule::contains_all("Apache-2.0", &["apache", "2.0"]),
        LicenseRule::contains_all("AGPL-3.0", &["affero", "3"]),
        LicenseRule::contains_all("LGPL-2.1", &["lesser general public license", "2.1"]),
        LicenseRule::contains_all("LGPL-2.1", &["lgpl", "2.1"]),
        LicenseRule::contains_all("LGPL-3.0", &["lesser general public license", "3"]),
        LicenseRule::contains_all("LGPL-3.0", &["lgpl", "3"]),
        LicenseRule::contains_all("LGPL-2.0", &["library general public license"]),
        LicenseRule::contains_all("LGPL-2.0", &["lesser general public license", "2"]),
        LicenseRule::contains_all("LGPL-2.0", &["lgpl", "2"]),
        LicenseRule::contains_all("GPL-3.0", &["general public license", "3"]),
        LicenseRule::contains_all("GPL-3.0", &["gpl", "3"]),
        LicenseRule::contains_all("GPL-2.0", &["general public license", "2"]),
        LicenseRule::contains_all("GPL-2.0", &["gpl", "2"]),
        LicenseRule::contains_all("BSD-2-Clause", &["bsd", "2-clause"]),
        LicenseRule::contains_all("BSD-2-Clause", &["bsd", "simplified"]),
        LicenseRule::contains_all("BSD-4-Clause", &["bsd", "4-clause"]),
        LicenseRule::contains_all("0BSD", &["0bsd"]),
        LicenseRule::contains_all("BSD-3-Clause", &["bsd"]),
        LicenseRule::contains_all("MPL-2.0", &["mozilla public license", "2.0"]),
    ]
}

/// 라이선스 정규화기
///
/// 규칙 표는 생성 후 변경되지 않으므로 `Arc`로 여러 워커가 공유할 수 있습니다.
#[derive(Debug, Clone)]
pub struct LicenseNormalizer {
    rules: Vec<LicenseRule>,
}

impl Default for LicenseNormalizer {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl LicenseNormalizer {
    /// 주어진 규칙 표로 정규화기를 생성합니다.
    ///
    /// # Errors
    ///
    /// 표준 식별자가 자기 자신으로 정규화되지 않으면 `CollectorError::Config`
    pub fn new(rules: Vec<LicenseRule>) -> Result<Self, CollectorError> {
        let normalizer = Self { rules };
        normalizer.check_fixed_points()?;
        Ok(normalizer)
    }

    /// 기본 규칙 뒤에 설정 파일의 규칙을 덧붙인 정규화기를 생성합니다.
    pub fn with_extra_rules(extra: &[LicenseRuleConfig]) -> Result<Self, CollectorError> {
        let mut rules = default_rules();
        for rule in extra {
            rules.push(LicenseRule::from_config(rule)?);
        }
        Self::new(rules)
    }

    /// 규칙 목록
    pub fn rules(&self) -> &[LicenseRule] {
        &self.rules
    }

    /// 라이선스 문자열을 정규화합니다.
    ///
    /// - 빈 문자열/공백 → `"Unknown"`
    /// - 일치하는 규칙이 있으면 표준 식별자
    /// - 없으면 앞뒤 공백을 제거한 원문
    pub fn normalize(&self, text: &str) -> String {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return UNKNOWN_LICENSE.to_owned();
        }
        let lowered = trimmed.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(&lowered))
            .map(|rule| rule.canonical.clone())
            .unwrap_or_else(|| trimmed.to_owned())
    }

    /// 값이 없을 수 있는 라이선스를 정규화합니다. `None`은 `"Unknown"`입니다.
    pub fn normalize_opt(&self, text: Option<&str>) -> String {
        self.normalize(text.unwrap_or_default())
    }

    fn check_fixed_points(&self) -> Result<(), CollectorError> {
        let canonicals = self
            .rules
            .iter()
            .map(|r| r.canonical.as_str())
            .chain(std::iter::once(UNKNOWN_LICENSE));
        for canonical in canonicals {
            let normalized = self.normalize(canonical);
            if normalized != canonical {
                return Err(CollectorError::Config {
                    field: "license.rules".to_owned(),
                    reason: format!(
                        "canonical id '{canonical}' normalizes to '{normalized}'; \
                         canonical ids must map to themselves"
                    ),
                });
            }
        }
        Ok(())
    }
}
