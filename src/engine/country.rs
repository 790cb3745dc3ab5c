// ==========================================
// 批量发货系统 - 内置国家分类表
// ==========================================
// 职责: CountryClassifier 的静态实现（名称 / 代码双向匹配）
// 范围: 欧盟 27 国 + HMRC 辖区（英国、瑞典）+ 常见目的国
// ==========================================

use crate::engine::services::CountryClassifier;

/// (ISO 代码, 可识别名称)
const COUNTRIES: &[(&str, &[&str])] = &[
    ("AT", &["austria"]),
    ("BE", &["belgium"]),
    ("BG", &["bulgaria"]),
    ("HR", &["croatia"]),
    ("CY", &["cyprus"]),
    ("CZ", &["czech republic", "czechia"]),
    ("DK", &["denmark"]),
    ("EE", &["estonia"]),
    ("FI", &["finland"]),
    ("FR", &["france"]),
    ("DE", &["germany", "deutschland"]),
    ("GR", &["greece"]),
    ("HU", &["hungary"]),
    ("IE", &["ireland"]),
    ("IT", &["italy"]),
    ("LV", &["latvia"]),
    ("LT", &["lithuania"]),
    ("LU", &["luxembourg"]),
    ("MT", &["malta"]),
    ("NL", &["netherlands", "the netherlands", "holland"]),
    ("PL", &["poland"]),
    ("PT", &["portugal"]),
    ("RO", &["romania"]),
    ("SK", &["slovakia"]),
    ("SI", &["slovenia"]),
    ("ES", &["spain"]),
    ("SE", &["sweden"]),
    ("GB", &["united kingdom", "uk", "great britain", "england", "scotland", "wales"]),
    ("US", &["united states", "united states of america", "usa", "us"]),
    ("CA", &["canada"]),
    ("AU", &["australia"]),
    ("CH", &["switzerland"]),
    ("NO", &["norway"]),
    ("JP", &["japan"]),
    ("CN", &["china"]),
];

/// 瑞典同时在欧盟与 HMRC 两张表中；税号校验先判定 HMRC，因此瑞典要求 HMRC
const EU_CODES: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT", "LV",
    "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

const HMRC_CODES: &[&str] = &["GB", "SE"];

#[derive(Debug, Clone, Default)]
pub struct StaticCountryClassifier;

impl CountryClassifier for StaticCountryClassifier {
    fn country_name_to_code(&self, name: &str) -> Option<String> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        COUNTRIES
            .iter()
            .find(|(code, names)| code.eq_ignore_ascii_case(&needle) || names.contains(&needle.as_str()))
            .map(|(code, _)| code.to_string())
    }

    fn is_eu_country(&self, code: &str) -> bool {
        EU_CODES.iter().any(|c| c.eq_ignore_ascii_case(code))
    }

    fn is_hmrc_country(&self, code: &str) -> bool {
        HMRC_CODES.iter().any(|c| c.eq_ignore_ascii_case(code))
    }
}
