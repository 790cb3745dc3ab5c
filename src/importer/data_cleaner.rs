// ==========================================
// 批量发货系统 - 数据清洗器
// ==========================================
// 职责: TRIM / NULL 标准化 / HS 编码清洗 / 金额换算
// ==========================================

use crate::importer::error::{ImportError, ImportResult};

/// 表示“空”的字面量（导出文件中常见）
const NULL_LITERALS: [&str; 3] = ["null", "undefined", "n/a"];

/// HS 编码有效位数范围
const HS_CODE_MIN_DIGITS: usize = 6;
const HS_CODE_MAX_DIGITS: usize = 10;

pub struct DataCleaner;

impl DataCleaner {
    /// 标准化 NULL 值（空字符串 / 空白 / null / undefined → None）
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() || NULL_LITERALS.contains(&trimmed.to_lowercase().as_str()) {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 清洗 HS 编码：去掉分隔符，要求 6-10 位纯数字
    pub fn clean_hs_code(&self, raw: &str) -> Option<String> {
        clean_hs_code(raw)
    }

    /// 解析金额（主货币单位文本）→ 最小货币单位
    ///
    /// 接受 "$50.00" / "1,299.5" / "€12" 这类写法；负数视为错误
    pub fn parse_money_minor(&self, raw: &str, row: usize, field: &str) -> ImportResult<i64> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();

        if cleaned.is_empty() {
            return Ok(0);
        }

        let value = cleaned
            .parse::<f64>()
            .map_err(|_| ImportError::TypeConversionError {
                row,
                field: field.to_string(),
                message: format!("无法解析为金额: {}", raw),
            })?;

        if value < 0.0 || !value.is_finite() {
            return Err(ImportError::ValueRangeError {
                row,
                field: field.to_string(),
                value,
                min: 0.0,
                max: f64::MAX,
            });
        }

        Ok((value * 100.0).round() as i64)
    }

    /// 解析正数（尺寸 / 重量），非正数视为缺失
    pub fn parse_positive(&self, raw: &str, row: usize, field: &str) -> ImportResult<Option<f64>> {
        let value = raw
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| ImportError::TypeConversionError {
                row,
                field: field.to_string(),
                message: format!("无法解析为数值: {}", raw),
            })?;

        if value > 0.0 && value.is_finite() {
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// 解析布尔标记
    pub fn parse_flag(&self, raw: &str) -> bool {
        matches!(
            raw.trim().to_lowercase().as_str(),
            "1" | "y" | "yes" | "true" | "是"
        )
    }
}

/// 清洗 HS 编码（供编辑路径复用）
pub fn clean_hs_code(raw: &str) -> Option<String> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | ' ' | '-'))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !(HS_CODE_MIN_DIGITS..=HS_CODE_MAX_DIGITS).contains(&digits.len()) {
        return None;
    }
    Some(digits)
}
