// ==========================================
// 批量发货系统 - 税号合规校验
// ==========================================
// 规则:
// - 目的国为欧盟 → 需要 IOSS；英国 / 瑞典 → 需要 HMRC（HMRC 优先判定）
// - 空串 / "null" / "undefined" 视为未填写
// - 扫描整批未跳过的草稿，收集全部违规，任何一条违规即整批拒绝
// ==========================================

use crate::domain::{ShipmentDraft, TaxIdType, ValidationIssue};
use crate::engine::error::{PipelineError, PipelineResult};
use crate::engine::services::CountryClassifier;
use std::sync::Arc;

pub struct TaxIdValidator {
    classifier: Arc<dyn CountryClassifier>,
}

impl TaxIdValidator {
    pub fn new(classifier: Arc<dyn CountryClassifier>) -> Self {
        Self { classifier }
    }

    /// 判定单票运单所需的税号类型（None 表示不需要）
    pub fn required_type(&self, draft: &ShipmentDraft) -> Option<(String, TaxIdType)> {
        let code = self.classifier.country_name_to_code(&draft.receiver.country)?;
        if self.classifier.is_hmrc_country(&code) {
            Some((code, TaxIdType::Hmrc))
        } else if self.classifier.is_eu_country(&code) {
            Some((code, TaxIdType::Ioss))
        } else {
            None
        }
    }

    /// 收集整批违规
    pub fn collect_issues(&self, drafts: &[ShipmentDraft]) -> Vec<ValidationIssue> {
        drafts
            .iter()
            .filter(|d| d.is_active())
            .filter_map(|d| {
                let (country_code, required_type) = self.required_type(d)?;
                if !is_blank_tax_id(d.tax_id.as_deref()) {
                    return None;
                }
                Some(ValidationIssue {
                    row_index: d.row_index,
                    receiver_name: d.receiver.name.clone(),
                    message: format!(
                        "收件人 {} 目的国 {} 需要填写 {} 税号",
                        d.receiver.name, country_code, required_type
                    ),
                    country_code,
                    required_type,
                })
            })
            .collect()
    }

    /// 全有或全无的合规闸门
    pub fn validate_batch(&self, drafts: &[ShipmentDraft]) -> PipelineResult<()> {
        let issues = self.collect_issues(drafts);
        if issues.is_empty() {
            return Ok(());
        }
        tracing::warn!(violations = issues.len(), "税号合规校验未通过，拒绝整批提交");
        Err(PipelineError::ComplianceViolation { issues })
    }
}

/// 税号是否视为未填写
pub fn is_blank_tax_id(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None => true,
        Some(v) => v.is_empty() || v.eq_ignore_ascii_case("null") || v.eq_ignore_ascii_case("undefined"),
    }
}
