// ==========================================
// 批量发货系统 - 合规校验问题
// ==========================================

use crate::domain::types::TaxIdType;
use serde::{Deserialize, Serialize};

/// 单行税号违规
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub row_index: usize,
    pub receiver_name: String,
    /// 目的国 ISO 代码
    pub country_code: String,
    pub required_type: TaxIdType,
    pub message: String,
}
