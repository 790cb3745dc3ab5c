// ==========================================
// 批量发货系统 - DDP 关税计算结果
// ==========================================
// 状态机: Idle → Calculating → {Available, Unavailable, Error}
// ==========================================

use crate::domain::shipment::DraftId;
use serde::{Deserialize, Serialize};

/// 单票运单的 DDP 计算状态
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DdpState {
    #[default]
    Idle,
    Calculating,
    /// 已取得税率，ddp_calculation 有值
    Available,
    /// 远端无适用税率，ddp_calculation 记录提示信息，不自动重试
    Unavailable,
    /// 网络 / 解析失败，ddp_calculation 保持为空
    Error { message: String },
}

impl DdpState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DdpState::Idle => "IDLE",
            DdpState::Calculating => "CALCULATING",
            DdpState::Available => "AVAILABLE",
            DdpState::Unavailable => "UNAVAILABLE",
            DdpState::Error { .. } => "ERROR",
        }
    }
}

/// DDP 计算明细（关税金额为主货币单位，申报价值为最小货币单位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdpCalculation {
    pub hs_code: String,
    pub customs_value: i64,
    pub duty_percentage: f64,
    pub base_duty: f64,
    pub ddp_processing_fee: f64,
    pub total: f64,
    pub formatted_total: String,
    pub available: bool,
    pub error_message: Option<String>,
}

impl DdpCalculation {
    /// 合计金额换算为最小货币单位
    pub fn total_minor(&self) -> i64 {
        to_minor_units(self.total)
    }
}

/// 扣款请求中的单票关税明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdpLineItem {
    pub draft_id: DraftId,
    pub row_index: usize,
    pub hs_code: String,
    pub customs_value: i64,
    pub total: f64,
}

/// 主货币单位 → 最小货币单位（四舍五入）
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
