// ==========================================
// 批量发货系统 - 草稿补丁类型
// ==========================================
// 职责: 引擎基于只读快照计算出的变更，交由 DraftStore 统一合并
// ==========================================

use crate::domain::{DdpCalculation, DraftId, PricingOption};
use serde::{Deserialize, Serialize};

/// 尺寸编辑（None 表示该项不变）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionsPatch {
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

// ==========================================
// 计价补丁
// ==========================================

#[derive(Debug, Clone, PartialEq)]
pub enum PricingPatchOutcome {
    Priced {
        options: Vec<PricingOption>,
        duties: Option<f64>,
    },
    Failed {
        message: String,
    },
}

/// 单票计价结果，携带发起请求时的输入修订号
#[derive(Debug, Clone, PartialEq)]
pub struct PricingPatch {
    pub id: DraftId,
    pub revision: u64,
    pub outcome: PricingPatchOutcome,
}

/// 合并模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeMode {
    /// 子集小于整批：按标识逐个定位后就地修补
    Partial,
    /// 子集覆盖整批：按存储顺序逐个映射
    Full,
}

/// 合并报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub mode: MergeMode,
    pub applied: usize,
    /// 请求期间输入已变化，结果被丢弃
    pub superseded: Vec<DraftId>,
    /// 请求期间草稿已被移除
    pub missing: Vec<DraftId>,
}

// ==========================================
// DDP 补丁
// ==========================================

/// 单票 DDP 请求凭据（发起时的令牌与输入）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdpTicket {
    pub id: DraftId,
    pub row_index: usize,
    pub token: u64,
    pub hs_code: String,
    pub customs_value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DdpOutcome {
    Available(DdpCalculation),
    Unavailable(DdpCalculation),
    Failed(String),
}
