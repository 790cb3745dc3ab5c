// ==========================================
// 批量发货系统 - 管线配置
// ==========================================
// 职责: 计算常量与行为开关的默认值
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// PipelineConfig - 管线配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub volumetric_divisor: f64,     // 体积重除数: 5000
    pub default_length_cm: f64,      // 缺省长: 15cm
    pub default_width_cm: f64,       // 缺省宽: 10cm
    pub default_height_cm: f64,      // 缺省高: 1cm
    pub default_weight_kg: f64,      // 缺省重: 0.5kg
    pub insurance_rate: f64,         // 保险费率: 1%
    pub insurance_min_fee_minor: i64, // 远端失败兜底最低保费: 100（$1.00）
    pub ddp_destination_code: String, // DDP 适用目的国: US
    pub auto_recalc_on_edit: bool,   // 编辑后自动静默重算: true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            volumetric_divisor: 5000.0,
            default_length_cm: 15.0,
            default_width_cm: 10.0,
            default_height_cm: 1.0,
            default_weight_kg: 0.5,
            insurance_rate: 0.01,
            insurance_min_fee_minor: 100,
            ddp_destination_code: "US".to_string(),
            auto_recalc_on_edit: true,
        }
    }
}
