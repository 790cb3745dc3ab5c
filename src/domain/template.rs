// ==========================================
// 批量发货系统 - 尺寸模板
// ==========================================

use serde::{Deserialize, Serialize};

/// 命名的包裹尺寸预设
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionTemplate {
    pub name: String,
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub weight_kg: f64,
}
