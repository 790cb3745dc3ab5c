// ==========================================
// 批量发货系统 - 体积重 / 计费重计算
// ==========================================
// 公式: volumetric = L×W×H / 5000, billable = max(实重, 体积重)
// 约束: 纯函数、同步、无副作用；结果保留两位小数
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::Package;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightResult {
    pub volumetric_weight: f64,
    pub billable_weight: f64,
}

// ==========================================
// WeightCalculator - 重量计算器
// ==========================================
#[derive(Debug, Clone)]
pub struct WeightCalculator {
    divisor: f64,
    default_length_cm: f64,
    default_width_cm: f64,
    default_height_cm: f64,
    default_weight_kg: f64,
}

impl WeightCalculator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            divisor: config.volumetric_divisor,
            default_length_cm: config.default_length_cm,
            default_width_cm: config.default_width_cm,
            default_height_cm: config.default_height_cm,
            default_weight_kg: config.default_weight_kg,
        }
    }

    /// 计算体积重与计费重
    ///
    /// 缺失或非正的输入使用缺省值（15×10×1 cm, 0.5 kg）
    pub fn calculate(
        &self,
        length_cm: Option<f64>,
        width_cm: Option<f64>,
        height_cm: Option<f64>,
        weight_kg: Option<f64>,
    ) -> WeightResult {
        let length = positive_or(length_cm, self.default_length_cm);
        let width = positive_or(width_cm, self.default_width_cm);
        let height = positive_or(height_cm, self.default_height_cm);
        let weight = positive_or(weight_kg, self.default_weight_kg);

        let volumetric = round2(length * width * height / self.divisor);
        let billable = round2(weight.max(volumetric));

        WeightResult {
            volumetric_weight: volumetric,
            billable_weight: billable,
        }
    }

    /// 按包裹当前尺寸重新派生两个重量字段
    pub fn apply(&self, package: &mut Package) {
        let result = self.calculate(
            package.length_cm,
            package.width_cm,
            package.height_cm,
            package.weight_kg,
        );
        package.volumetric_weight = result.volumetric_weight;
        package.billable_weight = result.billable_weight;
    }
}

impl Default for WeightCalculator {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

fn positive_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v > 0.0 && v.is_finite() => v,
        _ => default,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
