// ==========================================
// 批量发货系统 - 导入中间结构
// ==========================================
// 用途: 字段映射后的规范化单行（别名已合并，尚未分配标识）
// 生命周期: 仅在导入流程内
// ==========================================

use crate::domain::types::ShippingTerms;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawShipmentRecord {
    // 收件人
    pub receiver_name: Option<String>,
    pub order_reference: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    // 包裹（长度 cm，重量 kg）
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,

    // 报关
    pub hs_code: Option<String>,
    pub customs_value_minor: i64,
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    pub shipping_terms: ShippingTerms,

    // 保险 / 合规
    pub has_insurance: bool,
    pub tax_id: Option<String>,

    // 元信息
    pub row_number: usize, // 原始文件行号（从 1 开始）
}
