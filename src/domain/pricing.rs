// ==========================================
// 批量发货系统 - 计价选项
// ==========================================

use crate::domain::types::ServiceType;
use serde::{Deserialize, Serialize};

/// 单个可选物流服务报价（金额为主货币单位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingOption {
    pub id: String,
    pub name: String,
    pub service_type: ServiceType,
    pub total_price: f64,
    pub price_without_insurance: f64,
    pub estimated_delivery_days: Option<String>,
    pub carrier: String,
}
