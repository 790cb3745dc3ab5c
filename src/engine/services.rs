// ==========================================
// 批量发货系统 - 外部服务契约
// ==========================================
// 职责: 定义管线依赖的外部协作方接口（不包含实现）
// 说明: 计价 / 保险 / DDP / 余额 / 下单为异步网络调用,
//       国家分类为同步查表
// 线格式: camelCase JSON，与远端接口字段一致
// ==========================================

use crate::domain::{DdpLineItem, FinalizedShipment};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==========================================
// ServiceError - 外部服务错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("网络请求失败: {0}")]
    Network(String),

    #[error("响应解析失败: {0}")]
    Parse(String),

    #[error("服务拒绝请求: {0}")]
    Rejected(String),
}

// ==========================================
// 计价服务
// ==========================================

/// 计价请求（单票运单）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRequest {
    pub country: String,
    pub package_length: f64,
    pub package_width: f64,
    pub package_height: f64,
    pub package_weight: f64,
    pub hs_code: Option<String>,
    pub customs_value: i64,
    pub product_name: String,
    pub product_description: String,
}

/// 远端返回的单个服务报价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuote {
    pub id: String,
    pub name: String,
    pub service_type: String,
    pub total_price: f64,
    pub price_without_insurance: f64,
    pub estimated_delivery_days: Option<String>,
    pub carrier: String,
}

/// 计价服务附带的预估关税
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingDuties {
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
    pub success: bool,
    #[serde(default)]
    pub options: Vec<ServiceQuote>,
    pub duties: Option<PricingDuties>,
    pub error: Option<String>,
    /// 远端回显的请求参数，合并时一律忽略
    pub echo: Option<PricingRequest>,
}

#[async_trait]
pub trait PricingService: Send + Sync {
    async fn price(&self, request: PricingRequest) -> Result<PricingResponse, ServiceError>;
}

// ==========================================
// 保险服务
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceQuote {
    /// 保费（最小货币单位）
    pub cost: i64,
}

#[async_trait]
pub trait InsuranceService: Send + Sync {
    async fn insurance_cost(&self, insurance_value_minor: i64) -> Result<InsuranceQuote, ServiceError>;
}

// ==========================================
// DDP 关税服务
// ==========================================

/// 远端返回的单票关税计算记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DdpCalculationRecord {
    pub shipment_index: usize,
    pub hs_code: String,
    pub customs_value: i64,
    pub duty_percentage: f64,
    pub base_duty: f64,
    pub ddp_processing_fee: f64,
    pub total: f64,
    pub formatted_total: String,
    pub available: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DdpResponse {
    #[serde(default)]
    pub calculations: Vec<DdpCalculationRecord>,
}

/// 批量关税请求中的单票条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDdpShipment {
    pub shipment_index: usize,
    pub hs_code: String,
    pub customs_value: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDdpResponse {
    pub success: bool,
    #[serde(default)]
    pub calculations: Vec<DdpCalculationRecord>,
    pub total_ddp_amount: f64,
    pub error: Option<String>,
}

#[async_trait]
pub trait DdpService: Send + Sync {
    async fn calculate_ddp(
        &self,
        index: usize,
        hs_code: &str,
        customs_value: i64,
    ) -> Result<DdpResponse, ServiceError>;

    async fn calculate_bulk_ddp(
        &self,
        shipments: Vec<BulkDdpShipment>,
        user_id: &str,
    ) -> Result<BulkDdpResponse, ServiceError>;
}

// ==========================================
// 余额服务
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionRequest {
    pub user_id: String,
    /// 扣款总额（主货币单位）
    pub ddp_amount: f64,
    pub shipment_details: Vec<DdpLineItem>,
    /// 同一批次确认的幂等键
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionResponse {
    pub success: bool,
    /// 服务端权威余额（最小货币单位）
    pub new_balance: i64,
    pub message: Option<String>,
}

#[async_trait]
pub trait BalanceService: Send + Sync {
    /// 当前余额（最小货币单位）
    async fn balance(&self, user_id: &str) -> Result<i64, ServiceError>;

    async fn deduct_ddp_balance(&self, request: DeductionRequest) -> Result<DeductionResponse, ServiceError>;
}

// ==========================================
// 国家分类
// ==========================================
pub trait CountryClassifier: Send + Sync {
    /// 国家名称 → ISO 3166-1 alpha-2 代码
    fn country_name_to_code(&self, name: &str) -> Option<String>;

    fn is_eu_country(&self, code: &str) -> bool;

    fn is_hmrc_country(&self, code: &str) -> bool;
}

// ==========================================
// 下单服务
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreationReceipt {
    pub batch_id: String,
    pub created_count: usize,
}

#[async_trait]
pub trait OrderCreator: Send + Sync {
    async fn create_orders(&self, shipments: Vec<FinalizedShipment>) -> Result<BatchCreationReceipt, ServiceError>;
}
