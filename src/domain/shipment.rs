// ==========================================
// 批量发货系统 - 运单草稿实体
// ==========================================
// 职责: 定义 ShipmentDraft 及其子记录
// 红线: 派生字段（体积重 / 计费重）只能由 weight 引擎写入
// ==========================================

use crate::domain::ddp::{DdpCalculation, DdpState};
use crate::domain::pricing::PricingOption;
use crate::domain::types::ShippingTerms;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==========================================
// DraftId - 草稿稳定标识
// ==========================================
/// 导入时分配的合成标识，所有合并 / 查找都以它为键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(Uuid);

impl DraftId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// Receiver - 收件人
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    /// 国家名称（自由文本，由外部查表解析为 ISO 代码）
    pub country: String,
    pub postal_code: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// ==========================================
// Package - 包裹尺寸与重量
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Package {
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub volumetric_weight: f64, // 派生: L×W×H/5000
    pub billable_weight: f64,   // 派生: max(实重, 体积重)
}

impl Package {
    /// 四项尺寸/重量是否都已给出且为正数
    pub fn has_all_dimensions(&self) -> bool {
        [self.length_cm, self.width_cm, self.height_cm, self.weight_kg]
            .iter()
            .all(|v| matches!(v, Some(x) if *x > 0.0))
    }
}

// ==========================================
// Customs - 报关信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Customs {
    /// 原始 HS 编码（用户输入 / 导入原文）
    pub hs_code_raw: String,
    /// 清洗并校验后的 HS 编码，无效时为 None
    pub hs_code: Option<String>,
    /// 申报价值（最小货币单位，如美分）
    pub customs_value: i64,
    pub product_name: String,
    pub product_description: String,
    pub shipping_terms: ShippingTerms,
}

// ==========================================
// Insurance - 保险
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Insurance {
    pub has_insurance: bool,
    pub insurance_value: i64,          // 最小货币单位
    pub calculated_insurance_cost: i64, // 最小货币单位
}

// ==========================================
// Pricing - 计价结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pricing {
    pub options: Vec<PricingOption>,
    /// 选中的服务选项 ID，必须是 options 中的某一项
    pub selected_service_option: Option<String>,
    pub pricing_error: Option<String>,
    pub is_recalculating: bool,
}

impl Pricing {
    /// 清空计价结果（尺寸 / HS / 申报价值变化后调用）
    pub fn invalidate(&mut self) {
        self.options.clear();
        self.selected_service_option = None;
        self.pricing_error = None;
    }
}

// ==========================================
// ShipmentDraft - 运单草稿
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentDraft {
    pub id: DraftId,
    /// 导入文件中的行号（从 1 开始），用于错误报告
    pub row_index: usize,
    pub order_reference: String,

    pub receiver: Receiver,
    pub package: Package,
    pub customs: Customs,
    pub insurance: Insurance,
    pub pricing: Pricing,

    // DDP
    pub ddp_state: DdpState,
    pub ddp_calculation: Option<DdpCalculation>,
    /// 计价服务返回的预估关税（主货币单位）
    pub calculated_duties: Option<f64>,

    // 合规
    /// IOSS 或 HMRC 税号
    pub tax_id: Option<String>,

    // 选择 / 元信息
    pub skip_import: bool,
    pub selected_template: Option<String>,

    /// 计价相关输入的修订号；每次相关编辑递增，用于丢弃过期计价结果
    pub pricing_revision: u64,
    /// 最近一次 DDP 请求令牌；只有令牌一致的响应才会被应用
    pub ddp_token: u64,
}

impl ShipmentDraft {
    pub fn new(row_index: usize, order_reference: impl Into<String>, receiver: Receiver) -> Self {
        Self {
            id: DraftId::new(),
            row_index,
            order_reference: order_reference.into(),
            receiver,
            package: Package::default(),
            customs: Customs::default(),
            insurance: Insurance::default(),
            pricing: Pricing::default(),
            ddp_state: DdpState::Idle,
            ddp_calculation: None,
            calculated_duties: None,
            tax_id: None,
            skip_import: false,
            selected_template: None,
            pricing_revision: 0,
            ddp_token: 0,
        }
    }

    /// 结构化业务键（收件人 + 订单号），仅用于展示
    pub fn identity_key(&self) -> (&str, &str) {
        (self.receiver.name.as_str(), self.order_reference.as_str())
    }

    /// 当前选中的计价选项
    pub fn selected_option(&self) -> Option<&PricingOption> {
        let selected = self.pricing.selected_service_option.as_deref()?;
        self.pricing.options.iter().find(|o| o.id == selected)
    }

    /// 是否参与下游计算（计价 / DDP / 合规 / 提交）
    pub fn is_active(&self) -> bool {
        !self.skip_import
    }
}
