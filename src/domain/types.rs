// ==========================================
// 批量发货系统 - 领域类型定义
// ==========================================
// 职责: 运单草稿使用的枚举类型
// 序列化格式: 与上游导出文件 / 外部服务保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 贸易条款 (Shipping Terms)
// ==========================================
// DDP: 发件人预付进口关税
// DAP / DDU: 关税由收件人承担
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShippingTerms {
    #[default]
    Dap,
    Ddp,
    Ddu,
}

impl ShippingTerms {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingTerms::Dap => "dap",
            ShippingTerms::Ddp => "ddp",
            ShippingTerms::Ddu => "ddu",
        }
    }

    /// 宽松解析（大小写不敏感），无法识别时返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dap" => Some(ShippingTerms::Dap),
            "ddp" => Some(ShippingTerms::Ddp),
            "ddu" => Some(ShippingTerms::Ddu),
            _ => None,
        }
    }
}

impl fmt::Display for ShippingTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 服务类型 (Service Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Eco,
    Standard,
    Express,
}

impl ServiceType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ECO" | "ECONOMY" => Some(ServiceType::Eco),
            "STANDARD" => Some(ServiceType::Standard),
            "EXPRESS" => Some(ServiceType::Express),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Eco => write!(f, "ECO"),
            ServiceType::Standard => write!(f, "STANDARD"),
            ServiceType::Express => write!(f, "EXPRESS"),
        }
    }
}

// ==========================================
// 税号类型 (Tax Identifier Type)
// ==========================================
// IOSS: 欧盟进口一站式申报号
// HMRC: 英国 / 瑞典税号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxIdType {
    Ioss,
    Hmrc,
}

impl fmt::Display for TaxIdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxIdType::Ioss => write!(f, "IOSS"),
            TaxIdType::Hmrc => write!(f, "HMRC"),
        }
    }
}

// ==========================================
// 重算触发模式 (Recalc Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecalcMode {
    /// 用户主动触发：缺尺寸报错，完成后发布汇总事件
    Interactive,
    /// 编辑后自动触发：缺尺寸静默退出，不发布汇总事件
    Silent,
}

impl RecalcMode {
    pub fn is_silent(&self) -> bool {
        matches!(self, RecalcMode::Silent)
    }
}
