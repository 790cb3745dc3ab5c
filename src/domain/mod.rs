// ==========================================
// 批量发货系统 - 领域模型层
// ==========================================
// 职责: 定义运单草稿实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod compliance;
pub mod ddp;
pub mod order;
pub mod pricing;
pub mod raw_record;
pub mod shipment;
pub mod template;
pub mod types;

// 重导出核心类型
pub use compliance::ValidationIssue;
pub use ddp::{to_minor_units, DdpCalculation, DdpLineItem, DdpState};
pub use order::FinalizedShipment;
pub use pricing::PricingOption;
pub use raw_record::RawShipmentRecord;
pub use shipment::{Customs, DraftId, Insurance, Package, Pricing, Receiver, ShipmentDraft};
pub use template::DimensionTemplate;
pub use types::{RecalcMode, ServiceType, ShippingTerms, TaxIdType};
