// ==========================================
// 批量发货系统 - 引擎层
// ==========================================
// 职责: 重量 / 计价 / 保险 / DDP / 合规规则，外部服务契约
// 红线: 引擎只读快照、向存储提交补丁；网络调用期间不持有存储锁
// ==========================================

pub mod compliance;
pub mod country;
pub mod ddp;
pub mod error;
pub mod events;
pub mod insurance;
pub mod pricing;
pub mod services;
pub mod weight;

// 重导出核心引擎
pub use compliance::{is_blank_tax_id, TaxIdValidator};
pub use country::StaticCountryClassifier;
pub use ddp::{can_afford, DdpBatchQuote, DdpCalculator};
pub use error::{PipelineError, PipelineResult};
pub use events::{NoOpEventPublisher, OptionalEventPublisher, PipelineEvent, PipelineEventPublisher};
pub use insurance::{local_insurance_cost, InsuranceCalculator};
pub use pricing::{PricingRecalcEngine, RecalcOutcome, RecalcState, RecalcSummary};
pub use services::{
    BalanceService, BatchCreationReceipt, BulkDdpResponse, BulkDdpShipment, CountryClassifier,
    DdpCalculationRecord, DdpResponse, DdpService, DeductionRequest, DeductionResponse,
    InsuranceQuote, InsuranceService, OrderCreator, PricingDuties, PricingRequest, PricingResponse,
    PricingService, ServiceError, ServiceQuote,
};
pub use weight::{WeightCalculator, WeightResult};
