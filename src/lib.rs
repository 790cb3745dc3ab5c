// ==========================================
// 批量发货系统 - 核心库
// ==========================================
// 职责: 批量运单草稿的编排管线
// 流程: 导入 → 草稿存储 → 重量派生 → 计价重算 → 保险 → DDP → 税号合规 → 批量下单
// 技术栈: Rust + Tokio + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 草稿存储 - 写时复制集合
pub mod store;

// 引擎层 - 业务规则与外部服务契约
pub mod engine;

// 导入层 - 行数据规范化
pub mod importer;

// 数据仓储层 - 尺寸模板
pub mod repository;

// 配置层 - 管线配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 批次接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    DdpCalculation, DdpState, DimensionTemplate, DraftId, FinalizedShipment, PricingOption,
    RecalcMode, ShipmentDraft, ShippingTerms, TaxIdType, ValidationIssue,
};

// 存储与引擎
pub use engine::{
    DdpCalculator, InsuranceCalculator, PipelineError, PricingRecalcEngine, TaxIdValidator,
    WeightCalculator,
};
pub use store::{DraftSnapshot, DraftStore};

// API
pub use api::{ApiError, BatchApi, BatchServices};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "批量发货系统";
