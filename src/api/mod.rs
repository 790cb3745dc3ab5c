// ==========================================
// 批量发货系统 - API 层
// ==========================================
// 职责: 对外提供批次操作接口（界面 / 命令行调用）
// ==========================================

pub mod batch_api;
pub mod error;

// 重导出核心类型
pub use batch_api::{BatchApi, BatchServices};
pub use error::{ApiError, ApiResult};
