// ==========================================
// 批量发货系统 - 仓储层
// ==========================================
// 职责: SQLite 持久化（尺寸模板）
// 红线: 仓储不含业务规则
// ==========================================

pub mod error;
pub mod template_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use template_repo::{TemplateRepository, TemplateStore};
