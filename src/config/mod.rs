// ==========================================
// 批量发货系统 - 配置层
// ==========================================
// 职责: 管线常量与开关，支持 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod pipeline_config;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigError, ConfigManager, ConfigResult};
pub use pipeline_config::PipelineConfig;
