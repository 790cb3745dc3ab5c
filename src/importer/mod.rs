// ==========================================
// 批量发货系统 - 导入层
// ==========================================
// 职责: 外部已解析的行数据 → 规范化运单草稿
// 说明: 文件解析由外部完成，本层只处理键值行
// ==========================================

pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod shipment_importer;

// 重导出核心类型
pub use data_cleaner::{clean_hs_code, DataCleaner};
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use shipment_importer::{ImportOutcome, RowRejection, ShipmentImporter};
