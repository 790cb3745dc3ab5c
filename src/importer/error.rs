// ==========================================
// 批量发货系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 批次级错误 =====
    #[error("导入批次为空")]
    EmptyBatch,

    #[error("行数据格式错误 (行 {row}): {message}")]
    MalformedRow { row: usize, message: String },

    // ===== 数据映射错误 =====
    #[error("必填字段缺失 (行 {row}): {field}")]
    MissingRequiredField { row: usize, field: String },

    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    #[error("数值范围错误 (行 {row}, 字段 {field}): 值 {value} 超出范围 [{min}, {max}]")]
    ValueRangeError {
        row: usize,
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("贸易条款无法识别 (行 {row}): {value}")]
    UnknownShippingTerms { row: usize, value: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 出错的源文件行号（批次级错误为 None）
    pub fn row(&self) -> Option<usize> {
        match self {
            ImportError::MalformedRow { row, .. }
            | ImportError::MissingRequiredField { row, .. }
            | ImportError::TypeConversionError { row, .. }
            | ImportError::ValueRangeError { row, .. }
            | ImportError::UnknownShippingTerms { row, .. } => Some(*row),
            ImportError::EmptyBatch | ImportError::Other(_) => None,
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
