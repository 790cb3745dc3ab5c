// ==========================================
// 批量发货系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 传播策略:
// - 单票失败（计价 / DDP）记录在运单上，不中断兄弟运单
// - 批量失败（合规 / 余额不足）在任何副作用之前中止整个操作
// ==========================================

use crate::domain::{DraftId, ValidationIssue};
use crate::engine::services::ServiceError;
use thiserror::Error;

/// 管线错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    // ===== 前置条件 =====
    #[error("缺少包裹尺寸/重量，无法计价: 行 {rows:?}")]
    MissingDimensions { rows: Vec<usize> },

    #[error("运单草稿不存在: {0}")]
    DraftNotFound(DraftId),

    #[error("草稿存储锁获取失败: {0}")]
    StoreLock(String),

    #[error("服务选项不在当前报价中: {option_id}")]
    UnknownServiceOption { option_id: String },

    // ===== 单票失败 =====
    #[error("计价不可用 (draft={draft_id}): {message}")]
    PricingUnavailable { draft_id: DraftId, message: String },

    #[error("无适用关税税率: {message}")]
    DdpUnavailable { message: String },

    #[error("DDP 关税计算失败: {0}")]
    DdpCalculationFailed(String),

    // ===== 批量失败 =====
    #[error("余额不足: 需要 {required_minor}，当前余额 {balance_minor}（请先充值后再确认 DDP 扣款）")]
    InsufficientBalance { required_minor: i64, balance_minor: i64 },

    #[error("{}", format_violations(.issues))]
    ComplianceViolation { issues: Vec<ValidationIssue> },

    // ===== DDP 扣款事务 =====
    #[error("DDP 扣款请求正在处理中，请勿重复提交")]
    DeductionInFlight,

    #[error("该批次 DDP 报价已确认扣款: confirmation_id={0}")]
    QuoteAlreadyConfirmed(String),

    #[error("DDP 报价已过期（报价版本 {quote_version}，当前版本 {current_version}），请重新报价")]
    StaleQuote { quote_version: u64, current_version: u64 },

    #[error("DDP 扣款失败: {0}")]
    DeductionFailed(String),

    #[error("没有可计算 DDP 的运单")]
    NothingToCalculate,

    // ===== 外部服务 =====
    #[error(transparent)]
    Service(#[from] ServiceError),
}

fn format_violations(issues: &[ValidationIssue]) -> String {
    let rows: Vec<String> = issues
        .iter()
        .map(|i| format!("行 {} ({}, 需要 {})", i.row_index, i.country_code, i.required_type))
        .collect();
    format!("税号合规校验未通过，共 {} 行: {}", issues.len(), rows.join("; "))
}

/// Result 类型别名
pub type PipelineResult<T> = Result<T, PipelineError>;
