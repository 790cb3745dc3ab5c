// ==========================================
// 批量发货系统 - 管线事件发布
// ==========================================
// 职责: 定义管线事件与发布 trait
// 说明: 引擎只依赖 trait，界面 / 缓存层实现适配器
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 管线事件类型
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineEvent {
    /// 交互式重算完成后的汇总（静默模式不发布）
    PricingSummary {
        requested: usize,
        succeeded: usize,
        failed: usize,
        superseded: usize,
    },
    /// 余额已由服务端更新，其他位置缓存的余额需失效
    BalanceInvalidated { new_balance_minor: i64 },
    /// 批次已提交下单
    BatchSubmitted { batch_id: String, created_count: usize },
}

impl PipelineEvent {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineEvent::PricingSummary { .. } => "PricingSummary",
            PipelineEvent::BalanceInvalidated { .. } => "BalanceInvalidated",
            PipelineEvent::BatchSubmitted { .. } => "BatchSubmitted",
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 管线事件发布者
///
/// # 返回
/// - `Ok(())`: 已投递
/// - `Err`: 投递失败（调用方只记录日志，不回滚业务结果）
pub trait PipelineEventPublisher: Send + Sync {
    fn publish(&self, event: PipelineEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl PipelineEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: PipelineEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpEventPublisher: 跳过事件发布 - event={}", event.as_str());
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn PipelineEventPublisher>> 的使用；发布失败只记录告警
#[derive(Clone, Default)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn PipelineEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn PipelineEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn publish(&self, event: PipelineEvent) {
        let name = event.as_str().to_string();
        match &self.inner {
            Some(publisher) => {
                if let Err(e) = publisher.publish(event) {
                    tracing::warn!(event = %name, error = %e, "事件发布失败");
                }
            }
            None => {
                tracing::debug!("OptionalEventPublisher: 未配置发布者，跳过事件 - event={}", name);
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}
