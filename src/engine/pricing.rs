// ==========================================
// 批量发货系统 - 计价重算引擎
// ==========================================
// 职责: 逐票调用计价服务，将结果合并回草稿存储
// 输入: 草稿子集（或整批）+ 交互 / 静默模式
// 输出: RecalcOutcome（汇总计数）
// 红线:
// - 同一时刻最多一个重算批次在途，后来者直接丢弃
// - 远端回显的尺寸 / 报关字段绝不覆盖本地编辑
// ==========================================

use crate::domain::{DraftId, PricingOption, RecalcMode, ServiceType, ShipmentDraft};
use crate::engine::error::{PipelineError, PipelineResult};
use crate::engine::events::{OptionalEventPublisher, PipelineEvent};
use crate::engine::services::{PricingRequest, PricingResponse, PricingService, ServiceError, ServiceQuote};
use crate::engine::weight::WeightCalculator;
use crate::store::{DraftStore, MergeMode, PricingPatch, PricingPatchOutcome};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::instrument;

// ==========================================
// RecalcState - 重算状态机
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecalcState {
    Idle,
    Running,
}

impl RecalcState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecalcState::Idle => "IDLE",
            RecalcState::Running => "RUNNING",
        }
    }
}

/// 重算汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecalcSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 请求期间输入已变化或草稿已移除，结果被丢弃
    pub superseded: usize,
    pub merge_mode: Option<MergeMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecalcOutcome {
    Completed(RecalcSummary),
    /// 已有重算在途，本次调用未做任何事
    AlreadyRunning,
    /// 静默模式下缺少尺寸，未发起任何请求
    Skipped { missing_rows: Vec<usize> },
}

/// 离开作用域时把状态机复位为 Idle
struct RunningGuard<'a> {
    state: &'a Mutex<RecalcState>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            *state = RecalcState::Idle;
        }
    }
}

// ==========================================
// PricingRecalcEngine - 计价重算引擎
// ==========================================
pub struct PricingRecalcEngine {
    store: Arc<DraftStore>,
    service: Arc<dyn PricingService>,
    weight: WeightCalculator,
    event_publisher: OptionalEventPublisher,
    state: Mutex<RecalcState>,
}

impl PricingRecalcEngine {
    pub fn new(
        store: Arc<DraftStore>,
        service: Arc<dyn PricingService>,
        weight: WeightCalculator,
        event_publisher: OptionalEventPublisher,
    ) -> Self {
        Self {
            store,
            service,
            weight,
            event_publisher,
            state: Mutex::new(RecalcState::Idle),
        }
    }

    pub fn state(&self) -> RecalcState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(RecalcState::Idle)
    }

    fn try_begin(&self) -> PipelineResult<Option<RunningGuard<'_>>> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| PipelineError::StoreLock(e.to_string()))?;
        if *state == RecalcState::Running {
            return Ok(None);
        }
        *state = RecalcState::Running;
        Ok(Some(RunningGuard { state: &self.state }))
    }

    /// 重算计价
    ///
    /// # 参数
    /// - `ids`: 目标草稿；为空表示整批
    /// - `mode`: Interactive 时缺尺寸报错并发布汇总事件，Silent 时静默退出
    #[instrument(skip(self, ids), fields(targets = ids.len()))]
    pub async fn recalculate(&self, ids: &[DraftId], mode: RecalcMode) -> PipelineResult<RecalcOutcome> {
        let Some(_guard) = self.try_begin()? else {
            tracing::info!("计价重算已在进行中，忽略本次触发");
            return Ok(RecalcOutcome::AlreadyRunning);
        };

        let snapshot = self.store.snapshot()?;
        let wanted: HashSet<DraftId> = ids.iter().copied().collect();
        let targets: Vec<&ShipmentDraft> = snapshot
            .active()
            .filter(|d| wanted.is_empty() || wanted.contains(&d.id))
            .collect();

        // ===== 前置条件: 尺寸齐全 =====
        let missing_rows: Vec<usize> = targets
            .iter()
            .filter(|d| !d.package.has_all_dimensions())
            .map(|d| d.row_index)
            .collect();
        if !missing_rows.is_empty() {
            if mode.is_silent() {
                tracing::debug!(rows = ?missing_rows, "静默重算: 尺寸缺失，跳过");
                return Ok(RecalcOutcome::Skipped { missing_rows });
            }
            tracing::warn!(rows = ?missing_rows, "计价重算失败: 尺寸缺失");
            return Err(PipelineError::MissingDimensions { rows: missing_rows });
        }

        if targets.is_empty() {
            return Ok(RecalcOutcome::Completed(RecalcSummary::default()));
        }

        let target_ids: Vec<DraftId> = targets.iter().map(|d| d.id).collect();
        self.store.mark_recalculating(&target_ids, true)?;

        // ===== 并发请求（锁不跨越 await） =====
        let requests: Vec<(DraftId, u64, PricingRequest)> = targets
            .iter()
            .map(|d| (d.id, d.pricing_revision, self.build_request(d)))
            .collect();

        let service = &self.service;
        let responses = join_all(requests.into_iter().map(|(id, revision, request)| async move {
            let result = service.price(request).await;
            (id, revision, result)
        }))
        .await;

        let patches: Vec<PricingPatch> = responses
            .into_iter()
            .map(|(id, revision, result)| PricingPatch {
                id,
                revision,
                outcome: to_patch_outcome(id, result),
            })
            .collect();

        let priced: HashSet<DraftId> = patches
            .iter()
            .filter(|p| matches!(p.outcome, PricingPatchOutcome::Priced { .. }))
            .map(|p| p.id)
            .collect();
        let requested = patches.len();

        let report = self.store.merge_pricing(patches)?;

        let dropped: HashSet<DraftId> = report
            .superseded
            .iter()
            .chain(report.missing.iter())
            .copied()
            .collect();
        let succeeded = priced.iter().filter(|id| !dropped.contains(id)).count();
        let summary = RecalcSummary {
            requested,
            succeeded,
            failed: report.applied - succeeded,
            superseded: dropped.len(),
            merge_mode: Some(report.mode),
        };

        tracing::info!(
            requested = summary.requested,
            succeeded = summary.succeeded,
            failed = summary.failed,
            superseded = summary.superseded,
            "计价重算完成"
        );

        if !mode.is_silent() {
            self.event_publisher.publish(PipelineEvent::PricingSummary {
                requested: summary.requested,
                succeeded: summary.succeeded,
                failed: summary.failed,
                superseded: summary.superseded,
            });
        }

        Ok(RecalcOutcome::Completed(summary))
    }

    /// 构造单票计价请求（重量取计费重）
    fn build_request(&self, draft: &ShipmentDraft) -> PricingRequest {
        let pkg = &draft.package;
        let weights = self
            .weight
            .calculate(pkg.length_cm, pkg.width_cm, pkg.height_cm, pkg.weight_kg);
        PricingRequest {
            country: draft.receiver.country.clone(),
            package_length: pkg.length_cm.unwrap_or_default(),
            package_width: pkg.width_cm.unwrap_or_default(),
            package_height: pkg.height_cm.unwrap_or_default(),
            package_weight: weights.billable_weight,
            hs_code: draft.customs.hs_code.clone(),
            customs_value: draft.customs.customs_value,
            product_name: draft.customs.product_name.clone(),
            product_description: draft.customs.product_description.clone(),
        }
    }
}

fn to_patch_outcome(id: DraftId, result: Result<PricingResponse, ServiceError>) -> PricingPatchOutcome {
    let failed = |message: String| {
        let err = PipelineError::PricingUnavailable { draft_id: id, message };
        tracing::warn!(error = %err, "单票计价失败");
        PricingPatchOutcome::Failed {
            message: err.to_string(),
        }
    };

    match result {
        Err(e) => failed(e.to_string()),
        Ok(resp) if !resp.success => failed(resp.error.unwrap_or_else(|| "计价服务返回失败".to_string())),
        Ok(resp) => {
            let options: Vec<PricingOption> = resp.options.into_iter().filter_map(to_option).collect();
            if options.is_empty() {
                return failed("无可用运输服务".to_string());
            }
            PricingPatchOutcome::Priced {
                options,
                duties: resp.duties.map(|d| d.total),
            }
        }
    }
}

fn to_option(quote: ServiceQuote) -> Option<PricingOption> {
    let Some(service_type) = ServiceType::parse(&quote.service_type) else {
        tracing::warn!(option_id = %quote.id, service_type = %quote.service_type, "未知服务类型，忽略该选项");
        return None;
    };
    Some(PricingOption {
        id: quote.id,
        name: quote.name,
        service_type,
        total_price: quote.total_price,
        price_without_insurance: quote.price_without_insurance,
        estimated_delivery_days: quote.estimated_delivery_days,
        carrier: quote.carrier,
    })
}
