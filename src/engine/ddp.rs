// ==========================================
// 批量发货系统 - DDP 关税计算与余额扣款
// ==========================================
// 单票状态机: Idle → Calculating → {Available, Unavailable, Error}
// 触发条件: 条款为 DDP + 目的国为 US + HS 编码有效 + 申报价值 > 0
// 批量流程: 批量报价（只读）→ 余额校验 → 确认扣款（带幂等键）
// 红线:
// - 过期响应（令牌 / 输入已变化）一律丢弃
// - 余额只取服务端返回值，不在本地计算
// - 同一报价只能确认一次，扣款在途期间拒绝重复提交
// ==========================================

use crate::domain::{
    to_minor_units, DdpCalculation, DdpLineItem, DdpState, DraftId, ShipmentDraft, ShippingTerms,
};
use crate::engine::error::{PipelineError, PipelineResult};
use crate::engine::events::{OptionalEventPublisher, PipelineEvent};
use crate::engine::services::{
    BalanceService, BulkDdpShipment, CountryClassifier, DdpCalculationRecord, DdpService,
    DeductionRequest,
};
use crate::store::{DdpOutcome, DraftStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// DdpBatchQuote - 批量 DDP 报价
// ==========================================
/// 展示给用户确认的只读报价；confirmation_id 作为扣款幂等键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdpBatchQuote {
    pub confirmation_id: String,
    pub lines: Vec<DdpLineItem>,
    /// 可用条目合计（主货币单位）
    pub total_ddp_amount: f64,
    /// 报价时的用户余额（最小货币单位）
    pub balance_minor: i64,
    pub can_afford: bool,
    /// 报价时的草稿存储版本
    pub store_version: u64,
    pub created_at: DateTime<Utc>,
}

impl DdpBatchQuote {
    pub fn total_minor(&self) -> i64 {
        to_minor_units(self.total_ddp_amount)
    }
}

/// 余额是否足以支付（统一换算为最小货币单位比较）
pub fn can_afford(balance_minor: i64, total_ddp_amount: f64) -> bool {
    balance_minor >= to_minor_units(total_ddp_amount)
}

#[derive(Debug, Default)]
struct DeductionLedger {
    in_flight: bool,
    confirmed: HashSet<String>,
    cached_balance: Option<i64>,
}

/// 离开作用域时清除在途标记
struct InFlightGuard<'a> {
    ledger: &'a Mutex<DeductionLedger>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.in_flight = false;
        }
    }
}

// ==========================================
// DdpCalculator - DDP 计算器
// ==========================================
pub struct DdpCalculator {
    store: Arc<DraftStore>,
    ddp_service: Arc<dyn DdpService>,
    balance_service: Arc<dyn BalanceService>,
    classifier: Arc<dyn CountryClassifier>,
    event_publisher: OptionalEventPublisher,
    user_id: String,
    destination_code: String,
    ledger: Mutex<DeductionLedger>,
}

impl DdpCalculator {
    pub fn new(
        store: Arc<DraftStore>,
        ddp_service: Arc<dyn DdpService>,
        balance_service: Arc<dyn BalanceService>,
        classifier: Arc<dyn CountryClassifier>,
        event_publisher: OptionalEventPublisher,
        user_id: impl Into<String>,
        destination_code: impl Into<String>,
    ) -> Self {
        Self {
            store,
            ddp_service,
            balance_service,
            classifier,
            event_publisher,
            user_id: user_id.into(),
            destination_code: destination_code.into(),
            ledger: Mutex::new(DeductionLedger::default()),
        }
    }

    /// 单票是否满足 DDP 计算条件
    pub fn should_calculate(&self, draft: &ShipmentDraft) -> bool {
        draft.is_active()
            && draft.customs.shipping_terms == ShippingTerms::Ddp
            && draft.customs.hs_code.is_some()
            && draft.customs.customs_value > 0
            && self
                .classifier
                .country_name_to_code(&draft.receiver.country)
                .is_some_and(|code| code.eq_ignore_ascii_case(&self.destination_code))
    }

    /// 最近一次从服务端取得的余额
    pub fn cached_balance(&self) -> Option<i64> {
        self.ledger.lock().ok().and_then(|l| l.cached_balance)
    }

    // ==========================================
    // 单票计算
    // ==========================================

    /// 单票 DDP 计算
    ///
    /// 不满足触发条件时返回 Ok(None)，不发起请求
    #[instrument(skip(self))]
    pub async fn calculate_for(&self, id: DraftId) -> PipelineResult<Option<DdpState>> {
        let draft = self.store.get(id)?;
        if !self.should_calculate(&draft) {
            tracing::debug!(draft_id = %id, "不满足 DDP 触发条件，跳过");
            return Ok(None);
        }

        let ticket = self.store.begin_ddp(id)?;
        let result = self
            .ddp_service
            .calculate_ddp(ticket.row_index, &ticket.hs_code, ticket.customs_value)
            .await;

        let outcome = match result {
            Err(e) => {
                let err = PipelineError::DdpCalculationFailed(e.to_string());
                tracing::error!(draft_id = %id, error = %err, "DDP 计算失败");
                DdpOutcome::Failed(err.to_string())
            }
            Ok(resp) => {
                let record = resp
                    .calculations
                    .iter()
                    .find(|c| c.shipment_index == ticket.row_index)
                    .or_else(|| resp.calculations.first())
                    .cloned();
                match record {
                    None => {
                        let err = PipelineError::DdpCalculationFailed("响应缺少计算结果".to_string());
                        tracing::error!(draft_id = %id, error = %err, "DDP 计算失败");
                        DdpOutcome::Failed(err.to_string())
                    }
                    Some(r) if r.available => DdpOutcome::Available(to_calculation(r)),
                    Some(r) => {
                        tracing::info!(draft_id = %id, hs_code = %r.hs_code, "无适用关税税率");
                        DdpOutcome::Unavailable(to_calculation(r))
                    }
                }
            }
        };

        self.store.apply_ddp_outcome(&ticket, outcome)?;
        Ok(Some(self.store.get(id)?.ddp_state))
    }

    // ==========================================
    // 批量报价
    // ==========================================

    /// 批量计算整批 DDP 并查询余额，生成待确认报价
    #[instrument(skip(self))]
    pub async fn quote_batch(&self) -> PipelineResult<DdpBatchQuote> {
        let snapshot = self.store.snapshot()?;
        let eligible: Vec<&ShipmentDraft> = snapshot
            .active()
            .filter(|d| {
                d.customs.shipping_terms == ShippingTerms::Ddp
                    && d.customs.hs_code.is_some()
                    && d.customs.customs_value > 0
            })
            .collect();
        if eligible.is_empty() {
            return Err(PipelineError::NothingToCalculate);
        }

        let shipments: Vec<BulkDdpShipment> = eligible
            .iter()
            .enumerate()
            .map(|(index, d)| BulkDdpShipment {
                shipment_index: index,
                hs_code: d.customs.hs_code.clone().unwrap_or_default(),
                customs_value: d.customs.customs_value,
            })
            .collect();

        let resp = self
            .ddp_service
            .calculate_bulk_ddp(shipments, &self.user_id)
            .await
            .map_err(|e| PipelineError::DdpCalculationFailed(e.to_string()))?;
        if !resp.success {
            return Err(PipelineError::DdpCalculationFailed(
                resp.error.unwrap_or_else(|| "批量关税服务返回失败".to_string()),
            ));
        }

        let mut results: Vec<(DraftId, DdpCalculation)> = Vec::new();
        let mut lines: Vec<DdpLineItem> = Vec::new();
        for record in resp.calculations {
            let Some(draft) = eligible.get(record.shipment_index) else {
                tracing::warn!(index = record.shipment_index, "批量关税结果索引越界，忽略");
                continue;
            };
            let calc = to_calculation(record);
            if calc.available {
                lines.push(DdpLineItem {
                    draft_id: draft.id,
                    row_index: draft.row_index,
                    hs_code: calc.hs_code.clone(),
                    customs_value: calc.customs_value,
                    total: calc.total,
                });
            }
            results.push((draft.id, calc));
        }

        let total_minor: i64 = lines.iter().map(|l| to_minor_units(l.total)).sum();
        let total_ddp_amount = total_minor as f64 / 100.0;
        if to_minor_units(resp.total_ddp_amount) != total_minor {
            tracing::warn!(
                server_total = resp.total_ddp_amount,
                local_total = total_ddp_amount,
                "服务端合计与明细合计不一致，以明细为准"
            );
        }

        let applied = self.store.apply_batch_ddp(results)?;

        let balance_minor = self.balance_service.balance(&self.user_id).await?;
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.cached_balance = Some(balance_minor);
        }

        let quote = DdpBatchQuote {
            confirmation_id: Uuid::new_v4().to_string(),
            lines,
            total_ddp_amount,
            balance_minor,
            can_afford: can_afford(balance_minor, total_ddp_amount),
            store_version: self.store.version()?,
            created_at: Utc::now(),
        };

        tracing::info!(
            confirmation_id = %quote.confirmation_id,
            eligible = eligible.len(),
            applied,
            total = quote.total_ddp_amount,
            balance = quote.balance_minor,
            can_afford = quote.can_afford,
            "批量 DDP 报价完成"
        );
        Ok(quote)
    }

    // ==========================================
    // 确认扣款
    // ==========================================

    /// 确认扣款，成功返回服务端权威余额
    ///
    /// 失败时不修改本地余额，也不自动重试；报价后批次有任何修改都需重新报价
    #[instrument(skip(self, quote), fields(confirmation_id = %quote.confirmation_id))]
    pub async fn confirm_deduction(&self, quote: &DdpBatchQuote) -> PipelineResult<i64> {
        let current_version = self.store.version()?;
        let _guard = {
            let mut ledger = self
                .ledger
                .lock()
                .map_err(|e| PipelineError::StoreLock(e.to_string()))?;
            if ledger.confirmed.contains(&quote.confirmation_id) {
                return Err(PipelineError::QuoteAlreadyConfirmed(quote.confirmation_id.clone()));
            }
            if ledger.in_flight {
                return Err(PipelineError::DeductionInFlight);
            }
            if quote.lines.is_empty() {
                return Err(PipelineError::NothingToCalculate);
            }
            if !quote.can_afford {
                return Err(PipelineError::InsufficientBalance {
                    required_minor: quote.total_minor(),
                    balance_minor: quote.balance_minor,
                });
            }
            if current_version != quote.store_version {
                tracing::warn!(quote_version = quote.store_version, current_version, "报价后批次已修改，拒绝扣款");
                return Err(PipelineError::StaleQuote {
                    quote_version: quote.store_version,
                    current_version,
                });
            }
            ledger.in_flight = true;
            InFlightGuard { ledger: &self.ledger }
        };

        let request = DeductionRequest {
            user_id: self.user_id.clone(),
            ddp_amount: quote.total_ddp_amount,
            shipment_details: quote.lines.clone(),
            idempotency_key: quote.confirmation_id.clone(),
        };

        let resp = self
            .balance_service
            .deduct_ddp_balance(request)
            .await
            .map_err(|e| PipelineError::DeductionFailed(e.to_string()))?;
        if !resp.success {
            let message = resp.message.unwrap_or_else(|| "扣款被拒绝".to_string());
            tracing::error!(error = %message, "DDP 扣款失败");
            return Err(PipelineError::DeductionFailed(message));
        }

        {
            let mut ledger = self
                .ledger
                .lock()
                .map_err(|e| PipelineError::StoreLock(e.to_string()))?;
            ledger.confirmed.insert(quote.confirmation_id.clone());
            ledger.cached_balance = Some(resp.new_balance);
        }

        self.event_publisher.publish(PipelineEvent::BalanceInvalidated {
            new_balance_minor: resp.new_balance,
        });
        tracing::info!(new_balance = resp.new_balance, "DDP 扣款成功");
        Ok(resp.new_balance)
    }
}

fn to_calculation(record: DdpCalculationRecord) -> DdpCalculation {
    let error_message = if record.available {
        record.message
    } else {
        Some(
            PipelineError::DdpUnavailable {
                message: record.message.unwrap_or_else(|| format!("HS {}", record.hs_code)),
            }
            .to_string(),
        )
    };
    DdpCalculation {
        hs_code: record.hs_code,
        customs_value: record.customs_value,
        duty_percentage: record.duty_percentage,
        base_duty: record.base_duty,
        ddp_processing_fee: record.ddp_processing_fee,
        total: record.total,
        formatted_total: record.formatted_total,
        available: record.available,
        error_message,
    }
}
