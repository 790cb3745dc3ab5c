// ==========================================
// 批量发货系统 - 运单草稿存储
// ==========================================
// 职责: 整批 ShipmentDraft 的唯一持有者
// 模型: 带版本号的写时复制集合
//   - 读: snapshot() 返回 Arc 共享的只读快照
//   - 写: 克隆整个集合 → 修改 → 整体替换 → 版本号 +1
// 红线: 锁只在同步代码中持有，绝不跨越 await
// ==========================================

use crate::domain::{
    DdpCalculation, DdpState, DimensionTemplate, DraftId, ShipmentDraft, ShippingTerms,
};
use crate::engine::error::{PipelineError, PipelineResult};
use crate::engine::weight::WeightCalculator;
use crate::importer::data_cleaner::clean_hs_code;
use crate::store::patch::{
    DdpOutcome, DdpTicket, DimensionsPatch, MergeMode, MergeReport, PricingPatch,
    PricingPatchOutcome,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

// ==========================================
// DraftSnapshot - 只读快照
// ==========================================
#[derive(Debug, Clone)]
pub struct DraftSnapshot {
    pub version: u64,
    pub drafts: Arc<Vec<ShipmentDraft>>,
}

impl DraftSnapshot {
    pub fn find(&self, id: DraftId) -> Option<&ShipmentDraft> {
        self.drafts.iter().find(|d| d.id == id)
    }

    /// 未被跳过的草稿
    pub fn active(&self) -> impl Iterator<Item = &ShipmentDraft> {
        self.drafts.iter().filter(|d| d.is_active())
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    version: u64,
    drafts: Arc<Vec<ShipmentDraft>>,
}

// ==========================================
// DraftStore - 草稿存储
// ==========================================
pub struct DraftStore {
    state: RwLock<StoreState>,
    weight: WeightCalculator,
}

impl DraftStore {
    pub fn new(weight: WeightCalculator) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            weight,
        }
    }

    // ==========================================
    // 读
    // ==========================================

    pub fn snapshot(&self) -> PipelineResult<DraftSnapshot> {
        let state = self
            .state
            .read()
            .map_err(|e| PipelineError::StoreLock(e.to_string()))?;
        Ok(DraftSnapshot {
            version: state.version,
            drafts: Arc::clone(&state.drafts),
        })
    }

    pub fn version(&self) -> PipelineResult<u64> {
        Ok(self.snapshot()?.version)
    }

    pub fn get(&self, id: DraftId) -> PipelineResult<ShipmentDraft> {
        self.snapshot()?
            .find(id)
            .cloned()
            .ok_or(PipelineError::DraftNotFound(id))
    }

    // ==========================================
    // 写时复制提交
    // ==========================================

    /// 克隆集合 → 执行修改 → 整体替换；修改返回 Err 时不落地
    fn commit<R>(
        &self,
        f: impl FnOnce(&mut Vec<ShipmentDraft>) -> PipelineResult<R>,
    ) -> PipelineResult<R> {
        let mut state = self
            .state
            .write()
            .map_err(|e| PipelineError::StoreLock(e.to_string()))?;

        let mut next: Vec<ShipmentDraft> = state.drafts.as_ref().clone();
        let result = f(&mut next)?;

        state.drafts = Arc::new(next);
        state.version += 1;
        Ok(result)
    }

    /// 修改单个草稿并返回修改后的副本
    fn edit(
        &self,
        id: DraftId,
        f: impl FnOnce(&mut ShipmentDraft, &WeightCalculator) -> PipelineResult<()>,
    ) -> PipelineResult<ShipmentDraft> {
        let weight = &self.weight;
        self.commit(|drafts| {
            let draft = drafts
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or(PipelineError::DraftNotFound(id))?;
            f(draft, weight)?;
            Ok(draft.clone())
        })
    }

    // ==========================================
    // 批次生命周期
    // ==========================================

    /// 载入新批次（替换旧批次），重新派生所有重量字段
    pub fn load(&self, mut drafts: Vec<ShipmentDraft>) -> PipelineResult<u64> {
        for draft in drafts.iter_mut() {
            self.weight.apply(&mut draft.package);
        }
        let count = drafts.len();
        self.commit(move |current| {
            *current = drafts;
            Ok(())
        })?;
        let version = self.version()?;
        tracing::info!(count, version, "运单批次已载入");
        Ok(version)
    }

    /// 丢弃整批
    pub fn discard(&self) -> PipelineResult<()> {
        self.commit(|current| {
            current.clear();
            Ok(())
        })?;
        tracing::info!("运单批次已丢弃");
        Ok(())
    }

    // ==========================================
    // 字段编辑
    // ==========================================

    /// 编辑尺寸：重新派生重量、清空报价、脱离模板
    pub fn set_dimensions(&self, id: DraftId, patch: DimensionsPatch) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, weight| {
            let pkg = &mut draft.package;
            if let Some(v) = patch.length_cm {
                pkg.length_cm = Some(v);
            }
            if let Some(v) = patch.width_cm {
                pkg.width_cm = Some(v);
            }
            if let Some(v) = patch.height_cm {
                pkg.height_cm = Some(v);
            }
            if let Some(v) = patch.weight_kg {
                pkg.weight_kg = Some(v);
            }
            weight.apply(pkg);
            draft.selected_template = None;
            invalidate_pricing(draft);
            Ok(())
        })
    }

    /// 套用尺寸模板
    pub fn apply_template(&self, id: DraftId, template: &DimensionTemplate) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, weight| {
            let pkg = &mut draft.package;
            pkg.length_cm = Some(template.length_cm);
            pkg.width_cm = Some(template.width_cm);
            pkg.height_cm = Some(template.height_cm);
            pkg.weight_kg = Some(template.weight_kg);
            weight.apply(pkg);
            draft.selected_template = Some(template.name.clone());
            invalidate_pricing(draft);
            Ok(())
        })
    }

    /// 编辑 HS 编码：保存原文与清洗结果，清空报价与旧 DDP 结果
    pub fn set_hs_code(&self, id: DraftId, raw: &str) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, _| {
            draft.customs.hs_code_raw = raw.trim().to_string();
            draft.customs.hs_code = clean_hs_code(raw);
            invalidate_pricing(draft);
            reset_ddp(draft);
            Ok(())
        })
    }

    /// 编辑申报价值；已投保时保额随申报价值同步，保额归零即退保
    pub fn set_customs_value(&self, id: DraftId, value_minor: i64) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, _| {
            draft.customs.customs_value = value_minor.max(0);
            let ins = &mut draft.insurance;
            if ins.has_insurance {
                ins.insurance_value = draft.customs.customs_value;
                if ins.insurance_value == 0 {
                    ins.has_insurance = false;
                    ins.calculated_insurance_cost = 0;
                }
            }
            invalidate_pricing(draft);
            reset_ddp(draft);
            Ok(())
        })
    }

    /// 编辑目的国：影响报价与 DDP 适用性
    pub fn set_receiver_country(&self, id: DraftId, country: &str) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, _| {
            draft.receiver.country = country.trim().to_string();
            invalidate_pricing(draft);
            reset_ddp(draft);
            Ok(())
        })
    }

    /// 编辑贸易条款；离开 DDP 时清除关税结果并作废在途请求
    pub fn set_shipping_terms(&self, id: DraftId, terms: ShippingTerms) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, _| {
            let previous = draft.customs.shipping_terms;
            draft.customs.shipping_terms = terms;
            if previous == ShippingTerms::Ddp && terms != ShippingTerms::Ddp {
                reset_ddp(draft);
            }
            Ok(())
        })
    }

    /// 写入保险状态（由保险计算器给出保费）
    pub fn set_insurance(
        &self,
        id: DraftId,
        has_insurance: bool,
        insurance_value: i64,
        cost: i64,
    ) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, _| {
            let ins = &mut draft.insurance;
            ins.has_insurance = has_insurance;
            if has_insurance {
                ins.insurance_value = insurance_value.max(0);
                ins.calculated_insurance_cost = cost.max(0);
            } else {
                ins.insurance_value = 0;
                ins.calculated_insurance_cost = 0;
            }
            Ok(())
        })
    }

    /// 应用远端保费；保额在请求期间已变化或已退保时丢弃，返回是否应用
    pub fn apply_insurance_cost(&self, id: DraftId, expected_value: i64, cost: i64) -> PipelineResult<bool> {
        self.commit(|drafts| {
            let draft = drafts
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or(PipelineError::DraftNotFound(id))?;
            let ins = &mut draft.insurance;
            if !ins.has_insurance || ins.insurance_value != expected_value {
                tracing::warn!(draft_id = %id, "保费响应已过期，丢弃");
                return Ok(false);
            }
            ins.calculated_insurance_cost = cost.max(0);
            Ok(true)
        })
    }

    pub fn set_tax_id(&self, id: DraftId, tax_id: Option<String>) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, _| {
            draft.tax_id = tax_id.map(|t| t.trim().to_string());
            Ok(())
        })
    }

    pub fn set_skip_import(&self, id: DraftId, skip: bool) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, _| {
            draft.skip_import = skip;
            Ok(())
        })
    }

    /// 选择服务选项，必须是当前报价中的一项
    pub fn select_service_option(&self, id: DraftId, option_id: &str) -> PipelineResult<ShipmentDraft> {
        self.edit(id, |draft, _| {
            if !draft.pricing.options.iter().any(|o| o.id == option_id) {
                return Err(PipelineError::UnknownServiceOption {
                    option_id: option_id.to_string(),
                });
            }
            draft.pricing.selected_service_option = Some(option_id.to_string());
            Ok(())
        })
    }

    // ==========================================
    // 计价合并
    // ==========================================

    /// 标记 / 取消标记重算中
    pub fn mark_recalculating(&self, ids: &[DraftId], flag: bool) -> PipelineResult<()> {
        let targets: HashSet<DraftId> = ids.iter().copied().collect();
        self.commit(|drafts| {
            for draft in drafts.iter_mut().filter(|d| targets.contains(&d.id)) {
                draft.pricing.is_recalculating = flag;
            }
            Ok(())
        })
    }

    /// 合并计价结果
    ///
    /// 只写入 options / selected_service_option / pricing_error / calculated_duties，
    /// 其余字段一律保留存储中的当前值。按 DraftId 定位，不按下标。
    /// 请求期间 pricing_revision 已变化的结果视为过期，只清除重算标记。
    pub fn merge_pricing(&self, patches: Vec<PricingPatch>) -> PipelineResult<MergeReport> {
        self.commit(|drafts| {
            let active_ids: HashSet<DraftId> =
                drafts.iter().filter(|d| d.is_active()).map(|d| d.id).collect();
            let patch_ids: HashSet<DraftId> = patches.iter().map(|p| p.id).collect();
            let mode = if !active_ids.is_empty() && active_ids.is_subset(&patch_ids) {
                MergeMode::Full
            } else {
                MergeMode::Partial
            };

            let mut report = MergeReport {
                mode,
                applied: 0,
                superseded: Vec::new(),
                missing: Vec::new(),
            };

            match mode {
                MergeMode::Full => {
                    let mut by_id: HashMap<DraftId, PricingPatch> =
                        patches.into_iter().map(|p| (p.id, p)).collect();
                    for draft in drafts.iter_mut() {
                        if let Some(patch) = by_id.remove(&draft.id) {
                            apply_pricing_patch(draft, patch, &mut report);
                        }
                    }
                    report.missing.extend(by_id.into_keys());
                }
                MergeMode::Partial => {
                    for patch in patches {
                        match drafts.iter_mut().find(|d| d.id == patch.id) {
                            Some(draft) => apply_pricing_patch(draft, patch, &mut report),
                            None => report.missing.push(patch.id),
                        }
                    }
                }
            }

            Ok(report)
        })
    }

    // ==========================================
    // DDP 合并
    // ==========================================

    /// 发起单票 DDP：令牌 +1，状态置为 Calculating，返回请求凭据
    pub fn begin_ddp(&self, id: DraftId) -> PipelineResult<DdpTicket> {
        self.commit(|drafts| {
            let draft = drafts
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or(PipelineError::DraftNotFound(id))?;
            let hs_code = draft
                .customs
                .hs_code
                .clone()
                .ok_or_else(|| PipelineError::DdpCalculationFailed("HS 编码无效".to_string()))?;

            draft.ddp_token += 1;
            draft.ddp_state = DdpState::Calculating;
            Ok(DdpTicket {
                id,
                row_index: draft.row_index,
                token: draft.ddp_token,
                hs_code,
                customs_value: draft.customs.customs_value,
            })
        })
    }

    /// 应用单票 DDP 结果；令牌或输入已变化时丢弃，返回是否应用
    pub fn apply_ddp_outcome(&self, ticket: &DdpTicket, outcome: DdpOutcome) -> PipelineResult<bool> {
        self.commit(|drafts| {
            let Some(draft) = drafts.iter_mut().find(|d| d.id == ticket.id) else {
                return Ok(false);
            };
            if !ddp_ticket_is_current(draft, ticket) {
                tracing::warn!(
                    draft_id = %ticket.id,
                    token = ticket.token,
                    current = draft.ddp_token,
                    "DDP 响应已过期，丢弃"
                );
                return Ok(false);
            }

            match outcome {
                DdpOutcome::Available(calc) => {
                    draft.ddp_calculation = Some(calc);
                    draft.ddp_state = DdpState::Available;
                }
                DdpOutcome::Unavailable(calc) => {
                    draft.ddp_calculation = Some(calc);
                    draft.ddp_state = DdpState::Unavailable;
                }
                DdpOutcome::Failed(message) => {
                    draft.ddp_calculation = None;
                    draft.ddp_state = DdpState::Error { message };
                }
            }
            Ok(true)
        })
    }

    /// 批量写入 DDP 结果；输入已与计算时不一致的条目跳过，返回写入数
    pub fn apply_batch_ddp(&self, results: Vec<(DraftId, DdpCalculation)>) -> PipelineResult<usize> {
        self.commit(|drafts| {
            let mut applied = 0;
            for (id, calc) in results {
                let Some(draft) = drafts.iter_mut().find(|d| d.id == id) else {
                    continue;
                };
                let inputs_match = draft.customs.hs_code.as_deref() == Some(calc.hs_code.as_str())
                    && draft.customs.customs_value == calc.customs_value
                    && draft.customs.shipping_terms == ShippingTerms::Ddp;
                if !inputs_match {
                    continue;
                }
                draft.ddp_token += 1;
                draft.ddp_state = if calc.available {
                    DdpState::Available
                } else {
                    DdpState::Unavailable
                };
                draft.ddp_calculation = Some(calc);
                applied += 1;
            }
            Ok(applied)
        })
    }
}

fn invalidate_pricing(draft: &mut ShipmentDraft) {
    draft.pricing.invalidate();
    draft.calculated_duties = None;
    draft.pricing_revision += 1;
}

fn reset_ddp(draft: &mut ShipmentDraft) {
    draft.ddp_calculation = None;
    draft.ddp_state = DdpState::Idle;
    draft.ddp_token += 1;
}

fn ddp_ticket_is_current(draft: &ShipmentDraft, ticket: &DdpTicket) -> bool {
    draft.ddp_token == ticket.token
        && draft.customs.shipping_terms == ShippingTerms::Ddp
        && draft.customs.hs_code.as_deref() == Some(ticket.hs_code.as_str())
        && draft.customs.customs_value == ticket.customs_value
}

fn apply_pricing_patch(draft: &mut ShipmentDraft, patch: PricingPatch, report: &mut MergeReport) {
    draft.pricing.is_recalculating = false;

    if draft.pricing_revision != patch.revision {
        tracing::warn!(
            draft_id = %draft.id,
            requested = patch.revision,
            current = draft.pricing_revision,
            "计价结果已过期，丢弃"
        );
        report.superseded.push(draft.id);
        return;
    }

    match patch.outcome {
        PricingPatchOutcome::Priced { options, duties } => {
            draft.pricing.selected_service_option = options.first().map(|o| o.id.clone());
            draft.pricing.options = options;
            draft.pricing.pricing_error = None;
            draft.calculated_duties = duties;
        }
        PricingPatchOutcome::Failed { message } => {
            draft.pricing.options.clear();
            draft.pricing.selected_service_option = None;
            draft.pricing.pricing_error = Some(message);
            draft.calculated_duties = None;
        }
    }
    report.applied += 1;
}
