// ==========================================
// 批量发货系统 - 批次 API
// ==========================================
// 职责: 批次生命周期的统一入口（导入 / 编辑 / 重算 / DDP / 提交）
// 编辑联动:
// - 尺寸 / 模板 / HS / 申报价值 / 目的国 → 静默重算该票计价
// - HS / 申报价值 / 条款改为 DDP → 单票 DDP 计算（条件不满足时跳过）；目的国只清除旧结果
// - 申报价值 → 已投保时走远端保费路径
// - 保险开关 / 保额 → 本地费率
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::PipelineConfig;
use crate::domain::{
    DimensionTemplate, DraftId, FinalizedShipment, RecalcMode, ShipmentDraft, ShippingTerms,
    ValidationIssue,
};
use crate::engine::{
    BalanceService, BatchCreationReceipt, CountryClassifier, DdpBatchQuote, DdpCalculator,
    DdpService, InsuranceCalculator, InsuranceService, OptionalEventPublisher, OrderCreator,
    PipelineEvent, PricingRecalcEngine, PricingService, RecalcOutcome, TaxIdValidator,
    WeightCalculator,
};
use crate::importer::{ImportOutcome, ShipmentImporter};
use crate::repository::TemplateStore;
use crate::store::{DimensionsPatch, DraftSnapshot, DraftStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// 管线依赖的外部协作方
#[derive(Clone)]
pub struct BatchServices {
    pub pricing: Arc<dyn PricingService>,
    pub insurance: Arc<dyn InsuranceService>,
    pub ddp: Arc<dyn DdpService>,
    pub balance: Arc<dyn BalanceService>,
    pub classifier: Arc<dyn CountryClassifier>,
    pub orders: Arc<dyn OrderCreator>,
    pub templates: Arc<dyn TemplateStore>,
}

// ==========================================
// BatchApi - 批次 API
// ==========================================
pub struct BatchApi {
    config: PipelineConfig,
    store: Arc<DraftStore>,
    importer: ShipmentImporter,
    pricing: PricingRecalcEngine,
    insurance: InsuranceCalculator,
    ddp: DdpCalculator,
    validator: TaxIdValidator,
    templates: Arc<dyn TemplateStore>,
    orders: Arc<dyn OrderCreator>,
    event_publisher: OptionalEventPublisher,
}

impl BatchApi {
    pub fn new(
        config: PipelineConfig,
        services: BatchServices,
        event_publisher: OptionalEventPublisher,
        user_id: impl Into<String>,
    ) -> Self {
        let weight = WeightCalculator::new(&config);
        let store = Arc::new(DraftStore::new(weight.clone()));

        Self {
            importer: ShipmentImporter::new(&config),
            pricing: PricingRecalcEngine::new(
                store.clone(),
                services.pricing,
                weight,
                event_publisher.clone(),
            ),
            insurance: InsuranceCalculator::new(services.insurance, &config),
            ddp: DdpCalculator::new(
                store.clone(),
                services.ddp,
                services.balance,
                services.classifier.clone(),
                event_publisher.clone(),
                user_id,
                config.ddp_destination_code.clone(),
            ),
            validator: TaxIdValidator::new(services.classifier),
            templates: services.templates,
            orders: services.orders,
            store,
            event_publisher,
            config,
        }
    }

    // ==========================================
    // 批次生命周期
    // ==========================================

    /// 导入新批次（替换当前批次）
    pub fn ingest_rows(&self, rows: &[HashMap<String, String>]) -> ApiResult<ImportOutcome> {
        let outcome = self.importer.import_rows(rows)?;
        self.store.load(outcome.drafts.clone())?;
        Ok(outcome)
    }

    pub fn discard_batch(&self) -> ApiResult<()> {
        Ok(self.store.discard()?)
    }

    pub fn snapshot(&self) -> ApiResult<DraftSnapshot> {
        Ok(self.store.snapshot()?)
    }

    pub fn draft(&self, id: DraftId) -> ApiResult<ShipmentDraft> {
        Ok(self.store.get(id)?)
    }

    // ==========================================
    // 编辑
    // ==========================================

    pub async fn update_dimensions(&self, id: DraftId, patch: DimensionsPatch) -> ApiResult<ShipmentDraft> {
        self.store.set_dimensions(id, patch)?;
        self.auto_recalc(id).await;
        self.draft(id)
    }

    pub async fn apply_template(&self, id: DraftId, template_name: &str) -> ApiResult<ShipmentDraft> {
        let template = self
            .templates
            .get(template_name)?
            .ok_or_else(|| ApiError::NotFound(format!("尺寸模板 {} 不存在", template_name)))?;
        self.store.apply_template(id, &template)?;
        self.auto_recalc(id).await;
        self.draft(id)
    }

    pub async fn update_hs_code(&self, id: DraftId, raw: &str) -> ApiResult<ShipmentDraft> {
        self.store.set_hs_code(id, raw)?;
        self.auto_recalc(id).await;
        self.ddp.calculate_for(id).await?;
        self.draft(id)
    }

    /// 编辑申报价值；已投保时保额跟随，保费走远端路径
    pub async fn update_customs_value(&self, id: DraftId, value_minor: i64) -> ApiResult<ShipmentDraft> {
        let updated = self.store.set_customs_value(id, value_minor)?;
        if updated.insurance.has_insurance && updated.insurance.insurance_value > 0 {
            let insured = updated.insurance.insurance_value;
            let cost = self.insurance.remote_cost(insured).await;
            self.store.apply_insurance_cost(id, insured, cost)?;
        }
        self.auto_recalc(id).await;
        self.ddp.calculate_for(id).await?;
        self.draft(id)
    }

    pub async fn update_receiver_country(&self, id: DraftId, country: &str) -> ApiResult<ShipmentDraft> {
        self.store.set_receiver_country(id, country)?;
        self.auto_recalc(id).await;
        self.draft(id)
    }

    pub async fn set_shipping_terms(&self, id: DraftId, terms: ShippingTerms) -> ApiResult<ShipmentDraft> {
        self.store.set_shipping_terms(id, terms)?;
        if terms == ShippingTerms::Ddp {
            self.ddp.calculate_for(id).await?;
        }
        self.draft(id)
    }

    /// 保险开关（本地费率）；开启时保额取已有保额，否则取申报价值
    pub fn toggle_insurance(&self, id: DraftId, enabled: bool) -> ApiResult<ShipmentDraft> {
        let current = self.store.get(id)?;
        let value = if current.insurance.insurance_value > 0 {
            current.insurance.insurance_value
        } else {
            current.customs.customs_value
        };
        let cost = self.insurance.local_cost(value);
        Ok(self.store.set_insurance(id, enabled && value > 0, value, cost)?)
    }

    /// 编辑保额（本地费率）；保额 ≤ 0 视为关闭保险
    pub fn set_insurance_value(&self, id: DraftId, value_minor: i64) -> ApiResult<ShipmentDraft> {
        let cost = self.insurance.local_cost(value_minor);
        Ok(self
            .store
            .set_insurance(id, value_minor > 0, value_minor, cost)?)
    }

    pub fn set_tax_id(&self, id: DraftId, tax_id: Option<String>) -> ApiResult<ShipmentDraft> {
        Ok(self.store.set_tax_id(id, tax_id)?)
    }

    pub fn set_skip_import(&self, id: DraftId, skip: bool) -> ApiResult<ShipmentDraft> {
        Ok(self.store.set_skip_import(id, skip)?)
    }

    pub fn select_service_option(&self, id: DraftId, option_id: &str) -> ApiResult<ShipmentDraft> {
        Ok(self.store.select_service_option(id, option_id)?)
    }

    // ==========================================
    // 计价
    // ==========================================

    /// 用户触发的计价重算；ids 为空表示整批
    pub async fn recalculate(&self, ids: &[DraftId]) -> ApiResult<RecalcOutcome> {
        Ok(self.pricing.recalculate(ids, RecalcMode::Interactive).await?)
    }

    /// 编辑后自动静默重算；失败只记录日志
    async fn auto_recalc(&self, id: DraftId) {
        if !self.config.auto_recalc_on_edit {
            return;
        }
        match self.pricing.recalculate(&[id], RecalcMode::Silent).await {
            Ok(outcome) => tracing::debug!(draft_id = %id, ?outcome, "静默重算结束"),
            Err(e) => tracing::debug!(draft_id = %id, error = %e, "静默重算失败，已忽略"),
        }
    }

    // ==========================================
    // DDP
    // ==========================================

    pub async fn calculate_ddp(&self, id: DraftId) -> ApiResult<ShipmentDraft> {
        self.ddp.calculate_for(id).await?;
        self.draft(id)
    }

    pub async fn quote_batch_ddp(&self) -> ApiResult<DdpBatchQuote> {
        Ok(self.ddp.quote_batch().await?)
    }

    /// 确认扣款，返回服务端权威余额
    pub async fn confirm_ddp_deduction(&self, quote: &DdpBatchQuote) -> ApiResult<i64> {
        Ok(self.ddp.confirm_deduction(quote).await?)
    }

    pub fn cached_balance(&self) -> Option<i64> {
        self.ddp.cached_balance()
    }

    // ==========================================
    // 合规与提交
    // ==========================================

    /// 收集整批税号违规（不阻断）
    pub fn compliance_issues(&self) -> ApiResult<Vec<ValidationIssue>> {
        let snapshot = self.store.snapshot()?;
        Ok(self.validator.collect_issues(&snapshot.drafts))
    }

    /// 合规闸门通过后生成定稿列表（未跳过且已选服务）
    pub fn finalize(&self) -> ApiResult<Vec<FinalizedShipment>> {
        let snapshot = self.store.snapshot()?;
        self.validator.validate_batch(&snapshot.drafts)?;

        let now = Utc::now();
        Ok(snapshot
            .drafts
            .iter()
            .filter_map(|d| FinalizedShipment::from_draft(d, now))
            .collect())
    }

    /// 批量下单；任何合规违规都会在下单前整批拒绝
    #[instrument(skip(self))]
    pub async fn submit_batch(&self) -> ApiResult<BatchCreationReceipt> {
        let finalized = self.finalize()?;
        if finalized.is_empty() {
            return Err(ApiError::InvalidInput("没有可提交的运单（需未跳过且已选择服务）".to_string()));
        }

        let count = finalized.len();
        let receipt = self
            .orders
            .create_orders(finalized)
            .await
            .map_err(|e| ApiError::SubmissionFailed(e.to_string()))?;

        tracing::info!(batch_id = %receipt.batch_id, submitted = count, created = receipt.created_count, "批量下单完成");
        self.event_publisher.publish(PipelineEvent::BatchSubmitted {
            batch_id: receipt.batch_id.clone(),
            created_count: receipt.created_count,
        });
        Ok(receipt)
    }

    // ==========================================
    // 尺寸模板
    // ==========================================

    pub fn list_templates(&self) -> ApiResult<Vec<DimensionTemplate>> {
        Ok(self.templates.list()?)
    }

    pub fn save_template(&self, template: &DimensionTemplate) -> ApiResult<()> {
        Ok(self.templates.save(template)?)
    }

    pub fn delete_template(&self, name: &str) -> ApiResult<bool> {
        Ok(self.templates.delete(name)?)
    }
}
