// ==========================================
// 批量发货系统 - 待提交运单
// ==========================================
// 职责: 合规校验通过后交给下单服务的定稿记录
// ==========================================

use crate::domain::pricing::PricingOption;
use crate::domain::shipment::{DraftId, Receiver, ShipmentDraft};
use crate::domain::types::ShippingTerms;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedShipment {
    pub draft_id: DraftId,
    pub row_index: usize,
    pub order_reference: String,
    pub receiver: Receiver,

    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub billable_weight: f64,

    pub hs_code: Option<String>,
    pub customs_value: i64,
    pub product_description: String,
    pub shipping_terms: ShippingTerms,
    pub tax_id: Option<String>,

    pub service_option: PricingOption,
    pub insurance_cost: i64,
    /// DDP 关税合计（主货币单位），仅 Available 时有值
    pub ddp_total: Option<f64>,
    pub finalized_at: DateTime<Utc>,
}

impl FinalizedShipment {
    /// 从草稿生成定稿记录；跳过的草稿或未选服务的草稿返回 None
    pub fn from_draft(draft: &ShipmentDraft, finalized_at: DateTime<Utc>) -> Option<Self> {
        if draft.skip_import {
            return None;
        }
        let option = draft.selected_option()?.clone();

        Some(Self {
            draft_id: draft.id,
            row_index: draft.row_index,
            order_reference: draft.order_reference.clone(),
            receiver: draft.receiver.clone(),
            length_cm: draft.package.length_cm.unwrap_or_default(),
            width_cm: draft.package.width_cm.unwrap_or_default(),
            height_cm: draft.package.height_cm.unwrap_or_default(),
            weight_kg: draft.package.weight_kg.unwrap_or_default(),
            billable_weight: draft.package.billable_weight,
            hs_code: draft.customs.hs_code.clone(),
            customs_value: draft.customs.customs_value,
            product_description: draft.customs.product_description.clone(),
            shipping_terms: draft.customs.shipping_terms,
            tax_id: draft
                .tax_id
                .as_ref()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            service_option: option,
            insurance_cost: if draft.insurance.has_insurance {
                draft.insurance.calculated_insurance_cost
            } else {
                0
            },
            ddp_total: draft
                .ddp_calculation
                .as_ref()
                .filter(|c| c.available)
                .map(|c| c.total),
            finalized_at,
        })
    }
}
