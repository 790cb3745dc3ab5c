// ==========================================
// 批量发货系统 - 运单批次导入器
// ==========================================
// 职责: 已解析的行数据 → ShipmentDraft 集合
// 流程: 映射 → 校验必填 → 清洗 → 分配标识 → 派生重量 / 保费
// 说明: 单行失败记入 rejected，不影响其他行
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::{RawShipmentRecord, Receiver, ShipmentDraft};
use crate::engine::insurance::local_insurance_cost;
use crate::engine::weight::WeightCalculator;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// 被拒绝的源行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRejection {
    pub row: usize,
    pub message: String,
}

/// 导入结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub batch_id: String,
    pub imported_at: DateTime<Utc>,
    pub drafts: Vec<ShipmentDraft>,
    pub rejected: Vec<RowRejection>,
}

// ==========================================
// ShipmentImporter - 运单导入器
// ==========================================
pub struct ShipmentImporter {
    mapper: FieldMapper,
    cleaner: DataCleaner,
    weight: WeightCalculator,
    insurance_rate: f64,
}

impl ShipmentImporter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            mapper: FieldMapper::new(),
            cleaner: DataCleaner,
            weight: WeightCalculator::new(config),
            insurance_rate: config.insurance_rate,
        }
    }

    /// 导入整批行数据（行号从 1 开始）
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn import_rows(&self, rows: &[HashMap<String, String>]) -> ImportResult<ImportOutcome> {
        if rows.is_empty() {
            return Err(ImportError::EmptyBatch);
        }

        let mut drafts = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let row_number = index + 1;
            match self
                .mapper
                .map_row(row, row_number)
                .and_then(|record| self.build_draft(record))
            {
                Ok(draft) => drafts.push(draft),
                Err(e) => {
                    tracing::warn!(row = row_number, error = %e, "行导入失败");
                    rejected.push(RowRejection {
                        row: row_number,
                        message: e.to_string(),
                    });
                }
            }
        }

        let outcome = ImportOutcome {
            batch_id: Uuid::new_v4().to_string(),
            imported_at: Utc::now(),
            drafts,
            rejected,
        };
        tracing::info!(
            batch_id = %outcome.batch_id,
            imported = outcome.drafts.len(),
            rejected = outcome.rejected.len(),
            "运单批次导入完成"
        );
        Ok(outcome)
    }

    /// 规范化记录 → 草稿
    pub fn build_draft(&self, record: RawShipmentRecord) -> ImportResult<ShipmentDraft> {
        let row = record.row_number;
        let name = record.receiver_name.ok_or(ImportError::MissingRequiredField {
            row,
            field: "receiver_name".to_string(),
        })?;
        let country = record.country.ok_or(ImportError::MissingRequiredField {
            row,
            field: "country".to_string(),
        })?;
        let order_reference = record
            .order_reference
            .unwrap_or_else(|| format!("ROW-{}", row));

        let receiver = Receiver {
            name,
            address_line1: record.address_line1.unwrap_or_default(),
            address_line2: record.address_line2,
            city: record.city.unwrap_or_default(),
            state: record.state,
            country,
            postal_code: record.postal_code.unwrap_or_default(),
            phone: record.phone,
            email: record.email,
        };

        let mut draft = ShipmentDraft::new(row, order_reference, receiver);

        let pkg = &mut draft.package;
        pkg.length_cm = record.length_cm;
        pkg.width_cm = record.width_cm;
        pkg.height_cm = record.height_cm;
        pkg.weight_kg = record.weight_kg;
        self.weight.apply(pkg);

        let customs = &mut draft.customs;
        if let Some(raw) = record.hs_code {
            customs.hs_code = self.cleaner.clean_hs_code(&raw);
            if customs.hs_code.is_none() {
                tracing::debug!(row, hs_code = %raw, "HS 编码无效，保留原文");
            }
            customs.hs_code_raw = raw;
        }
        customs.customs_value = record.customs_value_minor;
        customs.product_name = record.product_name.unwrap_or_default();
        customs.product_description = record.product_description.unwrap_or_default();
        customs.shipping_terms = record.shipping_terms;

        if record.has_insurance {
            draft.insurance.has_insurance = true;
            draft.insurance.insurance_value = record.customs_value_minor;
            draft.insurance.calculated_insurance_cost =
                local_insurance_cost(record.customs_value_minor, self.insurance_rate);
        }

        draft.tax_id = record.tax_id;
        Ok(draft)
    }
}
