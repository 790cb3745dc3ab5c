// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
// 生成与表格导入一致的行数据（列名 → 文本值）
// ==========================================

use std::collections::HashMap;

// ==========================================
// RowBuilder - 源行构建器
// ==========================================

pub struct RowBuilder {
    cells: Vec<(&'static str, String)>,
}

impl RowBuilder {
    pub fn new(name: &str, country: &str) -> Self {
        Self {
            cells: vec![
                ("receiverName", name.to_string()),
                ("country", country.to_string()),
                ("address", "1 Test Street".to_string()),
                ("city", "Testville".to_string()),
                ("postalCode", "10001".to_string()),
                ("productName", "T-Shirt".to_string()),
            ],
        }
    }

    fn set(mut self, key: &'static str, value: String) -> Self {
        self.cells.retain(|(k, _)| *k != key);
        self.cells.push((key, value));
        self
    }

    /// 尺寸 (cm) 与实重 (kg)
    pub fn dims(self, length: f64, width: f64, height: f64, weight: f64) -> Self {
        self.set("length", length.to_string())
            .set("width", width.to_string())
            .set("height", height.to_string())
            .set("weight", weight.to_string())
    }

    pub fn hs(self, hs_code: &str) -> Self {
        self.set("hsCode", hs_code.to_string())
    }

    /// 申报价值（主货币单位文本，如 "50.00"）
    pub fn value(self, major: &str) -> Self {
        self.set("customsValue", major.to_string())
    }

    pub fn terms(self, terms: &str) -> Self {
        self.set("shippingTerms", terms.to_string())
    }

    pub fn tax_id(self, tax_id: &str) -> Self {
        self.set("taxId", tax_id.to_string())
    }

    pub fn insurance(self, insured: bool) -> Self {
        self.set("insurance", insured.to_string())
    }

    pub fn order_ref(self, reference: &str) -> Self {
        self.set("orderReference", reference.to_string())
    }

    pub fn build(self) -> HashMap<String, String> {
        self.cells
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

/// 带完整尺寸的美国 DDP 行
pub fn us_ddp_row(name: &str, value_major: &str) -> HashMap<String, String> {
    RowBuilder::new(name, "United States")
        .dims(30.0, 20.0, 10.0, 1.0)
        .hs("6109.10.00")
        .value(value_major)
        .terms("ddp")
        .build()
}
