// ==========================================
// 批量发货系统 - 字段映射器
// ==========================================
// 职责: 源列名 → 规范字段映射 + 类型转换
// 说明: 源数据存在同义列名（length / packageLength / package_length），
//       在此合并为唯一规范字段，下游不再出现双命名
// 列名匹配: 忽略大小写与 '_' / '-' / 空格
// ==========================================

use crate::domain::{RawShipmentRecord, ShippingTerms};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;

/// 规范字段 → 可接受的列名（已规范化）
const ALIASES: &[(&str, &[&str])] = &[
    ("receiver_name", &["receivername", "name", "recipient", "recipientname", "收件人"]),
    ("order_reference", &["orderreference", "orderref", "reference", "orderid", "ordernumber", "订单号"]),
    ("address_line1", &["addressline1", "address1", "address", "street"]),
    ("address_line2", &["addressline2", "address2"]),
    ("city", &["city", "receivercity"]),
    ("state", &["state", "province", "region"]),
    ("country", &["country", "receivercountry", "destinationcountry", "国家"]),
    ("postal_code", &["postalcode", "zip", "zipcode", "postcode"]),
    ("phone", &["phone", "phonenumber", "receiverphone"]),
    ("email", &["email", "receiveremail"]),
    ("length", &["length", "packagelength", "lengthcm"]),
    ("width", &["width", "packagewidth", "widthcm"]),
    ("height", &["height", "packageheight", "heightcm"]),
    ("weight", &["weight", "packageweight", "weightkg"]),
    ("hs_code", &["hscode", "hs", "tariffcode"]),
    ("customs_value", &["customsvalue", "declaredvalue", "value"]),
    ("product_name", &["productname", "product", "itemname"]),
    ("product_description", &["productdescription", "description", "itemdescription"]),
    ("shipping_terms", &["shippingterms", "terms", "incoterm", "incoterms"]),
    ("has_insurance", &["hasinsurance", "insurance", "insured"]),
    ("tax_id", &["taxid", "ioss", "iossnumber", "hmrc", "hmrcnumber", "vatnumber"]),
];

/// 列名规范化: 小写，去掉 '_' / '-' / 空格
fn normalize_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 单行映射
    pub fn map_row(&self, row: &HashMap<String, String>, row_number: usize) -> ImportResult<RawShipmentRecord> {
        let normalized: HashMap<String, &str> = row
            .iter()
            .map(|(k, v)| (normalize_header(k), v.as_str()))
            .collect();
        let get = |field: &str| self.get_string(&normalized, field);

        let shipping_terms = match get("shipping_terms") {
            None => ShippingTerms::default(),
            Some(v) => ShippingTerms::parse(&v).ok_or(ImportError::UnknownShippingTerms {
                row: row_number,
                value: v,
            })?,
        };

        Ok(RawShipmentRecord {
            receiver_name: get("receiver_name"),
            order_reference: get("order_reference"),
            address_line1: get("address_line1"),
            address_line2: get("address_line2"),
            city: get("city"),
            state: get("state"),
            country: get("country"),
            postal_code: get("postal_code"),
            phone: get("phone"),
            email: get("email"),

            length_cm: self.parse_positive(&normalized, "length", row_number)?,
            width_cm: self.parse_positive(&normalized, "width", row_number)?,
            height_cm: self.parse_positive(&normalized, "height", row_number)?,
            weight_kg: self.parse_positive(&normalized, "weight", row_number)?,

            hs_code: get("hs_code"),
            customs_value_minor: match get("customs_value") {
                Some(v) => self.cleaner.parse_money_minor(&v, row_number, "customs_value")?,
                None => 0,
            },
            product_name: get("product_name"),
            product_description: get("product_description"),
            shipping_terms,

            has_insurance: get("has_insurance")
                .map(|v| self.cleaner.parse_flag(&v))
                .unwrap_or(false),
            tax_id: get("tax_id"),

            row_number,
        })
    }

    /// 按别名取字段（空值 / null 字面量视为缺失）
    fn get_string(&self, row: &HashMap<String, &str>, field: &str) -> Option<String> {
        let aliases = ALIASES
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[]);

        aliases
            .iter()
            .filter_map(|alias| row.get(*alias))
            .find_map(|v| self.cleaner.normalize_null(Some(v.to_string())))
    }

    fn parse_positive(
        &self,
        row: &HashMap<String, &str>,
        field: &str,
        row_number: usize,
    ) -> ImportResult<Option<f64>> {
        match self.get_string(row, field) {
            None => Ok(None),
            Some(value) => self.cleaner.parse_positive(&value, row_number, field),
        }
    }
}
