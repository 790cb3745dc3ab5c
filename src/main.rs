// ==========================================
// 批量发货系统 - 命令行入口
// ==========================================
// 用法: bulk-shipping <rows.json> [--db <path>] [--template <name>]
// 流程: 读取 JSON 行数组 → 导入 → 派生重量 → 税号合规预检 → 输出 JSON 报告
// 退出码: 0 通过; 1 运行错误; 2 存在合规违规
// ==========================================

use anyhow::{bail, Context};
use bulk_shipping::config::ConfigManager;
use bulk_shipping::db::{get_default_db_path, open_sqlite_connection};
use bulk_shipping::engine::{StaticCountryClassifier, TaxIdValidator, WeightCalculator};
use bulk_shipping::importer::ShipmentImporter;
use bulk_shipping::repository::{TemplateRepository, TemplateStore};
use bulk_shipping::store::DraftStore;
use bulk_shipping::{logging, APP_NAME, VERSION};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct CliArgs {
    rows_path: String,
    db_path: String,
    template: Option<String>,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut rows_path = None;
    let mut db_path = None;
    let mut template = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db_path = Some(args.next().context("--db 缺少参数")?),
            "--template" => template = Some(args.next().context("--template 缺少参数")?),
            _ if rows_path.is_none() => rows_path = Some(arg),
            other => bail!("无法识别的参数: {}", other),
        }
    }

    Ok(CliArgs {
        rows_path: rows_path.context("用法: bulk-shipping <rows.json> [--db <path>] [--template <name>]")?,
        db_path: db_path.unwrap_or_else(get_default_db_path),
        template,
    })
}

/// JSON 对象 → 键值行（数字 / 布尔转为文本，null 转为空串）
fn to_row(value: Value) -> anyhow::Result<HashMap<String, String>> {
    let Value::Object(map) = value else {
        bail!("每一行必须是 JSON 对象");
    };
    Ok(map
        .into_iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, text)
        })
        .collect())
}

fn run() -> anyhow::Result<i32> {
    let args = parse_args()?;
    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("使用数据库: {}", args.db_path);

    let conn = Arc::new(Mutex::new(
        open_sqlite_connection(&args.db_path).context("无法打开数据库")?,
    ));
    let config = ConfigManager::from_connection(conn.clone())?.load_pipeline_config()?;
    let templates = TemplateRepository::new(conn)?;

    let raw = std::fs::read_to_string(&args.rows_path)
        .with_context(|| format!("无法读取 {}", args.rows_path))?;
    let values: Vec<Value> = serde_json::from_str(&raw).context("行数据必须是 JSON 数组")?;
    let rows = values
        .into_iter()
        .map(to_row)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let importer = ShipmentImporter::new(&config);
    let outcome = importer.import_rows(&rows)?;

    let store = DraftStore::new(WeightCalculator::new(&config));
    store.load(outcome.drafts.clone())?;

    // 为缺尺寸的草稿套用模板
    if let Some(name) = &args.template {
        let template = templates
            .get(name)?
            .with_context(|| format!("尺寸模板 {} 不存在", name))?;
        let missing: Vec<_> = store
            .snapshot()?
            .active()
            .filter(|d| !d.package.has_all_dimensions())
            .map(|d| d.id)
            .collect();
        for id in &missing {
            store.apply_template(*id, &template)?;
        }
        tracing::info!(template = %name, applied = missing.len(), "尺寸模板已套用");
    }

    let snapshot = store.snapshot()?;
    let validator = TaxIdValidator::new(Arc::new(StaticCountryClassifier));
    let issues = validator.collect_issues(&snapshot.drafts);

    let drafts: Vec<Value> = snapshot
        .drafts
        .iter()
        .map(|d| {
            json!({
                "row": d.row_index,
                "receiver": d.receiver.name,
                "orderReference": d.order_reference,
                "country": d.receiver.country,
                "volumetricWeight": d.package.volumetric_weight,
                "billableWeight": d.package.billable_weight,
                "hasAllDimensions": d.package.has_all_dimensions(),
                "hsCode": d.customs.hs_code,
                "customsValue": d.customs.customs_value,
                "shippingTerms": d.customs.shipping_terms,
                "insuranceCost": d.insurance.calculated_insurance_cost,
                "selectedTemplate": d.selected_template,
            })
        })
        .collect();

    let report = json!({
        "batchId": outcome.batch_id,
        "imported": snapshot.len(),
        "rejected": outcome.rejected,
        "drafts": drafts,
        "complianceIssues": issues,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if issues.is_empty() {
        Ok(0)
    } else {
        tracing::warn!(violations = issues.len(), "存在税号合规违规");
        Ok(2)
    }
}

fn main() {
    logging::init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
