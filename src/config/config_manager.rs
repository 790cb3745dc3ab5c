// ==========================================
// 批量发货系统 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表读取覆写值，缺省回落到 PipelineConfig::default()
// 存储: config_kv 表 (scope_id + key + value)
// ==========================================

use crate::config::pipeline_config::PipelineConfig;
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置数据库访问失败: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("配置锁获取失败: {0}")]
    LockError(String),

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const VOLUMETRIC_DIVISOR: &str = "volumetric_divisor";
    pub const DEFAULT_LENGTH_CM: &str = "default_length_cm";
    pub const DEFAULT_WIDTH_CM: &str = "default_width_cm";
    pub const DEFAULT_HEIGHT_CM: &str = "default_height_cm";
    pub const DEFAULT_WEIGHT_KG: &str = "default_weight_kg";
    pub const INSURANCE_RATE: &str = "insurance_rate";
    pub const INSURANCE_MIN_FEE_MINOR: &str = "insurance_min_fee_minor";
    pub const DDP_DESTINATION_CODE: &str = "ddp_destination_code";
    pub const AUTO_RECALC_ON_EDIT: &str = "auto_recalc_on_edit";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 打开配置数据库（不存在的表会被创建）
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        let manager = Self { conn };
        manager.ensure_table()?;
        Ok(manager)
    }

    fn ensure_table(&self) -> ConfigResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL DEFAULT 'global',
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> ConfigResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> ConfigResult<HashMap<String, String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// 加载管线配置：逐项读取覆写值，缺省使用默认值
    pub fn load_pipeline_config(&self) -> ConfigResult<PipelineConfig> {
        let defaults = PipelineConfig::default();

        let config = PipelineConfig {
            volumetric_divisor: self.parse_or(config_keys::VOLUMETRIC_DIVISOR, defaults.volumetric_divisor)?,
            default_length_cm: self.parse_or(config_keys::DEFAULT_LENGTH_CM, defaults.default_length_cm)?,
            default_width_cm: self.parse_or(config_keys::DEFAULT_WIDTH_CM, defaults.default_width_cm)?,
            default_height_cm: self.parse_or(config_keys::DEFAULT_HEIGHT_CM, defaults.default_height_cm)?,
            default_weight_kg: self.parse_or(config_keys::DEFAULT_WEIGHT_KG, defaults.default_weight_kg)?,
            insurance_rate: self.parse_or(config_keys::INSURANCE_RATE, defaults.insurance_rate)?,
            insurance_min_fee_minor: self
                .parse_or(config_keys::INSURANCE_MIN_FEE_MINOR, defaults.insurance_min_fee_minor)?,
            ddp_destination_code: self
                .get_global_config_value(config_keys::DDP_DESTINATION_CODE)?
                .map(|v| v.trim().to_uppercase())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.ddp_destination_code),
            auto_recalc_on_edit: self.parse_bool_or(config_keys::AUTO_RECALC_ON_EDIT, defaults.auto_recalc_on_edit)?,
        };

        if config.volumetric_divisor <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: config_keys::VOLUMETRIC_DIVISOR.to_string(),
                value: config.volumetric_divisor.to_string(),
                message: "体积重除数必须为正数".to_string(),
            });
        }

        tracing::debug!(?config, "管线配置已加载");
        Ok(config)
    }

    fn parse_or<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            }),
        }
    }

    fn parse_bool_or(&self, key: &str, default: bool) -> ConfigResult<bool> {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: "无法解析为布尔值".to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let manager = in_memory();
        let config = manager.load_pipeline_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_overrides_applied() {
        let manager = in_memory();
        manager.set_global_config_value(config_keys::VOLUMETRIC_DIVISOR, "6000").unwrap();
        manager.set_global_config_value(config_keys::AUTO_RECALC_ON_EDIT, "off").unwrap();
        manager.set_global_config_value(config_keys::DDP_DESTINATION_CODE, " us ").unwrap();

        let config = manager.load_pipeline_config().unwrap();
        assert_eq!(config.volumetric_divisor, 6000.0);
        assert!(!config.auto_recalc_on_edit);
        assert_eq!(config.ddp_destination_code, "US");
        assert_eq!(config.insurance_min_fee_minor, 100);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let manager = in_memory();
        manager.set_global_config_value(config_keys::INSURANCE_RATE, "abc").unwrap();
        let err = manager.load_pipeline_config().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "insurance_rate"));
    }

    #[test]
    fn test_non_positive_divisor_rejected() {
        let manager = in_memory();
        manager.set_global_config_value(config_keys::VOLUMETRIC_DIVISOR, "0").unwrap();
        assert!(manager.load_pipeline_config().is_err());
    }

    #[test]
    fn test_snapshot() {
        let manager = in_memory();
        manager.set_global_config_value(config_keys::INSURANCE_RATE, "0.02").unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();
        assert_eq!(snapshot.get("insurance_rate").map(String::as_str), Some("0.02"));
    }
}
