// ==========================================
// 批量发货系统 - 尺寸模板仓储
// ==========================================
// 职责: 命名尺寸预设的读写（dimension_template 表）
// 说明: TemplateStore trait 为管线依赖的接口，SQLite 为默认实现
// ==========================================

use crate::domain::DimensionTemplate;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 尺寸模板存取接口
pub trait TemplateStore: Send + Sync {
    fn list(&self) -> RepositoryResult<Vec<DimensionTemplate>>;

    fn get(&self, name: &str) -> RepositoryResult<Option<DimensionTemplate>>;

    /// 按名称插入或覆盖
    fn save(&self, template: &DimensionTemplate) -> RepositoryResult<()>;

    /// 返回是否确有删除
    fn delete(&self, name: &str) -> RepositoryResult<bool>;
}

pub struct TemplateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TemplateRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS dimension_template (
              name TEXT PRIMARY KEY,
              length_cm REAL NOT NULL CHECK(length_cm > 0),
              width_cm REAL NOT NULL CHECK(width_cm > 0),
              height_cm REAL NOT NULL CHECK(height_cm > 0),
              weight_kg REAL NOT NULL CHECK(weight_kg > 0),
              updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }
}

impl TemplateStore for TemplateRepository {
    fn list(&self) -> RepositoryResult<Vec<DimensionTemplate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, length_cm, width_cm, height_cm, weight_kg FROM dimension_template ORDER BY name",
        )?;
        let rows = stmt.query_map([], map_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get(&self, name: &str) -> RepositoryResult<Option<DimensionTemplate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, length_cm, width_cm, height_cm, weight_kg FROM dimension_template WHERE name = ?1",
        )?;
        match stmt.query_row(params![name], map_row) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, template: &DimensionTemplate) -> RepositoryResult<()> {
        validate(template)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO dimension_template (name, length_cm, width_cm, height_cm, weight_kg, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
            ON CONFLICT(name) DO UPDATE SET
              length_cm = excluded.length_cm,
              width_cm = excluded.width_cm,
              height_cm = excluded.height_cm,
              weight_kg = excluded.weight_kg,
              updated_at = excluded.updated_at
            "#,
            params![
                template.name.trim(),
                template.length_cm,
                template.width_cm,
                template.height_cm,
                template.weight_kg,
            ],
        )?;
        tracing::debug!(name = %template.name, "尺寸模板已保存");
        Ok(())
    }

    fn delete(&self, name: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM dimension_template WHERE name = ?1", params![name])?;
        Ok(affected > 0)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<DimensionTemplate> {
    Ok(DimensionTemplate {
        name: row.get(0)?,
        length_cm: row.get(1)?,
        width_cm: row.get(2)?,
        height_cm: row.get(3)?,
        weight_kg: row.get(4)?,
    })
}

fn validate(template: &DimensionTemplate) -> RepositoryResult<()> {
    if template.name.trim().is_empty() {
        return Err(RepositoryError::FieldValueError {
            field: "name".to_string(),
            message: "模板名称不能为空".to_string(),
        });
    }
    let dims = [
        ("length_cm", template.length_cm),
        ("width_cm", template.width_cm),
        ("height_cm", template.height_cm),
        ("weight_kg", template.weight_kg),
    ];
    for (field, value) in dims {
        if !(value > 0.0 && value.is_finite()) {
            return Err(RepositoryError::FieldValueError {
                field: field.to_string(),
                message: format!("必须为正数，实际 {}", value),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> TemplateRepository {
        let conn = Connection::open_in_memory().unwrap();
        TemplateRepository::new(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn template(name: &str, weight: f64) -> DimensionTemplate {
        DimensionTemplate {
            name: name.to_string(),
            length_cm: 25.0,
            width_cm: 20.0,
            height_cm: 8.0,
            weight_kg: weight,
        }
    }

    #[test]
    fn test_save_get_list_delete() {
        let repo = repo();
        repo.save(&template("Shoebox", 1.28)).unwrap();
        repo.save(&template("Envelope", 0.1)).unwrap();

        let names: Vec<String> = repo.list().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Envelope", "Shoebox"]);
        assert_eq!(repo.get("Shoebox").unwrap(), Some(template("Shoebox", 1.28)));

        assert!(repo.delete("Shoebox").unwrap());
        assert!(!repo.delete("Shoebox").unwrap());
        assert_eq!(repo.get("Shoebox").unwrap(), None);
    }

    #[test]
    fn test_save_overwrites_by_name() {
        let repo = repo();
        repo.save(&template("Box", 1.0)).unwrap();
        repo.save(&template("Box", 2.5)).unwrap();
        assert_eq!(repo.list().unwrap().len(), 1);
        assert_eq!(repo.get("Box").unwrap().unwrap().weight_kg, 2.5);
    }

    #[test]
    fn test_rejects_invalid_template() {
        let repo = repo();
        assert!(repo.save(&template("", 1.0)).is_err());
        assert!(matches!(
            repo.save(&template("Flat", 0.0)),
            Err(RepositoryError::FieldValueError { .. })
        ));
    }
}
