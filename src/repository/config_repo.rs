// ==========================================
// 缝纫工坊排单系统 - 排期配置仓储
// ==========================================
// 职责: planner_config 表的按用户读写
// 模式: 首次访问时按默认值惰性建行 (get-or-create)
// 校验: hours_per_day 与工作日字符串在写入边界校验,
//       容量逻辑永远拿不到原始字符串
// ==========================================

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::domain::config::{parse_work_days, PlannerConfig, DEFAULT_HOURS_PER_DAY, DEFAULT_WORK_DAYS};
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// PlannerConfigRepository - 排期配置仓储
// ==========================================
pub struct PlannerConfigRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlannerConfigRepository {
    /// 创建新的配置仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取用户配置, 不存在时按默认值建行
    pub fn get_or_create(&self, user_id: &str) -> RepositoryResult<PlannerConfig> {
        let conn = self.get_conn()?;

        let existing = conn
            .query_row(
                "SELECT hours_per_day, work_days FROM planner_config WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match existing {
            Some((hours_per_day, raw_work_days)) => {
                let work_days = parse_work_days(&raw_work_days).map_err(|message| {
                    RepositoryError::FieldValueError {
                        field: "work_days".to_string(),
                        message,
                    }
                })?;
                Ok(PlannerConfig {
                    user_id: user_id.to_string(),
                    hours_per_day,
                    work_days,
                })
            }
            None => {
                conn.execute(
                    r#"
                    INSERT OR IGNORE INTO planner_config (user_id, hours_per_day, work_days, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                    params![
                        user_id,
                        DEFAULT_HOURS_PER_DAY,
                        DEFAULT_WORK_DAYS,
                        Utc::now().naive_utc(),
                    ],
                )?;
                Ok(PlannerConfig::with_defaults(user_id))
            }
        }
    }

    /// 更新用户配置（写入边界, 严格校验）
    ///
    /// # 参数
    /// - hours_per_day: 每日工时, 必须在 1..=24
    /// - work_days_raw: 逗号分隔的 ISO 周几编号
    ///
    /// # 返回
    /// - Ok(PlannerConfig): 更新后的配置
    /// - Err(RepositoryError::FieldValueError): 校验失败
    pub fn update(
        &self,
        user_id: &str,
        hours_per_day: i64,
        work_days_raw: &str,
    ) -> RepositoryResult<PlannerConfig> {
        if !(1..=24).contains(&hours_per_day) {
            return Err(RepositoryError::FieldValueError {
                field: "hours_per_day".to_string(),
                message: format!("每日工时必须在1..=24之间: {}", hours_per_day),
            });
        }
        let work_days = parse_work_days(work_days_raw).map_err(|message| {
            RepositoryError::FieldValueError {
                field: "work_days".to_string(),
                message,
            }
        })?;

        let config = PlannerConfig {
            user_id: user_id.to_string(),
            hours_per_day,
            work_days,
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO planner_config (user_id, hours_per_day, work_days, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                hours_per_day = excluded.hours_per_day,
                work_days = excluded.work_days,
                updated_at = excluded.updated_at
            "#,
            params![
                user_id,
                config.hours_per_day,
                config.work_days_string(),
                Utc::now().naive_utc(),
            ],
        )?;

        Ok(config)
    }
}
