// ==========================================
// 缝纫工坊排单系统 - 应用装配
// ==========================================
// 职责: 从数据库路径装配共享连接、仓储与API实例
// ==========================================

use anyhow::Context;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::PlannerApi;
use crate::repository::config_repo::PlannerConfigRepository;
use crate::repository::order_repo::OrderRepository;

// ==========================================
// AppState - 应用状态
// ==========================================

/// 应用状态
///
/// 持有共享数据库连接之上的全部仓储与API实例
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 排单API
    pub planner_api: Arc<PlannerApi>,

    /// 订单仓储（外层 CRUD 直接使用）
    pub order_repo: Arc<OrderRepository>,

    /// 排期配置仓储
    pub config_repo: Arc<PlannerConfigRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 行为
    /// 打开连接, 应用统一PRAGMA, 幂等建表, 装配仓储与API
    pub fn new(db_path: &str) -> anyhow::Result<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .with_context(|| format!("打开数据库失败: {}", db_path))?;
        crate::db::init_schema(&conn).context("初始化数据库schema失败")?;

        let conn = Arc::new(Mutex::new(conn));
        Self::from_connection(db_path, conn)
    }

    /// 从已有连接装配（测试用内存库走此入口）
    pub fn from_connection(
        db_path: &str,
        conn: Arc<Mutex<Connection>>,
    ) -> anyhow::Result<Self> {
        let order_repo = Arc::new(OrderRepository::from_connection(conn.clone()));
        let config_repo = Arc::new(PlannerConfigRepository::from_connection(conn));
        let planner_api = Arc::new(PlannerApi::new(order_repo.clone(), config_repo.clone()));

        Ok(Self {
            db_path: db_path.to_string(),
            planner_api,
            order_repo,
            config_repo,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 ATELIER_PLANNER_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("ATELIER_PLANNER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut dir = PathBuf::from(".");
    if let Some(data_dir) = dirs::data_dir() {
        dir = data_dir.join("atelier-planner");
    }
    dir.join("atelier_planner.db").to_string_lossy().to_string()
}
