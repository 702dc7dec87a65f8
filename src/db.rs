// ==========================================
// 缝纫工坊排单系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键/忙等待）
// - 建表语句集中于此, 幂等执行, 库和测试共用同一份 schema
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 表结构：
/// - planner_config: 每用户排期配置（工时/工作日）
/// - orders: 订单平表, 主单与分段同表存放
///   （parent_order_id 为空 = 主单; 分段级联随主单删除）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS planner_config (
            user_id        TEXT PRIMARY KEY,
            hours_per_day  INTEGER NOT NULL DEFAULT 8,
            work_days      TEXT NOT NULL DEFAULT '1,2,3,4,5',
            updated_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS orders (
            order_id        TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL,
            title           TEXT NOT NULL,
            customer        TEXT,
            category        TEXT,
            status          TEXT NOT NULL DEFAULT 'NEW',
            comment         TEXT,
            color           TEXT NOT NULL,
            price           REAL,
            total_minutes   INTEGER NOT NULL,
            planned_date    TEXT,
            planned_minutes INTEGER NOT NULL DEFAULT 0,
            order_in_day    INTEGER,
            is_main_part    INTEGER NOT NULL DEFAULT 1,
            part_number     INTEGER NOT NULL DEFAULT 1,
            parent_order_id TEXT REFERENCES orders(order_id) ON DELETE CASCADE,
            total_parts     INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_orders_user_date
            ON orders(user_id, planned_date);
        CREATE INDEX IF NOT EXISTS idx_orders_parent
            ON orders(parent_order_id);
        "#,
    )?;
    Ok(())
}
