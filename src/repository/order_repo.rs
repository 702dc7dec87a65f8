// ==========================================
// 缝纫工坊排单系统 - 订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: orders 平表的查询与变更;
//       拆单替换/取消排期/日内重排以单事务承载
// ==========================================

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

use crate::domain::order::Order;
use crate::domain::types::OrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};

/// 查询列清单（与 row_to_order 的列序一一对应）
const ORDER_COLUMNS: &str = "order_id, user_id, title, customer, category, status, comment, \
     color, price, total_minutes, planned_date, planned_minutes, order_in_day, \
     is_main_part, part_number, parent_order_id, total_parts, created_at, updated_at";

/// 日内排序口径: order_in_day 升序(空值在前), 创建时间升序, 分段序号兜底
const DAY_ORDER_CLAUSE: &str = "ORDER BY order_in_day ASC, created_at ASC, part_number ASC";

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的订单仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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

    /// 行映射（列序与 ORDER_COLUMNS 一致）
    fn row_to_order(row: &Row<'_>) -> SqliteResult<Order> {
        Ok(Order {
            order_id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            customer: row.get(3)?,
            category: row.get(4)?,
            status: OrderStatus::parse(&row.get::<_, String>(5)?),
            comment: row.get(6)?,
            color: row.get(7)?,
            price: row.get(8)?,
            total_minutes: row.get(9)?,
            planned_date: row.get(10)?,
            planned_minutes: row.get(11)?,
            order_in_day: row.get(12)?,
            is_main_part: row.get(13)?,
            part_number: row.get(14)?,
            parent_order_id: row.get(15)?,
            total_parts: row.get(16)?,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }

    // ==========================================
    // 写入接口
    // ==========================================

    /// 插入订单行
    pub fn insert(&self, order: &Order) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO orders (
                order_id, user_id, title, customer, category, status, comment,
                color, price, total_minutes, planned_date, planned_minutes, order_in_day,
                is_main_part, part_number, parent_order_id, total_parts, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
            params![
                order.order_id,
                order.user_id,
                order.title,
                order.customer,
                order.category,
                order.status.to_string(),
                order.comment,
                order.color,
                order.price,
                order.total_minutes,
                order.planned_date,
                order.planned_minutes,
                order.order_in_day,
                order.is_main_part,
                order.part_number,
                order.parent_order_id,
                order.total_parts,
                order.created_at,
                order.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 更新订单行的排期落位（日期与日内序号）
    ///
    /// 仅做字段更新, 不触发拆单; 分段移动与简单主单移动走此入口
    pub fn update_placement(
        &self,
        order_id: &str,
        planned_date: Option<NaiveDate>,
        order_in_day: Option<i64>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE orders SET planned_date = ?1, order_in_day = ?2, updated_at = ?3 WHERE order_id = ?4",
            params![planned_date, order_in_day, Utc::now().naive_utc(), order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            });
        }
        Ok(())
    }

    /// 取消主单排期（单事务: 先删全部分段, 再清空主单落位）
    ///
    /// # 返回
    /// - Ok(usize): 被删除的分段数
    pub fn unschedule_main(&self, order_id: &str) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let deleted = tx.execute(
            "DELETE FROM orders WHERE parent_order_id = ?1",
            params![order_id],
        )?;

        let affected = tx.execute(
            r#"
            UPDATE orders
            SET planned_date = NULL, order_in_day = NULL,
                planned_minutes = 0, total_parts = 1, updated_at = ?1
            WHERE order_id = ?2
            "#,
            params![Utc::now().naive_utc(), order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(deleted)
    }

    /// 落库一次拆单结果（单事务: 整组替换）
    ///
    /// 步骤:
    /// 1. 删除该主单现有全部分段（幂等全量替换）
    /// 2. 更新主单落位（日期/当日工时/日内序号/分段总数）
    /// 3. 插入新分段行
    pub fn apply_split(&self, main: &Order, parts: &[Order]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            "DELETE FROM orders WHERE parent_order_id = ?1",
            params![main.order_id],
        )?;

        let affected = tx.execute(
            r#"
            UPDATE orders
            SET planned_date = ?1, planned_minutes = ?2, order_in_day = ?3,
                part_number = 1, total_parts = ?4, updated_at = ?5
            WHERE order_id = ?6
            "#,
            params![
                main.planned_date,
                main.planned_minutes,
                main.order_in_day,
                main.total_parts,
                main.updated_at,
                main.order_id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: main.order_id.clone(),
            });
        }

        for part in parts {
            tx.execute(
                r#"
                INSERT INTO orders (
                    order_id, user_id, title, customer, category, status, comment,
                    color, price, total_minutes, planned_date, planned_minutes, order_in_day,
                    is_main_part, part_number, parent_order_id, total_parts, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
                "#,
                params![
                    part.order_id,
                    part.user_id,
                    part.title,
                    part.customer,
                    part.category,
                    part.status.to_string(),
                    part.comment,
                    part.color,
                    part.price,
                    part.total_minutes,
                    part.planned_date,
                    part.planned_minutes,
                    part.order_in_day,
                    part.is_main_part,
                    part.part_number,
                    part.parent_order_id,
                    part.total_parts,
                    part.created_at,
                    part.updated_at,
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 按给定顺序归一化某日的日内序号（单事务, 0 起始连续编号）
    pub fn renumber_day(
        &self,
        user_id: &str,
        date: NaiveDate,
        ordered_ids: &[String],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let now = Utc::now().naive_utc();
        for (seq, order_id) in ordered_ids.iter().enumerate() {
            tx.execute(
                r#"
                UPDATE orders SET order_in_day = ?1, updated_at = ?2
                WHERE order_id = ?3 AND user_id = ?4 AND planned_date = ?5
                "#,
                params![seq as i64, now, order_id, user_id, date],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 按ID查询订单行（校验归属用户）
    pub fn find_by_id(&self, user_id: &str, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM orders WHERE order_id = ?1 AND user_id = ?2",
            ORDER_COLUMNS
        );
        let order = conn
            .query_row(&sql, params![order_id, user_id], Self::row_to_order)
            .optional()?;
        Ok(order)
    }

    /// 查询某日的全部订单行（含分段, 按日内顺序）
    pub fn find_by_date(&self, user_id: &str, date: NaiveDate) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = ?1 AND planned_date = ?2 {}",
            ORDER_COLUMNS, DAY_ORDER_CLAUSE
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![user_id, date], Self::row_to_order)?
            .collect::<SqliteResult<Vec<Order>>>()?;
        Ok(orders)
    }

    /// 查询日期区间内的全部订单行（含分段, 按日期+日内顺序）
    pub fn find_by_date_range(
        &self,
        user_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM orders
            WHERE user_id = ?1 AND planned_date BETWEEN ?2 AND ?3
            ORDER BY planned_date ASC, order_in_day ASC, created_at ASC, part_number ASC
            "#,
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![user_id, start_date, end_date], Self::row_to_order)?
            .collect::<SqliteResult<Vec<Order>>>()?;
        Ok(orders)
    }

    /// 查询待排区订单（主单或无主单行, 未设置日期）
    pub fn find_unscheduled(&self, user_id: &str) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM orders
            WHERE user_id = ?1 AND planned_date IS NULL
              AND (is_main_part = 1 OR parent_order_id IS NULL)
            ORDER BY created_at ASC
            "#,
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![user_id], Self::row_to_order)?
            .collect::<SqliteResult<Vec<Order>>>()?;
        Ok(orders)
    }

    /// 查询主单的全部分段（按分段序号）
    pub fn find_secondary_parts(&self, parent_order_id: &str) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM orders WHERE parent_order_id = ?1 ORDER BY part_number ASC",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![parent_order_id], Self::row_to_order)?
            .collect::<SqliteResult<Vec<Order>>>()?;
        Ok(orders)
    }

    /// 统计某日已占用工时, 排除指定逻辑订单自身的全部行
    ///
    /// 拆单引擎逐日计算余量时使用: 同一逻辑订单的旧落位
    /// （主单行 + 历史分段）不计入"他人已占用"
    pub fn committed_minutes_excluding(
        &self,
        user_id: &str,
        date: NaiveDate,
        logical_order_id: &str,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let total: i64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(planned_minutes), 0) FROM orders
            WHERE user_id = ?1 AND planned_date = ?2
              AND order_id != ?3
              AND (parent_order_id IS NULL OR parent_order_id != ?3)
            "#,
            params![user_id, date, logical_order_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}
