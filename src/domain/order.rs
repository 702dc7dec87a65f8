// ==========================================
// 缝纫工坊排单系统 - 订单领域模型
// ==========================================
// 主单与分段同在 orders 平表:
// - 主单: is_main_part=1, parent_order_id 为空, 承载逻辑总工时
// - 分段: 拆单引擎产生的单日切片, 随主单整组替换/删除
// 不变式: 拆单完成后, 主单+全部分段的 planned_minutes
//         合计等于主单 total_minutes
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::{default_color_for, OrderStatus};

// ==========================================
// Order - 订单行 (主单或分段)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    // ===== 主键与归属 =====
    pub order_id: String,                // 订单行ID (UUID)
    pub user_id: String,                 // 所属用户

    // ===== 业务字段 =====
    pub title: String,                   // 订单名称
    pub customer: Option<String>,        // 客户
    pub category: Option<String>,        // 品类
    pub status: OrderStatus,             // 状态
    pub comment: Option<String>,         // 备注
    pub color: String,                   // 展示颜色 (固定调色板)
    pub price: Option<f64>,              // 价格 (仅主单持有)

    // ===== 排期字段 =====
    pub total_minutes: i64,              // 逻辑总工时 (分钟, 主单维护)
    pub planned_date: Option<NaiveDate>, // 排期日期 (空=待排区)
    pub planned_minutes: i64,            // 当日分配工时 (分钟)
    pub order_in_day: Option<i64>,       // 日内序号 (再平衡时归一化)

    // ===== 主单/分段关系 =====
    pub is_main_part: bool,              // 是否主单
    pub part_number: i64,                // 分段序号 (主单=1)
    pub parent_order_id: Option<String>, // 所属主单ID (分段持有)
    pub total_parts: i64,                // 分段总数 (仅主单维护, 未拆=1)

    // ===== 时间戳 =====
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Order {
    /// 创建一个未排期的主单
    ///
    /// 颜色按订单ID哈希确定, 状态为 NEW
    pub fn new_main(user_id: &str, title: &str, total_minutes: i64) -> Self {
        let order_id = Uuid::new_v4().to_string();
        let color = default_color_for(&order_id).to_string();
        let now = Utc::now().naive_utc();

        Self {
            order_id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            customer: None,
            category: None,
            status: OrderStatus::New,
            comment: None,
            color,
            price: None,
            total_minutes,
            planned_date: None,
            planned_minutes: 0,
            order_in_day: None,
            is_main_part: true,
            part_number: 1,
            parent_order_id: None,
            total_parts: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// 判断是否分段
    pub fn is_secondary(&self) -> bool {
        !self.is_main_part
    }

    /// 逻辑订单ID（分段归属主单, 主单归属自身）
    pub fn logical_order_id(&self) -> &str {
        self.parent_order_id.as_deref().unwrap_or(&self.order_id)
    }

    /// 是否出现在当日可见订单列表中
    ///
    /// 口径: 主单或无主单行
    pub fn is_visible_in_day_list(&self) -> bool {
        self.is_main_part || self.parent_order_id.is_none()
    }
}
