// ==========================================
// 缝纫工坊排单系统 - 单日视图
// ==========================================
// 派生结构, 不落库: 由日聚合引擎按当日订单行计算
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::order::Order;

// ==========================================
// DayView - 单日排期视图
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayView {
    pub date: NaiveDate,             // 日期
    pub is_work_day: bool,           // 是否工作日 (仅标记, 不阻断)
    pub orders: Vec<Order>,          // 可见订单行 (主单或无主单行, 按日内顺序)
    pub total_minutes: i64,          // 当日合计工时 (含分段, 分钟)
    pub occupancy_percentage: f64,   // 占用率 (封顶100)
    pub is_over_limit: bool,         // 是否超出日容量
    pub over_minutes: i64,           // 超出量 (分钟)
}

impl DayView {
    /// 空日视图（无任何订单行）
    pub fn empty(date: NaiveDate, is_work_day: bool) -> Self {
        Self {
            date,
            is_work_day,
            orders: Vec::new(),
            total_minutes: 0,
            occupancy_percentage: 0.0,
            is_over_limit: false,
            over_minutes: 0,
        }
    }
}
