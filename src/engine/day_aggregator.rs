// ==========================================
// 缝纫工坊排单系统 - 日聚合引擎
// ==========================================
// 职责: 按当日全部订单行计算 DayView
// 口径:
// - 合计工时对"全部行"求和 (主单+分段都占容量)
// - 可见列表只保留主单或无主单行
// - 日内顺序: order_in_day 升序(空值在前), 创建时间升序
// ==========================================

use chrono::NaiveDate;

use crate::domain::config::PlannerConfig;
use crate::domain::day_view::DayView;
use crate::domain::order::Order;

// ==========================================
// DayAggregator - 日聚合引擎
// ==========================================
pub struct DayAggregator {
    // 无状态引擎
}

impl DayAggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算单日视图
    ///
    /// # 参数
    /// - config: 用户排期配置
    /// - date: 日期
    /// - rows: 当日全部订单行（主单与分段, 顺序不要求）
    ///
    /// # 返回
    /// DayView; 空输入得到零值视图
    pub fn aggregate(&self, config: &PlannerConfig, date: NaiveDate, rows: Vec<Order>) -> DayView {
        let is_work_day = config.is_work_day(date);
        if rows.is_empty() {
            return DayView::empty(date, is_work_day);
        }

        let mut rows = rows;
        sort_day_rows(&mut rows);

        let total_minutes: i64 = rows.iter().map(|o| o.planned_minutes).sum();
        let capacity = config.daily_capacity_minutes();

        let occupancy_percentage = if capacity > 0 {
            (total_minutes as f64 / capacity as f64 * 100.0).min(100.0)
        } else {
            0.0
        };

        let orders: Vec<Order> = rows
            .into_iter()
            .filter(|o| o.is_visible_in_day_list())
            .collect();

        DayView {
            date,
            is_work_day,
            orders,
            total_minutes,
            occupancy_percentage,
            is_over_limit: total_minutes > capacity,
            over_minutes: (total_minutes - capacity).max(0),
        }
    }
}

impl Default for DayAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// 按日内顺序排序订单行
///
/// 口径: order_in_day 升序, 空值在前; 同序号按创建时间;
/// 最后以分段序号兜底保证稳定
pub fn sort_day_rows(rows: &mut [Order]) {
    rows.sort_by_key(|o| {
        (
            o.order_in_day.is_some(),
            o.order_in_day.unwrap_or(0),
            o.created_at,
            o.part_number,
        )
    });
}
