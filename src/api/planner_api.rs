// ==========================================
// 缝纫工坊排单系统 - 排单 API
// ==========================================
// 职责: 排期视图查询、移单/取消排期、容量预检、
//       排期配置读写
// 红线: 容量超限只报告不阻断; 移单输入宽松解析
// ==========================================

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::config::PlannerConfig;
use crate::domain::day_view::DayView;
use crate::domain::order::Order;
use crate::engine::day_aggregator::DayAggregator;
use crate::engine::rebalancer::OverflowRebalancer;
use crate::engine::splitter::OrderSplitter;
use crate::repository::config_repo::PlannerConfigRepository;
use crate::repository::order_repo::OrderRepository;

// ==========================================
// 响应 DTO
// ==========================================

/// 排期视图响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerViewResponse {
    pub user_id: String,
    pub start_date: NaiveDate,           // 实际使用的起始日期
    pub weeks: u32,                      // 实际使用的周数
    pub days: Vec<DayView>,              // 逐日视图 (连续日期)
    pub orders_without_date: Vec<Order>, // 待排区订单
}

/// 移单响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOrderResponse {
    pub order_id: String,
    pub planned_date: Option<NaiveDate>,   // 移动后的落位日期 (空=待排区)
    pub total_parts: i64,                  // 移动后的分段总数
    pub rebalanced_dates: Vec<NaiveDate>,  // 本次再平衡处理过的日期
    pub message: String,
}

/// 容量预检响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDayLimitResponse {
    pub can_add: bool,      // 加入后是否仍在容量内
    pub total_minutes: i64, // 模拟加入后的当日合计
    pub limit: i64,         // 当日容量 (分钟)
}

// ==========================================
// PlannerApi - 排单 API
// ==========================================

/// 排单API
///
/// 职责：
/// 1. 排期视图（逐日视图 + 待排区）
/// 2. 移单（含拆单与再平衡的触发）
/// 3. 容量预检（模拟加入, 不落库）
/// 4. 排期配置（惰性建行 + 严格校验写入）
pub struct PlannerApi {
    order_repo: Arc<OrderRepository>,
    config_repo: Arc<PlannerConfigRepository>,
    aggregator: DayAggregator,
    splitter: OrderSplitter,
    rebalancer: OverflowRebalancer,
}

impl PlannerApi {
    /// 创建新的PlannerApi实例
    pub fn new(
        order_repo: Arc<OrderRepository>,
        config_repo: Arc<PlannerConfigRepository>,
    ) -> Self {
        let splitter = OrderSplitter::new(order_repo.clone());
        let rebalancer = OverflowRebalancer::new(order_repo.clone());
        Self {
            order_repo,
            config_repo,
            aggregator: DayAggregator::new(),
            splitter,
            rebalancer,
        }
    }

    // ==========================================
    // 排期视图接口
    // ==========================================

    /// 查询排期视图
    ///
    /// # 参数
    /// - user_id: 用户ID
    /// - start_date: 起始日期, 空则取本周一
    /// - weeks: 周数, 空则取1, 下限1
    ///
    /// # 返回
    /// - Ok(PlannerViewResponse): 逐日视图 + 待排区
    pub fn planner_view(
        &self,
        user_id: &str,
        start_date: Option<NaiveDate>,
        weeks: Option<u32>,
    ) -> ApiResult<PlannerViewResponse> {
        let config = self.config_repo.get_or_create(user_id)?;
        let weeks = weeks.unwrap_or(1).max(1);
        let start_date = start_date.unwrap_or_else(current_week_monday);
        let day_count = (weeks * 7) as i64;
        let end_date = start_date + Duration::days(day_count - 1);

        let rows = self
            .order_repo
            .find_by_date_range(user_id, start_date, end_date)?;

        // 按日期分组 (仓储已按日期+日内顺序返回)
        let mut by_date: HashMap<NaiveDate, Vec<Order>> = HashMap::new();
        for row in rows {
            if let Some(date) = row.planned_date {
                by_date.entry(date).or_default().push(row);
            }
        }

        let days: Vec<DayView> = (0..day_count)
            .map(|offset| {
                let date = start_date + Duration::days(offset);
                let day_rows = by_date.remove(&date).unwrap_or_default();
                self.aggregator.aggregate(&config, date, day_rows)
            })
            .collect();

        let orders_without_date = self.order_repo.find_unscheduled(user_id)?;

        Ok(PlannerViewResponse {
            user_id: user_id.to_string(),
            start_date,
            weeks,
            days,
            orders_without_date,
        })
    }

    // ==========================================
    // 移单接口
    // ==========================================

    /// 移动订单（拖拽/编辑落位）
    ///
    /// # 参数
    /// - user_id: 请求用户 (归属校验)
    /// - order_id: 订单行ID (主单或分段)
    /// - planned_date_raw: 目标日期字符串; 空/非法按"取消排期"处理
    /// - order_in_day_raw: 日内序号字符串; 空/非法按未指定处理
    ///
    /// # 行为
    /// - 日期为空: 取消排期 (主单先删全部分段)
    /// - 主单且总工时>0: 走拆单引擎, 再对涉及日期做再平衡
    /// - 分段或零工时主单: 仅更新落位字段, 不触发拆单
    #[instrument(skip(self), fields(user_id = %user_id, order_id = %order_id))]
    pub fn move_order(
        &self,
        user_id: &str,
        order_id: &str,
        planned_date_raw: Option<&str>,
        order_in_day_raw: Option<&str>,
    ) -> ApiResult<MoveOrderResponse> {
        let order = self
            .order_repo
            .find_by_id(user_id, order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单(id={})不存在", order_id)))?;

        let config = self.config_repo.get_or_create(user_id)?;

        // 宽松解析: 非法输入按空处理, 不报错
        let planned_date = parse_date_lenient(planned_date_raw);
        let order_in_day = parse_seq_lenient(order_in_day_raw);

        let target_date = match planned_date {
            None => {
                // 取消排期
                if order.is_main_part {
                    let deleted = self.order_repo.unschedule_main(&order.order_id)?;
                    tracing::info!(deleted_parts = deleted, "主单移回待排区");
                } else {
                    self.order_repo
                        .update_placement(&order.order_id, None, None)?;
                    tracing::info!("分段移回待排区");
                }
                return Ok(MoveOrderResponse {
                    order_id: order.order_id,
                    planned_date: None,
                    total_parts: 1,
                    rebalanced_dates: Vec::new(),
                    message: "订单已移回待排区".to_string(),
                });
            }
            Some(date) => date,
        };

        if order.is_main_part && order.total_minutes > 0 {
            // 主单: 拆单 + 对涉及日期再平衡
            let outcome = self
                .splitter
                .split(&config, &order, target_date, order_in_day)?;
            let rebalanced = self
                .rebalancer
                .rebalance_dates(&config, user_id, &outcome.touched_dates)?;

            let rebalanced_dates: Vec<NaiveDate> =
                rebalanced.iter().map(|r| r.date).collect();
            tracing::info!(
                total_parts = outcome.main.total_parts,
                rebalanced_days = rebalanced_dates.len(),
                "主单移动完成"
            );
            Ok(MoveOrderResponse {
                order_id: outcome.main.order_id.clone(),
                planned_date: outcome.main.planned_date,
                total_parts: outcome.main.total_parts,
                rebalanced_dates,
                message: format!("订单已排至{}, 共{}段", target_date, outcome.main.total_parts),
            })
        } else {
            // 分段 (或零工时主单): 仅更新落位, 不触发拆单
            self.order_repo
                .update_placement(&order.order_id, Some(target_date), order_in_day)?;
            tracing::info!(date = %target_date, "订单行落位更新");
            Ok(MoveOrderResponse {
                order_id: order.order_id,
                planned_date: Some(target_date),
                total_parts: order.total_parts,
                rebalanced_dates: Vec::new(),
                message: format!("订单已移动至{}", target_date),
            })
        }
    }

    // ==========================================
    // 容量预检接口
    // ==========================================

    /// 容量预检: 模拟把订单加到某日, 不落库
    ///
    /// 口径: 当日合计先减去该逻辑订单自身已占用的部分,
    /// 再加上订单总工时 (避免订单已在当日时重复计数)
    pub fn check_day_limit(
        &self,
        user_id: &str,
        order_id: &str,
        planned_date: NaiveDate,
    ) -> ApiResult<CheckDayLimitResponse> {
        let order = self
            .order_repo
            .find_by_id(user_id, order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单(id={})不存在", order_id)))?;
        let config = self.config_repo.get_or_create(user_id)?;
        let limit = config.daily_capacity_minutes();

        let logical_id = order.logical_order_id().to_string();
        let existing_others = self.order_repo.committed_minutes_excluding(
            user_id,
            planned_date,
            &logical_id,
        )?;

        let total_minutes = existing_others + order.total_minutes;

        Ok(CheckDayLimitResponse {
            can_add: total_minutes <= limit,
            total_minutes,
            limit,
        })
    }

    // ==========================================
    // 排期配置接口
    // ==========================================

    /// 读取用户排期配置 (不存在时按默认值建行)
    pub fn get_planner_settings(&self, user_id: &str) -> ApiResult<PlannerConfig> {
        Ok(self.config_repo.get_or_create(user_id)?)
    }

    /// 更新用户排期配置 (写入边界严格校验)
    pub fn update_planner_settings(
        &self,
        user_id: &str,
        hours_per_day: i64,
        work_days_raw: &str,
    ) -> ApiResult<PlannerConfig> {
        let config = self
            .config_repo
            .update(user_id, hours_per_day, work_days_raw)?;
        tracing::info!(
            user_id = %user_id,
            hours_per_day,
            work_days = %config.work_days_string(),
            "排期配置已更新"
        );
        Ok(config)
    }
}

// ==========================================
// 输入解析辅助函数
// ==========================================

/// 本周一
fn current_week_monday() -> NaiveDate {
    let today = Local::now().date_naive();
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}

/// 宽松解析日期 ("YYYY-MM-DD"; 空白/非法 → None)
fn parse_date_lenient(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// 宽松解析日内序号 (空白/非法 → None)
fn parse_seq_lenient(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<i64>().ok()
}
