// ==========================================
// 缝纫工坊排单系统 - 超限再平衡引擎
// ==========================================
// 职责: 拆单/移单后对受影响日期做两步处理
// 1) 日内序号归一化: 按现有顺序0起始连续重编
//    (消除人工拖拽留下的空洞与重复序号)
// 2) 超限检查: 合计工时严格大于容量时, 选当日
//    工时最大且超过最小拆分阈值的主单重新拆单
// 口径: 只处理传入的日期集合, 新波及日期不追踪
// ==========================================

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;

use crate::domain::config::PlannerConfig;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::splitter::OrderSplitter;
use crate::repository::error::RepositoryError;
use crate::repository::order_repo::OrderRepository;

/// 最小拆分阈值（分钟）: 当日工时不超过该值的主单不作为拆分候选
pub const MIN_SPLIT_MINUTES: i64 = 30;

// ==========================================
// OverflowRebalancer - 超限再平衡引擎
// ==========================================
pub struct OverflowRebalancer {
    order_repo: Arc<OrderRepository>,
    splitter: OrderSplitter,
}

/// 单日再平衡结果
#[derive(Debug, Clone)]
pub struct RebalanceOutcome {
    pub date: NaiveDate,               // 处理的日期
    pub renumbered: usize,             // 归一化的行数
    pub was_over_limit: bool,          // 处理前是否超限
    pub split_order_id: Option<String>, // 被重新拆单的主单ID
}

impl OverflowRebalancer {
    pub fn new(order_repo: Arc<OrderRepository>) -> Self {
        let splitter = OrderSplitter::new(order_repo.clone());
        Self {
            order_repo,
            splitter,
        }
    }

    /// 对一组日期逐个再平衡（去重, 保持传入顺序）
    pub fn rebalance_dates(
        &self,
        config: &PlannerConfig,
        user_id: &str,
        dates: &[NaiveDate],
    ) -> EngineResult<Vec<RebalanceOutcome>> {
        let mut seen: Vec<NaiveDate> = Vec::new();
        let mut outcomes = Vec::new();
        for &date in dates {
            if seen.contains(&date) {
                continue;
            }
            seen.push(date);
            outcomes.push(self.rebalance_date(config, user_id, date)?);
        }
        Ok(outcomes)
    }

    /// 单日再平衡: 序号归一化 + 超限拆分
    #[instrument(skip(self, config), fields(user_id = %user_id, date = %date))]
    pub fn rebalance_date(
        &self,
        config: &PlannerConfig,
        user_id: &str,
        date: NaiveDate,
    ) -> EngineResult<RebalanceOutcome> {
        // 仓储按日内顺序返回 (order_in_day 升序空值在前, 创建时间升序)
        let rows = self.order_repo.find_by_date(user_id, date)?;

        // 1. 日内序号归一化 (0起始连续编号)
        let ordered_ids: Vec<String> = rows.iter().map(|o| o.order_id.clone()).collect();
        self.order_repo.renumber_day(user_id, date, &ordered_ids)?;

        // 2. 超限检查 (恰好等于容量不算超限)
        let total_minutes: i64 = rows.iter().map(|o| o.planned_minutes).sum();
        let capacity = config.daily_capacity_minutes();
        if total_minutes <= capacity {
            return Ok(RebalanceOutcome {
                date,
                renumbered: ordered_ids.len(),
                was_over_limit: false,
                split_order_id: None,
            });
        }

        tracing::info!(
            total_minutes,
            capacity,
            over_minutes = total_minutes - capacity,
            "日容量超限, 尝试拆分化解"
        );

        // 选当日工时最大、且超过最小拆分阈值的主单
        let candidate = rows
            .iter()
            .filter(|o| o.is_main_part && o.planned_minutes > MIN_SPLIT_MINUTES)
            .max_by_key(|o| o.planned_minutes);

        let split_order_id = match candidate {
            Some(chosen) => {
                // 归一化后序号已变, 取库内最新行再拆
                let fresh = self
                    .order_repo
                    .find_by_id(user_id, &chosen.order_id)?
                    .ok_or_else(|| {
                        EngineError::Repository(RepositoryError::NotFound {
                            entity: "Order".to_string(),
                            id: chosen.order_id.clone(),
                        })
                    })?;
                self.splitter
                    .split(config, &fresh, date, fresh.order_in_day)?;
                Some(fresh.order_id)
            }
            None => {
                // 无合适候选: 超限保留, 仅由视图报告
                tracing::debug!("无可拆分候选, 超限保留");
                None
            }
        };

        Ok(RebalanceOutcome {
            date,
            renumbered: ordered_ids.len(),
            was_over_limit: true,
            split_order_id,
        })
    }
}
