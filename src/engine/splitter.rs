// ==========================================
// 缝纫工坊排单系统 - 拆单引擎
// ==========================================
// 职责: 把主单的总工时从目标日起逐日贪心分配,
//       每日只占用"他人之外"的剩余容量
// 规则:
// 1) 先删旧分段再整组重建 (幂等全量替换, 由仓储事务承载)
// 2) 当日余量为0时跳到下一天, 不消耗工时也不递增分段号
// 3) 第1段落在主单行自身, 第2段起新建分段行
// 4) 分段复制客户/品类/状态/备注/颜色, 不复制价格
// 5) 逐日扫描有上限, 超限报"无法排期"且不落库
// ==========================================

use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::config::PlannerConfig;
use crate::domain::order::Order;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::order_repo::OrderRepository;

/// 逐日扫描上限（天）
pub const MAX_SCAN_DAYS: u32 = 365;

// ==========================================
// OrderSplitter - 拆单引擎
// ==========================================
pub struct OrderSplitter {
    order_repo: Arc<OrderRepository>,
}

/// 一次拆单的结果
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub main: Order,                   // 更新后的主单 (第1段)
    pub secondary_parts: Vec<Order>,   // 新建的分段行 (第2段起)
    pub touched_dates: Vec<NaiveDate>, // 本次落位涉及的日期 (升序)
}

impl SplitOutcome {
    /// 主单+分段的当日工时合计
    pub fn allocated_minutes(&self) -> i64 {
        self.main.planned_minutes
            + self
                .secondary_parts
                .iter()
                .map(|p| p.planned_minutes)
                .sum::<i64>()
    }
}

impl OrderSplitter {
    pub fn new(order_repo: Arc<OrderRepository>) -> Self {
        Self { order_repo }
    }

    /// 拆分主单并落库
    ///
    /// # 参数
    /// - config: 用户排期配置
    /// - main: 主单（is_main_part 必须为真, total_minutes > 0）
    /// - target_date: 目标起始日期
    /// - order_in_day: 主单落位的日内序号（调用方输入, 可空）
    ///
    /// # 返回
    /// - Ok(SplitOutcome): 拆单结果（已落库）
    /// - Err(EngineError::CannotSchedule): 扫描上限内排不完, 未落库
    #[instrument(skip(self, config, main), fields(
        order_id = %main.order_id,
        total_minutes = main.total_minutes,
        target_date = %target_date
    ))]
    pub fn split(
        &self,
        config: &PlannerConfig,
        main: &Order,
        target_date: NaiveDate,
        order_in_day: Option<i64>,
    ) -> EngineResult<SplitOutcome> {
        let capacity = config.daily_capacity_minutes();
        let now = Utc::now().naive_utc();

        let mut updated_main = main.clone();
        let mut secondary_parts: Vec<Order> = Vec::new();
        let mut touched_dates: Vec<NaiveDate> = Vec::new();

        let mut remaining = main.total_minutes;
        let mut current_date = target_date;
        let mut part_number: i64 = 1;
        let mut scanned_days: u32 = 0;

        while remaining > 0 {
            if scanned_days >= MAX_SCAN_DAYS {
                tracing::warn!(
                    order_id = %main.order_id,
                    scanned_days,
                    remaining,
                    "拆单扫描达到上限, 放弃排期"
                );
                return Err(EngineError::CannotSchedule {
                    order_id: main.order_id.clone(),
                    scanned_days,
                });
            }

            // 当日"他人"已占用工时: 同一逻辑订单的旧落位不计入
            let existing = self.order_repo.committed_minutes_excluding(
                &main.user_id,
                current_date,
                &main.order_id,
            )?;
            let available = (capacity - existing).max(0);

            if available == 0 {
                // 当日已满: 跳到下一天, 不消耗工时, 不递增分段号
                current_date += Duration::days(1);
                scanned_days += 1;
                continue;
            }

            let allocated = remaining.min(available);

            if part_number == 1 {
                // 第1段落在主单行自身
                updated_main.planned_date = Some(current_date);
                updated_main.planned_minutes = allocated;
                updated_main.order_in_day = order_in_day;
                updated_main.part_number = 1;
                updated_main.updated_at = now;
            } else {
                secondary_parts.push(make_secondary_part(
                    &updated_main,
                    part_number,
                    current_date,
                    allocated,
                    now,
                ));
            }

            touched_dates.push(current_date);
            remaining -= allocated;
            current_date += Duration::days(1);
            part_number += 1;
            scanned_days += 1;
        }

        updated_main.total_parts = part_number - 1;

        // 单事务: 删旧分段 + 更新主单 + 写新分段
        self.order_repo
            .apply_split(&updated_main, &secondary_parts)?;

        tracing::debug!(
            order_id = %updated_main.order_id,
            total_parts = updated_main.total_parts,
            touched_days = touched_dates.len(),
            "拆单完成"
        );

        Ok(SplitOutcome {
            main: updated_main,
            secondary_parts,
            touched_dates,
        })
    }
}

/// 生成分段行
///
/// 复制主单的客户/品类/状态/备注/颜色; 价格仅主单持有;
/// 分段的 total_minutes 等于自身当日工时
fn make_secondary_part(
    main: &Order,
    part_number: i64,
    date: NaiveDate,
    minutes: i64,
    now: chrono::NaiveDateTime,
) -> Order {
    Order {
        order_id: Uuid::new_v4().to_string(),
        user_id: main.user_id.clone(),
        title: main.title.clone(),
        customer: main.customer.clone(),
        category: main.category.clone(),
        status: main.status,
        comment: main.comment.clone(),
        color: main.color.clone(),
        price: None,
        total_minutes: minutes,
        planned_date: Some(date),
        planned_minutes: minutes,
        order_in_day: None,
        is_main_part: false,
        part_number,
        parent_order_id: Some(main.order_id.clone()),
        total_parts: 1,
        created_at: now,
        updated_at: now,
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup_test_repo() -> Arc<OrderRepository> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        Arc::new(OrderRepository::from_connection(Arc::new(Mutex::new(conn))))
    }

    fn test_config() -> PlannerConfig {
        PlannerConfig::with_defaults("u1")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 预置一条占位订单行
    fn seed_blocker(repo: &OrderRepository, day: NaiveDate, minutes: i64) -> Order {
        let mut order = Order::new_main("u1", "占位", minutes);
        order.planned_date = Some(day);
        order.planned_minutes = minutes;
        repo.insert(&order).unwrap();
        order
    }

    #[test]
    fn test_split_600_on_empty_day() {
        // 场景: 480分钟容量, 600分钟订单落在空日
        // 预期: 主单480落第1天, 分段120落第2天
        let repo = setup_test_repo();
        let splitter = OrderSplitter::new(repo.clone());
        let main = Order::new_main("u1", "婚纱定制", 600);
        repo.insert(&main).unwrap();

        let outcome = splitter
            .split(&test_config(), &main, date(2026, 3, 2), Some(0))
            .unwrap();

        assert_eq!(outcome.main.planned_date, Some(date(2026, 3, 2)));
        assert_eq!(outcome.main.planned_minutes, 480);
        assert_eq!(outcome.main.order_in_day, Some(0));
        assert_eq!(outcome.main.total_parts, 2);
        assert_eq!(outcome.secondary_parts.len(), 1);
        assert_eq!(outcome.secondary_parts[0].planned_date, Some(date(2026, 3, 3)));
        assert_eq!(outcome.secondary_parts[0].planned_minutes, 120);
        assert_eq!(outcome.secondary_parts[0].part_number, 2);
        assert_eq!(outcome.touched_dates, vec![date(2026, 3, 2), date(2026, 3, 3)]);
        assert_eq!(outcome.allocated_minutes(), 600);
    }

    #[test]
    fn test_split_fills_remaining_capacity_first() {
        // 场景: 当日已占450/480, 新单100分钟
        // 预期: 当日分到30, 次日分到70
        let repo = setup_test_repo();
        let splitter = OrderSplitter::new(repo.clone());
        seed_blocker(&repo, date(2026, 3, 2), 450);

        let main = Order::new_main("u1", "衬衫改袖", 100);
        repo.insert(&main).unwrap();

        let outcome = splitter
            .split(&test_config(), &main, date(2026, 3, 2), None)
            .unwrap();

        assert_eq!(outcome.main.planned_minutes, 30);
        assert_eq!(outcome.secondary_parts.len(), 1);
        assert_eq!(outcome.secondary_parts[0].planned_minutes, 70);
        assert_eq!(outcome.secondary_parts[0].planned_date, Some(date(2026, 3, 3)));
    }

    #[test]
    fn test_split_skips_fully_booked_days() {
        // 第1、2天已满, 第3天才有余量
        let repo = setup_test_repo();
        let splitter = OrderSplitter::new(repo.clone());
        seed_blocker(&repo, date(2026, 3, 2), 480);
        seed_blocker(&repo, date(2026, 3, 3), 480);

        let main = Order::new_main("u1", "裤装修边", 60);
        repo.insert(&main).unwrap();

        let outcome = splitter
            .split(&test_config(), &main, date(2026, 3, 2), None)
            .unwrap();

        // 跳过满日不产生分段
        assert_eq!(outcome.main.planned_date, Some(date(2026, 3, 4)));
        assert_eq!(outcome.main.total_parts, 1);
        assert!(outcome.secondary_parts.is_empty());
    }

    #[test]
    fn test_split_sum_invariant() {
        // 不变式: 主单+分段工时合计 == 总工时
        let repo = setup_test_repo();
        let splitter = OrderSplitter::new(repo.clone());
        seed_blocker(&repo, date(2026, 3, 2), 400);
        seed_blocker(&repo, date(2026, 3, 4), 470);

        let main = Order::new_main("u1", "舞台服三件套", 1000);
        repo.insert(&main).unwrap();

        let outcome = splitter
            .split(&test_config(), &main, date(2026, 3, 2), None)
            .unwrap();

        assert_eq!(outcome.allocated_minutes(), 1000);
        // 每段都不超过当日余量
        assert_eq!(outcome.main.planned_minutes, 80);
        for part in &outcome.secondary_parts {
            assert!(part.planned_minutes <= 480);
            assert!(part.planned_minutes > 0);
        }
    }

    #[test]
    fn test_resplit_replaces_parts_without_accumulation() {
        // 幂等全量替换: 同样输入重复拆单, 分段不累积
        let repo = setup_test_repo();
        let splitter = OrderSplitter::new(repo.clone());
        let main = Order::new_main("u1", "晚礼服", 600);
        repo.insert(&main).unwrap();

        let first = splitter
            .split(&test_config(), &main, date(2026, 3, 2), Some(0))
            .unwrap();
        let second = splitter
            .split(&test_config(), &first.main, date(2026, 3, 2), Some(0))
            .unwrap();

        assert_eq!(second.secondary_parts.len(), first.secondary_parts.len());
        let stored_parts = repo.find_secondary_parts(&main.order_id).unwrap();
        assert_eq!(stored_parts.len(), 1);
        assert_eq!(second.allocated_minutes(), 600);
    }

    #[test]
    fn test_resplit_to_new_date_ignores_own_stale_allocation() {
        // 主单已在3月2日占480, 重拆到3月2日时旧落位不算"他人占用"
        let repo = setup_test_repo();
        let splitter = OrderSplitter::new(repo.clone());
        let main = Order::new_main("u1", "西装定制", 600);
        repo.insert(&main).unwrap();

        let first = splitter
            .split(&test_config(), &main, date(2026, 3, 2), None)
            .unwrap();
        assert_eq!(first.main.planned_minutes, 480);

        let second = splitter
            .split(&test_config(), &first.main, date(2026, 3, 2), None)
            .unwrap();
        // 结果与首次一致
        assert_eq!(second.main.planned_minutes, 480);
        assert_eq!(second.secondary_parts[0].planned_minutes, 120);
    }

    #[test]
    fn test_secondary_part_copies_fields_but_not_price() {
        let repo = setup_test_repo();
        let splitter = OrderSplitter::new(repo.clone());

        let mut main = Order::new_main("u1", "礼服租赁改制", 600);
        main.customer = Some("林女士".to_string());
        main.category = Some("礼服".to_string());
        main.comment = Some("腰身收2cm".to_string());
        main.price = Some(1280.0);
        repo.insert(&main).unwrap();

        let outcome = splitter
            .split(&test_config(), &main, date(2026, 3, 2), None)
            .unwrap();

        let part = &outcome.secondary_parts[0];
        assert_eq!(part.customer.as_deref(), Some("林女士"));
        assert_eq!(part.category.as_deref(), Some("礼服"));
        assert_eq!(part.comment.as_deref(), Some("腰身收2cm"));
        assert_eq!(part.color, main.color);
        assert_eq!(part.price, None);
        assert_eq!(part.total_minutes, part.planned_minutes);
        assert_eq!(part.parent_order_id.as_deref(), Some(main.order_id.as_str()));
    }

    #[test]
    fn test_cannot_schedule_when_horizon_is_full() {
        // 扫描上限内每天都满: 报无法排期, 且不落库
        let repo = setup_test_repo();
        let splitter = OrderSplitter::new(repo.clone());

        let start = date(2026, 3, 2);
        for offset in 0..=(MAX_SCAN_DAYS as i64) {
            seed_blocker(&repo, start + Duration::days(offset), 480);
        }

        let main = Order::new_main("u1", "排不进的单", 60);
        repo.insert(&main).unwrap();

        let result = splitter.split(&test_config(), &main, start, None);
        assert!(matches!(
            result,
            Err(EngineError::CannotSchedule { .. })
        ));

        // 未落库: 主单仍在待排区
        let stored = repo.find_by_id("u1", &main.order_id).unwrap().unwrap();
        assert!(stored.planned_date.is_none());
        assert!(repo.find_secondary_parts(&main.order_id).unwrap().is_empty());
    }
}
