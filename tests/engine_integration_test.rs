// ==========================================
// 拆单/再平衡引擎集成测试
// ==========================================
// 测试目标: 多订单连续落位下的容量守恒
// 覆盖范围: 连锁拆单、再平衡与拆单引擎协作、
//           跨日容量不变式
// ==========================================


use atelier_planner::domain::config::PlannerConfig;
use atelier_planner::engine::{OrderSplitter, OverflowRebalancer};
use test_helpers::{create_test_state, d, make_scheduled_order};

#[test]
fn test_sequential_placements_respect_capacity() {
    // 连续把三张订单排到同一天: 每张都只占余量, 依次外溢
    let (_tmp, state) = create_test_state().unwrap();
    let repo = state.order_repo.clone();
    let splitter = OrderSplitter::new(repo.clone());
    let config = PlannerConfig::with_defaults("u1");

    let day = d("2026-03-02");
    let titles = ["第一单", "第二单", "第三单"];
    for title in titles {
        let order = test_helpers::make_order("u1", title, 300);
        repo.insert(&order).unwrap();
        splitter.split(&config, &order, day, None).unwrap();
    }

    // 900分钟分布在两天: 第1天480, 第2天420
    let day1: i64 = repo
        .find_by_date("u1", day)
        .unwrap()
        .iter()
        .map(|o| o.planned_minutes)
        .sum();
    let day2: i64 = repo
        .find_by_date("u1", d("2026-03-03"))
        .unwrap()
        .iter()
        .map(|o| o.planned_minutes)
        .sum();
    assert_eq!(day1, 480);
    assert_eq!(day2, 420);
}

#[test]
fn test_rebalance_resolves_preexisting_overflow() {
    // 某日已被手工落位挤爆 (分段移动不触发容量检查),
    // 下一次波及该日的再平衡将其化解
    let (_tmp, state) = create_test_state().unwrap();
    let repo = state.order_repo.clone();
    let rebalancer = OverflowRebalancer::new(repo.clone());
    let config = PlannerConfig::with_defaults("u1");

    let day = d("2026-03-02");
    repo.insert(&make_scheduled_order("u1", "存量单", day, 380, Some(0)))
        .unwrap();
    repo.insert(&make_scheduled_order("u1", "挤入单", day, 200, Some(1)))
        .unwrap();

    let outcomes = rebalancer
        .rebalance_dates(&config, "u1", &[day])
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].was_over_limit);
    assert!(outcomes[0].split_order_id.is_some());

    // 当日回到容量内, 溢出尾巴落到次日
    let day1: i64 = repo
        .find_by_date("u1", day)
        .unwrap()
        .iter()
        .map(|o| o.planned_minutes)
        .sum();
    assert_eq!(day1, 480);

    let day2_rows = repo.find_by_date("u1", d("2026-03-03")).unwrap();
    let day2: i64 = day2_rows.iter().map(|o| o.planned_minutes).sum();
    assert_eq!(day2, 100);
    // 尾巴是"存量单"的分段 (当日工时最大的主单被选中)
    assert!(day2_rows[0].is_secondary());
}

#[test]
fn test_rebalance_only_processes_given_dates() {
    // 再平衡只处理传入日期; 化解第1天时拆单引擎
    // 逐日尊重后续日期的余量, 尾巴继续向后溢出
    let (_tmp, state) = create_test_state().unwrap();
    let repo = state.order_repo.clone();
    let rebalancer = OverflowRebalancer::new(repo.clone());
    let config = PlannerConfig::with_defaults("u1");

    let day1 = d("2026-03-02");
    let day2 = d("2026-03-03");
    repo.insert(&make_scheduled_order("u1", "次日将满", day2, 460, Some(0)))
        .unwrap();
    repo.insert(&make_scheduled_order("u1", "超限大单", day1, 600, Some(0)))
        .unwrap();

    rebalancer
        .rebalance_dates(&config, "u1", &[day1])
        .unwrap();

    // 第1天化解到480
    let day1_total: i64 = repo
        .find_by_date("u1", day1)
        .unwrap()
        .iter()
        .map(|o| o.planned_minutes)
        .sum();
    assert_eq!(day1_total, 480);

    // 拆单引擎尊重第2天余量(20), 余下的落到第3天
    let day2_total: i64 = repo
        .find_by_date("u1", day2)
        .unwrap()
        .iter()
        .map(|o| o.planned_minutes)
        .sum();
    assert_eq!(day2_total, 480);

    let day3_total: i64 = repo
        .find_by_date("u1", d("2026-03-04"))
        .unwrap()
        .iter()
        .map(|o| o.planned_minutes)
        .sum();
    assert_eq!(day3_total, 100);
}

#[test]
fn test_split_invariant_survives_rebalance_chain() {
    // 不变式: 任一再平衡链结束后, 每张逻辑订单的
    // 主单+分段合计仍等于其总工时
    let (_tmp, state) = create_test_state().unwrap();
    let repo = state.order_repo.clone();
    let splitter = OrderSplitter::new(repo.clone());
    let rebalancer = OverflowRebalancer::new(repo.clone());
    let config = PlannerConfig::with_defaults("u1");

    let day = d("2026-03-02");
    let mut order_ids = Vec::new();
    for (title, minutes) in [("甲", 700), ("乙", 500), ("丙", 650)] {
        let order = test_helpers::make_order("u1", title, minutes);
        order_ids.push((order.order_id.clone(), minutes));
        repo.insert(&order).unwrap();
        let outcome = splitter.split(&config, &order, day, None).unwrap();
        rebalancer
            .rebalance_dates(&config, "u1", &outcome.touched_dates)
            .unwrap();
    }

    for (order_id, total_minutes) in order_ids {
        let main = repo.find_by_id("u1", &order_id).unwrap().unwrap();
        let parts = repo.find_secondary_parts(&order_id).unwrap();
        let sum: i64 = main.planned_minutes
            + parts.iter().map(|p| p.planned_minutes).sum::<i64>();
        assert_eq!(sum, total_minutes, "订单{}工时不守恒", main.title);
        assert_eq!(main.total_parts, 1 + parts.len() as i64);
    }
}
