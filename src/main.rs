// ==========================================
// 缝纫工坊排单系统 - 控制台入口
// ==========================================
// 用途: 打开(或初始化)数据库, 打印指定用户
//       本周的排期视图概要
// 用法: atelier-planner [db_path] [user_id]
// ==========================================

use atelier_planner::app::{get_default_db_path, AppState};
use atelier_planner::{logging, APP_NAME, VERSION};

fn main() {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let user_id = args.next().unwrap_or_else(|| "default".to_string());

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("创建数据目录失败: {}", e);
            }
        }
    }
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(&db_path).expect("无法初始化AppState");

    let view = state
        .planner_api
        .planner_view(&user_id, None, Some(1))
        .expect("查询排期视图失败");

    println!();
    println!("用户 {} · 从 {} 起一周排期", view.user_id, view.start_date);
    println!("--------------------------------------------------");
    for day in &view.days {
        let flag = if day.is_over_limit {
            format!(" 超限+{}分钟", day.over_minutes)
        } else if !day.is_work_day {
            " (休)".to_string()
        } else {
            String::new()
        };
        println!(
            "{}  {:>4}分钟  {:>5.1}%  {}单{}",
            day.date,
            day.total_minutes,
            day.occupancy_percentage,
            day.orders.len(),
            flag
        );
    }
    println!("--------------------------------------------------");
    println!("待排区: {}单", view.orders_without_date.len());
}
