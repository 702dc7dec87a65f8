// ==========================================
// 缝纫工坊排单系统 - 排期配置领域模型
// ==========================================
// 红线: 工作日原始字符串只允许出现在存储边界,
//       容量计算一律使用解析后的集合
// ==========================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 默认每日工时（小时）
pub const DEFAULT_HOURS_PER_DAY: i64 = 8;

/// 默认工作日（周一至周五, ISO 编号）
pub const DEFAULT_WORK_DAYS: &str = "1,2,3,4,5";

// ==========================================
// PlannerConfig - 每用户排期配置
// ==========================================
// 用途: 日容量预算, 工作日标记
// 非工作日不阻断排期, 只在视图上打标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub user_id: String,          // 所属用户
    pub hours_per_day: i64,       // 每日工时 (1..=24, 写入时校验)
    pub work_days: BTreeSet<u32>, // 工作日集合 (ISO: 周一=1 .. 周日=7)
}

impl PlannerConfig {
    /// 按默认值创建配置（8小时/天, 周一至周五）
    pub fn with_defaults(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            work_days: parse_work_days(DEFAULT_WORK_DAYS)
                .unwrap_or_default(),
        }
    }

    /// 当日容量预算（分钟）
    pub fn daily_capacity_minutes(&self) -> i64 {
        self.hours_per_day * 60
    }

    /// 判断是否工作日
    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        self.work_days.contains(&date.weekday().number_from_monday())
    }

    /// 工作日集合序列化为存储格式（"1,2,3,4,5"）
    pub fn work_days_string(&self) -> String {
        self.work_days
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// 解析工作日字符串（存储边界专用）
///
/// # 参数
/// - raw: 逗号分隔的 ISO 周几编号, 例如 "1,2,3,4,5"
///
/// # 返回
/// - Ok(BTreeSet<u32>): 工作日集合（允许为空）
/// - Err(String): 非法片段描述（非整数或超出 1..=7）
pub fn parse_work_days(raw: &str) -> Result<BTreeSet<u32>, String> {
    let mut days = BTreeSet::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let day: u32 = token
            .parse()
            .map_err(|_| format!("非法的工作日片段: {}", token))?;
        if !(1..=7).contains(&day) {
            return Err(format!("工作日编号超出范围(1..=7): {}", day));
        }
        days.insert(day);
    }
    Ok(days)
}
