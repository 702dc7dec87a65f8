// ==========================================
// 缝纫工坊排单系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,        // 新订单
    InProgress, // 制作中
    Completed,  // 已完成
    Canceled,   // 已取消
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::InProgress => write!(f, "IN_PROGRESS"),
            OrderStatus::Completed => write!(f, "COMPLETED"),
            OrderStatus::Canceled => write!(f, "CANCELED"),
        }
    }
}

impl OrderStatus {
    /// 从数据库字符串解析订单状态
    ///
    /// 未知值按 NEW 处理（宽松读取, 不因历史脏数据中断查询）
    pub fn parse(raw: &str) -> OrderStatus {
        match raw {
            "IN_PROGRESS" => OrderStatus::InProgress,
            "COMPLETED" => OrderStatus::Completed,
            "CANCELED" => OrderStatus::Canceled,
            _ => OrderStatus::New,
        }
    }
}

// ==========================================
// 订单颜色 (固定调色板)
// ==========================================
// 红线: 颜色分配必须可复现 (按订单ID哈希取色, 不引入随机)

/// 订单展示颜色调色板
pub const ORDER_COLOR_PALETTE: [&str; 8] = [
    "#4e79a7", // 蓝
    "#f28e2b", // 橙
    "#e15759", // 红
    "#76b7b2", // 青
    "#59a14f", // 绿
    "#edc948", // 黄
    "#b07aa1", // 紫
    "#9c755f", // 棕
];

/// 按订单ID确定默认颜色
///
/// FNV-1a 哈希落入固定调色板, 同一ID永远得到同一颜色
pub fn default_color_for(order_id: &str) -> &'static str {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in order_id.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    ORDER_COLOR_PALETTE[(hash % ORDER_COLOR_PALETTE.len() as u64) as usize]
}
