// ==========================================
// 缝纫工坊排单系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 日容量排单引擎 (按用户单写入)
// 红线: 容量超限只报告不阻断, 由再平衡机会性化解
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 拆单/日聚合/再平衡
pub mod engine;

// API 层 - 排单边界操作
pub mod api;

// 数据库基础设施（连接初始化/PRAGMA/建表统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用装配层
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{DayView, Order, OrderStatus, PlannerConfig};

// 引擎
pub use engine::{DayAggregator, OrderSplitter, OverflowRebalancer};

// API
pub use api::{ApiError, ApiResult, PlannerApi};

// 应用状态
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "缝纫工坊排单系统";
