// ==========================================
// 缝纫工坊排单系统 - API 层
// ==========================================
// 职责: 排单边界操作, 供外层 CRUD/UI 调用
// ==========================================

pub mod error;
pub mod planner_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use planner_api::{
    CheckDayLimitResponse, MoveOrderResponse, PlannerApi, PlannerViewResponse,
};
