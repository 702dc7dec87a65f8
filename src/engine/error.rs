// ==========================================
// 缝纫工坊排单系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

use crate::repository::error::RepositoryError;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 逐日扫描达到上限仍未排完（后续日期全被占满）
    #[error("订单 {order_id} 在 {scanned_days} 天内无法完成排期")]
    CannotSchedule { order_id: String, scanned_days: u32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
