//! 领域模型错误定义
//!
//! `DomainError` 描述输入校验和业务规则违反；`RepositoryError` 是持久化层
//! 与上层之间约定的错误信号，其中 `NotFound` 和 `Conflict` 是可区分的。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 字段校验失败
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 密码强度不足
    #[error("password must be at least {min_length} characters")]
    WeakPassword { min_length: usize },

    /// 出行开始日期早于今天
    #[error("travel start date must not be in the past")]
    PastTravelDate,

    /// 出行开始日期不早于结束日期
    #[error("travel start date must be before the end date")]
    InvalidTravelDates,

    /// 国家或城市为空
    #[error("destination requires both country and city")]
    InvalidDestination,
}

impl DomainError {
    /// 创建字段校验错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 仓储层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    /// 违反唯一约束
    #[error("unique constraint violated")]
    Conflict,
    /// 获取连接或执行语句超时
    #[error("storage operation timed out")]
    Timeout,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
