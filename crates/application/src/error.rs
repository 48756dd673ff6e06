use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::credential::CredentialError;
use crate::password::PasswordHasherError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 令牌伪造、过期、算法不符或结构错误，原因只写日志
    #[error("invalid or expired credential")]
    InvalidCredential,
    /// 登录失败：邮箱不存在与密码错误不作区分
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("email already exists")]
    EmailAlreadyExists,
    #[error("operation not permitted")]
    Forbidden,
    #[error("validation error: {0}")]
    Validation(#[from] DomainError),
    #[error("storage error: {0}")]
    Storage(RepositoryError),
    #[error("password error: {0}")]
    Password(#[from] PasswordHasherError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    pub fn internal(message: impl Into<String>) -> Self {
        ApplicationError::Internal(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Storage(value)
    }
}

impl From<CredentialError> for ApplicationError {
    fn from(value: CredentialError) -> Self {
        match value {
            CredentialError::Invalid { .. } => ApplicationError::InvalidCredential,
            CredentialError::Signing(message) => ApplicationError::Internal(message),
        }
    }
}

impl From<validator::ValidationErrors> for ApplicationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        let field = fields.first().cloned().unwrap_or_else(|| "request".to_string());
        ApplicationError::Validation(DomainError::invalid_argument(field, "failed validation"))
    }
}
