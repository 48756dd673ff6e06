//! 两种传输共用的凭证校验
//!
//! REST 和 RPC 都从 `authorization` 头里取出 Bearer 令牌，再交给同一个函数校验。

use application::{ApplicationError, CredentialService, Identity};
use axum::http::{header::AUTHORIZATION, HeaderMap};

const BEARER_PREFIX: &str = "Bearer ";

/// 只接受访问令牌；缺失、前缀不符或校验失败都返回同一个错误
pub fn authenticate(
    headers: &HeaderMap,
    credentials: &CredentialService,
) -> Result<Identity, ApplicationError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!("missing authorization header");
            ApplicationError::InvalidCredential
        })?;

    let token = header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
        tracing::debug!("authorization header is not a bearer token");
        ApplicationError::InvalidCredential
    })?;

    credentials.verify_access(token.trim()).map_err(|err| {
        tracing::debug!(error = ?err, "credential rejected");
        ApplicationError::InvalidCredential
    })
}
