//! 密码哈希接口：注册时生成哈希，登录时比较

use async_trait::async_trait;
use domain::PasswordHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHasherError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    /// 存储的哈希无法解析，登录按密码错误处理
    #[error("stored password hash unusable: {0}")]
    Verify(String),
    #[error("unsupported hash cost {cost}, expected {min}..={max}")]
    Cost { cost: u32, min: u32, max: u32 },
}

impl PasswordHasherError {
    pub fn hash_error(message: impl Into<String>) -> Self {
        Self::Hash(message.into())
    }

    pub fn verify_error(message: impl Into<String>) -> Self {
        Self::Verify(message.into())
    }
}

/// 单向密码哈希，比较必须是常量时间的
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError>;
    /// 密码不匹配返回 `Ok(false)`，只有哈希本身不可用时才报错
    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError>;
}
