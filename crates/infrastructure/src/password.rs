use std::ops::RangeInclusive;

use application::{PasswordHasher, PasswordHasherError};
use async_trait::async_trait;
use bcrypt::{BcryptError, DEFAULT_COST};
use domain::PasswordHash;

/// bcrypt 支持的计算强度
pub const BCRYPT_COST_RANGE: RangeInclusive<u32> = 4..=31;

/// bcrypt 哈希，计算放在阻塞线程池中执行
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    /// 未配置强度时使用 bcrypt 默认值
    pub fn new(cost: Option<u32>) -> Result<Self, PasswordHasherError> {
        let cost = cost.unwrap_or(DEFAULT_COST);
        if !BCRYPT_COST_RANGE.contains(&cost) {
            return Err(PasswordHasherError::Cost {
                cost,
                min: *BCRYPT_COST_RANGE.start(),
                max: *BCRYPT_COST_RANGE.end(),
            });
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

async fn run_blocking<T, F>(
    job: F,
    fail: fn(String) -> PasswordHasherError,
) -> Result<T, PasswordHasherError>
where
    F: FnOnce() -> Result<T, BcryptError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result.map_err(|err| fail(err.to_string())),
        Err(err) => Err(fail(err.to_string())),
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();
        let hashed = run_blocking(
            move || bcrypt::hash(plaintext, cost),
            PasswordHasherError::Hash,
        )
        .await?;
        PasswordHash::new(hashed).map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        let plaintext = plaintext.to_owned();
        let hashed = hashed.as_str().to_owned();
        run_blocking(
            move || bcrypt::verify(plaintext, &hashed),
            PasswordHasherError::Verify,
        )
        .await
    }
}
