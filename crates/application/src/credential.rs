//! 访问令牌与刷新令牌的签发、校验和轮换
//!
//! 令牌使用 HS256 签名，只接受这一种算法。过期与生效时间按注入的 [`Clock`]
//! 计算，而不是按系统时间；令牌不落库，没有吊销列表，更换密钥会使所有未过期令牌失效。

use std::sync::Arc;

use chrono::Duration;
use config::JwtConfig;
use domain::{Timestamp, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// 令牌类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims 结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub token_type: TokenType,
    /// 同一秒内签发的令牌也互不相同
    pub jti: String,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// 令牌中携带的身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}

/// 校验通过的令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub identity: Identity,
    pub token_type: TokenType,
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// 访问令牌的有效秒数
    pub expires_in: i64,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    /// 对外只暴露通用信息，具体原因仅用于日志
    #[error("invalid credential")]
    Invalid { reason: String },
    #[error("failed to sign credential: {0}")]
    Signing(String),
}

impl CredentialError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

#[derive(Clone)]
pub struct CredentialSettings {
    pub secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl CredentialSettings {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            issuer: config.issuer.clone(),
            access_ttl: Duration::hours(config.access_ttl_hours),
            refresh_ttl: Duration::days(config.refresh_ttl_days),
        }
    }
}

pub struct CredentialService {
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl CredentialService {
    pub fn new(settings: CredentialSettings, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = vec![SIGNING_ALGORITHM];
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss"]);
        // 时间相关的声明按注入的时钟检查
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            issuer: settings.issuer,
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            clock,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, user_id: UserId, email: &str) -> Result<String, CredentialError> {
        self.issue(user_id, email, TokenType::Access, self.access_ttl)
    }

    pub fn issue_refresh(&self, user_id: UserId, email: &str) -> Result<String, CredentialError> {
        self.issue(user_id, email, TokenType::Refresh, self.refresh_ttl)
    }

    pub fn issue_pair(&self, user_id: UserId, email: &str) -> Result<TokenPair, CredentialError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id, email)?,
            refresh_token: self.issue_refresh(user_id, email)?,
            expires_in: self.access_ttl_secs(),
        })
    }

    /// 校验签名、算法、签发者和时间声明，两类令牌都接受
    pub fn verify(&self, token: &str) -> Result<VerifiedCredential, CredentialError> {
        let result = self.decode_claims(token);
        if let Err(CredentialError::Invalid { reason }) = &result {
            tracing::debug!(reason = %reason, "credential rejected");
        }
        let claims = result?;
        Ok(VerifiedCredential {
            identity: Identity {
                user_id: UserId(claims.user_id),
                email: claims.email,
            },
            token_type: claims.token_type,
            expires_at: claims.exp,
        })
    }

    /// 受保护的接口只接受访问令牌
    pub fn verify_access(&self, token: &str) -> Result<Identity, CredentialError> {
        let verified = self.verify(token)?;
        if verified.token_type != TokenType::Access {
            tracing::debug!("refresh token presented where an access token is required");
            return Err(CredentialError::invalid("refresh token used as access token"));
        }
        Ok(verified.identity)
    }

    /// 用刷新令牌换一对新令牌；刷新令牌必须重新校验通过
    pub fn rotate(&self, refresh_token: &str) -> Result<TokenPair, CredentialError> {
        let verified = self.verify(refresh_token)?;
        if verified.token_type != TokenType::Refresh {
            tracing::debug!("access token presented for rotation");
            return Err(CredentialError::invalid("access token used for rotation"));
        }
        let identity = verified.identity;
        tracing::debug!(user_id = %identity.user_id, "rotating credentials");
        self.issue_pair(identity.user_id, &identity.email)
    }

    fn issue(
        &self,
        user_id: UserId,
        email: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, CredentialError> {
        let now: Timestamp = self.clock.now();
        let claims = Claims {
            user_id: user_id.0,
            email: email.to_owned(),
            token_type,
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|err| CredentialError::Signing(err.to_string()))
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, CredentialError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| CredentialError::invalid(err.to_string()))?
            .claims;

        if claims.exp <= claims.iat {
            return Err(CredentialError::invalid("expiry not after issue time"));
        }
        let now = self.clock.now().timestamp();
        if now < claims.nbf {
            return Err(CredentialError::invalid("token not yet valid"));
        }
        if now >= claims.exp {
            return Err(CredentialError::invalid("token expired"));
        }
        Ok(claims)
    }
}
