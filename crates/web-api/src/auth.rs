//! JWT 认证模块
//!
//! 提供 JWT token 生成、验证，并以此实现应用层的凭证验证器接口。

use application::{CredentialError, CredentialVerifier};
use config::JwtConfig;
use domain::IdentityClaim;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT Claims 结构
///
/// `sub` 是不透明的用户标识，`username` 是签发时的显示名；
/// 改名后旧 token 里的显示名保持原样，已打开的会话不回绑。
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT token（登录流程在外部系统，这里主要供运维工具和测试使用）
    pub fn generate_token(
        &self,
        subject_id: &str,
        username: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(self.config.expiration_hours);

        let claims = Claims {
            sub: subject_id.to_owned(),
            username: username.to_owned(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// 验证并解析 JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
    }
}

impl CredentialVerifier for JwtService {
    fn verify(&self, credential: &str) -> Result<IdentityClaim, CredentialError> {
        let claims = self
            .verify_token(credential)
            .map_err(|err| CredentialError::Invalid(err.to_string()))?;
        Ok(IdentityClaim::new(claims.sub, claims.username))
    }
}
