//! 认证模块
//!
//! JWT 校验与请求上下文注入。令牌签发与轮换在本服务之外完成
//! （外部协作方），这里只做验证。

pub mod extractor;
pub mod jwt;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService};

use serde::{Deserialize, Serialize};

/// Authenticated staff member, extracted from a validated JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub employee_id: i64,
    pub name: String,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let employee_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| format!("non-numeric subject: {}", claims.sub))?;
        Ok(Self {
            employee_id,
            name: claims.name,
        })
    }
}
