/// 세션 정보
/// 인증은 앞단 프록시가 처리하고, 요청 헤더로 사용자 정보를 전달한다고 가정한다.
// region:    --- Imports
use crate::bidding::UserId;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;

// endregion: --- Imports

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

// region:    --- Session Model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Bidder,
    #[serde(untagged)]
    Other(String),
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "farmer" => Role::Farmer,
            "bidder" => Role::Bidder,
            _ => Role::Other(s.trim().to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Farmer => f.write_str("farmer"),
            Role::Bidder => f.write_str("bidder"),
            Role::Other(other) => f.write_str(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub role: Role,
    pub username: String,
    pub email: Option<String>,
}

impl SessionUser {
    /// 헤더에서 세션 사용자 추출. id 가 없으면 익명.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let id = header(USER_ID_HEADER)?;
        // 역할이 없으면 원래 서비스처럼 bidder 로 본다
        let role = header(USER_ROLE_HEADER)
            .map(|r| Role::from(r.as_str()))
            .unwrap_or(Role::Bidder);
        let username = header(USER_NAME_HEADER).unwrap_or_else(|| id.clone());
        Some(SessionUser {
            id: UserId(id),
            role,
            username,
            email: header(USER_EMAIL_HEADER),
        })
    }
}
// endregion: --- Session Model

// region:    --- Extractor
/// 세션 추출기 (익명이면 None)
#[derive(Debug, Clone)]
pub struct Session(pub Option<SessionUser>);

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Session(SessionUser::from_headers(&parts.headers)))
    }
}
// endregion: --- Extractor

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_user_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("f-1"));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("Farmer"));
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("ravi"));

        let user = SessionUser::from_headers(&headers).unwrap();
        assert_eq!(user.id, UserId::from("f-1"));
        assert_eq!(user.role, Role::Farmer);
        assert_eq!(user.username, "ravi");
        assert_eq!(user.email, None);
    }

    #[test]
    fn missing_id_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("bidder"));
        assert!(SessionUser::from_headers(&headers).is_none());
    }

    #[test]
    fn unknown_role_is_kept() {
        assert_eq!(Role::from("admin"), Role::Other("admin".to_string()));
        assert_eq!(Role::from("BIDDER"), Role::Bidder);
    }
}
