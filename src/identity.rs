// src/identity.rs
use async_trait::async_trait;
use http::HeaderMap;
use serde::Serialize;

use crate::error::SessionError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// Authenticated caller, as vouched for by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
}

impl Identity {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            role: Role::User,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resolves the caller of the current request.
///
/// `Ok(None)` means no session. `Err` is reserved for a session source that
/// cannot be read at all.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn current_user(&self) -> Result<Option<Identity>, SessionError>;
}

/// Reads the identity the upstream gateway forwards after validating the session.
#[derive(Debug, Clone, Default)]
pub struct HeaderIdentity {
    headers: HeaderMap,
}

impl HeaderIdentity {
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    fn header(&self, name: &str) -> Result<Option<String>, SessionError> {
        match self.headers.get(name) {
            None => Ok(None),
            Some(value) => value
                .to_str()
                .map(|v| Some(v.trim().to_string()).filter(|v| !v.is_empty()))
                .map_err(|_| SessionError(format!("malformed {name} header"))),
        }
    }
}

#[async_trait]
impl IdentityResolver for HeaderIdentity {
    async fn current_user(&self) -> Result<Option<Identity>, SessionError> {
        let Some(id) = self.header(USER_ID_HEADER)? else {
            return Ok(None);
        };
        let email = self.header(USER_EMAIL_HEADER)?;
        let role = self
            .header(USER_ROLE_HEADER)?
            .map(|r| Role::parse(&r))
            .unwrap_or(Role::User);

        Ok(Some(Identity { id, email, role }))
    }
}

/// Always resolves to the same caller, or to nobody.
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity(pub Option<Identity>);

impl FixedIdentity {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn of(identity: Identity) -> Self {
        Self(Some(identity))
    }
}

#[async_trait]
impl IdentityResolver for FixedIdentity {
    async fn current_user(&self) -> Result<Option<Identity>, SessionError> {
        Ok(self.0.clone())
    }
}
