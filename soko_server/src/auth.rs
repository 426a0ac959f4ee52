//! Identity extraction.
//!
//! Authentication is handled by the platform's API gateway, which terminates the user's session and forwards the
//! verified identity as two headers: `X-User-Id` and `X-User-Role`. This server must only ever be reachable
//! through that gateway; it trusts the headers as-is.

use std::{
    fmt::Display,
    future::{ready, Ready},
    str::FromStr,
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use soko_engine::db_types::UserId;

use crate::errors::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Vendor,
    Farmer,
    Rider,
    Admin,
}

impl FromStr for Role {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "vendor" => Ok(Self::Vendor),
            "farmer" => Ok(Self::Farmer),
            "rider" => Ok(Self::Rider),
            "admin" => Ok(Self::Admin),
            s => Err(ServerError::InsufficientPermissions(format!("Unknown role: {s}"))),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Buyer => "buyer",
            Role::Vendor => "vendor",
            Role::Farmer => "farmer",
            Role::Rider => "rider",
            Role::Admin => "admin",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub role: Role,
}

impl AuthenticatedUser {
    /// Admins pass every check; everyone else must hold one of the listed roles.
    pub fn require(&self, roles: &[Role]) -> Result<(), ServerError> {
        if self.role == Role::Admin || roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ServerError::InsufficientPermissions(format!(
                "This action is not available to the {} role",
                self.role
            )))
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_user(req))
    }
}

fn extract_user(req: &HttpRequest) -> Result<AuthenticatedUser, ServerError> {
    let id = req
        .headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ServerError::Unauthenticated)?;
    let role = req
        .headers()
        .get("X-User-Role")
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::Unauthenticated)?
        .parse::<Role>()?;
    Ok(AuthenticatedUser { id: UserId::from(id), role })
}
