use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

pub const SESSION_COOKIE: &str = "session_token";
pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    /// Value of a cookie from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers.get("cookie").and_then(|header| {
            header.split(';').find_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                (key == name).then_some(value)
            })
        })
    }
}

/// Authenticated identity. This is the only way handlers learn who the
/// caller is; every owner-scoped operation takes the username from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub method: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            method: method.into(),
        }
    }
}
