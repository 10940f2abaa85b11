//! Session cookie authentication.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity, CSRF_HEADER, SESSION_COOKIE};
use crate::account::AccountStore;

/// Resolves the `session_token` cookie to a user.
///
/// Unless CSRF checks are disabled, the request must also carry the
/// session's CSRF token in the `X-CSRF-TOKEN` header.
pub struct SessionAuthenticator {
    accounts: Arc<dyn AccountStore>,
    check_csrf: bool,
}

impl SessionAuthenticator {
    pub fn new(accounts: Arc<dyn AccountStore>, check_csrf: bool) -> Self {
        Self {
            accounts,
            check_csrf,
        }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let token = request
            .cookie(SESSION_COOKIE)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NotAuthenticated)?;

        let session = self
            .accounts
            .get_session(token)
            .map_err(|e| AuthError::ServiceUnavailable(e.to_string()))?
            .ok_or(AuthError::NotAuthenticated)?;

        if self.check_csrf {
            let provided = request
                .headers
                .get(CSRF_HEADER)
                .ok_or(AuthError::InvalidCsrfToken)?;
            if !constant_time_eq(provided.as_bytes(), session.csrf_token.as_bytes()) {
                return Err(AuthError::InvalidCsrfToken);
            }
        }

        Ok(Identity::new(session.username, self.method_name()))
    }

    fn method_name(&self) -> &'static str {
        "session"
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
