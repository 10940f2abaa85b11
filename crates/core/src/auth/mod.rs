mod session;
mod traits;
mod types;

pub use session::*;
pub use traits::*;
pub use types::*;

use std::sync::Arc;

use crate::account::AccountStore;
use crate::config::AuthConfig;

/// Factory function to create the authenticator from config
pub fn create_authenticator(
    config: &AuthConfig,
    accounts: Arc<dyn AccountStore>,
) -> Box<dyn Authenticator> {
    Box::new(SessionAuthenticator::new(
        accounts,
        !config.disable_csrf_checks,
    ))
}
