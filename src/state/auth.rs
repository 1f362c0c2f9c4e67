//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Read by route guards and user-aware views; written only by
//! [`SessionManager`](super::session::SessionManager).

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::net::types::User;

/// Coarse lifecycle phase derived from [`AuthState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    Loading,
    Authenticated,
    Anonymous,
}

/// Authentication state tracking the current user and loading status.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
    /// Display message from the last failed login/register.
    pub error: Option<String>,
    /// Open study-tracking session, if one was started.
    pub tracking_session_id: Option<String>,
}

impl Default for AuthState {
    /// Startup state: loading until the initial session check resolves.
    fn default() -> Self {
        Self { user: None, loading: true, error: None, tracking_session_id: None }
    }
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        if self.loading {
            AuthPhase::Loading
        } else if self.is_authenticated() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        }
    }

    /// Guarded views should send the user to login once loading has settled
    /// without a user.
    #[must_use]
    pub fn needs_login_redirect(&self) -> bool {
        self.phase() == AuthPhase::Anonymous
    }
}
