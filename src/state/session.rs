//! Session manager: owns [`AuthState`] and runs the auth actions.
//!
//! ARCHITECTURE
//! ============
//! One manager is created by the application root and shared behind `Arc`.
//! State lives in a `watch` channel: readers take snapshots or subscribe,
//! and every mutation is a synchronous `send_modify` made after the awaited
//! remote call has resolved.
//!
//! TRADE-OFFS
//! ==========
//! Overlapping actions are not serialized; a logout issued while a login is
//! in flight can be overtaken by the login's completion. Persisted records
//! are a cache only, so storage failures are logged and never abort a
//! transition.
//!
//! `check_auth` sets the stored user before the profile endpoint confirms
//! it, so subscribers briefly see an authenticated state that may be
//! retracted.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::watch;

use super::auth::AuthState;
use crate::config::Routes;
use crate::navigation::Navigator;
use crate::net::api::{AuthApi, TrackingApi};
use crate::net::error::RemoteError;
use crate::net::types::{AuthResponse, Credentials, RegistrationData, User};
use crate::storage::{self, SessionStorage, USER_KEY};

/// Key of the persisted study-tracking session id.
pub const TRACKING_KEY: &str = "tracking_session";

/// Message shown when a successful auth response carries no user object.
pub const MALFORMED_RESPONSE_MESSAGE: &str = "No se recibieron datos del usuario";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Register,
}

impl AuthAction {
    /// Message used when a failure carries nothing displayable.
    #[must_use]
    pub fn default_error(self) -> &'static str {
        match self {
            Self::Login => "Error al iniciar sesión",
            Self::Register => "Error al registrarse",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The auth service rejected the call; `message` is what was stored as the
    /// state's error.
    #[error("{message}")]
    RemoteCallFailed {
        message: String,
        #[source]
        source: RemoteError,
    },

    #[error("auth response did not include a user object")]
    AuthResponseMalformed,
}

impl SessionError {
    /// Message stored in [`AuthState::error`] for this failure.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::RemoteCallFailed { message, .. } => message,
            Self::AuthResponseMalformed => MALFORMED_RESPONSE_MESSAGE,
        }
    }
}

/// Result of the startup session check.
#[derive(Clone, Debug, PartialEq)]
pub enum RestoreOutcome {
    Authenticated(User),
    Anonymous,
}

/// Clears `loading` when dropped, including when the owning future is dropped.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<AuthState>,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a watch::Sender<AuthState>) -> Self {
        state.send_modify(|s| s.loading = true);
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.loading = false);
    }
}

pub struct SessionManager {
    state: watch::Sender<AuthState>,
    auth: Arc<dyn AuthApi>,
    tracking: Option<Arc<dyn TrackingApi>>,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    routes: Routes,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthApi>,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
        routes: Routes,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self { state, auth, tracking: None, storage, navigator, routes }
    }

    /// Open and close study-tracking sessions alongside auth transitions.
    #[must_use]
    pub fn with_tracking(mut self, tracking: Arc<dyn TrackingApi>) -> Self {
        self.tracking = Some(tracking);
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Resolve the startup state against the auth service.
    ///
    /// A persisted user is shown optimistically, then replaced by the
    /// confirmed profile or cleared when the profile fetch fails.
    pub async fn check_auth(&self) -> RestoreOutcome {
        let outcome = self.restore().await;
        if matches!(outcome, RestoreOutcome::Authenticated(_)) {
            self.start_tracking().await;
        }
        outcome
    }

    /// Log in with `credentials` and navigate to the landing route.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RemoteCallFailed`] when the auth service rejects
    /// the call and [`SessionError::AuthResponseMalformed`] when its answer
    /// has no user object. The state's error holds the display message.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, SessionError> {
        let user = self.authenticate(AuthAction::Login, self.auth.login(credentials)).await?;
        self.start_tracking().await;
        Ok(user)
    }

    /// Register a new account, sign it in and navigate to the landing route.
    ///
    /// # Errors
    ///
    /// Same as [`Self::login`].
    pub async fn register(&self, data: &RegistrationData) -> Result<User, SessionError> {
        let user = self.authenticate(AuthAction::Register, self.auth.register(data)).await?;
        self.start_tracking().await;
        Ok(user)
    }

    /// End the session. Remote failures are logged; local state is always
    /// cleared and the logout route is always visited.
    pub async fn logout(&self) {
        let session_id = self.state.borrow().tracking_session_id.clone();
        if let (Some(tracking), Some(id)) = (&self.tracking, session_id.as_deref()) {
            match tracking.end_session(id).await {
                Ok(()) => tracing::info!(session_id = id, "study session ended"),
                Err(e) => tracing::warn!(session_id = id, error = %e, "study session end failed"),
            }
        }

        if let Err(e) = self.auth.logout().await {
            tracing::warn!(error = %e, "remote logout failed; clearing local session anyway");
        }

        self.state.send_modify(|s| {
            s.user = None;
            s.tracking_session_id = None;
        });
        self.forget(USER_KEY);
        self.forget(TRACKING_KEY);
        self.navigator.go_to(&self.routes.logout);
        tracing::info!("logged out");
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    async fn restore(&self) -> RestoreOutcome {
        let _loading = LoadingGuard::start(&self.state);

        if let Some(user) = self.load_persisted::<User>(USER_KEY) {
            tracing::debug!("showing persisted user until profile is confirmed");
            self.state.send_modify(|s| s.user = Some(user));
        }
        if self.tracking.is_some() {
            if let Some(id) = self.load_persisted::<String>(TRACKING_KEY) {
                self.state.send_modify(|s| s.tracking_session_id = Some(id));
            }
        }

        match self.auth.get_profile().await {
            Ok(user) => {
                self.state.send_modify(|s| s.user = Some(user.clone()));
                self.persist(USER_KEY, &user);
                tracing::info!(user = user.display_name().unwrap_or("?"), "session restored");
                RestoreOutcome::Authenticated(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "no active session");
                self.state.send_modify(|s| {
                    s.user = None;
                    s.tracking_session_id = None;
                });
                self.forget(USER_KEY);
                self.forget(TRACKING_KEY);
                RestoreOutcome::Anonymous
            }
        }
    }

    async fn authenticate<F>(&self, action: AuthAction, call: F) -> Result<User, SessionError>
    where
        F: Future<Output = Result<AuthResponse, RemoteError>>,
    {
        let _loading = LoadingGuard::start(&self.state);
        self.state.send_modify(|s| s.error = None);

        let response = match call.await {
            Ok(response) => response,
            Err(source) => {
                let message = source.user_message(action.default_error());
                tracing::warn!(action = action.label(), error = %source, %message, "auth request failed");
                self.state.send_modify(|s| s.error = Some(message.clone()));
                return Err(SessionError::RemoteCallFailed { message, source });
            }
        };

        let notice = response.message.clone();
        let Some(user) = response.into_user() else {
            tracing::warn!(action = action.label(), "auth response without user object");
            self.state.send_modify(|s| s.error = Some(MALFORMED_RESPONSE_MESSAGE.to_owned()));
            return Err(SessionError::AuthResponseMalformed);
        };

        self.state.send_modify(|s| s.user = Some(user.clone()));
        self.persist(USER_KEY, &user);
        tracing::info!(
            action = action.label(),
            user = user.display_name().unwrap_or("?"),
            notice = notice.as_deref().unwrap_or(""),
            "authenticated"
        );
        self.navigator.go_to(&self.routes.landing);
        Ok(user)
    }

    async fn start_tracking(&self) {
        let Some(tracking) = &self.tracking else {
            return;
        };
        if self.state.borrow().tracking_session_id.is_some() {
            return;
        }
        match tracking.start_session().await {
            Ok(session) => {
                tracing::info!(
                    session_id = %session.sesion_id,
                    started_at = session.timestamp.as_deref().unwrap_or("?"),
                    "study session started"
                );
                self.persist(TRACKING_KEY, &session.sesion_id);
                self.state.send_modify(|s| s.tracking_session_id = Some(session.sesion_id));
            }
            Err(e) => tracing::warn!(error = %e, "study session start failed"),
        }
    }

    fn load_persisted<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match storage::load_json(self.storage.as_ref(), key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable persisted record");
                self.forget(key);
                None
            }
        }
    }

    fn persist<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = storage::save_json(self.storage.as_ref(), key, value) {
            tracing::warn!(key, error = %e, "failed to persist session record");
        }
    }

    fn forget(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            tracing::warn!(key, error = %e, "failed to remove session record");
        }
    }
}
