//! # matelog-session
//!
//! Client-side authentication state for the Matelog study tracker.
//!
//! [`state::session::SessionManager`] owns the current user and runs the
//! login/register/logout/startup-check actions against the auth and
//! study-tracking services in [`net::api`], persisting the user through
//! [`storage`] and routing through [`navigation`].

pub mod config;
pub mod navigation;
pub mod net;
pub mod state;
pub mod storage;
