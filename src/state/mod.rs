//! Client-side session state and the manager that mutates it.

pub mod auth;
pub mod session;
