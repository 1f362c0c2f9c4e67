//! Session configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_STATE_FILE: &str = ".matelog-session.json";
pub const DEFAULT_LANDING_ROUTE: &str = "/lecciones";
pub const DEFAULT_LOGOUT_ROUTE: &str = "/login";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Navigation targets used after auth transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    /// Where a successful login/register lands.
    pub landing: String,
    /// Where logout lands.
    pub logout: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self { landing: DEFAULT_LANDING_ROUTE.to_owned(), logout: DEFAULT_LOGOUT_ROUTE.to_owned() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_url: String,
    pub state_file: PathBuf,
    /// Open/close study-tracking sessions alongside auth transitions.
    pub tracking: bool,
    pub routes: Routes,
    pub timeouts: HttpTimeouts,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            tracking: true,
            routes: Routes::default(),
            timeouts: HttpTimeouts::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl SessionConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `MATELOG_API_URL`: default `http://localhost:8000`
    /// - `MATELOG_STATE_FILE`: default `.matelog-session.json`
    /// - `MATELOG_TRACKING`: `true` (default) or `false`
    /// - `MATELOG_LANDING_ROUTE`: default `/lecciones`
    /// - `MATELOG_LOGOUT_ROUTE`: default `/login`
    /// - `MATELOG_REQUEST_TIMEOUT_SECS`: default 30
    /// - `MATELOG_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error when a route does not start with `/`, a flag is not a
    /// boolean, or a timeout is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns an error when a route does not start with `/`, a flag is not a
    /// boolean, or a timeout is not a positive integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("MATELOG_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let state_file = lookup("MATELOG_STATE_FILE")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);
        let tracking = parse_flag("MATELOG_TRACKING", lookup("MATELOG_TRACKING"), true)?;
        let routes = Routes {
            landing: parse_route(
                "MATELOG_LANDING_ROUTE",
                lookup("MATELOG_LANDING_ROUTE"),
                DEFAULT_LANDING_ROUTE,
            )?,
            logout: parse_route("MATELOG_LOGOUT_ROUTE", lookup("MATELOG_LOGOUT_ROUTE"), DEFAULT_LOGOUT_ROUTE)?,
        };
        let timeouts = HttpTimeouts {
            request_secs: parse_secs(
                "MATELOG_REQUEST_TIMEOUT_SECS",
                lookup("MATELOG_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_secs(
                "MATELOG_CONNECT_TIMEOUT_SECS",
                lookup("MATELOG_CONNECT_TIMEOUT_SECS"),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
        };

        Ok(Self { api_url, state_file, tracking, routes, timeouts })
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_flag(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => parse_bool(v).ok_or_else(|| ConfigError::Invalid { var, reason: format!("{v:?} is not a boolean") }),
    }
}

fn parse_secs(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::Invalid { var, reason: format!("{raw:?} is not a positive number of seconds") }),
    }
}

fn parse_route(var: &'static str, raw: Option<String>, default: &str) -> Result<String, ConfigError> {
    let Some(raw) = raw.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) else {
        return Ok(default.to_owned());
    };
    if !raw.starts_with('/') {
        return Err(ConfigError::Invalid { var, reason: format!("route {raw:?} must start with '/'") });
    }
    Ok(raw)
}
