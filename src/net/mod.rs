//! Network boundary: wire types, remote errors, and REST clients.

pub mod api;
pub mod error;
pub mod types;
