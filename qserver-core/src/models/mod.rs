//! Core data structures shared across the crate

mod connection;

pub use connection::{
    ConnectionConfig, ConnectionConfigError, DEFAULT_SSH_PORT, HostKeyChecking,
    is_valid_service_name,
};
