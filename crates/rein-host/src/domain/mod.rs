//! Domain layer for rein-host.

pub mod config;

pub use config::HostConfig;
