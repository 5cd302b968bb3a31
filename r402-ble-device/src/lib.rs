//! x402 payment device.
//!
//! Wires the [`r402_ble`] pipeline to a line-oriented TCP transport that
//! stands in for a BLE write/notify characteristic pair: each line a peer
//! writes is one fragment or command, and each reply is written back as a
//! line.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`error`] - Startup error types
//! - [`transport`] - TCP line transport and per-connection sessions
//! - [`util`] - Shutdown signal handling

pub mod config;
pub mod error;
pub mod transport;
pub mod util;

pub use config::DeviceConfig;
pub use error::DeviceError;
