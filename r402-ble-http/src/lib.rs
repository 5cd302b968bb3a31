//! HTTP transport to a remote x402 facilitator.
//!
//! Provides [`FacilitatorClient`], the production implementation of
//! [`r402_ble::Facilitator`] used by the verification worker.
//!
//! # Modules
//!
//! - [`constants`] - Default facilitator URL and endpoint paths
//! - [`client`] - The HTTP facilitator client and its error type
//!
//! # Feature Flags
//!
//! - `telemetry` - Adds tracing spans around facilitator requests

pub mod client;
pub mod constants;

pub use client::{FacilitatorClient, FacilitatorClientError, SupportedCache};
