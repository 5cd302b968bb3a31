//! Device startup errors.

use r402_ble::UnknownNetworkError;
use r402_ble_http::FacilitatorClientError;

/// Errors that prevent the device from starting.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The configuration file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// Path of the configuration file.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or is missing required fields.
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The payment network is unknown and no asset was configured.
    #[error(transparent)]
    UnknownNetwork(#[from] UnknownNetworkError),

    /// The facilitator URL is invalid.
    #[error(transparent)]
    Facilitator(#[from] FacilitatorClientError),
}
