//! Device configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 4402
//! facilitator_url = "https://x402.org/facilitator/"
//!
//! [device]
//! name = "Coffee Machine"
//! logo = "https://example.com/logo.png"
//! options = ["small", "large"]
//!
//! [payment]
//! price = "10000"
//! pay_to = "$PAY_TO_ADDRESS"
//! network = "base-sepolia"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `config.toml`)
//! - `HOST` - Override the listen address
//! - `PORT` - Override the listen port
//! - Anything referenced by `$VAR` in the config file

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r402_ble::queue::DEFAULT_QUEUE_CAPACITY;
use r402_ble::reassembly::DEFAULT_MAX_PAYLOAD_BYTES;
use r402_ble::{Asset, DeviceProfile, PaymentTerms, UnknownNetworkError};
use r402_ble_http::FacilitatorClient;
use r402_ble_http::constants::DEFAULT_FACILITATOR_URL;
use serde::Deserialize;

use crate::error::DeviceError;

/// Top-level device configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Listen address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Listen port (default: `4402`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Verification queue depth (default: 4).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Largest accepted payment payload in bytes (default: 8192).
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Base URL of the remote facilitator.
    #[serde(default = "default_facilitator_url")]
    pub facilitator_url: String,

    /// Per-request facilitator timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub facilitator_timeout_secs: Option<u64>,

    /// What the device advertises about itself.
    #[serde(default)]
    pub device: DeviceSection,

    /// What the device charges.
    pub payment: PaymentSection,
}

/// The `[device]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    /// Device name.
    pub name: String,
    /// Logo URL or inline data.
    pub logo: String,
    /// Banner URL or inline data.
    pub banner: String,
    /// Product description.
    pub description: String,
    /// Options buyers may pick from.
    pub options: Vec<String>,
    /// Recurring frequency hint; 0 means unset.
    pub frequency: u32,
    /// Whether buyers may attach custom text.
    pub allow_custom_content: bool,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            name: "x402 device".to_owned(),
            logo: String::new(),
            banner: String::new(),
            description: String::new(),
            options: Vec::new(),
            frequency: 0,
            allow_custom_content: false,
        }
    }
}

/// The `[payment]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSection {
    /// Price in atomic token units.
    pub price: String,
    /// Recipient address.
    pub pay_to: String,
    /// V1 network name, e.g. `base-sepolia`.
    pub network: String,
    /// Resource URL being paid for.
    #[serde(default)]
    pub resource: String,
    /// Resource description; defaults to the device description.
    #[serde(default)]
    pub description: Option<String>,
    /// Resource MIME type.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Authorization validity window in seconds.
    #[serde(default)]
    pub max_timeout_seconds: Option<u64>,
    /// Settlement token; required for networks without a known USDC deployment.
    #[serde(default)]
    pub asset: Option<AssetSection>,
}

/// The `[payment.asset]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetSection {
    /// Token contract address.
    pub address: String,
    /// EIP-712 domain name.
    pub name: String,
    /// EIP-712 domain version.
    #[serde(default = "default_asset_version")]
    pub version: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    4402
}

const fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

const fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

fn default_facilitator_url() -> String {
    DEFAULT_FACILITATOR_URL.to_owned()
}

fn default_asset_version() -> String {
    "2".to_owned()
}

impl DeviceConfig {
    /// Loads configuration from `path`, expanding `$VAR` references from the
    /// process environment and applying `HOST` / `PORT` overrides.
    ///
    /// A missing file is read as empty and fails on the required `[payment]`
    /// table.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, DeviceError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| DeviceError::ConfigRead {
                path: path.display().to_string(),
                source,
            })?
        } else {
            String::new()
        };

        let mut config = Self::parse(&content, |name| std::env::var(name).ok())?;

        if let Some(host) = std::env::var("HOST").ok().and_then(|h| h.parse().ok()) {
            config.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }

        Ok(config)
    }

    /// Parses TOML after expanding variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::ConfigParse`] if the expanded text is not a
    /// valid configuration.
    pub fn parse<F>(content: &str, lookup: F) -> Result<Self, DeviceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_vars(content, lookup);
        Ok(toml::from_str(&expanded)?)
    }

    /// The socket address to listen on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Builds the payment terms.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownNetworkError`] if the network has no known USDC
    /// deployment and no `[payment.asset]` is configured.
    pub fn terms(&self) -> Result<PaymentTerms, UnknownNetworkError> {
        let payment = &self.payment;
        let terms = match &payment.asset {
            Some(asset) => PaymentTerms::with_asset(
                &payment.network,
                &payment.pay_to,
                &payment.price,
                Asset::new(&asset.address, &asset.name, &asset.version),
            ),
            None => PaymentTerms::new(&payment.network, &payment.pay_to, &payment.price)?,
        };
        let description = payment
            .description
            .as_deref()
            .unwrap_or(&self.device.description);
        let mut terms = terms
            .with_resource(&payment.resource)
            .with_description(description);
        if let Some(mime_type) = &payment.mime_type {
            terms = terms.with_mime_type(mime_type);
        }
        if let Some(seconds) = payment.max_timeout_seconds {
            terms = terms.with_max_timeout_seconds(seconds);
        }
        Ok(terms)
    }

    /// Builds the device profile around `terms`.
    #[must_use]
    pub fn profile(&self, terms: Arc<PaymentTerms>) -> DeviceProfile {
        let device = &self.device;
        DeviceProfile::new(&device.name, terms)
            .with_logo(&device.logo)
            .with_banner(&device.banner)
            .with_description(&device.description)
            .with_options(device.options.iter().cloned())
            .with_frequency(device.frequency)
            .with_custom_content(device.allow_custom_content)
    }

    /// Builds the HTTP facilitator client.
    ///
    /// `/supported` is only queried once at startup, so its cache is off.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Facilitator`] if `facilitator_url` is invalid.
    pub fn facilitator(&self) -> Result<FacilitatorClient, DeviceError> {
        let client = FacilitatorClient::try_from(self.facilitator_url.as_str())?
            .with_supported_cache_ttl(Duration::ZERO);
        Ok(match self.facilitator_timeout_secs {
            Some(secs) => client.with_timeout(Duration::from_secs(secs)),
            None => client,
        })
    }
}

/// Expands `$VAR` and `${VAR}` patterns through `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(at) = rest.find('$') {
        result.push_str(&rest[..at]);
        let after = &rest[at + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => result.push_str(&value),
            None => result.push_str(&rest[at..at + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    result.push_str(rest);
    result
}
