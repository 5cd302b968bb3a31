//! Payment terms for the advertised resource.
//!
//! [`PaymentTerms`] is captured once at startup and shared read-only between
//! the command router (price quotes) and every [`JobDescriptor`]
//! (verify/settle requests). Its wire form is produced by
//! [`PaymentTerms::requirements`].
//!
//! [`JobDescriptor`]: crate::job::JobDescriptor

use crate::error::UnknownNetworkError;
use crate::networks::{DEFAULT_USDC_VERSION, UsdcDeployment, usdc_by_name};
use crate::proto::{AssetExtra, PaymentRequirements};
use crate::terms::defaults::{DEFAULT_MAX_TIMEOUT_SECONDS, DEFAULT_MIME_TYPE, EXACT_SCHEME};

/// Defaults applied when terms are built from a network name alone.
pub mod defaults {
    /// The only scheme a notification-transport device can settle.
    pub const EXACT_SCHEME: &str = "exact";

    /// MIME type advertised for the paid resource.
    pub const DEFAULT_MIME_TYPE: &str = "application/json";

    /// Maximum time in seconds a signed authorization stays valid.
    pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300;
}

/// The token a payment is denominated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Token contract address.
    pub address: String,
    /// EIP-712 domain name of the token.
    pub name: String,
    /// EIP-712 domain version of the token.
    pub version: String,
}

impl Asset {
    /// Creates an asset descriptor.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

impl From<&UsdcDeployment> for Asset {
    fn from(usdc: &UsdcDeployment) -> Self {
        Self::new(usdc.address, usdc.name, DEFAULT_USDC_VERSION)
    }
}

/// Immutable payment terms for one advertised resource.
///
/// # Example
///
/// ```rust
/// use r402_ble::PaymentTerms;
///
/// let terms = PaymentTerms::new("base-sepolia", "0xABC", "1000000")
///     .unwrap()
///     .with_description("Coffee");
/// assert_eq!(terms.requirements().max_amount_required, "1000000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTerms {
    scheme: String,
    network: String,
    pay_to: String,
    amount: String,
    asset: Asset,
    resource: String,
    description: String,
    mime_type: String,
    max_timeout_seconds: u64,
}

impl PaymentTerms {
    /// Creates terms on a known network, settling in its USDC deployment.
    ///
    /// `amount` is in the token's atomic units (e.g. `"1000000"` is 1 USDC).
    ///
    /// # Errors
    ///
    /// Returns [`UnknownNetworkError`] if `network` is not in
    /// [`KNOWN_NETWORKS`](crate::networks::KNOWN_NETWORKS). Use
    /// [`PaymentTerms::with_asset`] for other networks.
    pub fn new(
        network: impl Into<String>,
        pay_to: impl Into<String>,
        amount: impl Into<String>,
    ) -> Result<Self, UnknownNetworkError> {
        let network = network.into();
        let asset = Asset::from(usdc_by_name(&network)?);
        Ok(Self::with_asset(network, pay_to, amount, asset))
    }

    /// Creates terms settling in an explicitly given asset.
    #[must_use]
    pub fn with_asset(
        network: impl Into<String>,
        pay_to: impl Into<String>,
        amount: impl Into<String>,
        asset: Asset,
    ) -> Self {
        Self {
            scheme: EXACT_SCHEME.to_owned(),
            network: network.into(),
            pay_to: pay_to.into(),
            amount: amount.into(),
            asset,
            resource: String::new(),
            description: String::new(),
            mime_type: DEFAULT_MIME_TYPE.to_owned(),
            max_timeout_seconds: DEFAULT_MAX_TIMEOUT_SECONDS,
        }
    }

    /// Sets the resource URL being paid for.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Sets the human-readable description of the resource.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the MIME type of the resource.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Sets how long a signed authorization stays valid.
    #[must_use]
    pub const fn with_max_timeout_seconds(mut self, seconds: u64) -> Self {
        self.max_timeout_seconds = seconds;
        self
    }

    /// The payment scheme (always `"exact"`).
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The V1 network name.
    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    /// The recipient address.
    #[must_use]
    pub fn pay_to(&self) -> &str {
        &self.pay_to
    }

    /// The price in atomic token units.
    #[must_use]
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// The settlement asset.
    #[must_use]
    pub const fn asset(&self) -> &Asset {
        &self.asset
    }

    /// The resource URL.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The resource description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Authorization validity window in seconds.
    #[must_use]
    pub const fn max_timeout_seconds(&self) -> u64 {
        self.max_timeout_seconds
    }

    /// Builds the facilitator-facing requirements for these terms.
    #[must_use]
    pub fn requirements(&self) -> PaymentRequirements {
        PaymentRequirements {
            scheme: self.scheme.clone(),
            network: self.network.clone(),
            max_amount_required: self.amount.clone(),
            resource: self.resource.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
            pay_to: self.pay_to.clone(),
            max_timeout_seconds: self.max_timeout_seconds,
            asset: self.asset.address.clone(),
            extra: Some(AssetExtra {
                name: self.asset.name.clone(),
                version: self.asset.version.clone(),
            }),
        }
    }

    /// Serializes [`PaymentTerms::requirements`] to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.requirements())
    }
}
