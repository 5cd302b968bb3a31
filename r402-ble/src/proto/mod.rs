//! Wire types exchanged with an x402 facilitator.
//!
//! The device speaks the V1 dialect: networks are named (`"base-sepolia"`),
//! requirements carry `maxAmountRequired`, and the signed payment payload is
//! forwarded to the facilitator exactly as the peer sent it.
//!
//! # Key Types
//!
//! - [`PaymentRequirements`] - Terms the payment must satisfy
//! - [`VerifyRequest`] / [`SettleRequest`] - Bodies for `POST /verify` and `POST /settle`
//! - [`VerifyResponse`] / [`SettleResponse`] - Facilitator verdicts
//! - [`SupportedResponse`] - Response from `GET /supported`
//! - [`PaymentSubmission`] - A reassembled payload parsed for forwarding
//!
//! # Wire Format
//!
//! All types serialize to JSON using camelCase field names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::terms::PaymentTerms;

mod submission;

pub use submission::{OrderSelection, PayloadError, PaymentSubmission};

/// Token metadata carried in [`PaymentRequirements::extra`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AssetExtra {
    /// EIP-712 domain name of the token.
    pub name: String,
    /// EIP-712 domain version of the token.
    pub version: String,
}

/// Payment requirements set by the device.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// The payment scheme (e.g. `"exact"`).
    pub scheme: String,
    /// The network name (e.g. `"base-sepolia"`).
    pub network: String,
    /// The amount required, in atomic token units.
    pub max_amount_required: String,
    /// The resource URL being paid for.
    pub resource: String,
    /// Human-readable description of the resource.
    pub description: String,
    /// MIME type of the resource.
    pub mime_type: String,
    /// The recipient address.
    pub pay_to: String,
    /// Maximum time in seconds for payment validity.
    pub max_timeout_seconds: u64,
    /// The token asset address.
    pub asset: String,
    /// Token metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<AssetExtra>,
}

/// Request to verify a payment before settlement.
///
/// The payment payload is kept as raw JSON so the facilitator sees the
/// peer's signed bytes unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    x402_version: u8,
    payment_payload: Box<RawValue>,
    payment_requirements: PaymentRequirements,
}

impl VerifyRequest {
    /// Builds a verify request for a parsed submission under the given terms.
    #[must_use]
    pub fn new(submission: &PaymentSubmission, terms: &PaymentTerms) -> Self {
        Self {
            x402_version: submission.x402_version(),
            payment_payload: submission.raw_payload().to_owned(),
            payment_requirements: terms.requirements(),
        }
    }

    /// The protocol version declared by the payload.
    #[must_use]
    pub const fn x402_version(&self) -> u8 {
        self.x402_version
    }

    /// The payment payload JSON, byte-for-byte as submitted.
    #[must_use]
    pub fn payment_payload(&self) -> &str {
        self.payment_payload.get()
    }

    /// The requirements the payment is checked against.
    #[must_use]
    pub const fn payment_requirements(&self) -> &PaymentRequirements {
        &self.payment_requirements
    }
}

/// Request to settle a verified payment on-chain.
///
/// Structurally identical to [`VerifyRequest`] on the wire, but a distinct
/// type so a settle can only be built from a request that was verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettleRequest(VerifyRequest);

impl SettleRequest {
    /// Returns the underlying request fields.
    #[must_use]
    pub const fn inner(&self) -> &VerifyRequest {
        &self.0
    }
}

impl From<VerifyRequest> for SettleRequest {
    fn from(request: VerifyRequest) -> Self {
        Self(request)
    }
}

/// Result returned by a facilitator after verifying a payment payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VerifyResponse {
    /// The payload matches the requirements and passes all checks.
    Valid {
        /// The address of the payer.
        payer: Option<String>,
    },
    /// The payload was well-formed but failed verification.
    Invalid {
        /// Machine-readable reason verification failed.
        reason: String,
        /// The payer address, if identifiable.
        payer: Option<String>,
    },
}

impl VerifyResponse {
    /// Constructs a successful verification response.
    #[must_use]
    pub const fn valid(payer: Option<String>) -> Self {
        Self::Valid { payer }
    }

    /// Constructs a failed verification response.
    #[must_use]
    pub const fn invalid(payer: Option<String>, reason: String) -> Self {
        Self::Invalid { reason, payer }
    }

    /// Returns `true` if the verification succeeded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponseWire {
    is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invalid_reason: Option<String>,
}

impl Serialize for VerifyResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Valid { payer } => VerifyResponseWire {
                is_valid: true,
                payer: payer.clone(),
                invalid_reason: None,
            },
            Self::Invalid { reason, payer } => VerifyResponseWire {
                is_valid: false,
                payer: payer.clone(),
                invalid_reason: Some(reason.clone()),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VerifyResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = VerifyResponseWire::deserialize(deserializer)?;
        if wire.is_valid {
            Ok(Self::Valid { payer: wire.payer })
        } else {
            Ok(Self::Invalid {
                reason: wire.invalid_reason.unwrap_or_else(|| "unspecified".to_owned()),
                payer: wire.payer,
            })
        }
    }
}

/// Response from a payment settlement request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettleResponse {
    /// Settlement succeeded.
    Success {
        /// The address that paid, if reported.
        payer: Option<String>,
        /// The on-chain transaction hash.
        transaction: String,
        /// The network where settlement occurred.
        network: String,
    },
    /// Settlement failed.
    Error {
        /// Machine-readable reason for failure.
        reason: String,
        /// The network where settlement was attempted.
        network: String,
    },
}

impl SettleResponse {
    /// Returns `true` if the settlement succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The settlement transaction, if the settlement succeeded with a
    /// non-empty identifier.
    #[must_use]
    pub fn transaction(&self) -> Option<&str> {
        match self {
            Self::Success { transaction, .. } if !transaction.is_empty() => {
                Some(transaction.as_str())
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettleResponseWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction: Option<String>,
    #[serde(default)]
    network: String,
}

impl Serialize for SettleResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Success {
                payer,
                transaction,
                network,
            } => SettleResponseWire {
                success: true,
                error_reason: None,
                payer: payer.clone(),
                transaction: Some(transaction.clone()),
                network: network.clone(),
            },
            Self::Error { reason, network } => SettleResponseWire {
                success: false,
                error_reason: Some(reason.clone()),
                payer: None,
                transaction: None,
                network: network.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SettleResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = SettleResponseWire::deserialize(deserializer)?;
        if wire.success {
            Ok(Self::Success {
                payer: wire.payer,
                transaction: wire.transaction.unwrap_or_default(),
                network: wire.network,
            })
        } else {
            let reason = wire
                .error_reason
                .ok_or_else(|| serde::de::Error::missing_field("errorReason"))?;
            Ok(Self::Error {
                reason,
                network: wire.network,
            })
        }
    }
}

/// Describes a payment method supported by a facilitator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedPaymentKind {
    /// The x402 protocol version (1 or 2).
    pub x402_version: u8,
    /// The payment scheme identifier (e.g. `"exact"`).
    pub scheme: String,
    /// The network identifier.
    pub network: String,
}

/// Response from a facilitator's `/supported` endpoint.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    /// List of supported payment kinds.
    #[serde(default)]
    pub kinds: Vec<SupportedPaymentKind>,
}

impl SupportedResponse {
    /// Returns `true` if the facilitator accepts `scheme` on `network` for
    /// the given protocol version.
    #[must_use]
    pub fn supports(&self, x402_version: u8, scheme: &str, network: &str) -> bool {
        self.kinds.iter().any(|k| {
            k.x402_version == x402_version && k.scheme == scheme && k.network == network
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_request_wire_format() {
        let terms = PaymentTerms::new("base-sepolia", "0xABC", "1000000").unwrap();
        let submission = PaymentSubmission::parse(br#"{"x402Version":1,"scheme":"exact"}"#).unwrap();
        let request = VerifyRequest::new(&submission, &terms);
        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(json["x402Version"], 1);
        assert_eq!(json["paymentPayload"]["scheme"], "exact");
        assert_eq!(json["paymentRequirements"]["payTo"], "0xABC");

        let settle = SettleRequest::from(request);
        let settle_json = serde_json::to_value(&settle).unwrap();
        assert_eq!(json, settle_json);
    }

    #[test]
    fn test_verify_response_invalid() {
        let response: VerifyResponse =
            serde_json::from_str(r#"{"isValid":false,"invalidReason":"insufficient_funds"}"#)
                .unwrap();
        assert_eq!(
            response,
            VerifyResponse::invalid(None, "insufficient_funds".to_owned())
        );
    }

    #[test]
    fn test_verify_response_valid_without_payer() {
        let response: VerifyResponse = serde_json::from_str(r#"{"isValid":true}"#).unwrap();
        assert!(response.is_valid());
    }

    #[test]
    fn test_settle_response_transaction() {
        let response: SettleResponse = serde_json::from_str(
            r#"{"success":true,"transaction":"0xdb07","network":"base-sepolia","payer":"0x1"}"#,
        )
        .unwrap();
        assert_eq!(response.transaction(), Some("0xdb07"));

        let empty: SettleResponse =
            serde_json::from_str(r#"{"success":true,"transaction":"","network":"base"}"#)
                .unwrap();
        assert!(empty.is_success());
        assert_eq!(empty.transaction(), None);
    }

    #[test]
    fn test_settle_response_error_requires_reason() {
        let err = serde_json::from_str::<SettleResponse>(r#"{"success":false,"network":"base"}"#);
        assert!(err.is_err());

        let failed: SettleResponse = serde_json::from_str(
            r#"{"success":false,"errorReason":"invalid_transaction_state","network":"base"}"#,
        )
        .unwrap();
        assert_eq!(failed.transaction(), None);
    }

    #[test]
    fn test_supported_response_lookup() {
        let supported: SupportedResponse = serde_json::from_str(
            r#"{"kinds":[{"x402Version":1,"scheme":"exact","network":"base-sepolia"}]}"#,
        )
        .unwrap();
        assert!(supported.supports(1, "exact", "base-sepolia"));
        assert!(!supported.supports(2, "exact", "base-sepolia"));
        assert!(!supported.supports(1, "exact", "base"));
    }
}
