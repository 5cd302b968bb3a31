//! Parsing of reassembled payment payloads.
//!
//! Companion apps send the signed payment as JSON, optionally followed by
//! the buyer's order selection:
//!
//! ```text
//! {"x402Version":1,...}--<custom text>--[option a,option b]
//! ```
//!
//! The JSON may also arrive base64-encoded, the same way it travels in the
//! HTTP `X-PAYMENT` header.

use base64::prelude::*;
use serde::Deserialize;
use serde_json::value::RawValue;

const SELECTION_SEPARATOR: &[u8] = b"--";

/// Reasons an assembled payload cannot be forwarded to a facilitator.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Nothing but whitespace was assembled.
    #[error("payment payload is empty")]
    Empty,

    /// The payload is not valid JSON.
    #[error("invalid payment JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is neither JSON nor valid base64.
    #[error("invalid base64 payment payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload is JSON but not an object.
    #[error("payment payload is not a JSON object")]
    NotAnObject,

    /// The payload declares an `x402Version` this device cannot forward.
    #[error("unsupported x402Version: {0}")]
    UnsupportedVersion(String),

    /// Bytes follow the payment JSON that are not an order selection.
    #[error("unexpected trailing data after payment payload")]
    TrailingData,
}

/// What the buyer picked alongside the payment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSelection {
    /// Free-form text the buyer attached, if any.
    pub custom_text: Option<String>,
    /// Options the buyer selected from the device's option list.
    pub options: Vec<String>,
}

impl OrderSelection {
    fn parse(tail: &[u8]) -> Self {
        let text = String::from_utf8_lossy(tail);
        let (custom, options) = match text.rsplit_once("--") {
            Some((custom, list)) if is_option_list(list) => (custom, parse_option_list(list)),
            _ => (&*text, Vec::new()),
        };
        let custom = custom.trim();
        let custom_text = (!custom.is_empty() && custom != "\"\"").then(|| custom.to_owned());
        Self {
            custom_text,
            options,
        }
    }
}

fn is_option_list(list: &str) -> bool {
    let list = list.trim();
    list.starts_with('[') && list.ends_with(']')
}

fn parse_option_list(list: &str) -> Vec<String> {
    let list = list.trim();
    list[1..list.len() - 1]
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect()
}

#[derive(Deserialize)]
struct VersionField {
    #[serde(rename = "x402Version", default)]
    x402_version: Option<serde_json::Value>,
}

/// A reassembled payment payload, ready to forward.
#[derive(Debug, Clone)]
pub struct PaymentSubmission {
    payload: Box<RawValue>,
    x402_version: u8,
    selection: Option<OrderSelection>,
}

impl PaymentSubmission {
    /// Parses an assembled payload.
    ///
    /// The payment JSON is kept byte-for-byte. A missing `x402Version`
    /// defaults to 1; both numeric and string forms are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if the payload is empty, not a JSON object
    /// (directly or after base64 decoding), declares an unsupported version,
    /// or carries trailing bytes that are not an order selection.
    pub fn parse(bytes: &[u8]) -> Result<Self, PayloadError> {
        let bytes = bytes.trim_ascii();
        if bytes.is_empty() {
            return Err(PayloadError::Empty);
        }

        let (payload, rest) = if bytes.starts_with(b"{") {
            split_json(bytes)?
        } else {
            let (encoded, rest) = split_selection(bytes);
            let decoded = BASE64_STANDARD.decode(encoded.trim_ascii())?;
            (serde_json::from_slice::<Box<RawValue>>(&decoded)?, rest)
        };

        if !payload.get().starts_with('{') {
            return Err(PayloadError::NotAnObject);
        }
        let x402_version = detect_version(&payload)?;

        let rest = rest.trim_ascii();
        let selection = if rest.is_empty() {
            None
        } else if let Some(tail) = rest.strip_prefix(SELECTION_SEPARATOR) {
            Some(OrderSelection::parse(tail))
        } else {
            return Err(PayloadError::TrailingData);
        };

        Ok(Self {
            payload,
            x402_version,
            selection,
        })
    }

    /// The payment JSON exactly as submitted.
    #[must_use]
    pub fn raw_payload(&self) -> &RawValue {
        &self.payload
    }

    /// The declared protocol version.
    #[must_use]
    pub const fn x402_version(&self) -> u8 {
        self.x402_version
    }

    /// The buyer's order selection, if one was appended.
    #[must_use]
    pub const fn selection(&self) -> Option<&OrderSelection> {
        self.selection.as_ref()
    }
}

fn split_json(bytes: &[u8]) -> Result<(Box<RawValue>, &[u8]), PayloadError> {
    let mut stream = serde_json::Deserializer::from_slice(bytes).into_iter::<Box<RawValue>>();
    let payload = stream.next().ok_or(PayloadError::Empty)??;
    Ok((payload, &bytes[stream.byte_offset()..]))
}

fn split_selection(bytes: &[u8]) -> (&[u8], &[u8]) {
    bytes
        .windows(SELECTION_SEPARATOR.len())
        .position(|w| w == SELECTION_SEPARATOR)
        .map_or((bytes, &[][..]), |at| bytes.split_at(at))
}

fn detect_version(payload: &RawValue) -> Result<u8, PayloadError> {
    let field: VersionField = serde_json::from_str(payload.get())?;
    let version = match field.x402_version {
        None => return Ok(1),
        Some(serde_json::Value::Number(n)) => n.as_u64().map(|v| v.to_string()),
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    };
    match version.as_deref() {
        Some("1") => Ok(1),
        Some("2") => Ok(2),
        other => Err(PayloadError::UnsupportedVersion(
            other.unwrap_or("non-integer").to_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kept_byte_exact() {
        let raw = br#"{"x402Version":1, "payload": {"signature":"0xdead"}}"#;
        let submission = PaymentSubmission::parse(raw).unwrap();
        assert_eq!(submission.raw_payload().get().as_bytes(), raw);
        assert_eq!(submission.x402_version(), 1);
        assert!(submission.selection().is_none());
    }

    #[test]
    fn test_version_defaults_and_string_form() {
        assert_eq!(PaymentSubmission::parse(b"{}").unwrap().x402_version(), 1);
        let v2 = PaymentSubmission::parse(br#"{"x402Version":"2"}"#).unwrap();
        assert_eq!(v2.x402_version(), 2);
        let err = PaymentSubmission::parse(br#"{"x402Version":7}"#).unwrap_err();
        assert!(matches!(err, PayloadError::UnsupportedVersion(v) if v == "7"));
    }

    #[test]
    fn test_order_selection_suffix() {
        let submission =
            PaymentSubmission::parse(br#"{"x402Version":1}--Happy birthday--[large,oat milk]"#)
                .unwrap();
        assert_eq!(submission.raw_payload().get(), r#"{"x402Version":1}"#);
        let selection = submission.selection().unwrap();
        assert_eq!(selection.custom_text.as_deref(), Some("Happy birthday"));
        assert_eq!(selection.options, vec!["large", "oat milk"]);
    }

    #[test]
    fn test_empty_selection_markers() {
        let submission = PaymentSubmission::parse(br#"{"x402Version":1}--""--[]"#).unwrap();
        assert_eq!(submission.selection(), Some(&OrderSelection::default()));
    }

    #[test]
    fn test_base64_payload() {
        let encoded = BASE64_STANDARD.encode(br#"{"x402Version":1,"scheme":"exact"}"#);
        let input = format!("{encoded}--note--[a]");
        let submission = PaymentSubmission::parse(input.as_bytes()).unwrap();
        assert_eq!(
            submission.raw_payload().get(),
            r#"{"x402Version":1,"scheme":"exact"}"#
        );
        assert_eq!(submission.selection().unwrap().options, vec!["a"]);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            PaymentSubmission::parse(b"   "),
            Err(PayloadError::Empty)
        ));
        assert!(matches!(
            PaymentSubmission::parse(br#"{"x402Version":1}garbage"#),
            Err(PayloadError::TrailingData)
        ));
        assert!(matches!(
            PaymentSubmission::parse(br#"{"x402Version":1"#),
            Err(PayloadError::Json(_))
        ));
        let array = BASE64_STANDARD.encode(b"[1]");
        assert!(matches!(
            PaymentSubmission::parse(array.as_bytes()),
            Err(PayloadError::NotAnObject)
        ));
    }
}
