//! Outbound reply tokens.
//!
//! Every reply is a short ASCII line whose prefix tells the peer what it is
//! answering. [`Reply`]'s [`Display`](fmt::Display) is the wire form.

use std::fmt;

use serde::Serialize;

use crate::error::{EnqueueError, ReassemblyError};

/// Why a payment could not be taken further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentFailure {
    /// A middle or end fragment arrived without a start.
    OutOfSequence,
    /// The assembled payload exceeded the configured limit.
    PayloadTooLarge,
    /// The verification queue was full.
    Busy,
    /// A buffer or job could not be allocated.
    NoMemory,
    /// The verification worker has stopped.
    Unavailable,
}

impl PaymentFailure {
    /// The wire code following `PAYMENT:ERROR `.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::OutOfSequence => "OUT_OF_SEQUENCE",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::Busy => "BUSY",
            Self::NoMemory => "NO_MEMORY",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

impl From<&ReassemblyError> for PaymentFailure {
    fn from(err: &ReassemblyError) -> Self {
        match err {
            ReassemblyError::UnexpectedChunk { .. } => Self::OutOfSequence,
            ReassemblyError::PayloadTooLarge { .. } => Self::PayloadTooLarge,
            ReassemblyError::OutOfMemory => Self::NoMemory,
        }
    }
}

impl From<&EnqueueError> for PaymentFailure {
    fn from(err: &EnqueueError) -> Self {
        match err {
            EnqueueError::QueueFull => Self::Busy,
            EnqueueError::AllocationFailure => Self::NoMemory,
            EnqueueError::WorkerStopped => Self::Unavailable,
        }
    }
}

/// A reply sent to the peer over the notify channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A payment fragment was buffered; send the next one.
    Ack,
    /// The payload was handed to the worker; the final result follows.
    Verifying,
    /// Final outcome of a payment.
    Complete {
        /// Whether the facilitator accepted the payment.
        verified: bool,
        /// The settlement transaction, when one was reported.
        transaction: Option<String>,
    },
    /// The payment was rejected before reaching the facilitator.
    Failure(PaymentFailure),
    /// Logo URL or data.
    Logo(String),
    /// Banner URL or data.
    Banner(String),
    /// Product description.
    Description(String),
    /// Display configuration.
    Config {
        /// Advertising frequency hint.
        frequency: u32,
        /// Whether buyers may attach free-form text.
        allow_custom_content: bool,
    },
    /// Selectable options.
    Options(Vec<String>),
    /// Price quote.
    Quote {
        /// Amount in atomic token units.
        price: String,
        /// Recipient address.
        pay_to: String,
        /// Network name.
        network: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigBody {
    frequency: u32,
    allow_custom_content: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteBody<'a> {
    price: &'a str,
    pay_to: &'a str,
    network: &'a str,
}

fn write_json(f: &mut fmt::Formatter<'_>, body: &impl Serialize) -> fmt::Result {
    let json = serde_json::to_string(body).map_err(|_| fmt::Error)?;
    f.write_str(&json)
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => f.write_str("PAYMENT:ACK"),
            Self::Verifying => f.write_str("PAYMENT:VERIFYING"),
            Self::Complete {
                verified,
                transaction,
            } => {
                write!(f, "PAYMENT:COMPLETE VERIFIED:{verified}")?;
                match transaction.as_deref() {
                    Some(tx) if !tx.is_empty() => write!(f, " TX:{tx}"),
                    _ => Ok(()),
                }
            }
            Self::Failure(failure) => write!(f, "PAYMENT:ERROR {}", failure.code()),
            Self::Logo(logo) => write!(f, "LOGO://{logo}"),
            Self::Banner(banner) => write!(f, "BANNER://{banner}"),
            Self::Description(desc) => write!(f, "DESC://{desc}"),
            Self::Config {
                frequency,
                allow_custom_content,
            } => {
                f.write_str("CONFIG://")?;
                write_json(
                    f,
                    &ConfigBody {
                        frequency: *frequency,
                        allow_custom_content: *allow_custom_content,
                    },
                )
            }
            Self::Options(options) => write!(f, "OPTIONS://{}", options.join(",")),
            Self::Quote {
                price,
                pay_to,
                network,
            } => {
                f.write_str("402://")?;
                write_json(
                    f,
                    &QuoteBody {
                        price,
                        pay_to,
                        network,
                    },
                )
            }
        }
    }
}

impl From<PaymentFailure> for Reply {
    fn from(failure: PaymentFailure) -> Self {
        Self::Failure(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Marker;

    #[test]
    fn test_payment_tokens() {
        assert_eq!(Reply::Ack.to_string(), "PAYMENT:ACK");
        assert_eq!(Reply::Verifying.to_string(), "PAYMENT:VERIFYING");
        assert_eq!(
            Reply::Complete {
                verified: true,
                transaction: Some("0xabc".into())
            }
            .to_string(),
            "PAYMENT:COMPLETE VERIFIED:true TX:0xabc"
        );
        assert_eq!(
            Reply::Complete {
                verified: true,
                transaction: Some(String::new())
            }
            .to_string(),
            "PAYMENT:COMPLETE VERIFIED:true"
        );
        assert_eq!(
            Reply::Complete {
                verified: false,
                transaction: None
            }
            .to_string(),
            "PAYMENT:COMPLETE VERIFIED:false"
        );
    }

    #[test]
    fn test_failure_codes() {
        let err = ReassemblyError::UnexpectedChunk {
            marker: Marker::End,
        };
        assert_eq!(
            Reply::from(PaymentFailure::from(&err)).to_string(),
            "PAYMENT:ERROR OUT_OF_SEQUENCE"
        );
        assert_eq!(
            Reply::from(PaymentFailure::from(&EnqueueError::QueueFull)).to_string(),
            "PAYMENT:ERROR BUSY"
        );
        assert_eq!(
            PaymentFailure::from(&EnqueueError::AllocationFailure),
            PaymentFailure::NoMemory
        );
        assert_eq!(
            PaymentFailure::from(&EnqueueError::WorkerStopped).code(),
            "UNAVAILABLE"
        );
    }

    #[test]
    fn test_json_replies_escape() {
        let quote = Reply::Quote {
            price: "1000".into(),
            pay_to: "0x\"quoted\"".into(),
            network: "base".into(),
        }
        .to_string();
        let body = quote.strip_prefix("402://").unwrap();
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["payTo"], "0x\"quoted\"");
        assert_eq!(value["price"], "1000");
        assert_eq!(value["network"], "base");

        assert_eq!(
            Reply::Config {
                frequency: 5,
                allow_custom_content: true
            }
            .to_string(),
            r#"CONFIG://{"frequency":5,"allowCustomContent":true}"#
        );
    }
}
