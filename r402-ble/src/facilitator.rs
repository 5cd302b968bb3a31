//! The facilitator seam.
//!
//! A [`Facilitator`] performs the two network round trips of a payment:
//! `verify` checks the signed payload against the device's terms, `settle`
//! submits it on chain. The verification worker is generic over this trait
//! so tests can substitute an in-process double for the HTTP client.

use std::future::Future;
use std::sync::Arc;

use crate::proto::{SettleRequest, SettleResponse, VerifyRequest, VerifyResponse};

/// Asynchronous verify/settle backend.
///
/// Implementations are invoked from the single verification worker, one
/// job at a time. Returning `Err` means the facilitator could not be
/// reached or answered garbage; a reachable facilitator that rejects the
/// payment answers `Ok(VerifyResponse::Invalid { .. })` instead.
pub trait Facilitator: Send + Sync {
    /// The error type returned when the facilitator cannot be reached.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Verifies a payment payload against its requirements.
    fn verify(
        &self,
        request: &VerifyRequest,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send;

    /// Settles a previously verified payment.
    fn settle(
        &self,
        request: &SettleRequest,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send;
}

impl<T: Facilitator> Facilitator for Arc<T> {
    type Error = T::Error;

    fn verify(
        &self,
        request: &VerifyRequest,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send {
        self.as_ref().verify(request)
    }

    fn settle(
        &self,
        request: &SettleRequest,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send {
        self.as_ref().settle(request)
    }
}
