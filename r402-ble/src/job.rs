//! The unit of work handed from a connection to the verification worker.

use std::fmt;
use std::sync::Arc;

use crate::error::EnqueueError;
use crate::reply::Reply;
use crate::terms::PaymentTerms;

/// Where a job's outcome is delivered.
///
/// For a BLE peripheral this is the notify characteristic of the
/// originating connection. Delivery is best effort: if the peer has
/// disconnected, `notify` silently does nothing.
pub trait ReplyTarget: Send + Sync {
    /// Sends one reply to the peer.
    fn notify(&self, bytes: &[u8]);
}

/// A self-contained verification job.
///
/// Owns an exact copy of the reassembled payload, so the producing
/// connection may reuse or reset its buffer immediately. Exactly one
/// party owns a job at a time: the connection until it is enqueued, the
/// queue until it is dequeued, then the worker until [`JobDescriptor::reply`]
/// consumes it.
pub struct JobDescriptor {
    payload: Box<[u8]>,
    terms: Arc<PaymentTerms>,
    reply_to: Arc<dyn ReplyTarget>,
}

impl fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("payload_len", &self.payload.len())
            .field("network", &self.terms.network())
            .finish_non_exhaustive()
    }
}

impl JobDescriptor {
    /// Copies `payload` into a new job.
    ///
    /// # Errors
    ///
    /// Returns [`EnqueueError::AllocationFailure`] if the payload copy
    /// cannot be allocated.
    pub fn try_new(
        payload: &[u8],
        terms: Arc<PaymentTerms>,
        reply_to: Arc<dyn ReplyTarget>,
    ) -> Result<Self, EnqueueError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(payload.len())
            .map_err(|_| EnqueueError::AllocationFailure)?;
        buf.extend_from_slice(payload);
        Ok(Self {
            payload: buf.into_boxed_slice(),
            terms,
            reply_to,
        })
    }

    /// The reassembled payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The terms the payment is verified against.
    #[must_use]
    pub fn terms(&self) -> &PaymentTerms {
        &self.terms
    }

    /// Delivers the final reply and releases the job.
    pub fn reply(self, reply: &Reply) {
        self.reply_to.notify(reply.to_string().as_bytes());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every notification as a string.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingTarget {
        pub(crate) sent: Mutex<Vec<String>>,
    }

    impl RecordingTarget {
        pub(crate) fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl ReplyTarget for RecordingTarget {
        fn notify(&self, bytes: &[u8]) {
            self.sent
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(bytes).into_owned());
        }
    }

    pub(crate) fn terms() -> Arc<PaymentTerms> {
        Arc::new(
            PaymentTerms::new("base-sepolia", "0xPayee", "1000000")
                .unwrap()
                .with_resource("https://device.local/coffee")
                .with_description("Coffee"),
        )
    }

    #[test]
    fn test_job_owns_copy_of_payload() {
        let target = Arc::new(RecordingTarget::default());
        let mut source = b"{\"x402Version\":1}".to_vec();
        let job = JobDescriptor::try_new(&source, terms(), target).unwrap();
        source.clear();
        assert_eq!(job.payload(), b"{\"x402Version\":1}");
        assert_eq!(job.terms().network(), "base-sepolia");
    }

    #[test]
    fn test_reply_notifies_target() {
        let target = Arc::new(RecordingTarget::default());
        let job = JobDescriptor::try_new(b"{}", terms(), target.clone()).unwrap();
        job.reply(&Reply::Complete {
            verified: false,
            transaction: None,
        });
        assert_eq!(target.messages(), vec!["PAYMENT:COMPLETE VERIFIED:false"]);
    }
}
