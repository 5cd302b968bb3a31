//! Per-connection glue between the transport and the pipeline.
//!
//! A [`Session`] lives on the transport's callback context for the lifetime
//! of one connection. Each inbound write is classified, fed to the
//! reassembler or the router, and answered immediately; a completed payment
//! is copied into a [`JobDescriptor`] and handed to the worker.

use std::sync::Arc;

use crate::job::{JobDescriptor, ReplyTarget};
use crate::profile::DeviceProfile;
use crate::queue::WorkQueue;
use crate::reassembly::{Assembly, Reassembler};
use crate::reply::{PaymentFailure, Reply};
use crate::request::{Fragment, Request};
use crate::router;

/// State for one connected peer.
pub struct Session {
    reassembler: Reassembler,
    profile: Arc<DeviceProfile>,
    queue: WorkQueue,
    reply_to: Arc<dyn ReplyTarget>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("reassembler", &self.reassembler)
            .field("device", &self.profile.name())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Opens a session for a newly connected peer.
    #[must_use]
    pub fn new(
        profile: Arc<DeviceProfile>,
        queue: WorkQueue,
        reply_to: Arc<dyn ReplyTarget>,
    ) -> Self {
        Self {
            reassembler: Reassembler::new(),
            profile,
            queue,
            reply_to,
        }
    }

    /// Caps assembled payloads at `max_payload` bytes.
    #[must_use]
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.reassembler = Reassembler::with_max_payload(max_payload);
        self
    }

    /// Handles one inbound write and returns the immediate reply, if any.
    ///
    /// Never blocks and never performs network I/O. Empty writes are
    /// ignored.
    pub fn on_write(&mut self, raw: &[u8]) -> Option<Reply> {
        if raw.is_empty() {
            return None;
        }
        let reply = match Request::classify(raw) {
            Request::Payment(fragment) => self.on_payment(fragment),
            Request::Command(command) => router::route(command, &self.profile),
        };
        Some(reply)
    }

    /// Handles one inbound write and sends the immediate reply to the peer.
    pub fn handle_write(&mut self, raw: &[u8]) {
        if let Some(reply) = self.on_write(raw) {
            self.reply_to.notify(reply.to_string().as_bytes());
        }
    }

    fn on_payment(&mut self, fragment: Fragment<'_>) -> Reply {
        let job = match self.reassembler.on_fragment(fragment) {
            Ok(Assembly::Incomplete) => return Reply::Ack,
            Ok(Assembly::Complete(payload)) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(len = payload.len(), "Payment payload assembled");
                JobDescriptor::try_new(
                    payload,
                    Arc::clone(self.profile.terms()),
                    Arc::clone(&self.reply_to),
                )
            }
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %err, "Payment reassembly failed");
                return PaymentFailure::from(&err).into();
            }
        };
        self.reassembler.reset();

        match job.and_then(|job| self.queue.enqueue(job)) {
            Ok(()) => Reply::Verifying,
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %err, "Payment not accepted for verification");
                PaymentFailure::from(&err).into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::{RecordingTarget, terms};
    use crate::queue::work_queue;
    use crate::worker::Pipeline;
    use crate::worker::tests::ScriptedFacilitator;

    fn profile() -> Arc<DeviceProfile> {
        Arc::new(DeviceProfile::new("Kiosk", terms()).with_logo("logo.png"))
    }

    #[tokio::test]
    async fn test_fragmented_payment_reaches_facilitator_verbatim() {
        let facilitator = Arc::new(ScriptedFacilitator::default());
        let pipeline = Pipeline::start(Arc::clone(&facilitator), 4);
        let target = Arc::new(RecordingTarget::default());
        let terms = Arc::new(
            crate::terms::PaymentTerms::new("base-sepolia", "0xABC", "1000000").unwrap(),
        );
        let profile = Arc::new(DeviceProfile::new("Kiosk", Arc::clone(&terms)));
        let mut session = Session::new(profile, pipeline.queue(), target.clone());

        session.handle_write(b"X-PAYMENT:START{\"x402");
        session.handle_write(b"X-PAYMENTVersion\":1}");
        session.handle_write(b"X-PAYMENT:END");
        drop(session);
        pipeline.shutdown().await;

        let verified = facilitator.verified.lock().unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].payment_payload(), r#"{"x402Version":1}"#);
        assert_eq!(verified[0].payment_requirements(), &terms.requirements());
        assert_eq!(
            target.messages(),
            vec![
                "PAYMENT:ACK",
                "PAYMENT:ACK",
                "PAYMENT:VERIFYING",
                "PAYMENT:COMPLETE VERIFIED:true TX:0xfeed",
            ]
        );
    }

    #[tokio::test]
    async fn test_commands_and_empty_writes() {
        let (queue, _jobs) = work_queue(1);
        let mut session = Session::new(profile(), queue, Arc::new(RecordingTarget::default()));
        assert_eq!(session.on_write(b""), None);
        assert_eq!(session.on_write(b"[logo]"), Some(Reply::Logo("logo.png".into())));
        assert!(matches!(session.on_write(b"hello"), Some(Reply::Quote { .. })));
    }

    #[tokio::test]
    async fn test_out_of_sequence_and_queue_full() {
        let (queue, _jobs) = work_queue(1);
        let mut session = Session::new(profile(), queue, Arc::new(RecordingTarget::default()));

        assert_eq!(
            session.on_write(b"X-PAYMENT:END{}"),
            Some(Reply::Failure(PaymentFailure::OutOfSequence))
        );

        assert_eq!(session.on_write(b"X-PAYMENT:START{}"), Some(Reply::Ack));
        assert_eq!(session.on_write(b"X-PAYMENT:END"), Some(Reply::Verifying));

        assert_eq!(session.on_write(b"X-PAYMENT:START{}"), Some(Reply::Ack));
        assert_eq!(
            session.on_write(b"X-PAYMENT:END"),
            Some(Reply::Failure(PaymentFailure::Busy))
        );
    }

    #[tokio::test]
    async fn test_oversized_payload_and_stopped_worker() {
        let (queue, jobs) = work_queue(1);
        let mut session = Session::new(profile(), queue, Arc::new(RecordingTarget::default()))
            .with_max_payload(8);

        assert_eq!(
            session.on_write(b"X-PAYMENT:START0123456789"),
            Some(Reply::Failure(PaymentFailure::PayloadTooLarge))
        );

        drop(jobs);
        assert_eq!(session.on_write(b"X-PAYMENT:START{}"), Some(Reply::Ack));
        assert_eq!(
            session.on_write(b"X-PAYMENT:END"),
            Some(Reply::Failure(PaymentFailure::Unavailable))
        );
    }
}
