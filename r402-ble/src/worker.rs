//! The verification worker.
//!
//! A single task drains the [`WorkQueue`] one job at a time, calls the
//! facilitator's `verify` and (on success) `settle`, and notifies the
//! originating connection with the outcome. Facilitator I/O happens only
//! here, never on the transport callback context.
//!
//! [`Pipeline`] owns the queue, the worker task and its shutdown token. It
//! is created once at startup; every connection gets a clone of
//! [`Pipeline::queue`].

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::facilitator::Facilitator;
use crate::job::JobDescriptor;
use crate::proto::{PaymentSubmission, SettleRequest, VerifyRequest, VerifyResponse};
use crate::queue::{JobReceiver, WorkQueue, work_queue};
use crate::reply::Reply;

const FAILED: Reply = Reply::Complete {
    verified: false,
    transaction: None,
};

/// Consumes jobs and runs verify/settle against a [`Facilitator`].
#[derive(Debug)]
pub struct VerificationWorker<F> {
    facilitator: F,
    jobs: JobReceiver,
}

impl<F: Facilitator> VerificationWorker<F> {
    /// Creates a worker draining `jobs`.
    #[must_use]
    pub const fn new(facilitator: F, jobs: JobReceiver) -> Self {
        Self { facilitator, jobs }
    }

    /// Processes jobs until every producer is gone or `shutdown` fires.
    ///
    /// On shutdown the queue is closed to new jobs and whatever was already
    /// accepted is still processed and answered before returning.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let job = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                job = self.jobs.dequeue() => job,
            };
            let Some(job) = job else {
                #[cfg(feature = "telemetry")]
                tracing::debug!("All producers gone, verification worker exiting");
                return;
            };
            self.process(job).await;
        }

        self.jobs.close();
        while let Some(job) = self.jobs.dequeue().await {
            self.process(job).await;
        }
        #[cfg(feature = "telemetry")]
        tracing::info!("Verification worker drained and stopped");
    }

    /// Runs one job to completion and replies to its peer.
    pub async fn process(&self, job: JobDescriptor) {
        let reply = self.verify_and_settle(&job).await;
        #[cfg(feature = "telemetry")]
        tracing::info!(reply = %reply, "Payment processed");
        job.reply(&reply);
    }

    #[allow(unused_variables)] // errors are needed for tracing only
    async fn verify_and_settle(&self, job: &JobDescriptor) -> Reply {
        let submission = match PaymentSubmission::parse(job.payload()) {
            Ok(submission) => submission,
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %err, "Rejecting unparseable payment payload");
                return FAILED;
            }
        };

        #[cfg(feature = "telemetry")]
        if let Some(selection) = submission.selection() {
            tracing::info!(
                custom_text = ?selection.custom_text,
                options = ?selection.options,
                "Order selection received"
            );
        }

        let request = VerifyRequest::new(&submission, job.terms());
        match self.facilitator.verify(&request).await {
            Ok(VerifyResponse::Valid { payer }) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(payer = ?payer, "Payment verified");
            }
            Ok(VerifyResponse::Invalid { reason, payer }) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(reason = %reason, payer = ?payer, "Payment rejected by facilitator");
                return FAILED;
            }
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %err, "Verification request failed");
                return FAILED;
            }
        }

        // A verified payment is reported as such even if settlement fails.
        let transaction = match self.facilitator.settle(&SettleRequest::from(request)).await {
            Ok(response) => {
                #[cfg(feature = "telemetry")]
                if !response.is_success() {
                    tracing::warn!(response = ?response, "Settlement failed after verification");
                }
                response.transaction().map(str::to_owned)
            }
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %err, "Settlement request failed");
                None
            }
        };

        Reply::Complete {
            verified: true,
            transaction,
        }
    }
}

/// The queue plus its single worker, created once per device.
#[allow(missing_debug_implementations)] // TaskTracker doesn't impl Debug
pub struct Pipeline {
    queue: WorkQueue,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl Pipeline {
    /// Creates a queue of `capacity` jobs and spawns the worker on the
    /// current tokio runtime.
    #[must_use]
    pub fn start<F>(facilitator: F, capacity: usize) -> Self
    where
        F: Facilitator + 'static,
    {
        let (queue, jobs) = work_queue(capacity);
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.spawn(VerificationWorker::new(facilitator, jobs).run(shutdown.clone()));
        tracker.close();

        #[cfg(feature = "telemetry")]
        tracing::info!(capacity = capacity.max(1), "Verification pipeline started");

        Self {
            queue,
            tracker,
            shutdown,
        }
    }

    /// A producer handle for a new connection.
    #[must_use]
    pub fn queue(&self) -> WorkQueue {
        self.queue.clone()
    }

    /// Stops accepting jobs, finishes the ones already queued and waits for
    /// the worker to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::job::tests::{RecordingTarget, terms};
    use crate::proto::SettleResponse;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("facilitator unreachable")]
    pub(crate) struct Unreachable;

    /// Scripted facilitator that records every request it sees.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedFacilitator {
        verify_results: Mutex<VecDeque<Result<VerifyResponse, Unreachable>>>,
        settle_results: Mutex<VecDeque<Result<SettleResponse, Unreachable>>>,
        pub(crate) verified: Mutex<Vec<VerifyRequest>>,
        pub(crate) settled: Mutex<Vec<SettleRequest>>,
        pub(crate) delay: Option<Duration>,
    }

    impl ScriptedFacilitator {
        pub(crate) fn verify_then(self, result: Result<VerifyResponse, Unreachable>) -> Self {
            self.verify_results.lock().unwrap().push_back(result);
            self
        }

        pub(crate) fn settle_then(self, result: Result<SettleResponse, Unreachable>) -> Self {
            self.settle_results.lock().unwrap().push_back(result);
            self
        }

        pub(crate) fn verify_count(&self) -> usize {
            self.verified.lock().unwrap().len()
        }

        pub(crate) fn settle_count(&self) -> usize {
            self.settled.lock().unwrap().len()
        }
    }

    impl Facilitator for ScriptedFacilitator {
        type Error = Unreachable;

        async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Unreachable> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.verified.lock().unwrap().push(request.clone());
            self.verify_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(VerifyResponse::valid(None)))
        }

        async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, Unreachable> {
            self.settled.lock().unwrap().push(request.clone());
            self.settle_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(settled("0xfeed")))
        }
    }

    pub(crate) fn settled(tx: &str) -> SettleResponse {
        SettleResponse::Success {
            payer: Some("0xPayer".into()),
            transaction: tx.into(),
            network: "base-sepolia".into(),
        }
    }

    async fn process_one(
        facilitator: ScriptedFacilitator,
        payload: &[u8],
    ) -> (Arc<ScriptedFacilitator>, Vec<String>) {
        let facilitator = Arc::new(facilitator);
        let target = Arc::new(RecordingTarget::default());
        let (_queue, jobs) = work_queue(1);
        let worker = VerificationWorker::new(Arc::clone(&facilitator), jobs);
        let job = JobDescriptor::try_new(payload, terms(), target.clone()).unwrap();
        worker.process(job).await;
        (facilitator, target.messages())
    }

    #[tokio::test]
    async fn test_verified_and_settled() {
        let (facilitator, replies) =
            process_one(ScriptedFacilitator::default(), br#"{"x402Version":1}"#).await;
        assert_eq!(replies, vec!["PAYMENT:COMPLETE VERIFIED:true TX:0xfeed"]);
        assert_eq!(facilitator.verify_count(), 1);
        assert_eq!(facilitator.settle_count(), 1);
        let settled = facilitator.settled.lock().unwrap();
        assert_eq!(settled[0].inner().payment_payload(), r#"{"x402Version":1}"#);
    }

    #[tokio::test]
    async fn test_invalid_never_settles() {
        let facilitator = ScriptedFacilitator::default()
            .verify_then(Ok(VerifyResponse::invalid(None, "insufficient_funds".into())));
        let (facilitator, replies) = process_one(facilitator, br#"{"x402Version":1}"#).await;
        assert_eq!(replies, vec!["PAYMENT:COMPLETE VERIFIED:false"]);
        assert_eq!(facilitator.settle_count(), 0);
    }

    #[tokio::test]
    async fn test_verify_error_is_failure() {
        let facilitator = ScriptedFacilitator::default().verify_then(Err(Unreachable));
        let (facilitator, replies) = process_one(facilitator, br#"{"x402Version":1}"#).await;
        assert_eq!(replies, vec!["PAYMENT:COMPLETE VERIFIED:false"]);
        assert_eq!(facilitator.settle_count(), 0);
    }

    #[tokio::test]
    async fn test_settle_failure_still_verified_without_tx() {
        let facilitator = ScriptedFacilitator::default().settle_then(Err(Unreachable));
        let (_, replies) = process_one(facilitator, br#"{"x402Version":1}"#).await;
        assert_eq!(replies, vec!["PAYMENT:COMPLETE VERIFIED:true"]);

        let facilitator = ScriptedFacilitator::default().settle_then(Ok(SettleResponse::Error {
            reason: "reverted".into(),
            network: "base-sepolia".into(),
        }));
        let (_, replies) = process_one(facilitator, br#"{"x402Version":1}"#).await;
        assert_eq!(replies, vec!["PAYMENT:COMPLETE VERIFIED:true"]);

        let facilitator = ScriptedFacilitator::default().settle_then(Ok(settled("")));
        let (_, replies) = process_one(facilitator, br#"{"x402Version":1}"#).await;
        assert_eq!(replies, vec!["PAYMENT:COMPLETE VERIFIED:true"]);
    }

    #[tokio::test]
    async fn test_unparseable_payload_skips_facilitator() {
        let (facilitator, replies) =
            process_one(ScriptedFacilitator::default(), b"not a payment").await;
        assert_eq!(replies, vec!["PAYMENT:COMPLETE VERIFIED:false"]);
        assert_eq!(facilitator.verify_count(), 0);
    }

    #[tokio::test]
    async fn test_selection_suffix_verifies_json_only() {
        let (facilitator, _) = process_one(
            ScriptedFacilitator::default(),
            br#"{"x402Version":1,"payload":{}}--extra hot--[large,oat]"#,
        )
        .await;
        let verified = facilitator.verified.lock().unwrap();
        assert_eq!(
            verified[0].payment_payload(),
            r#"{"x402Version":1,"payload":{}}"#
        );
    }

    #[tokio::test]
    async fn test_pipeline_fifo_and_drain_on_shutdown() {
        let facilitator = Arc::new(ScriptedFacilitator {
            delay: Some(Duration::from_millis(10)),
            ..ScriptedFacilitator::default()
        });
        let pipeline = Pipeline::start(Arc::clone(&facilitator), 4);
        let queue = pipeline.queue();
        let target = Arc::new(RecordingTarget::default());
        for n in 1..=3 {
            let payload = format!(r#"{{"x402Version":1,"n":{n}}}"#);
            let job = JobDescriptor::try_new(payload.as_bytes(), terms(), target.clone()).unwrap();
            queue.enqueue(job).unwrap();
        }

        pipeline.shutdown().await;

        assert_eq!(target.messages().len(), 3);
        let order: Vec<String> = facilitator
            .verified
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.payment_payload().to_owned())
            .collect();
        assert_eq!(
            order,
            vec![
                r#"{"x402Version":1,"n":1}"#,
                r#"{"x402Version":1,"n":2}"#,
                r#"{"x402Version":1,"n":3}"#,
            ]
        );
        let job = JobDescriptor::try_new(b"{}", terms(), target).unwrap();
        assert_eq!(
            queue.enqueue(job),
            Err(crate::error::EnqueueError::WorkerStopped)
        );
    }
}
