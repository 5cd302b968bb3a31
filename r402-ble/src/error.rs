//! Error types for the reassembly and hand-off pipeline.
//!
//! None of these are fatal to the device: every one of them maps to an
//! explicit [`PaymentFailure`](crate::reply::PaymentFailure) reply so the
//! peer is never left waiting.

use crate::request::Marker;

/// Errors raised while reassembling a fragmented payment payload.
///
/// Every variant leaves the [`Reassembler`](crate::reassembly::Reassembler)
/// reset and idle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReassemblyError {
    /// A middle or end fragment arrived with no assembly in progress.
    #[error("out-of-sequence {marker:?} fragment without a preceding start")]
    UnexpectedChunk {
        /// The marker of the offending fragment.
        marker: Marker,
    },

    /// The assembled payload would exceed the configured limit.
    #[error("payment payload exceeds {limit} bytes")]
    PayloadTooLarge {
        /// The configured maximum payload size in bytes.
        limit: usize,
    },

    /// The assembly buffer could not grow.
    #[error("out of memory while buffering payment payload")]
    OutOfMemory,
}

/// Reasons a job could not be handed to the verification worker.
///
/// Enqueueing is atomic: on any of these the job has already been dropped
/// and the producer holds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    /// The bounded work queue is at capacity.
    #[error("verification queue is full")]
    QueueFull,

    /// The job's payload buffer could not be allocated.
    #[error("failed to allocate verification job")]
    AllocationFailure,

    /// The worker has shut down and no longer accepts jobs.
    #[error("verification worker has stopped")]
    WorkerStopped,
}

/// A payment network name that is not in the known network table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported network: {0}")]
pub struct UnknownNetworkError(pub String);
