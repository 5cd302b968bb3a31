#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! x402 payments over fragmented notification transports.
//!
//! A constrained device (typically a BLE peripheral) advertises a payable
//! resource, receives a signed x402 payment payload split into small
//! fragments, and hands the reassembled payload to a facilitator for
//! verification and settlement. The transport delivers writes on a
//! synchronous callback context that must never block, so the network round
//! trip runs on a single background worker fed through a bounded queue.
//!
//! # Flow
//!
//! ```text
//! write ─► Request::classify ─┬─► Reassembler ─► JobDescriptor ─► WorkQueue ─► VerificationWorker ─► notify
//!                             └─► router::route ─────────────────────────────────────────────────────► notify
//! ```
//!
//! # Modules
//!
//! - [`request`] - Classification of raw writes into payment fragments and commands
//! - [`reassembly`] - Per-connection fragment reassembly state machine
//! - [`job`] - Owned unit of work and the [`ReplyTarget`](job::ReplyTarget) seam
//! - [`queue`] - Bounded, non-blocking hand-off between callback and worker
//! - [`worker`] - The verification worker and the [`Pipeline`](worker::Pipeline) that owns it
//! - [`router`] - Informational command replies
//! - [`session`] - Per-connection glue driving all of the above
//! - [`terms`] / [`profile`] - Payment terms and device profile
//! - [`networks`] - Known networks and USDC deployments
//! - [`proto`] - Facilitator wire types and payload parsing
//! - [`facilitator`] - The facilitator trait
//! - [`reply`] - Outbound reply tokens
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod error;
pub mod facilitator;
pub mod job;
pub mod networks;
pub mod profile;
pub mod proto;
pub mod queue;
pub mod reassembly;
pub mod reply;
pub mod request;
pub mod router;
pub mod session;
pub mod terms;
pub mod worker;

pub use error::{EnqueueError, ReassemblyError, UnknownNetworkError};
pub use facilitator::Facilitator;
pub use job::{JobDescriptor, ReplyTarget};
pub use profile::DeviceProfile;
pub use queue::{JobReceiver, WorkQueue, work_queue};
pub use reassembly::{Assembly, Reassembler};
pub use reply::{PaymentFailure, Reply};
pub use request::{Command, Fragment, Marker, Request};
pub use session::Session;
pub use terms::{Asset, PaymentTerms};
pub use worker::{Pipeline, VerificationWorker};
