//! Bounded hand-off between transport callbacks and the verification worker.
//!
//! Producers run on the transport's callback context and must never block,
//! so [`WorkQueue::enqueue`] either accepts a job immediately or rejects it.
//! The queue is FIFO and holds at most `capacity` jobs.

use tokio::sync::mpsc;

use crate::error::EnqueueError;
use crate::job::JobDescriptor;

/// Default queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Creates a bounded work queue. A `capacity` of zero is treated as one.
#[must_use]
pub fn work_queue(capacity: usize) -> (WorkQueue, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (WorkQueue { tx }, JobReceiver { rx })
}

/// Producer half. Cheap to clone; one per connection.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: mpsc::Sender<JobDescriptor>,
}

impl WorkQueue {
    /// Hands `job` to the worker without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`EnqueueError::QueueFull`] when the queue is at capacity and
    /// [`EnqueueError::WorkerStopped`] when the worker has gone away. In both
    /// cases the job is dropped here and the caller must reply itself.
    pub fn enqueue(&self, job: JobDescriptor) -> Result<(), EnqueueError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::WorkerStopped,
        })
    }

    /// Returns `true` once the worker has stopped accepting jobs.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the single worker.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::Receiver<JobDescriptor>,
}

impl JobReceiver {
    /// Waits for the next job. Returns `None` once the queue is closed and
    /// drained, or every producer is gone.
    pub async fn dequeue(&mut self) -> Option<JobDescriptor> {
        self.rx.recv().await
    }

    /// Stops accepting new jobs. Jobs already queued can still be dequeued.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
