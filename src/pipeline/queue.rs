use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors returned by [`WorkQueue::enqueue`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was closed; the link was not accepted and is handed back
    #[error("Work queue is closed, link not accepted: {0}")]
    Closed(String),
}

/// Bounded multi-producer, multi-consumer queue of links.
///
/// Backed by a tokio `mpsc` channel. Producers share one sender slot that
/// [`WorkQueue::close`] empties; consumers take turns on the receiver behind
/// an async mutex, so every link is handed to exactly one consumer.
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

struct Inner {
    sender: Mutex<Option<mpsc::Sender<String>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<String>>,
    closed: CancellationToken,
    capacity: usize,
    pending: AtomicUsize,
}

impl WorkQueue {
    /// Create a queue holding at most `capacity` pending links.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                sender: Mutex::new(Some(tx)),
                receiver: tokio::sync::Mutex::new(rx),
                closed: CancellationToken::new(),
                capacity,
                pending: AtomicUsize::new(0),
            }),
        }
    }

    /// Add a link, waiting while the buffer is full.
    ///
    /// Fails with [`QueueError::Closed`] once the queue is closed. Producers
    /// already waiting for space when the queue closes fail immediately
    /// rather than waiting for a slot that will never be consumed.
    pub async fn enqueue(&self, link: String) -> Result<(), QueueError> {
        let sender = {
            let guard = self.inner.sender.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        let Some(sender) = sender else {
            return Err(QueueError::Closed(link));
        };

        let permit = tokio::select! {
            biased;

            _ = self.inner.closed.cancelled() => return Err(QueueError::Closed(link)),

            permit = sender.reserve() => permit,
        };

        match permit {
            Ok(permit) if !self.inner.closed.is_cancelled() => {
                self.inner.pending.fetch_add(1, Ordering::Relaxed);
                permit.send(link);
                Ok(())
            }
            _ => Err(QueueError::Closed(link)),
        }
    }

    /// Take the next link, waiting until one is available.
    ///
    /// Returns `None` once the queue is closed and every buffered link has
    /// been handed out.
    pub async fn dequeue(&self) -> Option<String> {
        let mut receiver = self.inner.receiver.lock().await;
        let link = receiver.recv().await;
        if link.is_some() {
            self.inner.pending.fetch_sub(1, Ordering::Relaxed);
        }
        link
    }

    /// Take the next link unless the queue has been closed.
    ///
    /// Unlike [`WorkQueue::dequeue`], links still buffered at close time are
    /// not handed out; a consumer waiting here returns `None` as soon as the
    /// queue closes.
    pub async fn take_unless_closed(&self) -> Option<String> {
        if self.inner.closed.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;

            _ = self.inner.closed.cancelled() => None,

            link = self.dequeue() => link,
        }
    }

    /// Stop accepting links. Buffered links stay available to consumers.
    ///
    /// Calling `close` more than once has no further effect.
    pub fn close(&self) {
        self.inner.closed.cancel();
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if sender.is_some() {
            tracing::debug!("Work queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Links buffered and not yet handed to a consumer
    pub fn len(&self) -> usize {
        self.inner.pending.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
