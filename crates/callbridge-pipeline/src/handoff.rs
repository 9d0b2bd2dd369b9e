//! Ordered, bounded hand-off queues between pipeline stages.
//!
//! Every queue carries [`Handoff::Item`] values followed by a single
//! [`Handoff::EndOfStream`]. The end marker is a distinct variant, so an
//! empty payload is always an ordinary item.

use thiserror::Error;
use tokio::sync::mpsc;

/// One value on a hand-off queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff<T> {
    Item(T),
    EndOfStream,
}

/// The consumer side of the queue is gone.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("hand-off receiver dropped")]
pub struct HandoffClosed;

/// Creates a bounded queue. `push` waits while `capacity` items are pending.
pub fn channel<T>(capacity: usize) -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        HandoffSender { tx },
        HandoffReceiver { rx, ended: false },
    )
}

/// Producer half. Owned by exactly one stage.
#[derive(Debug)]
pub struct HandoffSender<T> {
    tx: mpsc::Sender<Handoff<T>>,
}

impl<T> HandoffSender<T> {
    /// Appends an item, waiting for space if the queue is full.
    pub async fn push(&self, item: T) -> Result<(), HandoffClosed> {
        self.tx
            .send(Handoff::Item(item))
            .await
            .map_err(|_| HandoffClosed)
    }

    /// Appends the end marker. Consumes the sender, so it happens once.
    ///
    /// A consumer that already went away is not an error here: there is
    /// nobody left to notify.
    pub async fn finish(self) {
        let _ = self.tx.send(Handoff::EndOfStream).await;
    }
}

/// Consumer half. Owned by exactly one stage.
#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<Handoff<T>>,
    ended: bool,
}

impl<T> HandoffReceiver<T> {
    /// Takes the next value in FIFO order.
    ///
    /// A producer dropped without calling [`HandoffSender::finish`] (for
    /// example because its task panicked) reads as `EndOfStream`. After the
    /// first `EndOfStream` every later call returns `EndOfStream` at once.
    /// Cancel safe.
    pub async fn pop(&mut self) -> Handoff<T> {
        if self.ended {
            return Handoff::EndOfStream;
        }
        match self.rx.recv().await {
            Some(Handoff::Item(item)) => Handoff::Item(item),
            Some(Handoff::EndOfStream) | None => {
                self.ended = true;
                self.rx.close();
                Handoff::EndOfStream
            }
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Pops and discards items until the end marker. Returns how many were
    /// discarded.
    pub async fn drain(&mut self) -> u64 {
        let mut discarded = 0;
        while let Handoff::Item(_) = self.pop().await {
            discarded += 1;
        }
        discarded
    }
}
