use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::warn;

use crate::broker::journal::Journal;
use crate::utils::error::MessagingError;

pub(crate) type SharedQueue = Arc<Mutex<QueueState>>;

/// Per-queue broker state: the FIFO backlog, the single consumer slot and
/// the journal handle for durable queues.
pub(crate) struct QueueState {
    pub(crate) name: String,
    pub(crate) durable: bool,
    pub(crate) backlog: VecDeque<Pending>,
    pub(crate) consumer: Option<ConsumerSlot>,
    pub(crate) next_seq: u64,
    pub(crate) journal: Option<Journal>,
}

/// A message waiting in the backlog, not yet handed to the consumer.
pub(crate) struct Pending {
    pub(crate) seq: u64,
    pub(crate) body: Vec<u8>,
    pub(crate) published_at: DateTime<Utc>,
}

/// The delivery stream registered on a queue, plus its flow-control counters.
/// `in_flight` never exceeds `prefetch` (0 means unlimited).
pub(crate) struct ConsumerSlot {
    pub(crate) tx: mpsc::UnboundedSender<Delivery>,
    pub(crate) auto_ack: bool,
    pub(crate) prefetch: u16,
    pub(crate) in_flight: u16,
}

/// Moves backlog messages into the consumer's stream while a prefetch slot
/// is free. Invoked after every publish, consume registration and settle.
pub(crate) fn drain_ready(shared: &SharedQueue) {
    let mut state = shared.lock().unwrap();
    loop {
        let (auto_ack, tx) = match state.consumer.as_ref() {
            Some(slot) if slot.prefetch == 0 || slot.in_flight < slot.prefetch => {
                (slot.auto_ack, slot.tx.clone())
            }
            _ => return,
        };
        let Some(pending) = state.backlog.pop_front() else {
            return;
        };
        let seq = pending.seq;
        let delivery = Delivery {
            shared: Arc::clone(shared),
            seq,
            body: pending.body,
            published_at: pending.published_at,
            settled: auto_ack,
        };
        if let Err(mut err) = tx.send(delivery) {
            // The stream side was dropped: requeue and clear the slot. The
            // delivery is neutralized first so its Drop does not retake the
            // lock held here.
            let delivery = &mut err.0;
            delivery.settled = true;
            requeue(
                &mut state,
                Pending {
                    seq: delivery.seq,
                    body: std::mem::take(&mut delivery.body),
                    published_at: delivery.published_at,
                },
            );
            state.consumer = None;
            return;
        }
        if auto_ack {
            if let Some(journal) = state.journal.clone() {
                if let Err(e) = journal.remove(&state.name, seq) {
                    warn!(queue = %state.name, error = %e, "failed to clear journal entry");
                }
            }
        } else if let Some(slot) = state.consumer.as_mut() {
            slot.in_flight += 1;
        }
    }
}

/// Puts a message back into the backlog at its sequence position, so
/// redeliveries keep FIFO order even when several unsettled deliveries are
/// dropped at once.
pub(crate) fn requeue(state: &mut QueueState, pending: Pending) {
    let pos = state
        .backlog
        .iter()
        .position(|p| p.seq > pending.seq)
        .unwrap_or(state.backlog.len());
    state.backlog.insert(pos, pending);
}

/// A single message handed to a consumer.
///
/// The delivery must be settled with [`Delivery::ack`] or [`Delivery::reject`]
/// to free its prefetch slot and clear its journal entry; deliveries from an
/// auto-ack consumer are settled at dispatch and both calls are no-ops.
/// Dropping an unsettled delivery (a consumer task unwinding, a stream torn
/// down mid-flight) requeues the message at its sequence position in the
/// backlog, so a leaked delivery cannot stall its queue's prefetch window.
pub struct Delivery {
    pub(crate) shared: SharedQueue,
    pub(crate) seq: u64,
    pub(crate) body: Vec<u8>,
    pub(crate) published_at: DateTime<Utc>,
    pub(crate) settled: bool,
}

impl Delivery {
    /// Raw message bytes as published.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Broker-side publish timestamp.
    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    /// Acknowledges the delivery.
    pub fn ack(mut self) -> Result<(), MessagingError> {
        self.settle()
    }

    /// Discards the delivery without requeueing it. The broker treats the
    /// message as settled; the caller is expected to have logged the reason.
    pub fn reject(mut self) -> Result<(), MessagingError> {
        self.settle()
    }

    fn settle(&mut self) -> Result<(), MessagingError> {
        if self.settled {
            return Ok(());
        }
        self.settled = true;
        let (name, journal) = {
            let mut state = self.shared.lock().unwrap();
            if let Some(slot) = state.consumer.as_mut() {
                slot.in_flight = slot.in_flight.saturating_sub(1);
            }
            (state.name.clone(), state.journal.clone())
        };
        if let Some(journal) = journal {
            journal.remove(&name, self.seq)?;
        }
        drain_ready(&self.shared);
        Ok(())
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;
        {
            let mut state = self.shared.lock().unwrap();
            if let Some(slot) = state.consumer.as_mut() {
                slot.in_flight = slot.in_flight.saturating_sub(1);
            }
            requeue(
                &mut state,
                Pending {
                    seq: self.seq,
                    body: std::mem::take(&mut self.body),
                    published_at: self.published_at,
                },
            );
            warn!(queue = %state.name, seq = self.seq, "unsettled delivery dropped, requeueing");
        }
        drain_ready(&self.shared);
    }
}

/// Receiving half of a queue subscription. Yields `None` once the channel or
/// connection owning the subscription closes.
#[derive(Debug)]
pub struct DeliveryStream {
    pub(crate) queue: String,
    pub(crate) rx: mpsc::UnboundedReceiver<Delivery>,
}

impl DeliveryStream {
    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}
