use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::broker::journal::Journal;
use crate::broker::queue::{
    drain_ready, ConsumerSlot, Delivery, DeliveryStream, Pending, QueueState, SharedQueue,
};
use crate::messaging::config::{ConsumerOptions, DeliveryMode, ProducerOptions, QueueOptions};
use crate::utils::error::MessagingError;

/// The embedded queue broker.
///
/// A `Broker` is a cheap-to-clone handle over shared state; there is no
/// process-wide singleton. Callers attach through [`Broker::connect`] and the
/// single multiplexed [`Channel`], mirroring an AMQP session bring-up.
#[derive(Clone, Default)]
pub struct Broker {
    inner: Arc<Mutex<BrokerState>>,
}

#[derive(Default)]
struct BrokerState {
    queues: HashMap<String, SharedQueue>,
    journal: Option<Journal>,
    prefetch: u16,
    closed: bool,
}

/// Snapshot returned by queue declaration.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    pub name: String,
    pub durable: bool,
    pub message_count: usize,
}

impl Broker {
    /// A transient broker: messages live only in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A broker whose durable queues journal persistent publishes to sled
    /// at `path`, restoring unsettled backlogs on the next start.
    pub fn with_journal(path: &str) -> Result<Self, MessagingError> {
        let journal = Journal::open(path)?;
        let broker = Self::default();
        broker.inner.lock().unwrap().journal = Some(journal);
        Ok(broker)
    }

    /// Attaches to the broker. Fails once the broker has been closed.
    pub fn connect(&self) -> Result<Connection, MessagingError> {
        let state = self.inner.lock().unwrap();
        if state.closed {
            return Err(MessagingError::ConnectionClosed);
        }
        Ok(Connection {
            broker: self.clone(),
        })
    }

    fn queue(&self, name: &str) -> Result<SharedQueue, MessagingError> {
        let state = self.inner.lock().unwrap();
        if state.closed {
            return Err(MessagingError::ConnectionClosed);
        }
        state
            .queues
            .get(name)
            .cloned()
            .ok_or_else(|| MessagingError::UnknownQueue(name.to_string()))
    }

    /// Drops every consumer slot, ending all delivery streams.
    fn stop_consumers(&self) {
        let queues: Vec<SharedQueue> = {
            let state = self.inner.lock().unwrap();
            state.queues.values().cloned().collect()
        };
        for queue in queues {
            let mut state = queue.lock().unwrap();
            if state.consumer.take().is_some() {
                debug!(queue = %state.name, "consumer stream closed");
            }
        }
    }
}

/// Handle for the broker attachment. The catalog services hold exactly one
/// per process; closing it is the global shutdown signal for every
/// consumption loop.
#[derive(Clone)]
pub struct Connection {
    broker: Broker,
}

impl Connection {
    /// Opens the single multiplexed channel.
    pub fn channel(&self) -> Result<Channel, MessagingError> {
        let state = self.broker.inner.lock().unwrap();
        if state.closed {
            return Err(MessagingError::ConnectionClosed);
        }
        Ok(Channel {
            broker: self.broker.clone(),
        })
    }

    /// Closes the connection: ends every delivery stream and rejects further
    /// publishes. Idempotent, best-effort, never fails.
    pub fn close(&self) {
        self.broker.stop_consumers();
        let mut state = self.broker.inner.lock().unwrap();
        if !state.closed {
            state.closed = true;
            info!("broker connection closed");
        }
    }
}

/// The single channel multiplexed over the connection. Cloneable and safe
/// for concurrent use; queue access is serialized internally.
#[derive(Clone)]
pub struct Channel {
    broker: Broker,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").finish_non_exhaustive()
    }
}

impl Channel {
    /// Sets the prefetch limit applied to consumers registered after this
    /// call. 0 means unlimited.
    pub fn qos(&self, prefetch: u16) -> Result<(), MessagingError> {
        let mut state = self.broker.inner.lock().unwrap();
        if state.closed {
            return Err(MessagingError::ConnectionClosed);
        }
        state.prefetch = prefetch;
        Ok(())
    }

    /// Declares a queue. Idempotent: re-declaring an existing queue returns
    /// its current state and ignores differing options. Durable queues
    /// reload their journaled backlog on first declaration.
    pub fn declare_queue(
        &self,
        name: &str,
        options: &QueueOptions,
    ) -> Result<QueueHandle, MessagingError> {
        let mut state = self.broker.inner.lock().unwrap();
        if state.closed {
            return Err(MessagingError::ConnectionClosed);
        }
        if let Some(existing) = state.queues.get(name) {
            let queue = existing.lock().unwrap();
            return Ok(QueueHandle {
                name: queue.name.clone(),
                durable: queue.durable,
                message_count: queue.backlog.len(),
            });
        }

        let journal = if options.durable {
            state.journal.clone()
        } else {
            None
        };
        let mut backlog = VecDeque::new();
        let mut next_seq = 1;
        if let Some(journal) = &journal {
            for (seq, body) in journal.load(name)? {
                next_seq = next_seq.max(seq + 1);
                backlog.push_back(Pending {
                    seq,
                    body,
                    published_at: Utc::now(),
                });
            }
        }
        let handle = QueueHandle {
            name: name.to_string(),
            durable: options.durable,
            message_count: backlog.len(),
        };
        debug!(queue = name, durable = options.durable, restored = handle.message_count, "queue declared");
        state.queues.insert(
            name.to_string(),
            Arc::new(Mutex::new(QueueState {
                name: name.to_string(),
                durable: options.durable,
                backlog,
                consumer: None,
                next_seq,
                journal,
            })),
        );
        Ok(handle)
    }

    /// Appends a message to the queue. Persistent publishes to durable
    /// queues are journaled before the message becomes visible. FIFO order
    /// is preserved per queue.
    pub fn publish(
        &self,
        queue: &str,
        body: Vec<u8>,
        options: &ProducerOptions,
    ) -> Result<(), MessagingError> {
        let shared = self.broker.queue(queue)?;
        {
            let mut state = shared.lock().unwrap();
            let seq = state.next_seq;
            state.next_seq += 1;
            if state.durable && options.delivery_mode == DeliveryMode::Persistent {
                if let Some(journal) = state.journal.clone() {
                    journal.append(&state.name, seq, &body)?;
                }
            }
            state.backlog.push_back(Pending {
                seq,
                body,
                published_at: Utc::now(),
            });
        }
        drain_ready(&shared);
        Ok(())
    }

    /// Opens the delivery stream for a queue. A queue supports exactly one
    /// live stream; the stream ends when the channel or connection closes.
    pub fn consume(
        &self,
        queue: &str,
        options: &ConsumerOptions,
    ) -> Result<DeliveryStream, MessagingError> {
        let prefetch = {
            let state = self.broker.inner.lock().unwrap();
            if state.closed {
                return Err(MessagingError::ConnectionClosed);
            }
            state.prefetch
        };
        let shared = self.broker.queue(queue)?;
        let (tx, rx) = mpsc::unbounded_channel::<Delivery>();
        {
            let mut state = shared.lock().unwrap();
            if state.consumer.is_some() {
                return Err(MessagingError::ConsumerAlreadyRegistered(queue.to_string()));
            }
            state.consumer = Some(ConsumerSlot {
                tx,
                auto_ack: options.auto_ack,
                prefetch,
                in_flight: 0,
            });
        }
        drain_ready(&shared);
        Ok(DeliveryStream {
            queue: queue.to_string(),
            rx,
        })
    }

    /// Ends every delivery stream opened on this channel. Publishes remain
    /// possible until the connection itself closes. Idempotent.
    pub fn close(&self) {
        self.broker.stop_consumers();
    }
}
