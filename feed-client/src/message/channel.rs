//! Realtime order channel
//!
//! One background reader per channel decodes pushes from the transport and
//! queues them as [`Delivery`] values. The reader lives as long as the channel:
//! `join` and `leave` only move the subscription generation it stamps onto
//! each delivery, so switching tenants never strands a frame in a reader that
//! is being torn down.
//!
//! Handlers never run on the reader: the owner drains the queue with
//! [`RealtimeOrderChannel::run_once`] (or [`next_delivery`] plus
//! [`dispatch`]), so every handler runs to completion on the owner's task, one
//! delivery at a time, in arrival order.
//!
//! [`next_delivery`]: RealtimeOrderChannel::next_delivery
//! [`dispatch`]: RealtimeOrderChannel::dispatch

use shared::message::{
    ChannelFrame, ClientJoinedPayload, EVENT_CLIENT_JOINED, EVENT_ORDER_UPDATE,
};
use shared::order::{OrderEventType, OrderUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cache::ViewEpoch;
use crate::message::{MessageError, Transport};

/// Generation value meaning "no subscription"; the reader discards frames
const NOT_JOINED: u64 = 0;

/// One decoded `order-update`, stamped on arrival
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Subscription generation live when the frame arrived
    pub generation: u64,
    /// View epoch observed when the frame arrived
    pub epoch: u64,
    pub update: OrderUpdate,
}

pub type DeliveryHandler = Box<dyn FnMut(&Delivery) + Send>;

/// The channel's reader task and its queue
struct Reader {
    cancel: CancellationToken,
    rx: mpsc::UnboundedReceiver<Delivery>,
}

/// Tenant-scoped subscription to `order-update` pushes
pub struct RealtimeOrderChannel {
    transport: Arc<dyn Transport>,
    epoch: ViewEpoch,
    generation: u64,
    /// Generation the reader stamps; `NOT_JOINED` while left
    live_generation: Arc<AtomicU64>,
    tenant_id: Option<String>,
    reader: Option<Reader>,
    handlers: HashMap<OrderEventType, Vec<DeliveryHandler>>,
}

impl std::fmt::Debug for RealtimeOrderChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeOrderChannel")
            .field("transport", &self.transport)
            .field("generation", &self.generation)
            .field("tenant", &self.tenant())
            .finish_non_exhaustive()
    }
}

impl RealtimeOrderChannel {
    pub fn new(transport: Arc<dyn Transport>, epoch: ViewEpoch) -> Self {
        Self {
            transport,
            epoch,
            generation: 0,
            live_generation: Arc::new(AtomicU64::new(NOT_JOINED)),
            tenant_id: None,
            reader: None,
            handlers: HashMap::new(),
        }
    }

    /// Tenant currently joined, if any
    pub fn tenant(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Subscribe to `tenant_id`, ending any previous subscription first.
    ///
    /// Frames read from here on carry the new generation; anything still
    /// queued from the previous tenant is discarded by [`next_delivery`].
    ///
    /// [`next_delivery`]: RealtimeOrderChannel::next_delivery
    pub async fn join(&mut self, tenant_id: &str) -> Result<(), MessageError> {
        self.leave();

        self.generation += 1;
        self.live_generation.store(self.generation, Ordering::SeqCst);
        if let Err(e) = self.transport.send(&ChannelFrame::join(tenant_id)).await {
            self.live_generation.store(NOT_JOINED, Ordering::SeqCst);
            return Err(e);
        }

        self.ensure_reader();
        self.tenant_id = Some(tenant_id.to_string());
        tracing::info!(tenant_id = %tenant_id, generation = self.generation, "Joined order channel");
        Ok(())
    }

    /// Tear down the subscription. Queued and in-flight deliveries are discarded.
    pub fn leave(&mut self) {
        if let Some(tenant_id) = self.tenant_id.take() {
            self.generation += 1;
            self.live_generation.store(NOT_JOINED, Ordering::SeqCst);
            tracing::info!(tenant_id = %tenant_id, "Left order channel");
        }
    }

    /// Leave, stop the reader and close the underlying transport
    pub async fn close(&mut self) -> Result<(), MessageError> {
        self.leave();
        self.stop_reader();
        self.transport.close().await
    }

    /// Register a handler for one event type
    pub fn on<F>(&mut self, event_type: OrderEventType, handler: F)
    where
        F: FnMut(&Delivery) + Send + 'static,
    {
        self.handlers
            .entry(event_type)
            .or_default()
            .push(Box::new(handler));
    }

    /// Remove every handler for `event_type`; returns how many were removed
    pub fn off(&mut self, event_type: OrderEventType) -> usize {
        self.handlers
            .remove(&event_type)
            .map(|h| h.len())
            .unwrap_or(0)
    }

    /// Wait for the next delivery of the current subscription.
    ///
    /// `None` when not joined or once the reader has stopped.
    pub async fn next_delivery(&mut self) -> Option<Delivery> {
        self.tenant_id.as_ref()?;
        let current = self.generation;
        let reader = self.reader.as_mut()?;
        loop {
            let delivery = reader.rx.recv().await?;
            if delivery.generation == current {
                return Some(delivery);
            }
            tracing::debug!(
                generation = delivery.generation,
                current,
                "Discarding delivery from a previous subscription"
            );
        }
    }

    /// Run the handlers registered for this delivery's event type.
    ///
    /// Deliveries from an earlier subscription are ignored. Returns whether any
    /// handler ran.
    pub fn dispatch(&mut self, delivery: &Delivery) -> bool {
        if self.tenant_id.is_none() || delivery.generation != self.generation {
            tracing::debug!(
                generation = delivery.generation,
                current = self.generation,
                "Ignoring delivery from a closed subscription"
            );
            return false;
        }

        match self.handlers.get_mut(&delivery.update.event_type) {
            Some(handlers) if !handlers.is_empty() => {
                for handler in handlers.iter_mut() {
                    handler(delivery);
                }
                true
            }
            _ => {
                tracing::debug!(event_type = %delivery.update.event_type, "No handler for order event");
                false
            }
        }
    }

    /// Wait for one delivery and dispatch it. Returns false when the
    /// subscription has ended (left or transport closed).
    pub async fn run_once(&mut self) -> bool {
        match self.next_delivery().await {
            Some(delivery) => {
                self.dispatch(&delivery);
                true
            }
            None => false,
        }
    }

    fn ensure_reader(&mut self) {
        if self.reader.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(read_loop(
            Arc::clone(&self.transport),
            self.epoch.clone(),
            Arc::clone(&self.live_generation),
            cancel.clone(),
            tx,
        ));
        self.reader = Some(Reader { cancel, rx });
    }

    fn stop_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.cancel.cancel();
        }
    }
}

impl Drop for RealtimeOrderChannel {
    fn drop(&mut self) {
        self.leave();
        self.stop_reader();
    }
}

async fn read_loop(
    transport: Arc<dyn Transport>,
    epoch: ViewEpoch,
    live_generation: Arc<AtomicU64>,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<Delivery>,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = transport.recv() => frame,
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) if e.is_fatal() => {
                tracing::warn!(error = %e, "Order channel reader stopped");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                continue;
            }
        };

        match frame.event.as_str() {
            EVENT_ORDER_UPDATE => {
                let generation = live_generation.load(Ordering::SeqCst);
                if generation == NOT_JOINED {
                    tracing::debug!("Dropping order-update received while not joined");
                    continue;
                }
                match OrderUpdate::from_value(frame.data) {
                    Ok(update) => {
                        let delivery = Delivery {
                            generation,
                            epoch: epoch.current(),
                            update,
                        };
                        if tx.send(delivery).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Dropping malformed order-update"),
                }
            }
            EVENT_CLIENT_JOINED => match frame.parse_data::<ClientJoinedPayload>() {
                Ok(joined) => tracing::info!(room_id = %joined.room_id, "Client joined room"),
                Err(_) => tracing::info!(data = %frame.data, "Client joined room"),
            },
            other => tracing::debug!(event = %other, "Ignoring channel event"),
        }
    }
}
