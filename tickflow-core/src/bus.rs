//! Synchronous in-process event bus.
//!
//! A single FIFO queue is shared across all event kinds. Handlers invoked
//! while the queue drains may publish new events through an [`Outbox`];
//! those land at the tail of the same queue. The result is breadth-first
//! dispatch in waves: every event that was queued when [`EventBus::run`]
//! started is fully processed before any event published as a side effect
//! of that wave. When a feed pre-publishes all bars, every stage therefore
//! sees all `MarketData` events before the first `Signal` is dispatched,
//! all signals before the first order, and so on down the chain. Stages
//! depend on this ordering; do not replace the queue with per-bar
//! recursion.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::events::{Event, EventKind};

/// A pipeline stage or observer driven by the bus.
///
/// Handlers own their per-symbol state and mutate it only inside
/// `on_event`; the bus is single-threaded, so no further synchronization
/// exists or is needed.
pub trait EventHandler {
    /// Event kinds this handler wants. Used by [`EventBus::attach`].
    fn subscriptions(&self) -> &'static [EventKind];

    /// React to one event, optionally publishing follow-up events.
    fn on_event(&mut self, event: &Event, outbox: &mut Outbox<'_>);
}

/// Shared handle to a handler registered on the bus.
pub type SharedHandler = Rc<RefCell<dyn EventHandler>>;

/// Wrap a handler for registration, keeping a clone for later inspection.
pub fn shared<H: EventHandler + 'static>(handler: H) -> Rc<RefCell<H>> {
    Rc::new(RefCell::new(handler))
}

/// Write-only view of the bus queue handed to handlers during dispatch.
///
/// Publishing through the outbox appends to the tail of the live queue,
/// which is exactly what preserves the wave ordering described above.
pub struct Outbox<'a> {
    queue: &'a mut VecDeque<Event>,
}

impl Outbox<'_> {
    pub fn publish(&mut self, event: Event) {
        self.queue.push_back(event);
    }
}

/// Pub/sub hub backed by one FIFO queue.
///
/// ```
/// use tickflow_core::bus::{shared, EventBus};
/// let mut bus = EventBus::new();
/// // bus.attach(strategy);
/// // bus.publish(Event::MarketData(bar));
/// // bus.run(None);
/// ```
#[derive(Default)]
pub struct EventBus {
    queue: VecDeque<Event>,
    routes: HashMap<EventKind, Vec<SharedHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for exactly one event kind.
    ///
    /// Handlers for a kind are invoked in registration order.
    pub fn subscribe(&mut self, kind: EventKind, handler: SharedHandler) {
        self.routes.entry(kind).or_default().push(handler);
    }

    /// Register `handler` for every kind in its
    /// [`subscriptions`](EventHandler::subscriptions) list.
    pub fn attach(&mut self, handler: SharedHandler) {
        let kinds = handler.borrow().subscriptions();
        for kind in kinds {
            self.subscribe(*kind, Rc::clone(&handler));
        }
    }

    /// Enqueue `event` at the tail of the queue.
    ///
    /// Publishing a kind nobody subscribed to is a no-op at dispatch time,
    /// never an error.
    pub fn publish(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Number of events currently waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue, dispatching each event to its subscribers.
    ///
    /// Stops when the queue is empty or after `max_events` dispatches
    /// (undispatched events stay queued). Returns the number of events
    /// processed. A panicking handler aborts the run; partially applied
    /// state is left as-is.
    pub fn run(&mut self, max_events: Option<usize>) -> usize {
        let mut processed = 0usize;
        loop {
            if let Some(cap) = max_events {
                if processed >= cap {
                    break;
                }
            }
            let Some(event) = self.queue.pop_front() else {
                break;
            };
            // Snapshot the route list so handler-side publishes cannot
            // alias the registry borrow.
            let handlers: Vec<SharedHandler> = self
                .routes
                .get(&event.kind())
                .map(|list| list.to_vec())
                .unwrap_or_default();
            for handler in handlers {
                let mut outbox = Outbox {
                    queue: &mut self.queue,
                };
                handler.borrow_mut().on_event(&event, &mut outbox);
            }
            processed += 1;
        }
        processed
    }
}
