//! Change notifications for presentation and quest tracking.
//!
//! Observers are called synchronously, in registration order, once the
//! operation that raised the event has finished mutating state. An observer
//! receives `&mut` access to the owner and may call back into it; events raised
//! by such nested calls are queued and delivered after the current one.
//!
//! Presentation layers that poll once per tick can take a channel receiver
//! instead.

use std::collections::VecDeque;
use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use satchel_common::ItemTypeId;

use crate::item::EquipSocket;

/// Event types raised by the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    /// Slot contents changed
    InventoryChanged,
    /// An add could not place every unit
    InventoryFull {
        /// Item being added
        item: ItemTypeId,
        /// Units requested
        requested: usize,
        /// Units actually placed
        placed: usize,
    },
    /// Equipment changed
    EquipmentChanged {
        /// Socket affected, or `None` when every socket may have changed
        socket: Option<EquipSocket>,
    },
    /// Quick slot bindings changed
    QuickSlotsChanged,
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Observer callback. `C` is the type that owns the dispatcher.
pub type Observer<C> = Box<dyn FnMut(&InventoryEvent, &mut C)>;

/// Ordered observer list plus channel subscribers.
pub struct EventDispatcher<C> {
    observers: Vec<(SubscriberId, Observer<C>)>,
    channels: Vec<Sender<InventoryEvent>>,
    pending: VecDeque<InventoryEvent>,
    removed: Vec<SubscriberId>,
    dispatching: bool,
    next_id: u64,
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
            channels: Vec::new(),
            pending: VecDeque::new(),
            removed: Vec::new(),
            dispatching: false,
            next_id: 1,
        }
    }
}

impl<C> fmt::Debug for EventDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("observers", &self.observers.len())
            .field("channels", &self.channels.len())
            .field("pending", &self.pending)
            .field("dispatching", &self.dispatching)
            .finish()
    }
}

impl<C> EventDispatcher<C> {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. Observers added during dispatch start receiving
    /// events from the next one.
    pub fn subscribe(&mut self, observer: Observer<C>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Removes an observer. Safe to call from inside an observer.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        if self.dispatching {
            self.removed.push(id);
        }
        self.observers.retain(|(existing, _)| *existing != id);
    }

    /// Creates a channel that receives a copy of every event.
    pub fn subscribe_channel(&mut self) -> Receiver<InventoryEvent> {
        let (sender, receiver) = unbounded();
        self.channels.push(sender);
        receiver
    }

    /// Number of registered observers and live channels.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.observers.len() + self.channels.len()
    }

    /// Queues an event for the next dispatch.
    pub fn queue(&mut self, event: InventoryEvent) {
        self.pending.push_back(event);
    }

    /// Starts a dispatch pass, handing the observer list to the caller.
    /// Returns `None` if a pass is already running; the running pass will
    /// deliver anything queued in the meantime.
    pub fn begin_dispatch(&mut self) -> Option<Vec<(SubscriberId, Observer<C>)>> {
        if self.dispatching {
            return None;
        }
        self.dispatching = true;
        Some(std::mem::take(&mut self.observers))
    }

    /// Next queued event, forwarded to every channel subscriber.
    pub fn next_event(&mut self) -> Option<InventoryEvent> {
        let event = self.pending.pop_front()?;
        self.channels
            .retain(|sender| sender.send(event.clone()).is_ok());
        Some(event)
    }

    /// Returns true if `id` was unsubscribed during the current pass.
    #[must_use]
    pub fn is_removed(&self, id: SubscriberId) -> bool {
        self.removed.contains(&id)
    }

    /// Ends a dispatch pass, putting the observer list back. Observers
    /// registered during the pass go after the existing ones.
    pub fn end_dispatch(&mut self, mut observers: Vec<(SubscriberId, Observer<C>)>) {
        observers.append(&mut self.observers);
        let removed = std::mem::take(&mut self.removed);
        observers.retain(|(id, _)| !removed.contains(id));
        self.observers = observers;
        self.dispatching = false;
    }
}
