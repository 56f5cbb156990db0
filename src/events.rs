//! In-process publish/subscribe for cross-view signals.
//!
//! Views that need to hear about uploads, deletions, or annotation changes
//! on another view subscribe here explicitly. A [`Subscription`] stays
//! active until it is dropped.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use imgmark_store::{ImageId, ImageRecord};

/// A signal published between views.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A new image was registered.
    ImageUploaded(ImageRecord),
    /// An image and its annotations were removed.
    ImageDeleted(ImageId),
    /// The annotation list of an image changed.
    AnnotationsChanged { image_id: ImageId, count: usize },
}

type Handler = Rc<dyn Fn(&AppEvent)>;

#[derive(Default)]
struct Registry {
    handlers: RefCell<Vec<(u64, Handler)>>,
    next_id: Cell<u64>,
}

/// Fan-out event bus. Cloning shares the same subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<Registry>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every published event.
    #[must_use = "the handler is removed when the subscription is dropped"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&AppEvent) + 'static,
    {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        self.registry
            .handlers
            .borrow_mut()
            .push((id, Rc::new(handler)));
        Subscription {
            registry: Rc::downgrade(&self.registry),
            id,
        }
    }

    /// Deliver an event to all current subscribers, in subscription order.
    ///
    /// Handlers may subscribe or unsubscribe while being called; such
    /// changes take effect from the next publish.
    pub fn publish(&self, event: &AppEvent) {
        let handlers: Vec<Handler> = self
            .registry
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        log::trace!("Event bus: {:?} to {} subscribers", event, handlers.len());
        for handler in handlers {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers.borrow().len()
    }
}

/// Handle that keeps a handler registered.
pub struct Subscription {
    registry: Weak<Registry>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now instead of at drop.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .handlers
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_subscribers() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let event = AppEvent::ImageDeleted(ImageId::new("img-1"));
        bus.publish(&event);
        assert_eq!(*seen.borrow(), vec![event]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let sub = bus.subscribe(move |_| c.set(c.get() + 1));
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&AppEvent::ImageDeleted(ImageId::new("x")));
        sub.cancel();
        bus.publish(&AppEvent::ImageDeleted(ImageId::new("x")));

        assert_eq!(count.get(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_may_subscribe_during_publish() {
        let bus = EventBus::new();
        let inner = bus.clone();
        let keep = Rc::new(RefCell::new(Vec::new()));
        let keep_in = keep.clone();
        let _sub = bus.subscribe(move |_| {
            keep_in.borrow_mut().push(inner.subscribe(|_| {}));
        });

        bus.publish(&AppEvent::ImageDeleted(ImageId::new("x")));
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let bus = EventBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        drop(sub);
    }
}
