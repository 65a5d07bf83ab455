#![forbid(unsafe_code)]

//! Change subscriptions for published snapshots.
//!
//! A [`SubscriberList`] keeps callbacks as weak references; the strong side
//! lives in the [`Subscription`] guard handed back to the caller. Dropping the
//! guard unsubscribes. Dead entries are pruned lazily on the next
//! notification.
//!
//! # Invariants
//!
//! 1. Live subscribers are notified in registration order.
//! 2. A callback whose guard has been dropped is never called again.
//! 3. Notification never holds a borrow of the owner's state, so callbacks
//!    may read from or write to the store that notified them.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

/// Registration-ordered weak callback list.
pub struct SubscriberList<T> {
    subscribers: Vec<CallbackWeak<T>>,
}

impl<T> Default for SubscriberList<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for SubscriberList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberList")
            .field("registered", &self.subscribers.len())
            .finish()
    }
}

impl<T: 'static> SubscriberList<T> {
    /// Register `callback`; it stays registered while the guard lives.
    pub fn subscribe(&mut self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.subscribers.push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Prune dead entries and return the live callbacks in order.
    ///
    /// The caller invokes them after releasing any borrow on its state.
    pub fn live(&mut self) -> Vec<CallbackRc<T>> {
        self.subscribers.retain(|w| w.strong_count() > 0);
        self.subscribers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Registered entries, including dead ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Invoke each callback with `value`.
pub fn notify_all<T>(callbacks: &[CallbackRc<T>], value: &T) {
    for cb in callbacks {
        cb(value);
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` drops the only strong reference to the
/// callback, so the weak entry in the list fails to upgrade from then on.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn notifies_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut list = SubscriberList::<u32>::default();

        let l1 = Rc::clone(&log);
        let _a = list.subscribe(move |v| l1.borrow_mut().push(("a", *v)));
        let l2 = Rc::clone(&log);
        let _b = list.subscribe(move |v| l2.borrow_mut().push(("b", *v)));

        notify_all(&list.live(), &7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn dropped_guard_stops_notifications_and_is_pruned() {
        let hits = Rc::new(RefCell::new(0));
        let mut list = SubscriberList::<()>::default();

        let h = Rc::clone(&hits);
        let guard = list.subscribe(move |_| *h.borrow_mut() += 1);
        notify_all(&list.live(), &());
        drop(guard);
        assert_eq!(list.len(), 1);

        notify_all(&list.live(), &());
        assert_eq!(*hits.borrow(), 1);
        assert!(list.is_empty());
    }
}
