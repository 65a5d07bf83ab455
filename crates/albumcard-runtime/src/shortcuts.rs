#![forbid(unsafe_code)]

//! Global keyboard routing: a host-owned listener hub and the undo/redo
//! router mounted on it.
//!
//! The host owns one [`KeyListenerHub`] and feeds every key event into
//! [`dispatch`](KeyListenerHub::dispatch) together with the current focus.
//! Components register listeners with [`listen`](KeyListenerHub::listen) and
//! keep the returned [`ListenerGuard`]; dropping it unregisters. Nothing here
//! is a process-wide singleton.
//!
//! [`UndoShortcuts`] is the listener that turns the primary-modifier + `z`
//! chords into [`SettingsStore::undo`] / [`SettingsStore::redo`], leaving
//! text fields to their native undo.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use albumcard_core::{FocusTarget, KeyEvent, ShortcutAction, ShortcutConfig, ShortcutMapper};
use tracing::{debug, trace};

use crate::store::SettingsStore;

/// What a listener did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyOutcome {
    /// Not interested.
    #[default]
    Ignored,
    /// Acted on the event.
    Handled {
        /// Suppress the host's default action for the chord.
        prevent_default: bool,
    },
}

impl KeyOutcome {
    /// Handled, with the default action suppressed.
    pub const CONSUMED: Self = Self::Handled {
        prevent_default: true,
    };
}

/// Aggregate result of one [`KeyListenerHub::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    /// Listeners that reported [`KeyOutcome::Handled`].
    pub handled: usize,
    /// Whether any of them asked to suppress the default action.
    pub default_prevented: bool,
}

type Listener = Rc<dyn Fn(&KeyEvent, FocusTarget) -> KeyOutcome>;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Registry of global key listeners. Clones share the registry.
#[derive(Clone, Default)]
pub struct KeyListenerHub {
    inner: Rc<RefCell<HubInner>>,
}

impl fmt::Debug for KeyListenerHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyListenerHub")
            .field("listeners", &self.len())
            .finish()
    }
}

impl KeyListenerHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` until the returned guard is dropped.
    pub fn listen(
        &self,
        listener: impl Fn(&KeyEvent, FocusTarget) -> KeyOutcome + 'static,
    ) -> ListenerGuard {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Rc::new(listener)));
        trace!(id, listeners = inner.listeners.len(), "key listener registered");
        ListenerGuard {
            hub: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver `event` to every listener in registration order.
    ///
    /// Listeners run without the registry borrowed, so they may register or
    /// drop listeners; such changes apply from the next dispatch.
    pub fn dispatch(&self, event: &KeyEvent, focus: FocusTarget) -> Dispatch {
        let listeners: Vec<Listener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        let mut dispatch = Dispatch::default();
        for listener in listeners {
            if let KeyOutcome::Handled { prevent_default } = listener(event, focus) {
                dispatch.handled += 1;
                dispatch.default_prevented |= prevent_default;
            }
        }
        dispatch
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps a listener registered; dropping it unregisters.
#[must_use = "dropping the guard unregisters the listener immediately"]
pub struct ListenerGuard {
    hub: Weak<RefCell<HubInner>>,
    id: u64,
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("id", &self.id)
            .field("hub_alive", &(self.hub.strong_count() > 0))
            .finish()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        let removed = {
            let mut inner = hub.borrow_mut();
            let index = inner.listeners.iter().position(|(id, _)| *id == self.id);
            index.map(|index| inner.listeners.remove(index))
        };
        if removed.is_some() {
            trace!(id = self.id, "key listener unregistered");
        }
    }
}

/// Undo/redo keyboard router.
#[derive(Debug)]
pub struct UndoShortcuts;

impl UndoShortcuts {
    /// Route undo/redo chords on `hub` to `store` until the guard is
    /// dropped.
    ///
    /// A matching chord is always consumed, even when there is nothing to
    /// undo or redo.
    pub fn mount(hub: &KeyListenerHub, store: SettingsStore, config: ShortcutConfig) -> ListenerGuard {
        let mapper = ShortcutMapper::new(config);
        debug!(
            primary = %mapper.config().primary,
            enabled = mapper.config().enabled,
            "undo shortcuts mounted"
        );
        hub.listen(move |event, focus| {
            let Some(action) = mapper.map(event, focus) else {
                return KeyOutcome::Ignored;
            };
            if store.is_torn_down() {
                return KeyOutcome::Ignored;
            }
            let applied = match action {
                ShortcutAction::Undo => store.undo(),
                ShortcutAction::Redo => store.redo(),
            };
            debug!(?action, applied, "shortcut");
            KeyOutcome::CONSUMED
        })
    }
}
