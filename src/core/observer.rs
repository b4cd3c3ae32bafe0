//! In-process publish / subscribe with priority ordering
use std::fmt;

/// Model changes published to views (EWMH hint mirrors, the workspace
/// indicator, interactive grabs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The active workspace changed
    WorkspaceChanged {
        /// Workspace that was active before the switch
        from: usize,
        /// Workspace that is active now
        to: usize,
    },
    /// The workspace set was resized
    WorkspaceSetResized(usize),
    /// The global stacking order changed
    StackingChanged,
    /// The focused frame changed
    FocusChanged,
    /// The set of managed clients changed
    ClientListChanged,
    /// Theme / decor profiles were reloaded
    ThemeReloaded,
    /// Interactive grabs must abort (published on theme reload)
    GrabAbort,
    /// Head geometry changed (RandR / Xinerama update)
    HeadsChanged,
}

/// What an observer wants to happen to its registration after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Stay attached
    Keep,
    /// Detach once the outermost notify has unwound
    Detach,
}

/// Token identifying an attached observer for later detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

struct Entry<E> {
    token: ObserverToken,
    priority: i32,
    seq: u64,
    callback: Box<dyn FnMut(&E) -> Control>,
}

impl<E> fmt::Debug for Entry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("token", &self.token)
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .finish()
    }
}

/// A priority-ordered observer list.
///
/// Ascending numeric priority fires first, ties break in registration order.
/// Observers notified during a notification may not invalidate the observer
/// list: detaches requested while a notify is in flight (either by returning
/// [Control::Detach] or via [ObserverBus::detach]) are queued and applied
/// after the outermost notify returns.
#[derive(Debug)]
pub struct ObserverBus<E> {
    entries: Vec<Entry<E>>,
    next: u64,
    notify_depth: usize,
    deferred_detach: Vec<ObserverToken>,
}

impl<E> Default for ObserverBus<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
            notify_depth: 0,
            deferred_detach: Vec::new(),
        }
    }
}

impl<E> ObserverBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer at the given priority.
    pub fn attach<F>(&mut self, priority: i32, callback: F) -> ObserverToken
    where
        F: FnMut(&E) -> Control + 'static,
    {
        let token = ObserverToken(self.next);
        let seq = self.next;
        self.next += 1;

        let at = self
            .entries
            .iter()
            .position(|e| (e.priority, e.seq) > (priority, seq))
            .unwrap_or(self.entries.len());
        self.entries.insert(
            at,
            Entry {
                token,
                priority,
                seq,
                callback: Box::new(callback),
            },
        );

        token
    }

    /// Detach the observer registered under `token`.
    ///
    /// Deferred until the outermost in-flight notify unwinds.
    pub fn detach(&mut self, token: ObserverToken) {
        if self.notify_depth > 0 {
            self.deferred_detach.push(token);
        } else {
            self.entries.retain(|e| e.token != token);
        }
    }

    /// Publish `event` to every attached observer in priority order.
    pub fn notify(&mut self, event: &E) {
        self.notify_depth += 1;

        let mut i = 0;
        while i < self.entries.len() {
            let token = self.entries[i].token;
            if !self.deferred_detach.contains(&token) {
                if (self.entries[i].callback)(event) == Control::Detach {
                    self.deferred_detach.push(token);
                }
            }
            i += 1;
        }

        self.notify_depth -= 1;
        if self.notify_depth == 0 && !self.deferred_detach.is_empty() {
            let detached = std::mem::take(&mut self.deferred_detach);
            self.entries.retain(|e| !detached.contains(&e.token));
        }
    }

    /// Number of attached observers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no observers are attached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn priority_order_ascending_then_registration() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus: ObserverBus<()> = ObserverBus::new();

        for (priority, tag) in [(10, "b1"), (0, "a1"), (10, "b2"), (0, "a2")] {
            let order = Rc::clone(&order);
            bus.attach(priority, move |_| {
                order.borrow_mut().push(tag);
                Control::Keep
            });
        }

        bus.notify(&());

        assert_eq!(*order.borrow(), vec!["a1", "a2", "b1", "b2"]);
    }

    #[test]
    fn detach_outside_notify_is_immediate() {
        let count = Rc::new(RefCell::new(0));
        let mut bus: ObserverBus<()> = ObserverBus::new();

        let c = Rc::clone(&count);
        let token = bus.attach(0, move |_| {
            *c.borrow_mut() += 1;
            Control::Keep
        });
        bus.detach(token);
        bus.notify(&());

        assert_eq!(*count.borrow(), 0);
        assert!(bus.is_empty());
    }

    #[test]
    fn self_detach_during_notify_is_deferred() {
        let count = Rc::new(RefCell::new(0));
        let mut bus: ObserverBus<()> = ObserverBus::new();

        let c = Rc::clone(&count);
        bus.attach(0, move |_| {
            *c.borrow_mut() += 1;
            Control::Detach
        });
        let c = Rc::clone(&count);
        bus.attach(1, move |_| {
            *c.borrow_mut() += 10;
            Control::Keep
        });

        // first notify runs both observers, then applies the detach
        bus.notify(&());
        assert_eq!(*count.borrow(), 11);
        assert_eq!(bus.len(), 1);

        // second notify only reaches the surviving observer
        bus.notify(&());
        assert_eq!(*count.borrow(), 21);
    }

    #[test]
    fn observations_are_cloneable_values() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus: ObserverBus<Observation> = ObserverBus::new();

        let s = Rc::clone(&seen);
        bus.attach(0, move |o: &Observation| {
            s.borrow_mut().push(o.clone());
            Control::Keep
        });

        bus.notify(&Observation::WorkspaceChanged { from: 0, to: 2 });
        bus.notify(&Observation::GrabAbort);

        assert_eq!(
            *seen.borrow(),
            vec![
                Observation::WorkspaceChanged { from: 0, to: 2 },
                Observation::GrabAbort,
            ]
        );
    }
}
