//! Small pub/sub helper. Handlers are keyed by event name and receive the
//! payload by reference. Emitting never re-enters the emitter, handlers
//! registered with [`EventEmitter::once`] are dropped after their first call.

use std::collections::HashMap;

pub type ListenerId = u64;

struct Listener<E> {
    id: ListenerId,
    once: bool,
    handler: Box<dyn FnMut(&E)>,
}

pub struct EventEmitter<E> {
    next_listener_id: ListenerId,
    listeners: HashMap<String, Vec<Listener<E>>>,
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self.listeners.iter()
            .map(|(name, listeners)| (name.as_str(), listeners.len()))
            .collect();
        f.debug_struct("EventEmitter").field("listeners", &counts).finish()
    }
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            next_listener_id: 0,
            listeners: HashMap::new(),
        }
    }

    pub fn on<S, F>(&mut self, event: S, handler: F) -> ListenerId
    where
        S: AsRef<str>,
        F: FnMut(&E) + 'static
    {
        self.register(event.as_ref(), false, Box::new(handler))
    }

    pub fn once<S, F>(&mut self, event: S, handler: F) -> ListenerId
    where
        S: AsRef<str>,
        F: FnMut(&E) + 'static
    {
        self.register(event.as_ref(), true, Box::new(handler))
    }

    fn register(&mut self, event: &str, once: bool, handler: Box<dyn FnMut(&E)>) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.entry(event.to_string())
            .or_default()
            .push(Listener { id, once, handler });
        id
    }

    /// Removes a listener, returns false when it was not registered.
    pub fn off(&mut self, listener: ListenerId) -> bool {
        let mut removed = false;
        for listeners in self.listeners.values_mut() {
            let before = listeners.len();
            listeners.retain(|l| l.id != listener);
            removed |= listeners.len() != before;
        }
        removed
    }

    /// Calls every handler for `event`, returns how many were called.
    pub fn emit<S: AsRef<str>>(&mut self, event: S, payload: &E) -> usize {
        let Some(listeners) = self.listeners.get_mut(event.as_ref()) else {
            return 0;
        };

        for listener in listeners.iter_mut() {
            (listener.handler)(payload);
        }
        let called = listeners.len();
        listeners.retain(|l| !l.once);
        called
    }

    pub fn listener_count<S: AsRef<str>>(&self, event: S) -> usize {
        self.listeners.get(event.as_ref()).map_or(0, |l| l.len())
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
use std::{cell::RefCell, rc::Rc};

#[test]
fn test_emit_reaches_named_listeners() {
    let received = Rc::new(RefCell::new(vec![]));
    let mut emitter = EventEmitter::<u32>::new();

    let sink = received.clone();
    emitter.on("hit", move |value| sink.borrow_mut().push(*value));
    emitter.on("miss", |_| panic!("wrong event"));

    assert_eq!(emitter.emit("hit", &4), 1);
    assert_eq!(emitter.emit("hit", &5), 1);
    assert_eq!(emitter.emit("unknown", &6), 0);
    assert_eq!(*received.borrow(), vec![4, 5]);
}

#[test]
fn test_once_and_off() {
    let count = Rc::new(RefCell::new(0));
    let mut emitter = EventEmitter::<()>::new();

    let once_count = count.clone();
    emitter.once("tick", move |_| *once_count.borrow_mut() += 1);
    let always_count = count.clone();
    let always = emitter.on("tick", move |_| *always_count.borrow_mut() += 10);

    emitter.emit("tick", &());
    emitter.emit("tick", &());
    assert_eq!(*count.borrow(), 21);

    assert!(emitter.off(always));
    assert!(!emitter.off(always));
    assert_eq!(emitter.listener_count("tick"), 0);
}
