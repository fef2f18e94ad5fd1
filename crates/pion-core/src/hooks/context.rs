//! Values provided by an ancestor element.
//!
//! A consumer dispatches a bubbling [`CONTEXT_EVENT`] from its host. The
//! nearest provider for the same context stops the event, subscribes the
//! consumer and answers with its current value.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::element::{Element, ListenerId, WeakElement};
use crate::event::Event;
use crate::state::{use_hook, Hook, WeakState};
use crate::scheduler::EffectKind;

pub const CONTEXT_EVENT: &str = "pion.context";

thread_local! {
    static NEXT_CONTEXT: Cell<u64> = const { Cell::new(1) };
}

type Unsubscribe = Box<dyn FnOnce()>;

struct ContextRequest<T> {
    context: u64,
    callback: Rc<dyn Fn(&T)>,
    response: RefCell<Option<(T, Unsubscribe)>>,
}

struct ContextInner<T> {
    id: u64,
    default: T,
}

/// A context key with its fallback value.
pub struct Context<T> {
    inner: Rc<ContextInner<T>>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

pub fn create_context<T: Clone + PartialEq + 'static>(default: T) -> Context<T> {
    let id = NEXT_CONTEXT.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    Context {
        inner: Rc::new(ContextInner { id, default }),
    }
}

impl<T: Clone + PartialEq + 'static> Context<T> {
    pub fn default_value(&self) -> T {
        self.inner.default.clone()
    }

    /// Makes `element` answer requests for this context with `value`.
    /// Dropping the provider stops answering; existing subscribers keep the
    /// last value they saw.
    pub fn provide(&self, element: &Element, value: T) -> ContextProvider<T> {
        let inner = Rc::new(ProviderInner {
            value: RefCell::new(value),
            subscribers: RefCell::new(Vec::new()),
            next_subscriber: Cell::new(1),
        });
        let weak = Rc::downgrade(&inner);
        let context = self.inner.id;
        let listener = element.add_event_listener(CONTEXT_EVENT, move |event: &Event| {
            let Some(request) = event.detail::<ContextRequest<T>>() else {
                return;
            };
            if request.context != context {
                return;
            }
            let Some(provider) = weak.upgrade() else {
                return;
            };
            event.stop_propagation();
            let id = provider.subscribe(Rc::clone(&request.callback));
            let value = provider.value.borrow().clone();
            let from = Rc::downgrade(&provider);
            let unsubscribe: Unsubscribe = Box::new(move || {
                if let Some(provider) = from.upgrade() {
                    provider.unsubscribe(id);
                }
            });
            *request.response.borrow_mut() = Some((value, unsubscribe));
        });
        ContextProvider {
            inner,
            element: element.downgrade(),
            listener,
        }
    }
}

struct ProviderInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<(u64, Rc<dyn Fn(&T)>)>>,
    next_subscriber: Cell<u64>,
}

impl<T> ProviderInner<T> {
    fn subscribe(&self, callback: Rc<dyn Fn(&T)>) -> u64 {
        let id = self.next_subscriber.get();
        self.next_subscriber.set(id + 1);
        self.subscribers.borrow_mut().push((id, callback));
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers
            .borrow_mut()
            .retain(|(subscriber, _)| *subscriber != id);
    }
}

/// Handle returned by [`Context::provide`].
pub struct ContextProvider<T> {
    inner: Rc<ProviderInner<T>>,
    element: WeakElement,
    listener: ListenerId,
}

impl<T: Clone + PartialEq + 'static> ContextProvider<T> {
    pub fn value(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Stores `value` and notifies every subscriber if it changed.
    pub fn set_value(&self, value: T) {
        if *self.inner.value.borrow() == value {
            return;
        }
        *self.inner.value.borrow_mut() = value.clone();
        let subscribers: Vec<Rc<dyn Fn(&T)>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for subscriber in subscribers {
            subscriber(&value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }
}

impl<T> Drop for ContextProvider<T> {
    fn drop(&mut self) {
        if let Some(element) = self.element.upgrade() {
            element.remove_event_listener(self.listener);
        }
    }
}

struct ContextHook<T> {
    id: usize,
    context: Context<T>,
    host: WeakElement,
    state: WeakState,
    value: RefCell<T>,
    unsubscribe: RefCell<Option<Unsubscribe>>,
    ran_effect: Cell<bool>,
    this: Weak<ContextHook<T>>,
}

impl<T: Clone + PartialEq + 'static> ContextHook<T> {
    fn subscribe(&self) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let this = self.this.clone();
        let request = ContextRequest {
            context: self.context.inner.id,
            callback: Rc::new(move |value: &T| {
                if let Some(hook) = this.upgrade() {
                    *hook.value.borrow_mut() = value.clone();
                    hook.state.update();
                }
            }),
            response: RefCell::new(None),
        };
        let event = Event::new(CONTEXT_EVENT)
            .with_detail(request)
            .bubbles(true)
            .cancelable(true);
        host.dispatch_event(&event);

        let response = event
            .detail::<ContextRequest<T>>()
            .and_then(|request| request.response.borrow_mut().take());
        match response {
            Some((value, unsubscribe)) => {
                *self.value.borrow_mut() = value;
                *self.unsubscribe.borrow_mut() = Some(unsubscribe);
            }
            None => {
                *self.value.borrow_mut() = self.context.default_value();
                self.unsubscribe.borrow_mut().take();
            }
        }
    }

    fn unsubscribe(&self) {
        let unsubscribe = self.unsubscribe.borrow_mut().take();
        if let Some(unsubscribe) = unsubscribe {
            unsubscribe();
        }
    }
}

impl<T: Clone + PartialEq + 'static> Hook for ContextHook<T> {
    /// The host may not have been in the tree during the first render, so
    /// the first effects pass asks again and re-renders.
    fn call(&self) {
        if self.ran_effect.replace(true) {
            return;
        }
        self.unsubscribe();
        self.subscribe();
        self.state.update();
    }

    fn teardown(&self, disconnected: bool) {
        self.unsubscribe();
        if disconnected {
            self.ran_effect.set(false);
        }
    }
}

impl<T> Drop for ContextHook<T> {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.get_mut().take() {
            unsubscribe();
        }
    }
}

/// Current value of `context` from the nearest provider above the host,
/// or its default. Re-renders when the provider's value changes.
pub fn use_context<T: Clone + PartialEq + 'static>(context: &Context<T>) -> T {
    let (hook, created) = use_hook(|cx| {
        let host = cx.host().downgrade();
        let state = cx.state();
        let id = cx.id();
        Rc::new_cyclic(|this: &Weak<ContextHook<T>>| ContextHook {
            id,
            context: context.clone(),
            host,
            state,
            value: RefCell::new(context.default_value()),
            unsubscribe: RefCell::new(None),
            ran_effect: Cell::new(false),
            this: this.clone(),
        })
    });
    if created {
        hook.subscribe();
    }
    if !hook.ran_effect.get() {
        if let Some(state) = hook.state.upgrade() {
            state.queue_effect(EffectKind::Passive, hook.id);
        }
    }
    let value = hook.value.borrow().clone();
    value
}
