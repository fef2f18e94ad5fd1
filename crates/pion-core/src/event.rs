use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::element::{Element, WeakElement};
use crate::setter::Setter;
use crate::value::{PropertyValue, Value};

/// A synchronously dispatched DOM-style event.
pub struct Event {
    kind: String,
    detail: Option<Rc<dyn Any>>,
    bubbles: bool,
    cancelable: bool,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
    target: RefCell<Option<WeakElement>>,
    current_target: RefCell<Option<WeakElement>>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: None,
            bubbles: false,
            cancelable: false,
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
            target: RefCell::new(None),
            current_target: RefCell::new(None),
        }
    }

    pub fn with_detail<T: Any>(mut self, detail: T) -> Self {
        self.detail = Some(Rc::new(detail));
        self
    }

    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn detail<T: Any>(&self) -> Option<&T> {
        self.detail.as_deref().and_then(|detail| detail.downcast_ref::<T>())
    }

    pub fn is_bubbling(&self) -> bool {
        self.bubbles
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// No-op unless the event is cancelable.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub fn target(&self) -> Option<Element> {
        self.target.borrow().as_ref().and_then(WeakElement::upgrade)
    }

    pub fn current_target(&self) -> Option<Element> {
        self.current_target
            .borrow()
            .as_ref()
            .and_then(WeakElement::upgrade)
    }

    pub(crate) fn set_target(&self, target: &Element) {
        *self.target.borrow_mut() = Some(target.downgrade());
    }

    pub(crate) fn set_current_target(&self, current: Option<&Element>) {
        *self.current_target.borrow_mut() = current.map(Element::downgrade);
    }
}

/// Detail of a `<name>-changed` event.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeDetail {
    pub value: Value,
    pub path: String,
}

/// Dispatches the cancelable `<event_name>` change notification on `host`.
/// Returns `false` when a listener prevented the change.
pub(crate) fn notify_change(host: &Element, event_name: &str, value: Value, path: &str) -> bool {
    let event = Event::new(event_name)
        .with_detail(ChangeDetail {
            value,
            path: path.to_string(),
        })
        .cancelable(true);
    host.dispatch_event(&event)
}

/// Listener that takes over a child's change event: the child's own update
/// is prevented and the value is handed to `setter` instead.
pub fn lift<T: PropertyValue>(setter: Setter<T>) -> impl Fn(&Event) + 'static {
    move |event: &Event| {
        event.prevent_default();
        if let Some(value) = event
            .detail::<ChangeDetail>()
            .and_then(|detail| T::from_value(&detail.value))
        {
            setter.set(value);
        }
    }
}
