//! Attribute observation shared by every attribute hook on a host.
//!
//! Each host gets at most one [`MutationObserver`], created when the first
//! watcher registers and discarded with the last one. The observer's
//! attribute filter is rebuilt on every registration change.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::collections::map::HashMap;
use crate::element::{Element, ElementId, MutationRecord, ObserverId, WeakElement};

/// Watches attribute mutations on a single target element.
pub struct MutationObserver {
    callback: Rc<dyn Fn(&MutationRecord)>,
    target: RefCell<Option<(WeakElement, ObserverId)>>,
}

impl MutationObserver {
    pub fn new(callback: impl Fn(&MutationRecord) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
            target: RefCell::new(None),
        }
    }

    /// Starts observing `target`, replacing any previous observation.
    pub fn observe(&self, target: &Element, attribute_filter: Vec<String>) {
        self.disconnect();
        let id = target.observe_attributes(attribute_filter, Rc::clone(&self.callback));
        *self.target.borrow_mut() = Some((target.downgrade(), id));
    }

    pub fn disconnect(&self) {
        if let Some((target, id)) = self.target.borrow_mut().take() {
            if let Some(target) = target.upgrade() {
                target.unobserve_attributes(id);
            }
        }
    }

    pub fn is_observing(&self) -> bool {
        self.target.borrow().is_some()
    }
}

impl Drop for MutationObserver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Receives external changes of a watched attribute.
pub trait AttributeWatcher {
    /// `value` is the attribute's current text, `None` once removed.
    fn attribute_changed(&self, name: &str, value: Option<&str>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

struct AttributeRegistry {
    host: WeakElement,
    observer: MutationObserver,
    watchers: IndexMap<String, Vec<(WatcherId, Weak<dyn AttributeWatcher>)>>,
}

impl AttributeRegistry {
    fn rebuild(&self) {
        self.observer.disconnect();
        if let Some(host) = self.host.upgrade() {
            let filter: Vec<String> = self.watchers.keys().cloned().collect();
            log::trace!("observing {filter:?} on <{}>", host.tag());
            self.observer.observe(&host, filter);
        }
    }
}

thread_local! {
    static REGISTRIES: RefCell<HashMap<ElementId, Rc<RefCell<AttributeRegistry>>>> =
        RefCell::new(HashMap::default());
    static NEXT_WATCHER: Cell<u64> = const { Cell::new(1) };
}

fn registry_for(host: ElementId) -> Option<Rc<RefCell<AttributeRegistry>>> {
    REGISTRIES.with(|registries| registries.borrow().get(&host).cloned())
}

/// Adds `watcher` for `name` on `host`, creating the host's observer if
/// this is the first registration.
pub fn register(host: &Element, name: &str, watcher: Weak<dyn AttributeWatcher>) -> WatcherId {
    let id = WatcherId(NEXT_WATCHER.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    }));

    let registry = registry_for(host.id()).unwrap_or_else(|| {
        let host_id = host.id();
        let registry = Rc::new(RefCell::new(AttributeRegistry {
            host: host.downgrade(),
            observer: MutationObserver::new(move |record| dispatch(host_id, record)),
            watchers: IndexMap::new(),
        }));
        REGISTRIES.with(|registries| {
            registries
                .borrow_mut()
                .insert(host_id, Rc::clone(&registry))
        });
        registry
    });

    let mut registry = registry.borrow_mut();
    let rebuild = !registry.watchers.contains_key(name);
    registry
        .watchers
        .entry(name.to_string())
        .or_default()
        .push((id, watcher));
    if rebuild {
        registry.rebuild();
    }
    id
}

/// Removes a registration. The host's observer is disconnected and the
/// registry discarded when nothing is left watching.
pub fn unregister(host: ElementId, id: WatcherId) {
    let Some(registry) = registry_for(host) else {
        return;
    };
    let empty = {
        let mut registry = registry.borrow_mut();
        let mut emptied = None;
        for (name, watchers) in registry.watchers.iter_mut() {
            let before = watchers.len();
            watchers.retain(|(watcher, _)| *watcher != id);
            if watchers.len() != before {
                if watchers.is_empty() {
                    emptied = Some(name.clone());
                }
                break;
            }
        }
        if let Some(name) = emptied {
            registry.watchers.shift_remove(&name);
            registry.rebuild();
        }
        registry.watchers.is_empty()
    };
    if empty {
        registry.borrow().observer.disconnect();
        REGISTRIES.with(|registries| registries.borrow_mut().remove(&host));
    }
}

/// Attribute names currently watched on `host`, in registration order.
pub fn watched_attributes(host: &Element) -> Vec<String> {
    registry_for(host.id())
        .map(|registry| registry.borrow().watchers.keys().cloned().collect())
        .unwrap_or_default()
}

pub fn has_registry(host: &Element) -> bool {
    registry_for(host.id()).is_some()
}

fn dispatch(host: ElementId, record: &MutationRecord) {
    // self-caused mutations from reflection
    if record.target.is_reflecting() {
        return;
    }
    let Some(registry) = registry_for(host) else {
        return;
    };
    let watchers: Vec<Weak<dyn AttributeWatcher>> = registry
        .borrow()
        .watchers
        .get(&record.attribute_name)
        .map(|watchers| watchers.iter().map(|(_, watcher)| watcher.clone()).collect())
        .unwrap_or_default();
    if watchers.is_empty() {
        return;
    }
    let value = record.target.get_attribute(&record.attribute_name);
    for watcher in watchers.iter().filter_map(Weak::upgrade) {
        watcher.attribute_changed(&record.attribute_name, value.as_deref());
    }
}
