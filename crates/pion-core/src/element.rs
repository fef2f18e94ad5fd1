//! Single-threaded host element model.
//!
//! Elements are reference-counted handles. Parents own their children,
//! children and shadow roots only point back weakly, so dropping the last
//! handle to a detached subtree frees it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::event::Event;
use crate::properties::{PropertyAccess, PropertyTable};
use crate::value::{PropertyValue, Value};

pub type ElementId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Element,
    Text,
    Document,
    ShadowRoot,
    Virtual,
}

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_id() -> u64 {
    NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

/// Callbacks a custom element definition attaches to its instances.
pub trait ElementLifecycle {
    fn connected(&self, _element: &Element) {}

    fn disconnected(&self, _element: &Element) {}

    fn observed_attributes(&self) -> &[String] {
        &[]
    }

    fn attribute_changed(
        &self,
        _element: &Element,
        _name: &str,
        _old_value: Option<&str>,
        _new_value: Option<&str>,
    ) {
    }
}

/// One attribute mutation, delivered to attribute observers.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub target: Element,
    pub attribute_name: String,
    pub old_value: Option<String>,
}

struct ListenerEntry {
    id: ListenerId,
    kind: String,
    callback: Rc<dyn Fn(&Event)>,
}

struct ObserverEntry {
    id: ObserverId,
    filter: Vec<String>,
    callback: Rc<dyn Fn(&MutationRecord)>,
}

struct ElementInner {
    id: ElementId,
    kind: NodeKind,
    tag: String,
    attributes: RefCell<IndexMap<String, String>>,
    properties: PropertyTable,
    listeners: RefCell<Vec<ListenerEntry>>,
    observers: RefCell<Vec<ObserverEntry>>,
    parent: RefCell<Weak<ElementInner>>,
    children: RefCell<Vec<Element>>,
    shadow_root: RefCell<Option<Element>>,
    data: RefCell<String>,
    lifecycle: RefCell<Option<Rc<dyn ElementLifecycle>>>,
    reflecting: Cell<bool>,
}

#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

#[derive(Clone, Default)]
pub struct WeakElement {
    inner: Weak<ElementInner>,
}

impl WeakElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upgrade(&self) -> Option<Element> {
        self.inner.upgrade().map(|inner| Element { inner })
    }
}

impl Element {
    fn with_kind(kind: NodeKind, tag: &str) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                id: next_id(),
                kind,
                tag: tag.to_string(),
                attributes: RefCell::new(IndexMap::new()),
                properties: PropertyTable::new(),
                listeners: RefCell::new(Vec::new()),
                observers: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                shadow_root: RefCell::new(None),
                data: RefCell::new(String::new()),
                lifecycle: RefCell::new(None),
                reflecting: Cell::new(false),
            }),
        }
    }

    pub fn new(tag: &str) -> Self {
        Self::with_kind(NodeKind::Element, &tag.to_ascii_lowercase())
    }

    pub fn text(data: &str) -> Self {
        let node = Self::with_kind(NodeKind::Text, "#text");
        *node.inner.data.borrow_mut() = data.to_string();
        node
    }

    /// A tree root. Nodes below a document are connected.
    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document, "#document")
    }

    /// A host without attributes of its own, anchored in `container` for
    /// event propagation but not one of its children.
    pub fn virtual_host(container: &Element) -> Self {
        let host = Self::with_kind(NodeKind::Virtual, "#virtual");
        *host.inner.parent.borrow_mut() = Rc::downgrade(&container.inner);
        host
    }

    pub fn id(&self) -> ElementId {
        self.inner.id
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    pub fn is_virtual(&self) -> bool {
        self.inner.kind == NodeKind::Virtual
    }

    pub fn is_text(&self) -> bool {
        self.inner.kind == NodeKind::Text
    }

    pub fn is_document(&self) -> bool {
        self.inner.kind == NodeKind::Document
    }

    pub fn is_shadow_root(&self) -> bool {
        self.inner.kind == NodeKind::ShadowRoot
    }

    pub fn downgrade(&self) -> WeakElement {
        WeakElement {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // attributes

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.inner.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.inner.attributes.borrow().contains_key(name)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.inner.attributes.borrow().keys().cloned().collect()
    }

    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let old = self
            .inner
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        self.attribute_mutated(name, old, Some(value));
    }

    pub fn remove_attribute(&self, name: &str) {
        let old = self.inner.attributes.borrow_mut().shift_remove(name);
        if old.is_some() {
            self.attribute_mutated(name, old, None);
        }
    }

    pub fn toggle_attribute(&self, name: &str, force: bool) {
        if force {
            if !self.has_attribute(name) {
                self.set_attribute(name, "");
            }
        } else {
            self.remove_attribute(name);
        }
    }

    fn attribute_mutated(&self, name: &str, old: Option<String>, new: Option<String>) {
        let observers: Vec<Rc<dyn Fn(&MutationRecord)>> = self
            .inner
            .observers
            .borrow()
            .iter()
            .filter(|entry| entry.filter.iter().any(|watched| watched == name))
            .map(|entry| Rc::clone(&entry.callback))
            .collect();
        if !observers.is_empty() {
            let record = MutationRecord {
                target: self.clone(),
                attribute_name: name.to_string(),
                old_value: old.clone(),
            };
            for observer in observers {
                observer(&record);
            }
        }

        if let Some(lifecycle) = self.lifecycle() {
            if lifecycle
                .observed_attributes()
                .iter()
                .any(|observed| observed == name)
            {
                lifecycle.attribute_changed(self, name, old.as_deref(), new.as_deref());
            }
        }
    }

    /// Runs `f` with the host-wide reflecting flag raised. The previous
    /// state is restored even if `f` panics.
    pub fn reflect<R>(&self, f: impl FnOnce(&Element) -> R) -> R {
        struct Restore<'a>(&'a Cell<bool>, bool);
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.0.set(self.1);
            }
        }
        let _restore = Restore(&self.inner.reflecting, self.inner.reflecting.replace(true));
        f(self)
    }

    pub fn is_reflecting(&self) -> bool {
        self.inner.reflecting.get()
    }

    // properties

    pub fn properties(&self) -> &PropertyTable {
        &self.inner.properties
    }

    pub fn get_property(&self, key: &str) -> Value {
        self.inner.properties.get(key)
    }

    pub fn set_property(&self, key: &str, value: impl Into<Value>) {
        self.inner.properties.set(key, value.into());
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.inner.properties.has(key)
    }

    pub fn prop<T: PropertyValue>(&self, key: &str) -> Option<T> {
        T::from_value(&self.get_property(key))
    }

    /// Replaces the listener notified after reactive property writes.
    pub fn on_property_change(&self, listener: impl Fn(&str) + 'static) {
        self.inner
            .properties
            .set_change_listener(Some(Rc::new(listener)));
    }

    // events

    pub fn add_event_listener(&self, kind: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        let id = ListenerId(next_id());
        self.inner.listeners.borrow_mut().push(ListenerEntry {
            id,
            kind: kind.to_string(),
            callback: Rc::new(callback),
        });
        id
    }

    pub fn remove_event_listener(&self, id: ListenerId) {
        self.inner
            .listeners
            .borrow_mut()
            .retain(|entry| entry.id != id);
    }

    /// Delivers `event` to this node and, if it bubbles, every ancestor up
    /// through shadow hosts. Returns `false` if the default was prevented.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        event.set_target(self);
        let mut node = Some(self.clone());
        while let Some(current) = node {
            let callbacks: Vec<Rc<dyn Fn(&Event)>> = current
                .inner
                .listeners
                .borrow()
                .iter()
                .filter(|entry| entry.kind == event.kind())
                .map(|entry| Rc::clone(&entry.callback))
                .collect();
            event.set_current_target(Some(&current));
            for callback in callbacks {
                callback(event);
            }
            if !event.is_bubbling() || event.propagation_stopped() {
                break;
            }
            node = current.parent();
        }
        event.set_current_target(None);
        !event.default_prevented()
    }

    // attribute observers

    pub fn observe_attributes(
        &self,
        filter: Vec<String>,
        callback: Rc<dyn Fn(&MutationRecord)>,
    ) -> ObserverId {
        let id = ObserverId(next_id());
        self.inner.observers.borrow_mut().push(ObserverEntry {
            id,
            filter,
            callback,
        });
        id
    }

    pub fn unobserve_attributes(&self, id: ObserverId) {
        self.inner
            .observers
            .borrow_mut()
            .retain(|entry| entry.id != id);
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    // tree

    /// Parent node; for a shadow root this is its host.
    pub fn parent(&self) -> Option<Element> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| Element { inner })
    }

    pub fn children(&self) -> Vec<Element> {
        self.inner.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub fn first_element_child(&self) -> Option<Element> {
        self.inner
            .children
            .borrow()
            .iter()
            .find(|child| !child.is_text())
            .cloned()
    }

    pub fn is_connected(&self) -> bool {
        let mut node = Some(self.clone());
        while let Some(current) = node {
            if current.is_document() {
                return true;
            }
            node = current.parent();
        }
        false
    }

    pub fn append_child(&self, child: &Element) {
        child.remove();
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.children.borrow_mut().push(child.clone());
        if child.is_connected() {
            child.notify_connected();
        }
    }

    pub fn remove_child(&self, child: &Element) {
        let is_child = child.parent().is_some_and(|parent| parent.ptr_eq(self));
        if is_child {
            child.remove();
        }
    }

    /// Detaches this node from its parent. Shadow roots and virtual hosts
    /// are never children and stay anchored.
    pub fn remove(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        let position = parent
            .inner
            .children
            .borrow()
            .iter()
            .position(|child| child.ptr_eq(self));
        let Some(position) = position else {
            return;
        };
        let was_connected = self.is_connected();
        parent.inner.children.borrow_mut().remove(position);
        *self.inner.parent.borrow_mut() = Weak::new();
        if was_connected {
            self.notify_disconnected();
        }
    }

    pub fn attach_shadow(&self) -> Element {
        if let Some(existing) = self.shadow_root() {
            return existing;
        }
        let root = Self::with_kind(NodeKind::ShadowRoot, "#shadow-root");
        *root.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        *self.inner.shadow_root.borrow_mut() = Some(root.clone());
        root
    }

    pub fn shadow_root(&self) -> Option<Element> {
        self.inner.shadow_root.borrow().clone()
    }

    /// Data of a text node.
    pub fn data(&self) -> String {
        self.inner.data.borrow().clone()
    }

    pub fn set_data(&self, data: &str) {
        *self.inner.data.borrow_mut() = data.to_string();
    }

    /// Concatenated text below this node, not descending into shadow roots.
    pub fn text_content(&self) -> String {
        if self.is_text() {
            return self.data();
        }
        self.children()
            .iter()
            .map(Element::text_content)
            .collect()
    }

    pub fn set_text_content(&self, text: &str) {
        for child in self.children() {
            child.remove();
        }
        if !text.is_empty() {
            self.append_child(&Element::text(text));
        }
    }

    /// First descendant (light tree, depth first) with the given tag.
    pub fn find(&self, tag: &str) -> Option<Element> {
        for child in self.children() {
            if child.tag() == tag {
                return Some(child);
            }
            if let Some(found) = child.find(tag) {
                return Some(found);
            }
        }
        None
    }

    // lifecycle

    pub fn set_lifecycle(&self, lifecycle: Rc<dyn ElementLifecycle>) {
        *self.inner.lifecycle.borrow_mut() = Some(lifecycle);
    }

    pub fn lifecycle(&self) -> Option<Rc<dyn ElementLifecycle>> {
        self.inner.lifecycle.borrow().clone()
    }

    fn notify_connected(&self) {
        if let Some(lifecycle) = self.lifecycle() {
            lifecycle.connected(self);
        }
        if let Some(root) = self.shadow_root() {
            root.notify_connected();
        }
        for child in self.children() {
            child.notify_connected();
        }
    }

    fn notify_disconnected(&self) {
        if let Some(lifecycle) = self.lifecycle() {
            lifecycle.disconnected(self);
        }
        if let Some(root) = self.shadow_root() {
            root.notify_disconnected();
        }
        for child in self.children() {
            child.notify_disconnected();
        }
    }
}

impl PropertyAccess for Element {
    fn get(&self, key: &str) -> Value {
        self.get_property(key)
    }

    fn set(&self, key: &str, value: Value) {
        self.inner.properties.set(key, value);
    }

    fn has(&self, key: &str) -> bool {
        self.has_property(key)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.inner.id)
            .field("tag", &self.inner.tag)
            .finish()
    }
}
