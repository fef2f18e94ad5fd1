//! Two-way binding between a host attribute and its camelCase property.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::element::{Element, ElementId, WeakElement};
use crate::error::HookError;
use crate::event::notify_change;
use crate::observer::{self, AttributeWatcher, WatcherId};
use crate::setter::{Setter, Update};
use crate::state::{current_host, try_use_hook, Hook};
use crate::value::{to_camel_case, to_kebab_case, AttributeValue};

struct AttributeHook<T: AttributeValue> {
    host: WeakElement,
    host_id: ElementId,
    property: String,
    attribute: String,
    event_name: String,
    default: T,
    last_reflected: RefCell<Option<T>>,
    /// Attribute text written by the last reflection.
    last_written: RefCell<Option<Option<String>>>,
    registration: Cell<Option<WatcherId>>,
    setter: Setter<T>,
    this: Weak<AttributeHook<T>>,
}

impl<T: AttributeValue> AttributeHook<T> {
    fn new(host: &Element, name: &str, default: T) -> Rc<Self> {
        let property = to_camel_case(name);
        let attribute = to_kebab_case(&property);
        Rc::new_cyclic(|this: &Weak<Self>| {
            let weak = this.clone();
            AttributeHook {
                host: host.downgrade(),
                host_id: host.id(),
                event_name: format!("{attribute}-changed"),
                property,
                attribute,
                default,
                last_reflected: RefCell::new(None),
                last_written: RefCell::new(None),
                registration: Cell::new(None),
                setter: Setter::new(move |update: Update<T>| {
                    if let Some(hook) = weak.upgrade() {
                        hook.set(update);
                    }
                }),
                this: this.clone(),
            }
        })
    }

    fn current(&self, host: &Element) -> T {
        T::from_property(&host.get_property(&self.property), &self.default)
    }

    fn register(&self, host: &Element) {
        if self.registration.get().is_some() {
            return;
        }
        let watcher: Weak<dyn AttributeWatcher> = self.this.clone();
        let id = observer::register(host, &self.attribute, watcher);
        self.registration.set(Some(id));
    }

    fn unregister(&self) {
        if let Some(id) = self.registration.take() {
            observer::unregister(self.host_id, id);
        }
    }

    /// First-use value: a property bound by the parent wins, then the
    /// attribute, then the default.
    fn initialize(&self, host: &Element) {
        if !host.get_property(&self.property).is_null() {
            return;
        }
        let value = if host.has_attribute(&self.attribute) {
            T::from_attribute(host.get_attribute(&self.attribute).as_deref(), &self.default)
        } else {
            self.default.clone()
        };
        self.update_prop(host, value);
    }

    /// Render-time sync: re-registers after a teardown and reflects values
    /// written to the property by other code.
    fn sync(&self, host: &Element) -> T {
        if self.registration.get().is_none() {
            self.register(host);
            self.adopt_missed_attribute(host);
        }
        let current = self.current(host);
        let stale = self.last_reflected.borrow().as_ref() != Some(&current);
        if stale {
            self.reflect(host, &current);
        }
        current
    }

    /// Picks up attribute edits made while unregistered.
    fn adopt_missed_attribute(&self, host: &Element) {
        let Some(written) = self.last_written.borrow().clone() else {
            return;
        };
        let actual = host.get_attribute(&self.attribute);
        if actual != written {
            let value = T::from_attribute(actual.as_deref(), &self.default);
            self.apply_external(host, value);
        }
    }

    fn set(&self, update: Update<T>) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let previous = self.current(&host);
        let next = update.resolve(&previous);
        if previous == next {
            return;
        }
        self.update_prop(&host, next);
    }

    fn update_prop(&self, host: &Element, value: T) {
        let allowed = notify_change(
            host,
            &self.event_name,
            value.clone().into_value(),
            &self.property,
        );
        if !allowed {
            return;
        }
        host.set_property(&self.property, value.clone().into_value());
        self.reflect(host, &value);
    }

    fn reflect(&self, host: &Element, value: &T) {
        let text = value.to_attribute();
        *self.last_reflected.borrow_mut() = Some(value.clone());
        *self.last_written.borrow_mut() = Some(text.clone());
        host.reflect(|host| match text {
            Some(text) => host.set_attribute(&self.attribute, text),
            None => host.remove_attribute(&self.attribute),
        });
    }

    /// External attribute edits go straight to the property, without a
    /// change event.
    fn apply_external(&self, host: &Element, value: T) {
        if value == self.current(host) {
            return;
        }
        *self.last_reflected.borrow_mut() = Some(value.clone());
        *self.last_written.borrow_mut() = Some(host.get_attribute(&self.attribute));
        host.set_property(&self.property, value.into_value());
    }
}

impl<T: AttributeValue> AttributeWatcher for AttributeHook<T> {
    fn attribute_changed(&self, _name: &str, value: Option<&str>) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let value = T::from_attribute(value, &self.default);
        self.apply_external(&host, value);
    }
}

impl<T: AttributeValue> Hook for AttributeHook<T> {
    fn teardown(&self, _disconnected: bool) {
        self.unregister();
    }
}

impl<T: AttributeValue> Drop for AttributeHook<T> {
    fn drop(&mut self) {
        self.unregister();
    }
}

/// Binds attribute `name` with the type's default (`false`, `0` or `""`).
///
/// `name` may be kebab-case or camelCase: the attribute is always
/// kebab-case and the property camelCase. Fails on virtual hosts.
pub fn use_attribute<T: AttributeValue>(name: &str) -> Result<(T, Setter<T>), HookError> {
    use_attribute_with(name, T::type_default())
}

/// Binds attribute `name`, falling back to `default` when neither the
/// property nor the attribute is set.
///
/// Setting a new value dispatches a cancelable `<attribute>-changed` event
/// with a [`ChangeDetail`](crate::ChangeDetail). If it is not prevented,
/// the property is written and the attribute reflected. Attribute edits
/// made by other code update the property without an event.
pub fn use_attribute_with<T: AttributeValue>(
    name: &str,
    default: T,
) -> Result<(T, Setter<T>), HookError> {
    let (hook, created) = try_use_hook(|cx| {
        if cx.is_virtual() {
            return Err(HookError::VirtualHost {
                hook: "use_attribute",
            });
        }
        Ok(AttributeHook::new(cx.host(), name, default))
    })?;
    let host = current_host();
    if created {
        hook.register(&host);
        hook.initialize(&host);
    }
    let value = hook.sync(&host);
    Ok((value, hook.setter.clone()))
}
