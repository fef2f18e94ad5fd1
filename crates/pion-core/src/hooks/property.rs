use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::element::{Element, WeakElement};
use crate::error::HookError;
use crate::event::notify_change;
use crate::setter::{Setter, Update};
use crate::state::{current_host, try_use_hook, use_hook, Hook};
use crate::value::{reflect_value, to_kebab_case, PropertyValue, Value};

struct PropertyHook<T> {
    host: WeakElement,
    property: String,
    event_name: String,
    /// Kebab-case attribute the property is mirrored to, if reflecting.
    attribute: Option<String>,
    initial: T,
    last_reflected: RefCell<Option<Value>>,
    setter: Setter<T>,
}

impl<T: PropertyValue> PropertyHook<T> {
    fn new(host: &Element, name: &str, initial: T, reflect: bool) -> Rc<Self> {
        let attribute = to_kebab_case(name);
        Rc::new_cyclic(|this: &Weak<Self>| {
            let weak = this.clone();
            PropertyHook {
                host: host.downgrade(),
                property: name.to_string(),
                event_name: format!("{attribute}-changed"),
                attribute: reflect.then_some(attribute),
                initial,
                last_reflected: RefCell::new(None),
                setter: Setter::new(move |update: Update<T>| {
                    if let Some(hook) = weak.upgrade() {
                        hook.set(update);
                    }
                }),
            }
        })
    }

    /// Property value, or the initial value when the property holds
    /// nothing of type `T`.
    fn current(&self, host: &Element) -> T {
        T::from_value(&host.get_property(&self.property)).unwrap_or_else(|| self.initial.clone())
    }

    fn initialize(&self, host: &Element) {
        if !host.get_property(&self.property).is_null() {
            return;
        }
        let initial = self.initial.clone();
        if initial.clone().into_value().is_null() {
            return;
        }
        self.update_prop(host, initial);
    }

    fn sync(&self, host: &Element) -> T {
        if self.attribute.is_some() {
            let value = host.get_property(&self.property);
            let stale = self.last_reflected.borrow().as_ref() != Some(&value);
            if stale {
                self.reflect(host, &value);
            }
        }
        self.current(host)
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
        let value = value.into_value();
        if !notify_change(host, &self.event_name, value.clone(), &self.property) {
            return;
        }
        host.set_property(&self.property, value.clone());
        if self.attribute.is_some() {
            self.reflect(host, &value);
        }
    }

    fn reflect(&self, host: &Element, value: &Value) {
        let Some(attribute) = self.attribute.as_deref() else {
            return;
        };
        *self.last_reflected.borrow_mut() = Some(value.clone());
        host.reflect(|host| match reflect_value(value) {
            Some(text) => host.set_attribute(attribute, text),
            None => host.remove_attribute(attribute),
        });
    }
}

impl<T: PropertyValue> Hook for PropertyHook<T> {}

/// Binds host property `name`, initialized to `initial` unless the parent
/// already set it (or `initial` is null).
///
/// Setting a new value dispatches a cancelable `<kebab-name>-changed`
/// event first; a prevented event leaves the property untouched. Works on
/// virtual hosts.
pub fn use_property<T: PropertyValue>(name: &str, initial: T) -> (T, Setter<T>) {
    let (hook, created) = use_hook(|cx| PropertyHook::new(cx.host(), name, initial, false));
    let host = current_host();
    if created {
        hook.initialize(&host);
    }
    let value = hook.sync(&host);
    (value, hook.setter.clone())
}

/// [`use_property`] that also mirrors the value to the kebab-case
/// attribute: `true` as an empty attribute, `false` and null removed,
/// anything else stringified. Fails on virtual hosts.
pub fn use_reflected_property<T: PropertyValue>(
    name: &str,
    initial: T,
) -> Result<(T, Setter<T>), HookError> {
    let (hook, created) = try_use_hook(|cx| {
        if cx.is_virtual() {
            return Err(HookError::VirtualHost {
                hook: "use_reflected_property",
            });
        }
        Ok(PropertyHook::new(cx.host(), name, initial, true))
    })?;
    let host = current_host();
    if created {
        hook.initialize(&host);
    }
    let value = hook.sync(&host);
    Ok((value, hook.setter.clone()))
}
