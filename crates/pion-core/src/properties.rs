use std::cell::RefCell;
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::value::Value;

/// Capability interface for reading and writing dynamic properties.
pub trait PropertyAccess {
    fn get(&self, key: &str) -> Value;
    fn set(&self, key: &str, value: Value);
    fn has(&self, key: &str) -> bool;
}

enum Descriptor {
    /// Private data (`_`-prefixed keys), never notifies.
    Plain(Value),
    Reactive { value: Value, is_setup: bool },
}

/// Per-instance descriptor table.
///
/// A write to an unknown key installs its descriptor first. Reactive
/// descriptors notify the change listener on the first write and on every
/// later write of a different value.
#[derive(Default)]
pub struct PropertyTable {
    descriptors: RefCell<HashMap<String, Descriptor>>,
    on_change: RefCell<Option<Rc<dyn Fn(&str)>>>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_change_listener(&self, listener: Option<Rc<dyn Fn(&str)>>) {
        *self.on_change.borrow_mut() = listener;
    }

    pub fn keys(&self) -> Vec<String> {
        self.descriptors.borrow().keys().cloned().collect()
    }

    fn install(key: &str) -> Descriptor {
        if key.starts_with('_') {
            Descriptor::Plain(Value::Null)
        } else {
            Descriptor::Reactive {
                value: Value::Null,
                is_setup: false,
            }
        }
    }
}

impl PropertyAccess for PropertyTable {
    fn get(&self, key: &str) -> Value {
        match self.descriptors.borrow().get(key) {
            Some(Descriptor::Plain(value)) | Some(Descriptor::Reactive { value, .. }) => {
                value.clone()
            }
            None => Value::Null,
        }
    }

    fn set(&self, key: &str, new_value: Value) {
        let changed = {
            let mut descriptors = self.descriptors.borrow_mut();
            let descriptor = descriptors
                .entry(key.to_string())
                .or_insert_with(|| Self::install(key));
            match descriptor {
                Descriptor::Plain(value) => {
                    *value = new_value;
                    false
                }
                Descriptor::Reactive { value, is_setup } => {
                    if *is_setup && value.same_value(&new_value) {
                        false
                    } else {
                        *is_setup = true;
                        *value = new_value;
                        true
                    }
                }
            }
        };
        if changed {
            let listener = self.on_change.borrow().clone();
            if let Some(listener) = listener {
                listener(key);
            }
        }
    }

    fn has(&self, key: &str) -> bool {
        self.descriptors.borrow().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recording(table: &PropertyTable) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        table.set_change_listener(Some(Rc::new(move |key: &str| {
            sink.borrow_mut().push(key.to_string())
        })));
        log
    }

    #[test]
    fn unknown_keys_read_as_null() {
        let table = PropertyTable::new();
        assert!(table.get("missing").is_null());
        assert!(!table.has("missing"));
    }

    #[test]
    fn reactive_writes_notify_only_on_change() {
        let table = PropertyTable::new();
        let log = recording(&table);

        table.set("count", Value::Number(1.0));
        table.set("count", Value::Number(1.0));
        table.set("count", Value::Number(2.0));

        assert_eq!(*log.borrow(), vec!["count", "count"]);
        assert_eq!(table.get("count"), Value::Number(2.0));
    }

    #[test]
    fn first_write_notifies_even_with_null() {
        let table = PropertyTable::new();
        let log = recording(&table);
        table.set("value", Value::Null);
        assert_eq!(log.borrow().len(), 1);
        assert!(table.has("value"));
    }

    #[test]
    fn private_keys_are_plain() {
        let table = PropertyTable::new();
        let log = recording(&table);
        table.set("_cache", Value::Number(3.0));
        table.set("_cache", Value::Number(4.0));
        assert!(log.borrow().is_empty());
        assert_eq!(table.get("_cache"), Value::Number(4.0));
    }

    #[test]
    fn listener_may_read_the_table() {
        let table = Rc::new(PropertyTable::new());
        let seen = Rc::new(RefCell::new(Value::Null));
        let weak = Rc::downgrade(&table);
        let sink = Rc::clone(&seen);
        table.set_change_listener(Some(Rc::new(move |key: &str| {
            if let Some(table) = weak.upgrade() {
                *sink.borrow_mut() = table.get(key);
            }
        })));
        table.set("name", Value::from("pion"));
        assert_eq!(*seen.borrow(), Value::from("pion"));
    }
}
