use std::cell::{self, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::state::{use_hook, Hook};

/// A mutable cell that lives as long as the component. Writing to it never
/// schedules a render.
pub struct Ref<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Ref<T> {
    pub fn borrow(&self) -> cell::Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> cell::RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    pub fn set(&self, value: T) {
        *self.inner.borrow_mut() = value;
    }

    pub fn replace(&self, value: T) -> T {
        self.inner.replace(value)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Ref<T> {
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&self.inner.borrow()).finish()
    }
}

struct RefHook<T> {
    cell: Ref<T>,
}

impl<T: 'static> Hook for RefHook<T> {}

pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> Ref<T> {
    let (hook, _) = use_hook(|_| {
        Rc::new(RefHook {
            cell: Ref {
                inner: Rc::new(RefCell::new(init())),
            },
        })
    });
    hook.cell.clone()
}
