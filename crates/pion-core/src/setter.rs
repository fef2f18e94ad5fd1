use std::fmt;
use std::rc::Rc;

/// A new value, or a function computing it from the previous one.
pub enum Update<T> {
    Replace(T),
    Apply(Box<dyn FnOnce(&T) -> T>),
}

impl<T> Update<T> {
    pub fn resolve(self, previous: &T) -> T {
        match self {
            Update::Replace(value) => value,
            Update::Apply(f) => f(previous),
        }
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Update::Replace(value)
    }
}

/// Setter half of a `(value, setter)` pair.
///
/// Created once per hook, so every render hands out the same setter.
pub struct Setter<T> {
    inner: Rc<dyn Fn(Update<T>)>,
}

impl<T: 'static> Setter<T> {
    pub fn new(f: impl Fn(Update<T>) + 'static) -> Self {
        Self { inner: Rc::new(f) }
    }

    pub fn set(&self, value: T) {
        (self.inner)(Update::Replace(value));
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        (self.inner)(Update::Apply(Box::new(f)));
    }

    pub fn apply(&self, update: Update<T>) {
        (self.inner)(update);
    }
}

impl<T> Setter<T> {
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Setter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").finish_non_exhaustive()
    }
}

/// Sends actions to a reducer hook.
pub struct Dispatch<A> {
    inner: Rc<dyn Fn(A)>,
}

impl<A: 'static> Dispatch<A> {
    pub fn new(f: impl Fn(A) + 'static) -> Self {
        Self { inner: Rc::new(f) }
    }

    pub fn dispatch(&self, action: A) {
        (self.inner)(action);
    }
}

impl<A> Dispatch<A> {
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> PartialEq for Dispatch<A> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch").finish_non_exhaustive()
    }
}
