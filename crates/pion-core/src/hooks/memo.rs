use std::cell::RefCell;
use std::rc::Rc;

use crate::state::{use_hook, Hook};

struct MemoHook<T, D> {
    memo: RefCell<Option<(D, T)>>,
}

impl<T: 'static, D: 'static> Hook for MemoHook<T, D> {}

/// Recomputes `compute` only when `deps` differs from the previous render.
/// Use a tuple for several dependencies.
pub fn use_memo<T, D>(deps: D, compute: impl FnOnce() -> T) -> T
where
    T: Clone + 'static,
    D: PartialEq + 'static,
{
    let (hook, _) = use_hook(|_| {
        Rc::new(MemoHook::<T, D> {
            memo: RefCell::new(None),
        })
    });
    let cached = match &*hook.memo.borrow() {
        Some((stored, value)) if *stored == deps => Some(value.clone()),
        _ => None,
    };
    if let Some(value) = cached {
        return value;
    }
    let value = compute();
    *hook.memo.borrow_mut() = Some((deps, value.clone()));
    value
}

/// Keeps the same callback instance while `deps` is unchanged.
pub fn use_callback<F, D>(deps: D, callback: F) -> Rc<F>
where
    F: 'static,
    D: PartialEq + 'static,
{
    use_memo(deps, || Rc::new(callback))
}
