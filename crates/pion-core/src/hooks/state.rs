use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::setter::{Setter, Update};
use crate::state::{use_hook, Hook};

struct StateHook<T> {
    value: RefCell<T>,
    setter: Setter<T>,
}

impl<T: 'static> Hook for StateHook<T> {}

/// Local state that survives re-renders.
///
/// The setter applies the new value right away and schedules a render;
/// setting an equal value does nothing. Several calls before the next frame
/// share one render.
pub fn use_state<T>(init: impl FnOnce() -> T) -> (T, Setter<T>)
where
    T: Clone + PartialEq + 'static,
{
    let (hook, _) = use_hook(|cx| {
        let state = cx.state();
        let initial = init();
        Rc::new_cyclic(|weak: &Weak<StateHook<T>>| {
            let weak = weak.clone();
            StateHook {
                value: RefCell::new(initial),
                setter: Setter::new(move |update: Update<T>| {
                    let Some(hook) = weak.upgrade() else {
                        return;
                    };
                    let previous = hook.value.borrow().clone();
                    let next = update.resolve(&previous);
                    if previous == next {
                        return;
                    }
                    *hook.value.borrow_mut() = next;
                    state.update();
                }),
            }
        })
    });
    let value = hook.value.borrow().clone();
    (value, hook.setter.clone())
}
