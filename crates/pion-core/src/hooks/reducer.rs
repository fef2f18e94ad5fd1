use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::setter::Dispatch;
use crate::state::{use_hook, Hook};

type Reducer<S, A> = Rc<dyn Fn(&S, A) -> S>;

struct ReducerHook<S, A> {
    state: RefCell<S>,
    reducer: RefCell<Reducer<S, A>>,
    dispatch: Dispatch<A>,
}

impl<S: 'static, A: 'static> Hook for ReducerHook<S, A> {}

/// State driven by a reducer. The reducer from the latest render handles
/// dispatched actions, and every dispatch schedules a render.
pub fn use_reducer<S, A>(
    reducer: impl Fn(&S, A) -> S + 'static,
    init: impl FnOnce() -> S,
) -> (S, Dispatch<A>)
where
    S: Clone + 'static,
    A: 'static,
{
    let reducer: Reducer<S, A> = Rc::new(reducer);
    let (hook, created) = use_hook(|cx| {
        let state = cx.state();
        let initial = init();
        let reducer = Rc::clone(&reducer);
        Rc::new_cyclic(|weak: &Weak<ReducerHook<S, A>>| {
            let weak = weak.clone();
            ReducerHook {
                state: RefCell::new(initial),
                reducer: RefCell::new(reducer),
                dispatch: Dispatch::new(move |action: A| {
                    let Some(hook) = weak.upgrade() else {
                        return;
                    };
                    let reducer = Rc::clone(&hook.reducer.borrow());
                    let current = hook.state.borrow().clone();
                    let next = reducer(&current, action);
                    *hook.state.borrow_mut() = next;
                    state.update();
                }),
            }
        })
    });
    if !created {
        *hook.reducer.borrow_mut() = reducer;
    }
    let value = hook.state.borrow().clone();
    (value, hook.dispatch.clone())
}
