use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use crate::scheduler::EffectKind;
use crate::state::{use_hook, Hook, WeakState};
use crate::task;

type Cleanup = Box<dyn FnOnce()>;
type Callback = Box<dyn FnOnce() -> Option<Cleanup>>;

/// What an effect body may return: nothing, or a cleanup closure.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl<F: FnOnce() + 'static> IntoCleanup for F {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(Box::new(self))
    }
}

struct EffectHook<D> {
    id: usize,
    kind: EffectKind,
    state: WeakState,
    callback: RefCell<Option<Callback>>,
    /// Dependencies passed by the latest render, `None` meaning every time.
    deps: RefCell<Option<D>>,
    /// Dependencies of the last run, `None` before the first run.
    last: RefCell<Option<D>>,
    cleanup: RefCell<Option<Cleanup>>,
}

impl<D: PartialEq + 'static> EffectHook<D> {
    fn run(&self, callback: Callback) {
        let previous = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = previous {
            cleanup();
        }
        let cleanup = callback();
        *self.cleanup.borrow_mut() = cleanup;
    }
}

impl<D: PartialEq + 'static> Hook for EffectHook<D> {
    fn call(&self) {
        let Some(callback) = self.callback.borrow_mut().take() else {
            return;
        };
        let deps = self.deps.borrow_mut().take();
        let due = match (&deps, &*self.last.borrow()) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(next), Some(last)) => next != last,
        };
        if !due {
            return;
        }
        *self.last.borrow_mut() = deps;
        self.run(callback);
    }

    fn teardown(&self, disconnected: bool) {
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
        if disconnected {
            self.last.borrow_mut().take();
        }
    }
}

impl<D> Drop for EffectHook<D> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.get_mut().take() {
            cleanup();
        }
    }
}

fn use_effect_with<D, C>(kind: EffectKind, deps: Option<D>, effect: impl FnOnce() -> C + 'static)
where
    D: PartialEq + 'static,
    C: IntoCleanup,
{
    let (hook, _) = use_hook(|cx| {
        Rc::new(EffectHook::<D> {
            id: cx.id(),
            kind,
            state: cx.state(),
            callback: RefCell::new(None),
            deps: RefCell::new(None),
            last: RefCell::new(None),
            cleanup: RefCell::new(None),
        })
    });
    *hook.callback.borrow_mut() = Some(Box::new(move || effect().into_cleanup()));
    *hook.deps.borrow_mut() = deps;
    if let Some(state) = hook.state.upgrade() {
        state.queue_effect(hook.kind, hook.id);
    }
}

/// Runs `effect` after the commit whenever `deps` changed since its last
/// run. `()` as deps runs once per connect. A returned closure is called
/// before the next run and on disconnect.
pub fn use_effect<D, C>(deps: D, effect: impl FnOnce() -> C + 'static)
where
    D: PartialEq + 'static,
    C: IntoCleanup,
{
    use_effect_with(EffectKind::Passive, Some(deps), effect);
}

/// Runs `effect` after every commit.
pub fn use_effect_always<C: IntoCleanup>(effect: impl FnOnce() -> C + 'static) {
    use_effect_with::<(), C>(EffectKind::Passive, None, effect);
}

/// Like [`use_effect`], but runs right after the commit, before the next
/// frame's passive effects.
pub fn use_layout_effect<D, C>(deps: D, effect: impl FnOnce() -> C + 'static)
where
    D: PartialEq + 'static,
    C: IntoCleanup,
{
    use_effect_with(EffectKind::Layout, Some(deps), effect);
}

pub fn use_layout_effect_always<C: IntoCleanup>(effect: impl FnOnce() -> C + 'static) {
    use_effect_with::<(), C>(EffectKind::Layout, None, effect);
}

/// Spawns the future returned by `effect` whenever `deps` changed. The
/// future is not awaited and provides no cleanup.
pub fn use_async_effect<D, F>(deps: D, effect: impl FnOnce() -> F + 'static)
where
    D: PartialEq + 'static,
    F: Future<Output = ()> + 'static,
{
    use_effect(deps, move || task::spawn_local(effect()));
}
