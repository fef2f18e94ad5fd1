//! Three-phase update cycle for one host.
//!
//! `update` queues a render on the read runner. The render queues a commit
//! (followed by layout effects) on the write runner, and the commit queues
//! passive effects on a later write batch.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::element::{Element, WeakElement};
use crate::state::State;
use crate::task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Update,
    Commit,
    Effects,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Layout,
    Passive,
}

/// Produces a render result from the host.
pub type Renderer<O> = Rc<dyn Fn(&Element) -> O>;

/// Applies a render result, implemented by the host integration.
pub trait Commit<O> {
    fn commit(&self, result: O);
}

impl<O, F: Fn(O)> Commit<O> for F {
    fn commit(&self, result: O) {
        self(result)
    }
}

struct SchedulerInner<O> {
    renderer: RefCell<Renderer<O>>,
    host: WeakElement,
    state: State,
    commit: Box<dyn Commit<O>>,
    update_queued: Cell<bool>,
    active: Cell<bool>,
}

pub struct Scheduler<O: 'static> {
    inner: Rc<SchedulerInner<O>>,
}

impl<O: 'static> Clone for Scheduler<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Clears `update_queued` when the read task is done with it, including
/// when the render panics.
struct QueuedGuard<O: 'static>(Rc<SchedulerInner<O>>);

impl<O: 'static> Drop for QueuedGuard<O> {
    fn drop(&mut self) {
        self.0.update_queued.set(false);
    }
}

impl<O: 'static> Scheduler<O> {
    /// Creates the scheduler and its state, and subscribes to reactive
    /// property writes on `host`.
    pub fn new(
        host: &Element,
        renderer: impl Fn(&Element) -> O + 'static,
        commit: impl Commit<O> + 'static,
    ) -> Self {
        let renderer: Renderer<O> = Rc::new(renderer);
        let inner = Rc::new_cyclic(|weak: &Weak<SchedulerInner<O>>| {
            let weak = weak.clone();
            SchedulerInner {
                renderer: RefCell::new(renderer),
                host: host.downgrade(),
                state: State::new(host, move || {
                    if let Some(inner) = weak.upgrade() {
                        SchedulerInner::update(&inner);
                    }
                }),
                commit: Box::new(commit),
                update_queued: Cell::new(false),
                active: Cell::new(true),
            }
        });

        let weak = Rc::downgrade(&inner);
        host.on_property_change(move |_| {
            if let Some(inner) = weak.upgrade() {
                SchedulerInner::update(&inner);
            }
        });

        Self { inner }
    }

    /// Queues one render/commit/effects cycle unless paused or already
    /// queued.
    pub fn update(&self) {
        SchedulerInner::update(&self.inner);
    }

    pub fn pause(&self) {
        self.inner.active.set(false);
    }

    pub fn resume(&self) {
        self.inner.active.set(true);
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn is_update_queued(&self) -> bool {
        self.inner.update_queued.get()
    }

    pub fn teardown(&self) {
        self.inner.state.teardown();
    }

    pub fn state(&self) -> &State {
        &self.inner.state
    }

    pub fn host(&self) -> Option<Element> {
        self.inner.host.upgrade()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.inner.state.phase()
    }

    pub fn renderer(&self) -> Renderer<O> {
        Rc::clone(&self.inner.renderer.borrow())
    }

    /// Swaps the renderer. Hook state is kept.
    pub fn set_renderer(&self, renderer: Renderer<O>) {
        *self.inner.renderer.borrow_mut() = renderer;
    }
}

impl<O: 'static> SchedulerInner<O> {
    fn update(this: &Rc<Self>) {
        if !this.active.get() || this.update_queued.get() {
            return;
        }
        this.update_queued.set(true);
        let guard = QueuedGuard(Rc::clone(this));
        task::read(move || {
            let inner = Rc::clone(&guard.0);
            let result = inner.render();
            drop(guard);
            let Some(result) = result else {
                return;
            };
            task::write(move || {
                inner.commit(result);
                task::write(move || inner.run_effects());
            });
        });
    }

    fn render(&self) -> Option<O> {
        let renderer = Rc::clone(&self.renderer.borrow());
        let _phase = PhaseGuard::enter(&self.state, Phase::Update);
        let result = self.state.run(|host| renderer(host));
        if result.is_none() {
            log::trace!("skipping render, host dropped");
        }
        result
    }

    fn commit(&self, result: O) {
        let _phase = PhaseGuard::enter(&self.state, Phase::Commit);
        self.commit.commit(result);
        self.state.run_effects(EffectKind::Layout);
    }

    fn run_effects(&self) {
        let _phase = PhaseGuard::enter(&self.state, Phase::Effects);
        self.state.run_effects(EffectKind::Passive);
    }
}

/// Reports `phase` until dropped, so a panicking renderer or effect leaves
/// the scheduler idle.
struct PhaseGuard<'a>(&'a State);

impl<'a> PhaseGuard<'a> {
    fn enter(state: &'a State, phase: Phase) -> Self {
        state.set_phase(Some(phase));
        Self(state)
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.set_phase(None);
    }
}
