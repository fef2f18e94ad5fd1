//! Positional hook storage for one host.
//!
//! A hook is identified by the order in which the renderer calls it. The
//! first render appends every hook; later renders must call the same hooks
//! in the same order and get the same instances back.

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::{Rc, Weak};

use scoped_tls_hkt::scoped_thread_local;

use crate::element::{Element, WeakElement};
use crate::scheduler::{EffectKind, Phase};

/// Per-call-site state living in a [`State`].
pub trait Hook: Any {
    /// Runs the hook's side effect during an effects pass.
    fn call(&self) {}

    /// Releases whatever the hook holds. `disconnected` is set when the
    /// host left the document.
    fn teardown(&self, _disconnected: bool) {}
}

/// What a hook gets to see while it is being created.
#[derive(Clone)]
pub struct HookContext {
    id: usize,
    state: WeakState,
    host: Element,
    is_virtual: bool,
}

impl HookContext {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WeakState {
        self.state.clone()
    }

    pub fn host(&self) -> &Element {
        &self.host
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }
}

struct HookEntry {
    hook: Rc<dyn Hook>,
    any: Rc<dyn Any>,
    type_name: &'static str,
}

struct StateInner {
    host: WeakElement,
    is_virtual: bool,
    on_update: Box<dyn Fn()>,
    hooks: RefCell<Vec<HookEntry>>,
    cursor: Cell<usize>,
    effects: RefCell<Vec<usize>>,
    layout_effects: RefCell<Vec<usize>>,
    phase: Cell<Option<Phase>>,
    rendering: Cell<bool>,
}

#[derive(Clone)]
pub struct State {
    inner: Rc<StateInner>,
}

#[derive(Clone, Default)]
pub struct WeakState {
    inner: Weak<StateInner>,
}

impl WeakState {
    pub fn upgrade(&self) -> Option<State> {
        self.inner.upgrade().map(|inner| State { inner })
    }

    /// Requests a render if the state is still alive.
    pub fn update(&self) {
        if let Some(state) = self.upgrade() {
            state.update();
        }
    }
}

struct RenderScope {
    state: State,
    host: Element,
}

scoped_thread_local!(static CURRENT: RenderScope);

impl State {
    /// `on_update` is what [`State::update`] calls, normally the owning
    /// scheduler's `update`.
    pub fn new(host: &Element, on_update: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(StateInner {
                host: host.downgrade(),
                is_virtual: host.is_virtual(),
                on_update: Box::new(on_update),
                hooks: RefCell::new(Vec::new()),
                cursor: Cell::new(0),
                effects: RefCell::new(Vec::new()),
                layout_effects: RefCell::new(Vec::new()),
                phase: Cell::new(None),
                rendering: Cell::new(false),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakState {
        WeakState {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn host(&self) -> Option<Element> {
        self.inner.host.upgrade()
    }

    pub fn is_virtual(&self) -> bool {
        self.inner.is_virtual
    }

    pub fn update(&self) {
        (self.inner.on_update)();
    }

    pub fn phase(&self) -> Option<Phase> {
        self.inner.phase.get()
    }

    pub(crate) fn set_phase(&self, phase: Option<Phase>) {
        self.inner.phase.set(phase);
    }

    pub fn hook_count(&self) -> usize {
        self.inner.hooks.borrow().len()
    }

    pub fn cursor(&self) -> usize {
        self.inner.cursor.get()
    }

    pub fn is_rendering(&self) -> bool {
        self.inner.rendering.get()
    }

    /// Runs one render pass with this state installed as the current one.
    /// Returns `None` if the host is gone.
    ///
    /// # Panics
    ///
    /// Panics if this state is already rendering.
    pub fn run<R>(&self, render: impl FnOnce(&Element) -> R) -> Option<R> {
        let host = self.host()?;
        assert!(
            !self.inner.rendering.get(),
            "state for <{}> is already rendering",
            host.tag()
        );

        struct Rendering<'a>(&'a Cell<bool>);
        impl Drop for Rendering<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }
        self.inner.rendering.set(true);
        let _rendering = Rendering(&self.inner.rendering);

        self.inner.cursor.set(0);
        let scope = RenderScope {
            state: self.clone(),
            host: host.clone(),
        };
        let result = CURRENT.set(&scope, || render(&host));

        let expected = self.hook_count();
        if self.inner.cursor.get() < expected {
            log::warn!(
                "<{}> called {} of its {expected} hooks; hooks must run unconditionally",
                host.tag(),
                self.inner.cursor.get()
            );
        }
        Some(result)
    }

    /// Resolves the hook at the cursor, creating it on first use. The bool
    /// is `true` when the hook was just created.
    ///
    /// # Panics
    ///
    /// Panics if the hook stored at this position is of another type, which
    /// means the renderer changed its hook order.
    pub fn hook<H: Hook>(
        &self,
        host: &Element,
        create: impl FnOnce(&HookContext) -> Rc<H>,
    ) -> (Rc<H>, bool) {
        match self.try_hook(host, |cx| Ok::<_, Infallible>(create(cx))) {
            Ok(resolved) => resolved,
            Err(never) => match never {},
        }
    }

    /// Like [`State::hook`] but creation may fail. A failed creation leaves
    /// the cursor where it was.
    pub fn try_hook<H: Hook, E>(
        &self,
        host: &Element,
        create: impl FnOnce(&HookContext) -> Result<Rc<H>, E>,
    ) -> Result<(Rc<H>, bool), E> {
        let index = self.inner.cursor.get();
        let existing = self
            .inner
            .hooks
            .borrow()
            .get(index)
            .map(|entry| (Rc::clone(&entry.any), entry.type_name));

        let resolved = match existing {
            Some((any, stored)) => match any.downcast::<H>() {
                Ok(hook) => (hook, false),
                Err(_) => panic!(
                    "hook order changed between renders: position {index} holds `{stored}` but `{}` was called",
                    type_name::<H>()
                ),
            },
            None => {
                let cx = HookContext {
                    id: index,
                    state: self.downgrade(),
                    host: host.clone(),
                    is_virtual: self.inner.is_virtual,
                };
                let hook = create(&cx)?;
                self.inner.hooks.borrow_mut().push(HookEntry {
                    hook: Rc::clone(&hook) as Rc<dyn Hook>,
                    any: Rc::clone(&hook) as Rc<dyn Any>,
                    type_name: type_name::<H>(),
                });
                (hook, true)
            }
        };
        self.inner.cursor.set(index + 1);
        Ok(resolved)
    }

    /// Queues hook `id` for the next effects pass of `kind`.
    pub fn queue_effect(&self, kind: EffectKind, id: usize) {
        let mut queue = self.queue(kind).borrow_mut();
        if !queue.contains(&id) {
            queue.push(id);
        }
    }

    pub fn pending_effects(&self, kind: EffectKind) -> usize {
        self.queue(kind).borrow().len()
    }

    fn queue(&self, kind: EffectKind) -> &RefCell<Vec<usize>> {
        match kind {
            EffectKind::Layout => &self.inner.layout_effects,
            EffectKind::Passive => &self.inner.effects,
        }
    }

    /// Calls every queued hook of `kind` in call order and empties the queue.
    pub fn run_effects(&self, kind: EffectKind) {
        let ids = std::mem::take(&mut *self.queue(kind).borrow_mut());
        for id in ids {
            let hook = self
                .inner
                .hooks
                .borrow()
                .get(id)
                .map(|entry| Rc::clone(&entry.hook));
            if let Some(hook) = hook {
                hook.call();
            }
        }
    }

    /// Tears down every hook and rewinds the cursor. The hooks themselves
    /// stay, so their state survives a reconnect.
    pub fn teardown(&self) {
        let hooks: Vec<Rc<dyn Hook>> = self
            .inner
            .hooks
            .borrow()
            .iter()
            .map(|entry| Rc::clone(&entry.hook))
            .collect();
        for hook in hooks {
            hook.teardown(true);
        }
        self.inner.effects.borrow_mut().clear();
        self.inner.layout_effects.borrow_mut().clear();
        self.inner.cursor.set(0);
    }
}

/// True while some state is rendering on this thread.
pub fn is_rendering() -> bool {
    CURRENT.is_set()
}

fn with_scope<R>(f: impl FnOnce(&RenderScope) -> R) -> R {
    assert!(
        CURRENT.is_set(),
        "hooks can only be called while a component is rendering"
    );
    CURRENT.with(f)
}

/// The state currently rendering.
///
/// # Panics
///
/// Panics outside a render pass.
pub fn current_state() -> State {
    with_scope(|scope| scope.state.clone())
}

/// Resolves a hook in the current render pass. See [`State::hook`].
pub fn use_hook<H: Hook>(create: impl FnOnce(&HookContext) -> Rc<H>) -> (Rc<H>, bool) {
    let (state, host) = with_scope(|scope| (scope.state.clone(), scope.host.clone()));
    state.hook(&host, create)
}

/// Resolves a hook whose creation may fail. See [`State::try_hook`].
pub fn try_use_hook<H: Hook, E>(
    create: impl FnOnce(&HookContext) -> Result<Rc<H>, E>,
) -> Result<(Rc<H>, bool), E> {
    let (state, host) = with_scope(|scope| (scope.state.clone(), scope.host.clone()));
    state.try_hook(&host, create)
}

pub(crate) fn current_host() -> Element {
    with_scope(|scope| scope.host.clone())
}
