#![doc = r"Hook state, three-phase scheduling and attribute reflection for custom element components."]

pub mod collections;
pub mod element;
pub mod error;
pub mod event;
pub mod hooks;
pub mod observer;
pub mod properties;
pub mod scheduler;
pub mod setter;
pub mod state;
pub mod task;
pub mod value;

pub use element::{
    Element, ElementId, ElementLifecycle, ListenerId, MutationRecord, ObserverId, WeakElement,
};
pub use error::{HookError, UncaughtError};
pub use event::{lift, ChangeDetail, Event};
pub use hooks::*;
pub use observer::{AttributeWatcher, MutationObserver, WatcherId};
pub use properties::{PropertyAccess, PropertyTable};
pub use scheduler::{Commit, EffectKind, Phase, Renderer, Scheduler};
pub use setter::{Dispatch, Setter, Update};
pub use state::{current_state, is_rendering, try_use_hook, use_hook, Hook, HookContext, State, WeakState};
pub use task::{queue_microtask, read, run_microtasks, spawn_local, write};
pub use value::{
    format_number, parse_float, reflect_value, to_camel_case, to_kebab_case, AttributeKind,
    AttributeValue, PropertyValue, Value,
};

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod hooks_tests;
