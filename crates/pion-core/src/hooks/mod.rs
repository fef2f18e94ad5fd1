//! Hook factory functions. Each may only be called while a component is
//! rendering, unconditionally and in the same order on every render.

mod attribute;
mod context;
mod effect;
mod host;
mod memo;
mod property;
mod reducer;
mod reference;
mod state;

pub use attribute::{use_attribute, use_attribute_with};
pub use context::{create_context, use_context, Context, ContextProvider, CONTEXT_EVENT};
pub use effect::{
    use_async_effect, use_effect, use_effect_always, use_layout_effect,
    use_layout_effect_always, IntoCleanup,
};
pub use host::use_host;
pub use memo::{use_callback, use_memo};
pub use property::{use_property, use_reflected_property};
pub use reducer::use_reducer;
pub use reference::{use_ref, Ref};
pub use state::use_state;
