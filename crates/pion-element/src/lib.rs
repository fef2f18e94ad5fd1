//! Custom element integration for pion components.
//!
//! A [`Pion`] binds an external render function (the template backend) to
//! hook-based renderers. Each [`Component`] creates elements whose lifecycle
//! callbacks drive a [`pion_core::Scheduler`], and the per-thread
//! [`Registry`] maps tags to component definitions.

mod component;
mod registry;
mod virtual_component;

pub use component::{Component, ComponentOptions, Pion, RenderFunction, RenderResult};
pub use registry::{custom_elements, DefineError, Registry};
pub use virtual_component::VirtualComponent;

pub mod prelude {
    pub use crate::{custom_elements, Component, ComponentOptions, Pion, RenderResult};
    pub use pion_core::hooks::*;
    pub use pion_core::{lift, Element, HookError, Setter};
}
