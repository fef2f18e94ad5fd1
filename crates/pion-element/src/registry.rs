//! Tag to component mapping, one registry per thread.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use pion_core::{Element, Renderer};
use thiserror::Error;

use crate::component::Component;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefineError {
    #[error("\"{0}\" is not a valid custom element name")]
    InvalidName(String),
    #[error("\"{0}\" has already been defined")]
    AlreadyDefined(String),
    #[error("\"{0}\" is defined with a different render output type")]
    RendererMismatch(String),
}

trait Definition {
    fn create_element(&self, tag: &str) -> Element;
    fn as_any(&self) -> &dyn Any;
}

impl<O: 'static> Definition for Component<O> {
    fn create_element(&self, tag: &str) -> Element {
        Component::create_element(self, tag)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
pub struct Registry {
    definitions: RefCell<IndexMap<String, Rc<dyn Definition>>>,
    hot_replacement: Cell<bool>,
}

thread_local! {
    static CUSTOM_ELEMENTS: Rc<Registry> = Rc::new(Registry::default());
}

/// The registry of the current thread.
pub fn custom_elements() -> Rc<Registry> {
    CUSTOM_ELEMENTS.with(Rc::clone)
}

/// Lowercase, starts with a letter and contains a hyphen.
fn is_valid_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    starts_with_letter
        && tag.contains('-')
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, defining a tag again swaps the new renderer into the
    /// existing definition instead of failing.
    pub fn enable_hot_replacement(&self, enabled: bool) {
        self.hot_replacement.set(enabled);
    }

    pub fn define<O: 'static>(&self, tag: &str, component: &Component<O>) -> Result<(), DefineError> {
        if !is_valid_name(tag) {
            return Err(DefineError::InvalidName(tag.to_string()));
        }
        if self.is_defined(tag) {
            if !self.hot_replacement.get() {
                return Err(DefineError::AlreadyDefined(tag.to_string()));
            }
            let existing = self
                .get::<O>(tag)
                .ok_or_else(|| DefineError::RendererMismatch(tag.to_string()))?;
            if !existing.ptr_eq(component) {
                let updated = existing.replace_renderer(component.renderer());
                log::info!("hot replaced <{tag}>, {updated} instance(s) updated");
            }
            return Ok(());
        }
        log::trace!("defining <{tag}>");
        self.definitions
            .borrow_mut()
            .insert(tag.to_string(), Rc::new(component.clone()));
        Ok(())
    }

    pub fn get<O: 'static>(&self, tag: &str) -> Option<Component<O>> {
        let definitions = self.definitions.borrow();
        let component = definitions
            .get(tag)?
            .as_any()
            .downcast_ref::<Component<O>>()
            .cloned();
        component
    }

    /// Swaps the renderer of `tag` and re-renders its connected elements.
    /// Returns the number of elements updated.
    pub fn replace_renderer<O: 'static>(&self, tag: &str, renderer: Renderer<O>) -> usize {
        match self.get::<O>(tag) {
            Some(component) => component.replace_renderer(renderer),
            None => {
                log::warn!("no component of this output type is defined as <{tag}>");
                0
            }
        }
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.borrow().contains_key(tag)
    }

    /// Defined tags in definition order.
    pub fn tags(&self) -> Vec<String> {
        self.definitions.borrow().keys().cloned().collect()
    }

    /// Creates a `tag` element, upgraded to its component when defined.
    pub fn create_element(&self, tag: &str) -> Element {
        let definition = self.definitions.borrow().get(tag).cloned();
        match definition {
            Some(definition) => definition.create_element(tag),
            None => Element::new(tag),
        }
    }
}
