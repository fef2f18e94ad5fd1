use std::cell::RefCell;
use std::rc::{Rc, Weak};

use pion_core::{to_camel_case, Element, ElementLifecycle, Renderer, Scheduler, Value, WeakElement};

use crate::virtual_component::VirtualComponent;

/// What the external render function hands back. Kept by the host and told
/// when the host enters or leaves the document.
pub trait RenderResult {
    fn set_connected(&self, _connected: bool) {}
}

impl RenderResult for () {}

/// Renders a component's output into a container element.
pub type RenderFunction<O> = Rc<dyn Fn(O, &Element) -> Rc<dyn RenderResult>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentOptions {
    /// Attributes whose changes are written to the camelCase property.
    pub observed_attributes: Vec<String>,
    /// Render into a shadow root instead of the element itself.
    pub use_shadow_dom: bool,
}

impl Default for ComponentOptions {
    fn default() -> Self {
        Self {
            observed_attributes: Vec::new(),
            use_shadow_dom: true,
        }
    }
}

/// Entry point binding a render function to component definitions.
pub struct Pion<O: 'static> {
    render: RenderFunction<O>,
}

impl<O: 'static> Clone for Pion<O> {
    fn clone(&self) -> Self {
        Self {
            render: Rc::clone(&self.render),
        }
    }
}

impl<O: 'static> Pion<O> {
    pub fn new(render: impl Fn(O, &Element) -> Rc<dyn RenderResult> + 'static) -> Self {
        Self {
            render: Rc::new(render),
        }
    }

    pub fn component(&self, renderer: impl Fn(&Element) -> O + 'static) -> Component<O> {
        self.component_with(renderer, ComponentOptions::default())
    }

    pub fn component_with(
        &self,
        renderer: impl Fn(&Element) -> O + 'static,
        options: ComponentOptions,
    ) -> Component<O> {
        Component {
            inner: Rc::new(ComponentInner {
                render: Rc::clone(&self.render),
                renderer: RefCell::new(Rc::new(renderer)),
                options,
                instances: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Renders `renderer` into `container` on a virtual host. Attribute
    /// binding hooks are unavailable there.
    pub fn mount_virtual(
        &self,
        renderer: impl Fn(&Element) -> O + 'static,
        container: &Element,
    ) -> VirtualComponent<O> {
        VirtualComponent::mount(Rc::clone(&self.render), Rc::new(renderer), container)
    }
}

pub(crate) struct ComponentInner<O: 'static> {
    render: RenderFunction<O>,
    renderer: RefCell<Renderer<O>>,
    options: ComponentOptions,
    /// Connected instances.
    instances: RefCell<Vec<Weak<Instance<O>>>>,
}

impl<O: 'static> ComponentInner<O> {
    fn track(&self, instance: &Rc<Instance<O>>) {
        let mut instances = self.instances.borrow_mut();
        instances.retain(|live| live.strong_count() > 0);
        if !instances.iter().any(|live| live.ptr_eq(&Rc::downgrade(instance))) {
            instances.push(Rc::downgrade(instance));
        }
    }

    fn untrack(&self, instance: &Instance<O>) {
        self.instances
            .borrow_mut()
            .retain(|live| live.strong_count() > 0 && !std::ptr::eq(live.as_ptr(), instance));
    }

    fn live_instances(&self) -> Vec<Rc<Instance<O>>> {
        self.instances
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

/// A component definition: a renderer plus the options its elements are
/// created with.
pub struct Component<O: 'static> {
    inner: Rc<ComponentInner<O>>,
}

impl<O: 'static> Clone for Component<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<O: 'static> Component<O> {
    pub fn options(&self) -> &ComponentOptions {
        &self.inner.options
    }

    pub fn renderer(&self) -> Renderer<O> {
        Rc::clone(&self.inner.renderer.borrow())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of connected elements of this component.
    pub fn instance_count(&self) -> usize {
        self.inner.live_instances().len()
    }

    /// Swaps the renderer and re-renders every connected element with it,
    /// keeping hook state. Returns the number of elements updated.
    pub fn replace_renderer(&self, renderer: Renderer<O>) -> usize {
        *self.inner.renderer.borrow_mut() = renderer;
        let instances = self.inner.live_instances();
        for instance in &instances {
            instance.scheduler.update();
        }
        log::info!("replaced renderer on {} instance(s)", instances.len());
        instances.len()
    }

    /// Creates an element backed by this component. It renders once it is
    /// connected, or sooner if a reactive property is written.
    pub fn create_element(&self, tag: &str) -> Element {
        let element = Element::new(tag);
        let container = if self.inner.options.use_shadow_dom {
            Container::Shadow(element.attach_shadow())
        } else {
            Container::Light(element.downgrade())
        };

        let result: Rc<RefCell<Option<Rc<dyn RenderResult>>>> = Rc::new(RefCell::new(None));
        let component = Rc::clone(&self.inner);
        let render = Rc::clone(&self.inner.render);
        let slot = Rc::clone(&result);
        let scheduler = Scheduler::new(
            &element,
            move |host: &Element| {
                let renderer = Rc::clone(&component.renderer.borrow());
                renderer(host)
            },
            move |output: O| {
                let Some(container) = container.get() else {
                    return;
                };
                let rendered = render(output, &container);
                *slot.borrow_mut() = Some(rendered);
            },
        );

        let instance = Rc::new_cyclic(|this: &Weak<Instance<O>>| Instance {
            component: Rc::downgrade(&self.inner),
            scheduler,
            result,
            observed_attributes: self.inner.options.observed_attributes.clone(),
            this: this.clone(),
        });
        element.set_lifecycle(instance);
        element
    }
}

enum Container {
    Shadow(Element),
    Light(WeakElement),
}

impl Container {
    fn get(&self) -> Option<Element> {
        match self {
            Container::Shadow(root) => Some(root.clone()),
            Container::Light(element) => element.upgrade(),
        }
    }
}

struct Instance<O: 'static> {
    component: Weak<ComponentInner<O>>,
    scheduler: Scheduler<O>,
    result: Rc<RefCell<Option<Rc<dyn RenderResult>>>>,
    observed_attributes: Vec<String>,
    this: Weak<Instance<O>>,
}

impl<O: 'static> Instance<O> {
    fn set_connected(&self, connected: bool) {
        let result = self.result.borrow().clone();
        if let Some(result) = result {
            result.set_connected(connected);
        }
    }
}

impl<O: 'static> ElementLifecycle for Instance<O> {
    fn connected(&self, _element: &Element) {
        if let (Some(component), Some(this)) = (self.component.upgrade(), self.this.upgrade()) {
            component.track(&this);
        }
        self.scheduler.resume();
        self.scheduler.update();
        self.set_connected(true);
    }

    fn disconnected(&self, _element: &Element) {
        self.scheduler.pause();
        self.scheduler.teardown();
        self.set_connected(false);
        if let Some(component) = self.component.upgrade() {
            component.untrack(self);
        }
    }

    fn observed_attributes(&self) -> &[String] {
        &self.observed_attributes
    }

    fn attribute_changed(
        &self,
        element: &Element,
        name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) {
        if old_value == new_value || element.is_reflecting() {
            return;
        }
        let value = match new_value {
            Some("") => Value::Bool(true),
            Some(text) => Value::from(text),
            None => Value::Null,
        };
        element.set_property(&to_camel_case(name), value);
    }
}
