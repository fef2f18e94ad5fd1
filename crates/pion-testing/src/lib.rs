//! Testing utilities for pion components: a minimal template renderer,
//! fixtures mounted into a per-thread document, and frame helpers.

use std::cell::RefCell;
use std::rc::Rc;

use pion_core::collections::map::HashMap;
use pion_core::{run_microtasks, Element, ElementId, Event, ListenerId, UncaughtError, Value};
use pion_element::{custom_elements, Pion, RenderResult};

/// A template: the nodes rendered into a container.
#[derive(Clone, Default)]
pub struct Html(pub Vec<Node>);

#[derive(Clone)]
pub enum Node {
    Text(String),
    Element(ElementTemplate),
}

#[derive(Clone)]
pub struct ElementTemplate {
    tag: String,
    props: Vec<(String, Value)>,
    attrs: Vec<(String, String)>,
    listeners: Vec<(String, Rc<dyn Fn(&Event)>)>,
    children: Vec<Node>,
}

pub fn html(nodes: impl IntoIterator<Item = impl Into<Node>>) -> Html {
    Html(nodes.into_iter().map(Into::into).collect())
}

pub fn el(tag: &str) -> ElementTemplate {
    ElementTemplate {
        tag: tag.to_ascii_lowercase(),
        props: Vec::new(),
        attrs: Vec::new(),
        listeners: Vec::new(),
        children: Vec::new(),
    }
}

pub fn text(data: impl Into<String>) -> Node {
    Node::Text(data.into())
}

impl ElementTemplate {
    /// Property binding, written on every render.
    pub fn prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.props.push((name.to_string(), value.into()));
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_string(), value.into()));
        self
    }

    /// Event listener, replaced on every render.
    pub fn on(mut self, kind: &str, listener: impl Fn(&Event) + 'static) -> Self {
        self.listeners.push((kind.to_string(), Rc::new(listener)));
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn text(self, data: impl Into<String>) -> Self {
        self.child(text(data))
    }
}

impl From<ElementTemplate> for Node {
    fn from(template: ElementTemplate) -> Self {
        Node::Element(template)
    }
}

impl From<&str> for Node {
    fn from(data: &str) -> Self {
        Node::Text(data.to_string())
    }
}

impl From<String> for Node {
    fn from(data: String) -> Self {
        Node::Text(data)
    }
}

impl From<ElementTemplate> for Html {
    fn from(template: ElementTemplate) -> Self {
        Html(vec![template.into()])
    }
}

thread_local! {
    static DOCUMENT: Element = Element::document();
    static FIXTURES: RefCell<Vec<Element>> = const { RefCell::new(Vec::new()) };
    static LISTENERS: RefCell<HashMap<ElementId, Vec<ListenerId>>> = RefCell::new(HashMap::default());
}

impl Node {
    fn matches(&self, element: &Element) -> bool {
        match self {
            Node::Text(_) => element.is_text(),
            Node::Element(template) => !element.is_text() && element.tag() == template.tag,
        }
    }

    fn create(&self) -> Element {
        match self {
            Node::Text(data) => Element::text(data),
            Node::Element(template) => {
                let element = custom_elements().create_element(&template.tag);
                template.apply(&element);
                element
            }
        }
    }

    fn update(&self, element: &Element) {
        match self {
            Node::Text(data) => {
                if element.data() != *data {
                    element.set_data(data);
                }
            }
            Node::Element(template) => template.apply(element),
        }
    }
}

impl ElementTemplate {
    fn apply(&self, element: &Element) {
        for (name, value) in &self.attrs {
            if element.get_attribute(name).as_deref() != Some(value.as_str()) {
                element.set_attribute(name, value.clone());
            }
        }
        for (name, value) in &self.props {
            element.set_property(name, value.clone());
        }

        let ids: Vec<ListenerId> = self
            .listeners
            .iter()
            .map(|(kind, listener)| {
                let listener = Rc::clone(listener);
                element.add_event_listener(kind, move |event| listener(event))
            })
            .collect();
        let previous = LISTENERS.with(|listeners| listeners.borrow_mut().insert(element.id(), ids));
        for id in previous.into_iter().flatten() {
            element.remove_event_listener(id);
        }

        reconcile(&self.children, element);
    }
}

/// Reuses children while they line up with `nodes`, then replaces the rest.
fn reconcile(nodes: &[Node], parent: &Element) {
    let existing = parent.children();
    let kept = nodes
        .iter()
        .zip(&existing)
        .take_while(|(node, element)| node.matches(element))
        .count();
    for (node, element) in nodes.iter().zip(&existing).take(kept) {
        node.update(element);
    }
    for stale in &existing[kept..] {
        stale.remove();
    }
    for node in &nodes[kept..] {
        let element = node.create();
        parent.append_child(&element);
    }
}

/// Renders `html` into `container`. Used as the render function of
/// [`pion()`].
pub fn render(html: Html, container: &Element) -> Rc<dyn RenderResult> {
    reconcile(&html.0, container);
    Rc::new(())
}

/// A [`Pion`] rendering [`Html`] templates.
pub fn pion() -> Pion<Html> {
    Pion::new(render)
}

/// The document of the current thread. Fixtures are mounted below it.
pub fn document() -> Element {
    DOCUMENT.with(Element::clone)
}

/// Renders `html` into a fresh container in the document, runs a frame and
/// returns the first element rendered.
pub fn fixture(html: impl Into<Html>) -> Element {
    let container = Element::new("div");
    document().append_child(&container);
    render(html.into(), &container);
    FIXTURES.with(|fixtures| fixtures.borrow_mut().push(container.clone()));
    next_frame();
    container
        .first_element_child()
        .expect("fixture template rendered no element")
}

/// Removes every fixture from the document.
pub fn fixture_cleanup() {
    let fixtures = FIXTURES.with(|fixtures| std::mem::take(&mut *fixtures.borrow_mut()));
    for container in fixtures {
        container.remove();
    }
    next_frame();
}

/// Runs queued work until idle. Panics if any task panicked.
pub fn next_frame() {
    let errors = next_frame_with_errors();
    assert!(errors.is_empty(), "uncaught errors during frame: {errors:?}");
}

/// Runs queued work until idle and returns what panicked.
pub fn next_frame_with_errors() -> Vec<UncaughtError> {
    run_microtasks()
}

pub mod prelude {
    pub use crate::{
        document, el, fixture, fixture_cleanup, html, next_frame, next_frame_with_errors, pion,
        text, Html, Node,
    };
}
