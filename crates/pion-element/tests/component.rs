use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pion_core::{
    lift, use_attribute, use_attribute_with, use_effect, use_host, use_property, use_ref,
    use_state, Element, Setter, Value,
};
use pion_element::{custom_elements, ComponentOptions, Pion, RenderResult};
use pion_testing::prelude::*;
use pion_testing::render;

type Slot<T> = Rc<RefCell<Option<T>>>;

fn shadow_text(element: &Element) -> String {
    element
        .shadow_root()
        .map(|root| root.text_content())
        .unwrap_or_default()
}

fn counting<T: Clone + 'static>() -> (Rc<Cell<usize>>, Slot<T>) {
    (Rc::new(Cell::new(0)), Rc::new(RefCell::new(None)))
}

#[test]
fn renders_into_the_shadow_root() {
    custom_elements()
        .define(
            "x-greeting",
            &pion().component(|_| Html::from(el("span").text("Hello"))),
        )
        .unwrap();

    let element = fixture(el("x-greeting"));

    assert_eq!(shadow_text(&element), "Hello");
    assert_eq!(element.child_count(), 0);
}

#[test]
fn renders_into_the_element_without_shadow_dom() {
    let options = ComponentOptions {
        use_shadow_dom: false,
        ..ComponentOptions::default()
    };
    custom_elements()
        .define(
            "x-light",
            &pion().component_with(|_| Html::from(el("b").text("light")), options),
        )
        .unwrap();

    let element = fixture(el("x-light"));

    assert!(element.shadow_root().is_none());
    assert_eq!(element.text_content(), "light");
}

#[test]
fn state_persists_and_updates_coalesce() {
    let (renders, setter) = counting::<Setter<i32>>();
    let (count, fill) = (Rc::clone(&renders), Rc::clone(&setter));
    custom_elements()
        .define(
            "x-counter",
            &pion().component(move |_| {
                count.set(count.get() + 1);
                let (value, set) = use_state(|| 0);
                *fill.borrow_mut() = Some(set);
                Html::from(el("span").text(format!("Count: {value}")))
            }),
        )
        .unwrap();

    let element = fixture(el("x-counter"));
    assert_eq!(renders.get(), 1);

    let set = setter.borrow().clone().unwrap();
    set.set(1);
    set.set(2);
    next_frame();

    assert_eq!(renders.get(), 2);
    assert_eq!(shadow_text(&element), "Count: 2");

    set.set(2);
    next_frame();
    assert_eq!(renders.get(), 2);
}

#[test]
fn effects_follow_connect_and_disconnect() {
    let setups = Rc::new(Cell::new(0));
    let teardowns = Rc::new(Cell::new(0));
    let (s, t) = (Rc::clone(&setups), Rc::clone(&teardowns));
    custom_elements()
        .define(
            "x-effects",
            &pion().component(move |_| {
                let (s, t) = (Rc::clone(&s), Rc::clone(&t));
                use_effect((), move || {
                    s.set(s.get() + 1);
                    move || t.set(t.get() + 1)
                });
                Html::default()
            }),
        )
        .unwrap();

    let element = fixture(el("x-effects"));
    let parent = element.parent().unwrap();
    assert_eq!((setups.get(), teardowns.get()), (1, 0));

    element.remove();
    next_frame();
    assert_eq!((setups.get(), teardowns.get()), (1, 1));

    parent.append_child(&element);
    next_frame();
    assert_eq!((setups.get(), teardowns.get()), (2, 1));
}

#[test]
fn paused_writes_render_once_on_reconnect() {
    let (renders, _) = counting::<()>();
    let count = Rc::clone(&renders);
    custom_elements()
        .define(
            "x-paused",
            &pion().component(move |host| {
                count.set(count.get() + 1);
                let label = host.prop::<String>("label").unwrap_or_default();
                Html::from(el("p").text(label))
            }),
        )
        .unwrap();

    let element = fixture(el("x-paused"));
    let parent = element.parent().unwrap();
    element.remove();
    element.set_property("label", "first");
    element.set_property("label", "second");
    next_frame();
    assert_eq!(renders.get(), 1);

    parent.append_child(&element);
    next_frame();

    assert_eq!(renders.get(), 2);
    assert_eq!(shadow_text(&element), "second");
}

#[test]
fn observed_attributes_are_written_to_camel_case_properties() {
    let options = ComponentOptions {
        observed_attributes: vec!["user-name".into(), "active".into()],
        ..ComponentOptions::default()
    };
    custom_elements()
        .define(
            "x-profile",
            &pion().component_with(
                |host| {
                    let name = host.prop::<String>("userName").unwrap_or_default();
                    let active = host.prop::<bool>("active").unwrap_or(false);
                    Html::from(el("p").text(format!("{name}:{active}")))
                },
                options,
            ),
        )
        .unwrap();

    let element = fixture(el("x-profile").attr("user-name", "ann"));
    assert_eq!(shadow_text(&element), "ann:false");

    element.set_attribute("active", "");
    assert_eq!(element.get_property("active"), Value::Bool(true));
    next_frame();
    assert_eq!(shadow_text(&element), "ann:true");

    element.remove_attribute("user-name");
    assert_eq!(element.get_property("userName"), Value::Null);
}

#[test]
fn reflected_attributes_do_not_feed_back_into_properties() {
    let options = ComponentOptions {
        observed_attributes: vec!["size".into()],
        ..ComponentOptions::default()
    };
    let (renders, setter) = counting::<Setter<f64>>();
    let (count, fill) = (Rc::clone(&renders), Rc::clone(&setter));
    custom_elements()
        .define(
            "x-sized",
            &pion().component_with(
                move |_| {
                    count.set(count.get() + 1);
                    let (size, set) = use_attribute_with("size", 8.0).unwrap();
                    *fill.borrow_mut() = Some(set);
                    Html::from(el("span").text(size.to_string()))
                },
                options,
            ),
        )
        .unwrap();

    let element = fixture(el("x-sized"));
    assert_eq!(element.get_attribute("size").as_deref(), Some("8"));
    assert_eq!(element.get_property("size"), Value::Number(8.0));

    setter.borrow().clone().unwrap().set(12.0);
    next_frame();

    assert_eq!(element.get_property("size"), Value::Number(12.0));
    assert_eq!(element.get_attribute("size").as_deref(), Some("12"));
    assert_eq!(renders.get(), 2);
}

#[test]
fn parent_binding_wins_over_the_default() {
    custom_elements()
        .define(
            "x-child-size",
            &pion().component(|_| {
                let (size, _) = use_attribute_with("size", 8.0).unwrap();
                Html::from(el("span").text(size.to_string()))
            }),
        )
        .unwrap();

    let element = fixture(el("x-child-size").prop("size", 20.0));

    assert_eq!(shadow_text(&element), "20");
    assert_eq!(element.get_attribute("size").as_deref(), Some("20"));
}

#[test]
fn lifted_changes_flow_through_the_parent() {
    let child_setter: Slot<Setter<bool>> = Rc::new(RefCell::new(None));
    let fill = Rc::clone(&child_setter);
    custom_elements()
        .define(
            "x-toggle",
            &pion().component(move |_| {
                let (opened, set) = use_attribute::<bool>("opened").unwrap();
                *fill.borrow_mut() = Some(set);
                Html::from(el("span").text(if opened { "open" } else { "closed" }))
            }),
        )
        .unwrap();
    custom_elements()
        .define(
            "x-toggle-parent",
            &pion().component(|_| {
                let (opened, set_opened) = use_state(|| false);
                Html::from(
                    el("x-toggle")
                        .prop("opened", opened)
                        .on("opened-changed", lift(set_opened)),
                )
            }),
        )
        .unwrap();

    let parent = fixture(el("x-toggle-parent"));
    let child = parent.shadow_root().and_then(|root| root.find("x-toggle")).unwrap();
    assert_eq!(shadow_text(&child), "closed");

    child_setter.borrow().clone().unwrap().set(true);
    assert_eq!(child.get_property("opened"), Value::Bool(false));
    next_frame();

    assert_eq!(child.get_property("opened"), Value::Bool(true));
    assert!(child.has_attribute("opened"));
    assert_eq!(shadow_text(&child), "open");
}

#[test]
fn property_hook_initializes_and_yields_to_bindings() {
    custom_elements()
        .define(
            "x-prop",
            &pion().component(|_| {
                let (label, _) = use_property("label", "initial".to_string());
                Html::from(el("i").text(label))
            }),
        )
        .unwrap();

    let defaulted = fixture(el("x-prop"));
    let bound = fixture(el("x-prop").prop("label", "bound"));

    assert_eq!(shadow_text(&defaulted), "initial");
    assert_eq!(defaulted.get_property("label"), Value::from("initial"));
    assert_eq!(shadow_text(&bound), "bound");
    assert!(!bound.has_attribute("label"));
}

#[test]
fn effect_panics_keep_state_changes() {
    custom_elements()
        .define(
            "x-throwing",
            &pion().component(|host| {
                let (value, set) = use_state(|| 0);
                let fail = host.prop::<bool>("fail").unwrap_or(false);
                use_effect((), move || {
                    set.set(1);
                    if fail {
                        panic!("effect failed");
                    }
                });
                Html::from(el("span").text(value.to_string()))
            }),
        )
        .unwrap();

    let container = Element::new("div");
    document().append_child(&container);
    render(Html::from(el("x-throwing").prop("fail", true)), &container);
    let errors = next_frame_with_errors();

    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("effect failed"));
    let element = container.first_element_child().unwrap();
    assert_eq!(shadow_text(&element), "1");
}

#[test]
fn hook_order_changes_are_reported() {
    custom_elements()
        .define(
            "x-unstable",
            &pion().component(|host| {
                if host.prop::<bool>("flip").unwrap_or(false) {
                    use_ref(|| 0);
                } else {
                    use_state(|| 0);
                }
                Html::default()
            }),
        )
        .unwrap();

    let element = fixture(el("x-unstable"));
    element.set_property("flip", true);
    let errors = next_frame_with_errors();

    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("hook order changed"));

    element.set_property("flip", false);
    next_frame();
}

#[test]
fn use_host_is_the_custom_element() {
    let seen: Slot<Element> = Rc::new(RefCell::new(None));
    let fill = Rc::clone(&seen);
    custom_elements()
        .define(
            "x-hosted",
            &pion().component(move |_| {
                *fill.borrow_mut() = Some(use_host());
                Html::default()
            }),
        )
        .unwrap();

    let element = fixture(el("x-hosted"));

    assert!(seen.borrow().as_ref().unwrap().ptr_eq(&element));
}

struct Recorder(Rc<RefCell<Vec<bool>>>);

impl RenderResult for Recorder {
    fn set_connected(&self, connected: bool) {
        self.0.borrow_mut().push(connected);
    }
}

#[test]
fn render_results_hear_about_connection_changes() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let pion = Pion::new(move |_: (), _: &Element| {
        Rc::new(Recorder(Rc::clone(&sink))) as Rc<dyn RenderResult>
    });
    let element = pion.component(|_| ()).create_element("x-recorded");
    let document = document();

    document.append_child(&element);
    next_frame();
    element.remove();
    document.append_child(&element);
    next_frame();

    assert_eq!(*log.borrow(), vec![false, true]);
}

#[test]
fn fixture_cleanup_disconnects_components() {
    let teardowns = Rc::new(Cell::new(0));
    let t = Rc::clone(&teardowns);
    custom_elements()
        .define(
            "x-cleaned",
            &pion().component(move |_| {
                let t = Rc::clone(&t);
                use_effect((), move || move || t.set(t.get() + 1));
                Html::default()
            }),
        )
        .unwrap();

    let element = fixture(el("x-cleaned"));
    fixture_cleanup();

    assert!(!element.is_connected());
    assert_eq!(teardowns.get(), 1);
}
