use std::cell::RefCell;
use std::rc::Rc;

use pion_core::{Element, Renderer, Scheduler};

use crate::component::{RenderFunction, RenderResult};

/// A component rendered on a virtual host inside a container it does not
/// own. Created by [`Pion::mount_virtual`](crate::Pion::mount_virtual).
pub struct VirtualComponent<O: 'static> {
    host: Element,
    scheduler: Scheduler<O>,
    result: Rc<RefCell<Option<Rc<dyn RenderResult>>>>,
}

impl<O: 'static> VirtualComponent<O> {
    pub(crate) fn mount(render: RenderFunction<O>, renderer: Renderer<O>, container: &Element) -> Self {
        let host = Element::virtual_host(container);
        let result: Rc<RefCell<Option<Rc<dyn RenderResult>>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&result);
        let target = container.downgrade();
        let scheduler = Scheduler::new(
            &host,
            move |host: &Element| renderer(host),
            move |output: O| {
                let Some(container) = target.upgrade() else {
                    return;
                };
                let rendered = render(output, &container);
                *slot.borrow_mut() = Some(rendered);
            },
        );
        scheduler.update();
        Self {
            host,
            scheduler,
            result,
        }
    }

    pub fn host(&self) -> &Element {
        &self.host
    }

    pub fn update(&self) {
        self.scheduler.update();
    }

    /// Re-renders with `renderer`, keeping hook state.
    pub fn replace_renderer(&self, renderer: Renderer<O>) {
        self.scheduler.set_renderer(renderer);
        self.scheduler.update();
    }

    /// Stops rendering and runs every hook teardown.
    pub fn disconnect(&self) {
        self.scheduler.pause();
        self.scheduler.teardown();
        let result = self.result.borrow().clone();
        if let Some(result) = result {
            result.set_connected(false);
        }
    }
}

impl<O: 'static> Drop for VirtualComponent<O> {
    fn drop(&mut self) {
        if self.scheduler.is_active() {
            self.disconnect();
        }
    }
}
