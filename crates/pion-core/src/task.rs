//! Cooperative task queues standing in for the host event loop.
//!
//! Everything runs on the current thread. [`queue_microtask`] defers work
//! until [`run_microtasks`] drains the queue, and the [`read`] and [`write`]
//! runners batch every task scheduled during one turn into a single
//! microtask. Because a write batch is always queued behind the read batch
//! that produced it, all pending renders finish before any commit starts.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::LocalKey;

use crate::error::UncaughtError;

type Task = Box<dyn FnOnce() + 'static>;
type LocalFuture = Pin<Box<dyn Future<Output = ()> + 'static>>;

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Task>> = const { RefCell::new(VecDeque::new()) };
    static LOCAL_TASKS: RefCell<Vec<LocalFuture>> = const { RefCell::new(Vec::new()) };
    static WAKE_FLAG: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    static READ: Runner = Runner::new();
    static WRITE: Runner = Runner::new();
}

pub fn queue_microtask(task: impl FnOnce() + 'static) {
    MICROTASKS.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

pub fn has_pending_microtasks() -> bool {
    MICROTASKS.with(|queue| !queue.borrow().is_empty())
}

/// Runs queued microtasks until the queue is empty and no spawned future
/// is ready to make progress.
///
/// A panicking microtask does not stop the loop: the panic is logged and
/// returned, the same way a browser reports an uncaught error and moves on.
pub fn run_microtasks() -> Vec<UncaughtError> {
    let mut errors = Vec::new();
    loop {
        let next = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        if let Some(task) = next {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                let error = UncaughtError::from_panic(payload.as_ref());
                log::error!("{error}");
                errors.push(error);
            }
            continue;
        }
        if !poll_local_tasks(&mut errors) {
            break;
        }
    }
    errors
}

/// Spawns a future polled by [`run_microtasks`]. Nothing awaits it.
pub fn spawn_local(future: impl Future<Output = ()> + 'static) {
    LOCAL_TASKS.with(|tasks| tasks.borrow_mut().push(Box::pin(future)));
    WAKE_FLAG.with(|flag| flag.store(true, Ordering::SeqCst));
}

struct LocalWaker {
    flag: Arc<AtomicBool>,
}

impl futures_task::ArcWake for LocalWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.flag.store(true, Ordering::SeqCst);
    }
}

fn poll_local_tasks(errors: &mut Vec<UncaughtError>) -> bool {
    let flag = WAKE_FLAG.with(Arc::clone);
    if !flag.swap(false, Ordering::SeqCst) {
        return false;
    }
    let waker = futures_task::waker(Arc::new(LocalWaker {
        flag: Arc::clone(&flag),
    }));
    let mut cx = Context::from_waker(&waker);

    let tasks = LOCAL_TASKS.with(|tasks| std::mem::take(&mut *tasks.borrow_mut()));
    let mut pending = Vec::with_capacity(tasks.len());
    for mut future in tasks {
        match panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx))) {
            Ok(Poll::Ready(())) => {}
            Ok(Poll::Pending) => pending.push(future),
            Err(payload) => {
                let error = UncaughtError::from_panic(payload.as_ref());
                log::error!("{error}");
                errors.push(error);
            }
        }
    }
    LOCAL_TASKS.with(|tasks| {
        let mut tasks = tasks.borrow_mut();
        // futures spawned while polling go after the survivors
        pending.append(&mut tasks);
        *tasks = pending;
    });
    true
}

struct Runner {
    tasks: RefCell<Vec<Task>>,
    scheduled: Cell<bool>,
}

impl Runner {
    const fn new() -> Self {
        Self {
            tasks: RefCell::new(Vec::new()),
            scheduled: Cell::new(false),
        }
    }
}

fn schedule(runner: &'static LocalKey<Runner>, task: Task) {
    let first = runner.with(|runner| {
        runner.tasks.borrow_mut().push(task);
        !runner.scheduled.replace(true)
    });
    if first {
        queue_microtask(move || flush(runner));
    }
}

/// Runs one batch in FIFO order. A panicking task does not cost the rest of
/// the batch its turn; the first panic is resumed once the batch is done.
fn flush(runner: &'static LocalKey<Runner>) {
    let tasks = runner.with(|runner| {
        runner.scheduled.set(false);
        std::mem::take(&mut *runner.tasks.borrow_mut())
    });
    let mut first_panic = None;
    for task in tasks {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            if first_panic.is_none() {
                first_panic = Some(payload);
            } else {
                log::error!("{}", UncaughtError::from_panic(payload.as_ref()));
            }
        }
    }
    if let Some(payload) = first_panic {
        panic::resume_unwind(payload);
    }
}

/// Schedules render-side work for the next read batch.
pub fn read(task: impl FnOnce() + 'static) {
    schedule(&READ, Box::new(task));
}

/// Schedules DOM-side work for the next write batch.
pub fn write(task: impl FnOnce() + 'static) {
    schedule(&WRITE, Box::new(task));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let push = move |entry: &'static str| -> Box<dyn FnOnce()> {
            let sink = Rc::clone(&sink);
            Box::new(move || sink.borrow_mut().push(entry))
        };
        (log, push)
    }

    #[test]
    fn nothing_runs_before_the_loop_turns() {
        let (log, push) = recorder();
        read(push("read"));
        assert!(log.borrow().is_empty());
        assert!(has_pending_microtasks());
        assert!(run_microtasks().is_empty());
        assert_eq!(*log.borrow(), vec!["read"]);
    }

    #[test]
    fn reads_of_every_host_finish_before_any_write() {
        let (log, push) = recorder();
        let push = Rc::new(push);
        for name in ["a", "b"] {
            let push = Rc::clone(&push);
            let render = push(if name == "a" { "render a" } else { "render b" });
            read(move || {
                render();
                let commit = push(if name == "a" { "commit a" } else { "commit b" });
                write(commit);
            });
        }
        run_microtasks();
        assert_eq!(
            *log.borrow(),
            vec!["render a", "render b", "commit a", "commit b"]
        );
    }

    #[test]
    fn a_panicking_task_keeps_the_rest_of_its_batch() {
        let (log, push) = recorder();
        write(|| panic!("first"));
        write(push("second"));
        let errors = run_microtasks();
        assert_eq!(*log.borrow(), vec!["second"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "first");
    }

    #[test]
    fn runner_can_be_reused_after_a_panic() {
        let (log, push) = recorder();
        read(|| panic!("boom"));
        run_microtasks();
        read(push("again"));
        assert!(run_microtasks().is_empty());
        assert_eq!(*log.borrow(), vec!["again"]);
    }

    #[test]
    fn spawned_futures_are_polled() {
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);
        spawn_local(async move {
            flag.set(true);
        });
        assert!(!done.get());
        run_microtasks();
        assert!(done.get());
    }
}
