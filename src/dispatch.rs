//! Process-wide render queue.
//!
//! One worker thread drains render-and-emit tasks in FIFO order, so the
//! multi-line blocks of concurrent exchanges come out whole instead of
//! shuffled together. The worker is created on first submission, retires
//! after a quiet period, and is recreated on demand; the single mutex below
//! is the only acquisition point, so racing first uses converge on one
//! worker and retirement cannot lose a task.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::error;

pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const WORKER_NAME: &str = "wiretap-render";

static QUEUE: Mutex<Option<Sender<Task>>> = Mutex::new(None);

fn queue_lock() -> MutexGuard<'static, Option<Sender<Task>>> {
    // A panic inside a task is caught before it can poison anything, but a
    // poisoned lock still must not take the whole trace pipeline down.
    QUEUE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Enqueue a task for the render worker. Fire-and-forget: never blocks beyond
/// the queue mutex, returns nothing, and keeps the submission order.
pub(crate) fn dispatch(task: Task) {
    let mut slot = queue_lock();
    let task = match slot.as_ref() {
        Some(tx) => match tx.send(task) {
            Ok(()) => return,
            // Worker exited without clearing the slot; respawn below.
            Err(mpsc::SendError(task)) => task,
        },
        None => task,
    };

    let (tx, rx) = mpsc::channel::<Task>();
    let spawned = thread::Builder::new()
        .name(WORKER_NAME.into())
        .spawn(move || worker_loop(rx));
    match spawned {
        Ok(_) => {
            let _ = tx.send(task);
            *slot = Some(tx);
        }
        Err(err) => {
            error!(error = %err, "failed to spawn render worker; dropping trace task");
        }
    }
}

fn worker_loop(rx: Receiver<Task>) {
    loop {
        match rx.recv_timeout(IDLE_TIMEOUT) {
            Ok(task) => run_task(task),
            Err(RecvTimeoutError::Timeout) => {
                // Retire under the lock: a concurrent dispatch either got its
                // send in before we looked (drained here) or sees the empty
                // slot and spawns a fresh worker.
                let mut slot = queue_lock();
                match rx.try_recv() {
                    Ok(task) => {
                        drop(slot);
                        run_task(task);
                    }
                    Err(_) => {
                        *slot = None;
                        return;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn run_task(task: Task) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        error!("render task panicked; trace output for that exchange was lost");
    }
}
