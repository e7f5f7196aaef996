//! Concurrency surface (component F, §5): the single-producer/multi-producer
//! queue that marshals requests from arbitrary caller threads onto the one
//! thread that owns the workspace/`Connection` pair.
//!
//! Grounded on `common/mcp_server.hpp`/`http_server.hpp`'s
//! `PendingCommand { sql, result, completed, mutex, cv }` plus a
//! `run_until_stopped()` drain loop, implemented with `parking_lot::{Mutex,
//! Condvar}` the way the teacher's `lib.rs` favors `parking_lot` over
//! `std::sync` for its own locks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// How often [`CommandQueue::run_until_stopped`] polls the interrupt
/// predicate while otherwise idle on the condvar (§5 "periodic checks of a
/// cancellation flag").
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// One queued request: a SQL statement to run on the workspace thread and a
/// slot for the result, signaled complete via the shared condvar.
struct PendingCommand {
    sql: String,
    result: Mutex<Option<Result<String, String>>>,
    completed: AtomicBool,
}

/// FIFO command queue. Cloned handles share the same queue; the workspace
/// thread calls [`CommandQueue::run_until_stopped`] while every other thread
/// calls [`CommandQueue::submit`] and blocks on the returned handle.
#[derive(Clone)]
pub struct CommandQueue {
    inner: Arc<Inner>,
}

struct Inner {
    queue: Mutex<VecDeque<Arc<PendingCommand>>>,
    cv: Condvar,
    stopped: AtomicBool,
    interrupt_check: Mutex<Option<Box<dyn Fn() -> bool + Send + Sync>>>,
}

/// A caller's handle to one in-flight command; `wait()` blocks until the
/// workspace thread has run it.
pub struct CommandHandle {
    cmd: Arc<PendingCommand>,
    inner: Arc<Inner>,
}

impl CommandHandle {
    /// Blocks until the command completes, then returns its result: `Ok(sql
    /// output text)` or `Err(error text)`, mirroring the taxonomy a remote
    /// transport would forward verbatim to its caller.
    pub fn wait(self) -> Result<String, String> {
        let mut guard = self.cmd.result.lock();
        while !self.cmd.completed.load(Ordering::Acquire) {
            self.inner.cv.wait(&mut guard);
        }
        guard.take().unwrap_or_else(|| Err("command was cancelled".into()))
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        CommandQueue {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                cv: Condvar::new(),
                stopped: AtomicBool::new(false),
                interrupt_check: Mutex::new(None),
            }),
        }
    }

    /// Installs the predicate `run_until_stopped` polls between commands
    /// (§5 "accept a `set_interrupt_check` predicate invoked periodically").
    /// Replaces any predicate installed earlier.
    pub fn set_interrupt_check(&self, predicate: impl Fn() -> bool + Send + Sync + 'static) {
        *self.inner.interrupt_check.lock() = Some(Box::new(predicate));
    }

    /// Enqueues `sql` and returns a handle the caller blocks on for the
    /// result. Safe to call from any thread.
    pub fn submit(&self, sql: impl Into<String>) -> CommandHandle {
        let cmd = Arc::new(PendingCommand {
            sql: sql.into(),
            result: Mutex::new(None),
            completed: AtomicBool::new(false),
        });
        self.inner.queue.lock().push_back(cmd.clone());
        self.inner.cv.notify_all();
        CommandHandle {
            cmd,
            inner: self.inner.clone(),
        }
    }

    /// Requests that [`run_until_stopped`] return after draining whatever is
    /// currently queued.
    pub fn stop(&self) {
        tracing::debug!("command queue stop requested");
        self.inner.stopped.store(true, Ordering::Release);
        self.inner.cv.notify_all();
    }

    /// Drains the queue on the calling (workspace) thread, running `exec` on
    /// each command's SQL text and completing its handle. Blocks on the
    /// condvar between batches, waking periodically to poll the interrupt
    /// predicate (§5); when it reports true, every still-queued command is
    /// completed with [`crate::error::EngineError::Interrupted`] and the loop
    /// stops. Also returns once [`stop`](Self::stop) has been called and the
    /// queue is empty.
    pub fn run_until_stopped(&self, mut exec: impl FnMut(&str) -> Result<String, String>) {
        loop {
            if self.interrupted() {
                self.drain_interrupted();
                tracing::warn!("command queue interrupted; draining and stopping");
                return;
            }
            let next = {
                let mut guard = self.inner.queue.lock();
                loop {
                    if let Some(cmd) = guard.pop_front() {
                        break Some(cmd);
                    }
                    if self.inner.stopped.load(Ordering::Acquire) {
                        break None;
                    }
                    if self.interrupted() {
                        break None;
                    }
                    self.inner.cv.wait_for(&mut guard, INTERRUPT_POLL);
                }
            };
            let Some(cmd) = next else {
                if self.interrupted() {
                    self.drain_interrupted();
                    tracing::warn!("command queue interrupted; draining and stopping");
                }
                return;
            };
            let result = exec(&cmd.sql);
            *cmd.result.lock() = Some(result);
            cmd.completed.store(true, Ordering::Release);
            self.inner.cv.notify_all();
        }
    }

    fn interrupted(&self) -> bool {
        match self.inner.interrupt_check.lock().as_ref() {
            Some(predicate) => predicate(),
            None => false,
        }
    }

    /// Completes every command still in the queue with an `Interrupted`
    /// result text and wakes any producer blocked in [`CommandHandle::wait`].
    fn drain_interrupted(&self) {
        let mut guard = self.inner.queue.lock();
        for cmd in guard.drain(..) {
            *cmd.result.lock() = Some(Err(
                crate::error::EngineError::Interrupted.to_string()
            ));
            cmd.completed.store(true, Ordering::Release);
        }
        self.inner.stopped.store(true, Ordering::Release);
        self.inner.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::thread;

    #[test]
    fn submit_and_run_round_trips() {
        let queue = CommandQueue::new();
        let worker_queue = queue.clone();
        let worker = thread::spawn(move || {
            worker_queue.run_until_stopped(|sql| Ok(format!("ran: {sql}")));
        });

        let handle = queue.submit("SELECT 1");
        assert_eq!(handle.wait(), Ok("ran: SELECT 1".to_string()));

        queue.stop();
        worker.join().unwrap();
    }

    #[test]
    fn interrupt_check_drains_pending_commands() {
        let queue = CommandQueue::new();
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = interrupted.clone();
        queue.set_interrupt_check(move || flag.load(Ordering::Acquire));

        // Nothing pops commands off the queue until the worker starts, so
        // submit first, then flip the interrupt flag before the worker runs.
        let handle = queue.submit("SELECT 1");
        interrupted.store(true, Ordering::Release);

        let worker_queue = queue.clone();
        let worker = thread::spawn(move || {
            worker_queue.run_until_stopped(|sql| Ok(format!("ran: {sql}")));
        });

        let result = handle.wait();
        assert_eq!(result, Err(EngineError::Interrupted.to_string()));

        worker.join().unwrap();
    }

    #[test]
    fn errors_propagate_to_caller() {
        let queue = CommandQueue::new();
        let worker_queue = queue.clone();
        let worker = thread::spawn(move || {
            worker_queue.run_until_stopped(|_sql| Err("boom".to_string()));
        });

        let handle = queue.submit("BAD SQL");
        assert_eq!(handle.wait(), Err("boom".to_string()));

        queue.stop();
        worker.join().unwrap();
    }
}
