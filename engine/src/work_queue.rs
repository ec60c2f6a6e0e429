//! A fixed pool of worker threads over one shared FIFO.
//!
//! Submission never blocks (the queue is unbounded) and `join` is a barrier
//! that waits until every submitted and in-flight task has completed; the
//! pool remains usable for further submissions afterwards. There is no
//! cancellation and no timeout: a hung task stalls `join` indefinitely.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

type Work = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<State>,
    work_available: Condvar,
    all_done: Condvar,
}

#[derive(Default)]
struct State {
    queue: VecDeque<Work>,
    in_flight: usize,
    shutdown: bool,
}

impl WorkQueue {
    /// Starts `threads` long-lived workers (at least one).
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            work_available: Condvar::new(),
            all_done: Condvar::new(),
        });
        let workers = (0..threads)
            .map(|id| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("worker-{id}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self { shared, workers }
    }

    /// Enqueues a task for execution by one of the workers. Never blocks.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        state.queue.push_back(Box::new(task));
        self.shared.work_available.notify_one();
    }

    /// Blocks until the queue is empty and no worker is mid-task. Tasks
    /// submitted by other tasks before those finish are waited on too.
    pub fn join(&self) {
        let mut state = self.shared.state.lock();
        while !state.queue.is_empty() || state.in_flight > 0 {
            self.shared.all_done.wait(&mut state);
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let work = {
            let mut state = shared.state.lock();
            loop {
                if let Some(work) = state.queue.pop_front() {
                    state.in_flight += 1;
                    break work;
                }
                if state.shutdown {
                    return;
                }
                shared.work_available.wait(&mut state);
            }
        };

        // A failing task must not take the worker down or block siblings.
        if panic::catch_unwind(AssertUnwindSafe(work)).is_err() {
            tracing::error!("task panicked; worker continues");
        }

        let mut state = shared.state.lock();
        state.in_flight -= 1;
        if state.queue.is_empty() && state.in_flight == 0 {
            shared.all_done.notify_all();
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
        }
        self.shared.work_available.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
