/// Work queue - a fixed pool of worker threads plus the calling thread.
///
/// Tasks are one-shot closures receiving the index of the thread that runs
/// them (0 is the thread that owns the queue). A task may depend on other
/// tasks; it is queued automatically once its last dependency finishes.
/// Ready tasks travel over a crossbeam channel shared by every thread.
/// `complete()` runs queued tasks on the caller and otherwise blocks until
/// the last pending task signals that it finished.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use crossbeam::channel::{bounded, select, unbounded, Receiver, Sender, TryRecvError};
use crate::{engine_error, engine_info};

/// Upper bound on execution threads, the caller included.
pub const MAX_THREADS: usize = 16;

type Job = Box<dyn FnOnce(usize) + Send + 'static>;

thread_local! {
    static THREAD_INDEX: Cell<usize> = const { Cell::new(0) };
}

pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Task panics are caught and logged; the data behind a poisoned lock stays usable
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ===== TASK =====

/// One unit of work. Create with `Task::new`, wire dependencies with
/// `WorkQueue::add_dependency`, then queue only the tasks without
/// dependencies.
pub struct Task {
    job: Mutex<Option<Job>>,
    dependents: Mutex<Vec<Arc<Task>>>,
    dependency_counter: AtomicUsize,
}

impl Task {
    pub fn new<F>(job: F) -> Arc<Task>
    where
        F: FnOnce(usize) + Send + 'static,
    {
        Arc::new(Task {
            job: Mutex::new(Some(Box::new(job))),
            dependents: Mutex::new(Vec::new()),
            dependency_counter: AtomicUsize::new(0),
        })
    }

    /// Number of unfinished dependencies
    pub fn pending_dependencies(&self) -> usize {
        self.dependency_counter.load(Ordering::Acquire)
    }

    /// Whether the job has already run
    pub fn is_finished(&self) -> bool {
        lock(&self.job).is_none()
    }
}

// ===== SHARED STATE =====

enum Message {
    Run(Arc<Task>),
    Shutdown,
}

struct Shared {
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    /// Holds at most one wake-up for a caller blocked in `complete()`
    done_sender: Sender<()>,
    done_receiver: Receiver<()>,
    /// Tasks queued but not yet finished
    num_pending: AtomicUsize,
    num_workers: usize,
}

impl Shared {
    fn push(&self, tasks: &[Arc<Task>]) {
        if tasks.is_empty() {
            return;
        }
        if self.num_workers == 0 {
            for task in tasks {
                self.run(task, 0);
            }
            return;
        }

        self.num_pending.fetch_add(tasks.len(), Ordering::AcqRel);
        for task in tasks {
            debug_assert_eq!(task.pending_dependencies(), 0, "queued a task with unfinished dependencies");
            // Both ends live in `self`, so the channel never disconnects here
            let _ = self.sender.send(Message::Run(task.clone()));
        }
    }

    /// Run the job, then release dependents. Dependents are queued before
    /// `finish` decrements `num_pending`, so barriers cannot exit early.
    fn run(&self, task: &Arc<Task>, thread_index: usize) {
        let job = lock(&task.job).take();
        if let Some(job) = job {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job(thread_index))) {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                engine_error!("galaxy3d::WorkQueue", "Task panicked on thread {}: {}", thread_index, reason);
            }
        }

        let dependents = std::mem::take(&mut *lock(&task.dependents));
        let ready: Vec<Arc<Task>> = dependents
            .into_iter()
            .filter(|dependent| dependent.dependency_counter.fetch_sub(1, Ordering::AcqRel) == 1)
            .collect();
        self.push(&ready);
    }

    fn finish(&self) {
        if self.num_pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            // A full channel already holds a wake-up
            let _ = self.done_sender.try_send(());
        }
    }

    fn worker_loop(self: Arc<Self>, thread_index: usize) {
        THREAD_INDEX.with(|index| index.set(thread_index));
        while let Ok(Message::Run(task)) = self.receiver.recv() {
            self.run(&task, thread_index);
            self.finish();
        }
    }
}

// ===== WORK QUEUE =====

pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    /// Create with `num_threads` execution threads including the caller.
    /// 0 picks the available parallelism; 1 runs every task inline.
    pub fn new(num_threads: usize) -> Self {
        let num_threads = if num_threads == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            num_threads
        }
        .clamp(1, MAX_THREADS);

        let (sender, receiver) = unbounded();
        let (done_sender, done_receiver) = bounded(1);
        let shared = Arc::new(Shared {
            sender,
            receiver,
            done_sender,
            done_receiver,
            num_pending: AtomicUsize::new(0),
            num_workers: num_threads - 1,
        });

        let mut workers = Vec::with_capacity(num_threads - 1);
        for index in 1..num_threads {
            let worker_shared = shared.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("galaxy3d-worker-{}", index))
                .spawn(move || worker_shared.worker_loop(index));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    engine_error!("galaxy3d::WorkQueue", "Failed to spawn worker {}: {}", index, err);
                    break;
                }
            }
        }

        if workers.len() != shared.num_workers {
            // Run inline rather than with a partial pool
            for _ in 0..workers.len() {
                let _ = shared.sender.send(Message::Shutdown);
            }
            for handle in workers.drain(..) {
                let _ = handle.join();
            }
            return Self::new(1);
        }

        engine_info!("galaxy3d::WorkQueue", "Started with {} threads", num_threads);
        Self { shared, workers }
    }

    /// Execution threads including the caller
    pub fn num_threads(&self) -> usize {
        self.workers.len() + 1
    }

    /// Index of the current thread: 0 for the owner, 1.. for workers
    pub fn thread_index() -> usize {
        THREAD_INDEX.with(|index| index.get())
    }

    /// Make `dependent` wait for `dependency`. Must be called before either
    /// task is queued; the dependent then queues itself.
    pub fn add_dependency(&self, dependent: &Arc<Task>, dependency: &Arc<Task>) {
        dependent.dependency_counter.fetch_add(1, Ordering::AcqRel);
        lock(&dependency.dependents).push(dependent.clone());
    }

    /// Queue a task. Without workers it runs immediately on the caller.
    pub fn queue_task(&self, task: Arc<Task>) {
        self.shared.push(std::slice::from_ref(&task));
    }

    /// Queue several tasks at once.
    pub fn queue_tasks(&self, tasks: &[Arc<Task>]) {
        self.shared.push(tasks);
    }

    /// Run queued tasks on the caller until every queued task has finished.
    /// Blocks while the remaining tasks run on workers.
    pub fn complete(&self) {
        if self.workers.is_empty() {
            return;
        }
        let shared = &self.shared;
        while shared.num_pending.load(Ordering::Acquire) > 0 {
            select! {
                recv(shared.receiver) -> message => {
                    if let Ok(Message::Run(task)) = message {
                        shared.run(&task, 0);
                        shared.finish();
                    }
                }
                // May be left over from an earlier barrier; the loop re-checks
                recv(shared.done_receiver) -> _ => {}
            }
        }
    }

    /// Run one queued task on the caller if any. Returns whether one ran.
    pub fn try_complete(&self) -> bool {
        if self.workers.is_empty() {
            return false;
        }
        match self.shared.receiver.try_recv() {
            Ok(Message::Run(task)) => {
                self.shared.run(&task, 0);
                self.shared.finish();
                true
            }
            Ok(Message::Shutdown) | Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    /// Tasks queued but not yet finished
    pub fn num_pending(&self) -> usize {
        self.shared.num_pending.load(Ordering::Acquire)
    }

    /// Ready tasks waiting for a thread
    pub fn num_queued(&self) -> usize {
        self.shared.receiver.len()
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for _ in 0..self.workers.len() {
            let _ = self.shared.sender.send(Message::Shutdown);
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
#[path = "work_queue_tests.rs"]
mod tests;
