//! Unit tests for the work queue
//!
//! Covers inline execution, dependency ordering, barriers and panic recovery
//! with and without worker threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use super::*;

fn counting_task(counter: &Arc<AtomicUsize>) -> Arc<Task> {
    let counter = counter.clone();
    Task::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_thread_counts() {
    assert_eq!(WorkQueue::new(1).num_threads(), 1);
    assert_eq!(WorkQueue::new(4).num_threads(), 4);
    assert_eq!(WorkQueue::new(64).num_threads(), MAX_THREADS);
    assert!(WorkQueue::new(0).num_threads() >= 1);
}

#[test]
fn test_main_thread_index_is_zero() {
    let _queue = WorkQueue::new(2);
    assert_eq!(WorkQueue::thread_index(), 0);
}

// ============================================================================
// Inline execution
// ============================================================================

#[test]
fn test_single_thread_runs_inline() {
    let queue = WorkQueue::new(1);
    let counter = Arc::new(AtomicUsize::new(0));
    queue.queue_task(counting_task(&counter));
    // Already done before complete()
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(!queue.try_complete());
    queue.complete();
}

#[test]
fn test_inline_dependencies_run_in_order() {
    let queue = WorkQueue::new(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    let make = |name: &'static str| {
        let order = order.clone();
        Task::new(move |_| order.lock().unwrap().push(name))
    };
    let first = make("first");
    let second = make("second");
    let last = make("last");
    queue.add_dependency(&last, &first);
    queue.add_dependency(&last, &second);

    queue.queue_tasks(&[first, second]);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "last"]);
}

// ============================================================================
// Worker threads
// ============================================================================

#[test]
fn test_complete_waits_for_all_tasks() {
    let queue = WorkQueue::new(4);
    let counter = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<_> = (0..200).map(|_| counting_task(&counter)).collect();
    queue.queue_tasks(&tasks);
    queue.complete();
    assert_eq!(counter.load(Ordering::SeqCst), 200);
    assert_eq!(queue.num_pending(), 0);
    assert!(tasks.iter().all(|t| t.is_finished()));
}

#[test]
fn test_thread_indices_are_in_range() {
    let queue = WorkQueue::new(3);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let seen = seen.clone();
            Task::new(move |index| seen.lock().unwrap().push((index, WorkQueue::thread_index())))
        })
        .collect();
    queue.queue_tasks(&tasks);
    queue.complete();
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 64);
    assert!(seen.iter().all(|&(given, current)| given == current && given < 3));
}

#[test]
fn test_dependent_runs_after_all_dependencies() {
    let queue = WorkQueue::new(4);
    let finished = Arc::new(AtomicUsize::new(0));
    let observed = Arc::new(AtomicUsize::new(usize::MAX));

    let observer = {
        let finished = finished.clone();
        let observed = observed.clone();
        Task::new(move |_| observed.store(finished.load(Ordering::SeqCst), Ordering::SeqCst))
    };
    let producers: Vec<_> = (0..16)
        .map(|_| {
            let task = counting_task(&finished);
            queue.add_dependency(&observer, &task);
            task
        })
        .collect();
    assert_eq!(observer.pending_dependencies(), 16);

    queue.queue_tasks(&producers);
    queue.complete();
    assert_eq!(observed.load(Ordering::SeqCst), 16);
    assert!(observer.is_finished());
}

#[test]
fn test_dependency_chain() {
    let queue = WorkQueue::new(2);
    let log = Arc::new(Mutex::new(Vec::new()));
    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let log = log.clone();
            Task::new(move |_| log.lock().unwrap().push(i))
        })
        .collect();
    for pair in tasks.windows(2) {
        queue.add_dependency(&pair[1], &pair[0]);
    }
    queue.queue_task(tasks[0].clone());
    queue.complete();
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_try_complete_drains_one_task() {
    let queue = WorkQueue::new(2);
    let counter = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<_> = (0..32).map(|_| counting_task(&counter)).collect();
    queue.queue_tasks(&tasks);
    while queue.num_pending() > 0 {
        queue.try_complete();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 32);
}

#[test]
fn test_complete_blocks_until_worker_tasks_finish() {
    let queue = WorkQueue::new(4);
    let counter = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let counter = counter.clone();
            Task::new(move |_| {
                std::thread::sleep(std::time::Duration::from_millis(30));
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    queue.queue_tasks(&tasks);
    queue.complete();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(queue.num_pending(), 0);
    assert_eq!(queue.num_queued(), 0);
}

#[test]
fn test_repeated_barriers() {
    let queue = WorkQueue::new(3);
    let counter = Arc::new(AtomicUsize::new(0));
    for round in 1..=20 {
        let tasks: Vec<_> = (0..8).map(|_| counting_task(&counter)).collect();
        queue.queue_tasks(&tasks);
        queue.complete();
        assert_eq!(counter.load(Ordering::SeqCst), round * 8);
    }
    // A barrier with nothing queued returns immediately
    queue.complete();
}

// ============================================================================
// Panics
// ============================================================================

#[test]
fn test_panicking_task_does_not_hang_barrier() {
    let queue = WorkQueue::new(3);
    let counter = Arc::new(AtomicUsize::new(0));
    let bad = Task::new(|_| panic!("task failure"));
    let after = counting_task(&counter);
    queue.add_dependency(&after, &bad);

    queue.queue_tasks(&[bad, counting_task(&counter)]);
    queue.complete();
    // The dependent still runs
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_panicking_task_inline() {
    let queue = WorkQueue::new(1);
    let counter = Arc::new(AtomicUsize::new(0));
    queue.queue_task(Task::new(|_| panic!("inline failure")));
    queue.queue_task(counting_task(&counter));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}
