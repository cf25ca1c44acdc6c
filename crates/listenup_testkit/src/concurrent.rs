//! Thread-based runner for concurrency scenarios.
//!
//! Workers are released together from a barrier so they race on the same
//! keys, which is the point of these scenarios.

use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a concurrent run.
#[derive(Debug)]
pub struct ConcurrentRun<T> {
    /// Each worker's result, indexed by worker number.
    pub results: Vec<T>,
    /// Wall time from release to the last worker finishing.
    pub duration: Duration,
}

impl<T, E> ConcurrentRun<Result<T, E>> {
    /// Number of workers that returned `Ok`.
    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Number of workers that returned `Err`.
    pub fn failures(&self) -> usize {
        self.results.len() - self.successes()
    }
}

/// Runs `work(worker)` on `workers` threads that all start at once.
///
/// # Panics
///
/// Propagates a panic from any worker.
pub fn run_concurrently<T, F>(workers: usize, work: F) -> ConcurrentRun<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    let barrier = Barrier::new(workers);
    let work = &work;
    let barrier = &barrier;

    let (results, duration) = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                scope.spawn(move || {
                    barrier.wait();
                    let start = Instant::now();
                    let result = work(worker);
                    (result, start)
                })
            })
            .collect();

        let mut first_start: Option<Instant> = None;
        let results: Vec<T> = handles
            .into_iter()
            .map(|handle| {
                let (result, start) = handle.join().expect("worker panicked");
                first_start = Some(first_start.map_or(start, |s| s.min(start)));
                result
            })
            .collect();
        let duration = first_start.map_or(Duration::ZERO, |s| s.elapsed());
        (results, duration)
    });

    ConcurrentRun { results, duration }
}
