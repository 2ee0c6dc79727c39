// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Timer jobs, one OS thread each.
//!
//! The registry lock only guards the job table. A failing or panicking job
//! is logged; a repeated job keeps its schedule.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

pub type JobId = u64;

type Job = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct Control {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl Control {
    fn cancel(&self) {
        *lock(&self.cancelled) = true;
        self.wake.notify_all();
    }

    fn is_cancelled(&self) -> bool {
        *lock(&self.cancelled)
    }

    /// Sleep up to `timeout`; true if cancelled meanwhile.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = lock(&self.cancelled);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = match self.wake.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

struct Entry {
    control: Arc<Control>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Inner {
    jobs: Mutex<HashMap<JobId, Entry>>,
    next_id: AtomicU64,
    stopped: Mutex<bool>,
    stop_signal: Condvar,
}

/// Cheap to clone; clones drive the same registry.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` once after `interval`.
    pub fn schedule(
        &self,
        interval: Duration,
        job: impl FnMut() -> anyhow::Result<()> + Send + 'static,
    ) -> Option<JobId> {
        self.spawn(interval, false, Box::new(job))
    }

    /// Run `job` now, then every `interval` until cancelled or stopped.
    pub fn repeat(
        &self,
        interval: Duration,
        job: impl FnMut() -> anyhow::Result<()> + Send + 'static,
    ) -> Option<JobId> {
        self.spawn(interval, true, Box::new(job))
    }

    fn spawn(&self, interval: Duration, repeat: bool, mut job: Job) -> Option<JobId> {
        if self.is_stopped() {
            return None;
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let control = Arc::new(Control::default());
        let mut jobs = lock(&self.inner.jobs);

        let inner = Arc::clone(&self.inner);
        let ctl = Arc::clone(&control);
        let spawned = thread::Builder::new()
            .name(format!("sitekit-job-{}", id))
            .spawn(move || {
                let mut due = repeat;
                loop {
                    if !due && ctl.wait(interval) {
                        break;
                    }
                    if ctl.is_cancelled() {
                        break;
                    }
                    due = false;
                    match catch_unwind(AssertUnwindSafe(&mut job)) {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => error!(job = id, error = %format!("{:#}", e), "job failed"),
                        Err(_) => error!(job = id, "job panicked"),
                    }
                    if !repeat {
                        break;
                    }
                }
                lock(&inner.jobs).remove(&id);
            });
        let handle = match spawned {
            Ok(h) => h,
            Err(e) => {
                error!(error = %e, "cannot start job thread");
                return None;
            }
        };
        jobs.insert(
            id,
            Entry {
                control,
                handle: Some(handle),
            },
        );
        debug!(job = id, ?interval, repeat, "job scheduled");
        Some(id)
    }

    /// `false` when the job already finished or never existed.
    pub fn cancel(&self, id: JobId) -> bool {
        let entry = lock(&self.inner.jobs).remove(&id);
        match entry {
            Some(entry) => {
                entry.control.cancel();
                debug!(job = id, "job cancelled");
                true
            }
            None => false,
        }
    }

    /// Jobs still waiting or running.
    pub fn len(&self) -> usize {
        lock(&self.inner.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_stopped(&self) -> bool {
        *lock(&self.inner.stopped)
    }

    /// Ask `run` to return. Does not wait.
    pub fn want_stop(&self) {
        *lock(&self.inner.stopped) = true;
        for entry in lock(&self.inner.jobs).values() {
            entry.control.cancel();
        }
        self.inner.stop_signal.notify_all();
    }

    /// Block until `want_stop`, then wait for job threads to wind down.
    pub fn run(&self) {
        let mut stopped = lock(&self.inner.stopped);
        while !*stopped {
            stopped = match self.inner.stop_signal.wait(stopped) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        drop(stopped);

        let handles: Vec<JoinHandle<()>> = lock(&self.inner.jobs)
            .values_mut()
            .filter_map(|e| e.handle.take())
            .collect();
        for h in handles {
            if h.thread().id() != thread::current().id() {
                let _ = h.join();
            }
        }
    }
}
