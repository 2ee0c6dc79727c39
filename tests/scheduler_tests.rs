// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use sitekit::scheduler::Scheduler;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(20);

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let c = Arc::new(AtomicUsize::new(0));
    (c.clone(), c)
}

fn wait_until(what: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if what() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn scheduled_job_runs_once_and_leaves_the_registry() {
    let s = Scheduler::new();
    let (count, seen) = counter();
    s.schedule(TICK, move || {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();
    assert!(wait_until(|| seen.load(Ordering::SeqCst) == 1));
    assert!(wait_until(|| s.is_empty()));
    thread::sleep(TICK * 3);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn repeated_job_runs_until_cancelled() {
    let s = Scheduler::new();
    let (count, seen) = counter();
    let id = s
        .repeat(TICK, move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    // first run does not wait for the interval
    assert!(wait_until(|| seen.load(Ordering::SeqCst) >= 1));
    assert!(wait_until(|| seen.load(Ordering::SeqCst) >= 3));
    assert!(s.cancel(id));
    assert!(!s.cancel(id));
    thread::sleep(TICK * 2);
    let after = seen.load(Ordering::SeqCst);
    thread::sleep(TICK * 5);
    assert_eq!(seen.load(Ordering::SeqCst), after);
}

#[test]
fn repeated_job_starts_right_away() {
    let s = Scheduler::new();
    let (count, seen) = counter();
    let id = s
        .repeat(Duration::from_secs(60), move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    assert!(wait_until(|| seen.load(Ordering::SeqCst) == 1));
    assert!(s.cancel(id));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn cancelled_job_never_runs() {
    let s = Scheduler::new();
    let (count, seen) = counter();
    let id = s
        .schedule(Duration::from_secs(60), move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    assert_eq!(s.len(), 1);
    assert!(s.cancel(id));
    assert_eq!(s.len(), 0);
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn failing_and_panicking_jobs_keep_their_schedule() {
    let s = Scheduler::new();
    let (fails, failed) = counter();
    let (panics, panicked) = counter();
    s.repeat(TICK, move || {
        fails.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("site down")
    })
    .unwrap();
    s.repeat(TICK, move || {
        panics.fetch_add(1, Ordering::SeqCst);
        panic!("parser bug");
    })
    .unwrap();
    assert!(wait_until(|| failed.load(Ordering::SeqCst) >= 3));
    assert!(wait_until(|| panicked.load(Ordering::SeqCst) >= 3));
    assert_eq!(s.len(), 2);
    s.want_stop();
}

#[test]
fn want_stop_releases_run_and_refuses_new_jobs() {
    let s = Scheduler::new();
    let (count, seen) = counter();
    let stopper = s.clone();
    s.repeat(TICK, move || {
        if count.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
            stopper.want_stop();
        }
        Ok(())
    })
    .unwrap();
    s.run();
    assert!(s.is_stopped());
    assert!(seen.load(Ordering::SeqCst) >= 2);
    assert!(s.schedule(TICK, || Ok(())).is_none());
    assert!(wait_until(|| s.is_empty()));
}
