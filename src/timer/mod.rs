// src/timer/mod.rs

//! Deadline timer that runs callbacks on an owned [`ThreadPool`].
//!
//! One worker thread sleeps until the nearest deadline, reaps everything
//! due, and hands each live callback to the pool; scheduling never runs a
//! callback on the caller's thread. Repeaters are fixed-delay: the next
//! deadline is `now + interval`, computed at reap time, so cadence absorbs
//! dispatch latency instead of compounding it.
//!
//! Cancellation is mark-and-skip. The flag is re-checked by the dispatch
//! wrapper right before the user callback runs, so cancelling between
//! expiry and execution still suppresses the call. Cancelling during
//! execution does not interrupt it.

use crate::pool::ThreadPool;

use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Identifier handed out by the `schedule_*` calls. `0` is never a valid
/// id; it is the failure sentinel.
pub type TimerId = u64;

/// Worker threads in the internal pool when none is specified.
pub const DEFAULT_POOL_SIZE: usize = 4;

type Callback = Box<dyn Fn() + Send + Sync + 'static>;

struct TimerTask {
  id: TimerId,
  callback: Callback,
  interval: Duration,
  repeating: bool,
  cancelled: AtomicBool,
}

#[derive(Default)]
struct TimerState {
  // Ordered by deadline; the id in the key keeps duplicate deadlines
  // distinct, which makes this the multiset the worker walks.
  by_time: BTreeMap<(Instant, TimerId), Arc<TimerTask>>,
  by_id: HashMap<TimerId, Arc<TimerTask>>,
}

struct TimerShared {
  state: Mutex<TimerState>,
  signal: Condvar,
  running: AtomicBool,
  should_stop: AtomicBool,
  next_id: AtomicU64,
  pool: ThreadPool,
}

/// A delay-scheduled timer with one-shot and fixed-delay repeating tasks.
///
/// May be shared across threads; the public methods are the concurrency
/// boundary. Dropping the timer stops it, joining the worker and shutting
/// down the pool.
pub struct AsyncTimer {
  shared: Arc<TimerShared>,
  worker: Mutex<Option<JoinHandle<()>>>,
  stopped: AtomicBool,
}

impl AsyncTimer {
  /// Creates a timer whose internal pool may grow to `pool_size` workers
  /// (coerced to at least 1).
  pub fn new(pool_size: usize) -> Self {
    AsyncTimer {
      shared: Arc::new(TimerShared {
        state: Mutex::new(TimerState::default()),
        signal: Condvar::new(),
        running: AtomicBool::new(false),
        should_stop: AtomicBool::new(false),
        next_id: AtomicU64::new(1),
        pool: ThreadPool::new(1, pool_size.max(1), "timer"),
      }),
      worker: Mutex::new(None),
      stopped: AtomicBool::new(false),
    }
  }

  /// Spawns the timer thread. Idempotent while running; a spawn failure
  /// leaves the timer stopped and surfaces the error.
  ///
  /// A timer that has been [`stop`](Self::stop)ped cannot be restarted —
  /// its pool is gone — and `start` refuses rather than resurrect it.
  pub fn start(&self) -> io::Result<()> {
    let mut worker = self.worker.lock();
    if worker.is_some() {
      return Ok(());
    }
    if self.stopped.load(Ordering::Acquire) {
      return Err(io::Error::other("timer cannot be restarted after stop"));
    }
    self.shared.should_stop.store(false, Ordering::Release);
    let worker_shared = Arc::clone(&self.shared);
    let handle = thread::Builder::new()
      .name("timer-worker".to_owned())
      .spawn(move || timer_worker(worker_shared))?;
    *worker = Some(handle);
    self.shared.running.store(true, Ordering::Release);
    log::debug!("timer: started");
    Ok(())
  }

  /// Signals the worker, joins it, then shuts down the pool. Idempotent;
  /// a timer that never started is left untouched.
  pub fn stop(&self) {
    let handle = {
      let mut worker = self.worker.lock();
      let Some(handle) = worker.take() else {
        return;
      };
      self.stopped.store(true, Ordering::Release);
      self.shared.running.store(false, Ordering::Release);
      // Setting the flag under the state lock serializes with the worker's
      // wait entry; the notify below cannot be lost.
      let _state = self.shared.state.lock();
      self.shared.should_stop.store(true, Ordering::Release);
      handle
    };
    self.shared.signal.notify_all();
    if handle.join().is_err() {
      log::error!("timer: worker panicked");
    }
    self.shared.pool.shutdown();
    log::debug!("timer: stopped");
  }

  /// Schedules `callback` to fire once after `delay`. Returns the task id,
  /// or `0` if the timer is not running.
  pub fn schedule_once<F>(&self, callback: F, delay: Duration) -> TimerId
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.schedule(Box::new(callback), delay, Duration::ZERO, false)
  }

  /// Schedules `callback` to fire every `interval`, starting after
  /// `initial_delay` (or after one full `interval` when the initial delay
  /// is zero). A zero `interval` is rejected with `0`.
  pub fn schedule_repeating<F>(&self, callback: F, interval: Duration, initial_delay: Duration) -> TimerId
  where
    F: Fn() + Send + Sync + 'static,
  {
    if interval.is_zero() {
      log::error!("timer: zero interval for a repeating task");
      return 0;
    }
    let first = if initial_delay.is_zero() { interval } else { initial_delay };
    self.schedule(Box::new(callback), first, interval, true)
  }

  fn schedule(&self, callback: Callback, first_delay: Duration, interval: Duration, repeating: bool) -> TimerId {
    if !self.shared.running.load(Ordering::Acquire) {
      log::warn!("timer: schedule on a timer that is not running");
      return 0;
    }
    let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
    let task = Arc::new(TimerTask {
      id,
      callback,
      interval,
      repeating,
      cancelled: AtomicBool::new(false),
    });
    let due = Instant::now() + first_delay;
    {
      let mut state = self.shared.state.lock();
      state.by_time.insert((due, id), Arc::clone(&task));
      state.by_id.insert(id, task);
    }
    // Every insertion wakes the worker so an earlier deadline takes effect
    // immediately.
    self.shared.signal.notify_one();
    id
  }

  /// Marks the task cancelled. Returns whether `id` was present. The
  /// worker may still reach the task, but the callback will not run.
  pub fn cancel(&self, id: TimerId) -> bool {
    let state = self.shared.state.lock();
    match state.by_id.get(&id) {
      Some(task) => {
        task.cancelled.store(true, Ordering::Release);
        true
      }
      None => false,
    }
  }

  /// Marks every present task cancelled.
  pub fn cancel_all(&self) {
    let state = self.shared.state.lock();
    for task in state.by_id.values() {
      task.cancelled.store(true, Ordering::Release);
    }
  }

  /// Whether the timer thread is running.
  pub fn is_running(&self) -> bool {
    self.shared.running.load(Ordering::Acquire)
  }

  /// Number of tasks currently tracked, cancelled-but-unreaped included.
  pub fn active_timer_count(&self) -> usize {
    self.shared.state.lock().by_id.len()
  }

  /// Pending tasks in the callback pool.
  pub fn pool_queue_size(&self) -> usize {
    self.shared.pool.queue_size()
  }

  /// Worker threads in the callback pool.
  pub fn pool_thread_count(&self) -> usize {
    self.shared.pool.thread_count()
  }
}

impl Default for AsyncTimer {
  fn default() -> Self {
    Self::new(DEFAULT_POOL_SIZE)
  }
}

impl Drop for AsyncTimer {
  fn drop(&mut self) {
    self.stop();
  }
}

impl fmt::Debug for AsyncTimer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AsyncTimer")
      .field("running", &self.shared.running.load(Ordering::Relaxed))
      .field("active", &self.active_timer_count())
      .finish_non_exhaustive()
  }
}

fn timer_worker(shared: Arc<TimerShared>) {
  log::debug!("timer: worker started");
  loop {
    let mut state = shared.state.lock();
    if shared.should_stop.load(Ordering::Acquire) {
      break;
    }
    if state.by_time.is_empty() {
      shared.signal.wait_while(&mut state, |s| {
        s.by_time.is_empty() && !shared.should_stop.load(Ordering::Acquire)
      });
      continue;
    }
    let due = match state.by_time.keys().next() {
      Some(&(due, _)) => due,
      None => continue,
    };
    let now = Instant::now();
    if due <= now {
      reap_due(&shared, &mut state, now);
    } else {
      // Woken early by any insertion or by stop; the loop re-evaluates the
      // earliest deadline either way.
      let _ = shared.signal.wait_until(&mut state, due);
    }
  }
  log::debug!("timer: worker stopped");
}

/// Fires everything due at or before `now`. Runs under the state lock;
/// `cancel` takes the same lock, so flags cannot flip mid-reap — only the
/// dispatch wrapper races, and it re-checks.
fn reap_due(shared: &TimerShared, state: &mut TimerState, now: Instant) {
  let mut fired = Vec::new();
  loop {
    let key = match state.by_time.keys().next() {
      Some(&key) if key.0 <= now => key,
      _ => break,
    };
    if let Some(task) = state.by_time.remove(&key) {
      if task.cancelled.load(Ordering::Acquire) {
        state.by_id.remove(&task.id);
      } else {
        fired.push(task);
      }
    }
  }

  for task in &fired {
    let handle = Arc::clone(task);
    shared.pool.add_task(move || {
      if !handle.cancelled.load(Ordering::Acquire) {
        (handle.callback)();
        log::trace!("timer: task {} executed", handle.id);
      }
    });
  }

  for task in fired {
    if task.repeating {
      let due = now + task.interval;
      state.by_time.insert((due, task.id), Arc::clone(&task));
    } else {
      state.by_id.remove(&task.id);
    }
  }
}
