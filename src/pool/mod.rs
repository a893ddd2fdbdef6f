// src/pool/mod.rs

//! Worker-thread pool with a general FIFO queue and per-tag serial
//! sub-queues.
//!
//! Untagged tasks fan out across every free worker in submission order.
//! Tasks submitted under the same non-empty tag execute one at a time, in
//! submission order, no matter how many workers are free: a tag enters
//! `running_tags` while a worker owns it, and only leaves the dispatch
//! rotation once its sub-queue drains. Workers are spawned lazily up to a
//! hard cap whenever a submission finds nobody idle.
//!
//! Shutdown is abrupt-after-in-flight: workers finish what they are
//! running and exit; pending tasks are not guaranteed to run.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Default number of eagerly spawned workers.
pub const DEFAULT_PRE_ALLOC: usize = 1;
/// Default hard cap on worker threads.
pub const DEFAULT_MAX_THREADS: usize = 2;

/// A unit of work accepted by the pool.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct PoolState {
  general: VecDeque<Task>,
  serial: HashMap<String, VecDeque<Task>>,
  running_tags: HashSet<String>,
  // Tags with queued work and no current runner; front-popped for fairness
  // across tags.
  available_tags: VecDeque<String>,
  workers: Vec<JoinHandle<()>>,
}

struct PoolShared {
  state: Mutex<PoolState>,
  signal: Condvar,
  running: AtomicBool,
  shutdown: AtomicBool,
  idle: AtomicUsize,
  max_threads: usize,
  name: String,
}

/// A bounded set of worker threads draining a global FIFO plus per-tag
/// serial sub-queues.
///
/// The pool may be shared across threads; its public methods are the
/// concurrency boundary. Dropping the pool shuts it down and joins every
/// worker.
pub struct ThreadPool {
  shared: Arc<PoolShared>,
}

impl ThreadPool {
  /// Creates a pool that eagerly spawns `pre_alloc` workers and grows on
  /// demand up to `max_threads` (coerced to at least 1). `name` prefixes
  /// the worker thread names.
  pub fn new(pre_alloc: usize, max_threads: usize, name: &str) -> Self {
    let max_threads = max_threads.max(1);
    let shared = Arc::new(PoolShared {
      state: Mutex::new(PoolState::default()),
      signal: Condvar::new(),
      running: AtomicBool::new(true),
      shutdown: AtomicBool::new(false),
      idle: AtomicUsize::new(0),
      max_threads,
      name: if name.is_empty() { "pool".to_owned() } else { name.to_owned() },
    });
    {
      let mut state = shared.state.lock();
      for _ in 0..pre_alloc.min(max_threads) {
        spawn_worker(&shared, &mut state);
      }
    }
    ThreadPool { shared }
  }

  /// Enqueues a task on the general queue. Never blocks and never rejects
  /// while the pool is running; after [`shutdown`](Self::shutdown) the
  /// task is dropped with a warning.
  pub fn add_task<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.add_task_tagged(task, "");
  }

  /// Enqueues a task under `tag`. An empty tag means "general": any free
  /// worker may run it. Tasks sharing a non-empty tag run one at a time in
  /// submission order.
  pub fn add_task_tagged<F>(&self, task: F, tag: &str)
  where
    F: FnOnce() + Send + 'static,
  {
    if self.shared.shutdown.load(Ordering::Acquire) {
      log::warn!("{}: task submitted after shutdown, dropping", self.shared.name);
      return;
    }
    let mut state = self.shared.state.lock();
    if tag.is_empty() {
      state.general.push_back(Box::new(task));
    } else {
      let fresh = !state.serial.contains_key(tag);
      state.serial.entry(tag.to_owned()).or_default().push_back(Box::new(task));
      if fresh && !state.running_tags.contains(tag) {
        state.available_tags.push_back(tag.to_owned());
      }
    }
    if self.shared.idle.load(Ordering::Relaxed) == 0 && state.workers.len() < self.shared.max_threads {
      spawn_worker(&self.shared, &mut state);
    }
    drop(state);
    self.shared.signal.notify_one();
  }

  /// Stops accepting work, wakes every worker, and joins them. In-flight
  /// tasks complete; pending tasks are dropped. Idempotent.
  pub fn shutdown(&self) {
    if self.shared.shutdown.swap(true, Ordering::AcqRel) {
      return;
    }
    self.shared.running.store(false, Ordering::Release);
    let workers = {
      let mut state = self.shared.state.lock();
      std::mem::take(&mut state.workers)
    };
    self.shared.signal.notify_all();
    for handle in workers {
      if handle.join().is_err() {
        log::error!("{}: worker panicked during shutdown", self.shared.name);
      }
    }
    log::debug!("{}: shut down", self.shared.name);
  }

  /// Whether the pool still accepts work.
  pub fn is_running(&self) -> bool {
    self.shared.running.load(Ordering::Acquire)
  }

  /// Number of pending tasks, general and serial together.
  pub fn queue_size(&self) -> usize {
    let state = self.shared.state.lock();
    state.general.len() + state.serial.values().map(VecDeque::len).sum::<usize>()
  }

  /// Number of worker threads currently owned by the pool.
  pub fn thread_count(&self) -> usize {
    self.shared.state.lock().workers.len()
  }
}

impl Default for ThreadPool {
  fn default() -> Self {
    Self::new(DEFAULT_PRE_ALLOC, DEFAULT_MAX_THREADS, "threadpool")
  }
}

impl Drop for ThreadPool {
  fn drop(&mut self) {
    self.shutdown();
  }
}

impl fmt::Debug for ThreadPool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ThreadPool")
      .field("name", &self.shared.name)
      .field("max_threads", &self.shared.max_threads)
      .field("running", &self.shared.running.load(Ordering::Relaxed))
      .finish_non_exhaustive()
  }
}

fn spawn_worker(shared: &Arc<PoolShared>, state: &mut PoolState) {
  let index = state.workers.len();
  let worker_shared = Arc::clone(shared);
  let builder = thread::Builder::new().name(format!("{}-{}", shared.name, index));
  match builder.spawn(move || worker_loop(worker_shared)) {
    Ok(handle) => state.workers.push(handle),
    Err(e) => log::error!("{}: failed to spawn worker: {}", shared.name, e),
  }
}

fn worker_loop(shared: Arc<PoolShared>) {
  log::trace!("{}: worker started", shared.name);
  let mut state = shared.state.lock();
  loop {
    while !shared.shutdown.load(Ordering::Acquire)
      && state.general.is_empty()
      && state.available_tags.is_empty()
    {
      shared.idle.fetch_add(1, Ordering::Relaxed);
      shared.signal.wait(&mut state);
      shared.idle.fetch_sub(1, Ordering::Relaxed);
    }
    if shared.shutdown.load(Ordering::Acquire) {
      break;
    }

    // General work first, FIFO.
    if let Some(task) = state.general.pop_front() {
      MutexGuard::unlocked(&mut state, || run_task(&shared, task, None));
      continue;
    }

    // Otherwise take ownership of the fairest pending tag.
    let Some(tag) = state.available_tags.pop_front() else {
      continue;
    };
    let Some(task) = state.serial.get_mut(&tag).and_then(VecDeque::pop_front) else {
      state.serial.remove(&tag);
      continue;
    };
    state.running_tags.insert(tag.clone());
    MutexGuard::unlocked(&mut state, || run_task(&shared, task, Some(&tag)));
    state.running_tags.remove(&tag);
    match state.serial.get(&tag) {
      Some(queue) if !queue.is_empty() => {
        state.available_tags.push_back(tag);
        shared.signal.notify_one();
      }
      _ => {
        state.serial.remove(&tag);
      }
    }
  }
  log::trace!("{}: worker exiting", shared.name);
}

fn run_task(shared: &PoolShared, task: Task, tag: Option<&str>) {
  if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
    match tag {
      Some(tag) => log::error!("{}: task for tag {:?} panicked", shared.name, tag),
      None => log::error!("{}: task panicked", shared.name),
    }
  }
}
