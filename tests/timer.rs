use strand::timer::AsyncTimer;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn one_shot_fires_once() {
  let timer = AsyncTimer::new(2);
  timer.start().unwrap();

  let count = Arc::new(AtomicUsize::new(0));
  let c = Arc::clone(&count);
  let id = timer.schedule_once(
    move || {
      c.fetch_add(1, Ordering::Relaxed);
    },
    Duration::from_millis(30),
  );
  assert_ne!(id, 0);

  thread::sleep(Duration::from_millis(200));
  assert_eq!(count.load(Ordering::Relaxed), 1);
  assert_eq!(timer.active_timer_count(), 0);
  timer.stop();
}

#[test]
fn cancelled_one_shot_never_fires() {
  // Scheduled for +100ms, cancelled at +50ms: by +250ms the flag is still
  // unset and the task has been reaped out of both indexes.
  let timer = AsyncTimer::new(2);
  timer.start().unwrap();

  let fired = Arc::new(AtomicBool::new(false));
  let f = Arc::clone(&fired);
  let id = timer.schedule_once(
    move || {
      f.store(true, Ordering::Release);
    },
    Duration::from_millis(100),
  );
  assert_ne!(id, 0);

  thread::sleep(Duration::from_millis(50));
  assert!(timer.cancel(id));
  thread::sleep(Duration::from_millis(200));

  assert!(!fired.load(Ordering::Acquire));
  assert_eq!(timer.active_timer_count(), 0);
  timer.stop();
}

#[test]
fn repeater_cadence_and_cancel() {
  // A 50ms repeater fires for the first time after one interval; after
  // 220ms the count sits between 3 and 6. Cancelling freezes it.
  let timer = AsyncTimer::new(2);
  timer.start().unwrap();

  let count = Arc::new(AtomicUsize::new(0));
  let c = Arc::clone(&count);
  let id = timer.schedule_repeating(
    move || {
      c.fetch_add(1, Ordering::Relaxed);
    },
    Duration::from_millis(50),
    Duration::ZERO,
  );
  assert_ne!(id, 0);

  thread::sleep(Duration::from_millis(220));
  let observed = count.load(Ordering::Relaxed);
  assert!((3..=6).contains(&observed), "fired {} times", observed);

  assert!(timer.cancel(id));
  let frozen = count.load(Ordering::Relaxed);
  thread::sleep(Duration::from_millis(150));
  assert_eq!(count.load(Ordering::Relaxed), frozen);
  timer.stop();
}

#[test]
fn an_earlier_deadline_preempts_the_current_wait() {
  let timer = AsyncTimer::new(2);
  timer.start().unwrap();

  let order = Arc::new(std::sync::Mutex::new(Vec::new()));
  let slow = Arc::clone(&order);
  timer.schedule_once(
    move || {
      slow.lock().unwrap().push("slow");
    },
    Duration::from_millis(300),
  );
  // The worker is now asleep until +300ms; this insertion must wake it.
  let fast = Arc::clone(&order);
  timer.schedule_once(
    move || {
      fast.lock().unwrap().push("fast");
    },
    Duration::from_millis(30),
  );

  thread::sleep(Duration::from_millis(150));
  assert_eq!(*order.lock().unwrap(), vec!["fast"]);
  thread::sleep(Duration::from_millis(250));
  assert_eq!(*order.lock().unwrap(), vec!["fast", "slow"]);
  timer.stop();
}

#[test]
fn cancel_all_sweeps_everything() {
  let timer = AsyncTimer::new(2);
  timer.start().unwrap();

  let count = Arc::new(AtomicUsize::new(0));
  for _ in 0..5 {
    let c = Arc::clone(&count);
    timer.schedule_once(
      move || {
        c.fetch_add(1, Ordering::Relaxed);
      },
      Duration::from_millis(60),
    );
  }
  assert_eq!(timer.active_timer_count(), 5);
  timer.cancel_all();
  thread::sleep(Duration::from_millis(200));
  assert_eq!(count.load(Ordering::Relaxed), 0);
  assert_eq!(timer.active_timer_count(), 0);
  timer.stop();
}

#[test]
fn repeating_initial_delay_is_honored() {
  let timer = AsyncTimer::new(2);
  timer.start().unwrap();

  let count = Arc::new(AtomicUsize::new(0));
  let c = Arc::clone(&count);
  let id = timer.schedule_repeating(
    move || {
      c.fetch_add(1, Ordering::Relaxed);
    },
    Duration::from_millis(200),
    Duration::from_millis(20),
  );
  assert_ne!(id, 0);

  // First fire comes from the 20ms initial delay, not the 200ms interval.
  thread::sleep(Duration::from_millis(120));
  assert_eq!(count.load(Ordering::Relaxed), 1);
  timer.cancel(id);
  timer.stop();
}

#[test]
fn stop_joins_the_worker_and_pool() {
  let timer = AsyncTimer::new(3);
  timer.start().unwrap();
  assert!(timer.is_running());
  assert!(timer.pool_thread_count() >= 1);

  timer.stop();
  assert!(!timer.is_running());
  assert_eq!(timer.pool_thread_count(), 0);
  assert_eq!(timer.schedule_once(|| {}, Duration::from_millis(1)), 0);
}

#[test]
fn drop_stops_a_running_timer() {
  let fired = Arc::new(AtomicBool::new(false));
  {
    let timer = AsyncTimer::new(2);
    timer.start().unwrap();
    let f = Arc::clone(&fired);
    timer.schedule_once(
      move || {
        f.store(true, Ordering::Release);
      },
      Duration::from_secs(60),
    );
  }
  // Dropping joined the worker; the far-future task never ran.
  assert!(!fired.load(Ordering::Acquire));
}
