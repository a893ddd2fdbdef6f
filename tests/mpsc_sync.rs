mod common;
use common::*;

use strand::error::RecvError;
use strand::mpsc;

use std::collections::HashSet;
use std::thread;

#[test]
fn fan_in_counts_every_item_exactly_once() {
  // 4 producers x 100 items over a 50-slot ring; after the producers join
  // the channel is closed and the single consumer must count exactly 400.
  const PRODUCERS: usize = 4;
  let (tx, mut rx) = mpsc::channel(50);

  let handles: Vec<_> = (0..PRODUCERS)
    .map(|p| {
      let tx = tx.clone();
      thread::spawn(move || {
        for i in 0..ITEMS_LOW {
          tx.send(p * ITEMS_LOW + i).unwrap();
        }
      })
    })
    .collect();

  let consumer = thread::spawn(move || {
    let mut seen = HashSet::new();
    while let Ok(v) = rx.recv() {
      assert!(seen.insert(v), "duplicate item {}", v);
    }
    seen.len()
  });

  for handle in handles {
    handle.join().unwrap();
  }
  tx.close();

  assert_eq!(consumer.join().unwrap(), PRODUCERS * ITEMS_LOW);
}

#[test]
fn heavy_contention_on_a_tiny_buffer() {
  const PRODUCERS: usize = 8;
  const PER_PRODUCER: usize = 500;
  let (tx, mut rx) = mpsc::channel(2);

  let handles: Vec<_> = (0..PRODUCERS)
    .map(|p| {
      let tx = tx.clone();
      thread::spawn(move || {
        for i in 0..PER_PRODUCER {
          tx.send(p * PER_PRODUCER + i).unwrap();
        }
      })
    })
    .collect();
  drop(tx);

  let mut count = 0usize;
  let mut seen = vec![false; PRODUCERS * PER_PRODUCER];
  while count < PRODUCERS * PER_PRODUCER {
    if let Ok(v) = rx.try_recv() {
      assert!(!seen[v]);
      seen[v] = true;
      count += 1;
    }
  }
  for handle in handles {
    handle.join().unwrap();
  }
  assert!(rx.is_empty());
}

#[test]
fn send_after_close_fails_for_every_clone() {
  let (tx, mut rx) = mpsc::channel::<u32>(4);
  let tx2 = tx.clone();
  tx.send(1).unwrap();
  rx.close();
  assert!(tx.send(2).is_err());
  assert!(tx2.send(3).is_err());
  // The value accepted before the close still drains.
  assert_eq!(rx.recv().unwrap(), 1);
  assert_eq!(rx.recv(), Err(RecvError::Closed));
}

#[test]
fn size_stays_within_bounds_under_load() {
  let (tx, mut rx) = mpsc::channel(10);
  let producers: Vec<_> = (0..3)
    .map(|_| {
      let tx = tx.clone();
      thread::spawn(move || {
        for i in 0..ITEMS_MEDIUM {
          tx.send(i).unwrap();
        }
      })
    })
    .collect();
  drop(tx);

  let mut received = 0usize;
  while received < 3 * ITEMS_MEDIUM {
    let len = rx.len();
    assert!(len <= 10, "len {} exceeded capacity", len);
    if rx.try_recv().is_ok() {
      received += 1;
    }
  }
  for handle in producers {
    handle.join().unwrap();
  }
}
