// src/mpmc/mod.rs

//! Bounded multi-producer multi-consumer channel.
//!
//! Both sides CAS: producers reserve `tail`, consumers claim `head`, and
//! consumers additionally tolerate the reserved-but-unpublished gap the
//! same way the [`mpsc`](crate::mpsc) consumer does. Both endpoints are
//! `Clone`.

use crate::error::{RecvError, SendError, TryRecvError, TrySendError};
use crate::internal::backoff::Backoff;
use crate::ring::Ring;

use std::fmt;
use std::sync::Arc;

/// Creates a bounded MPMC channel with room for `capacity` values.
/// A `capacity` of 0 is coerced to 1.
pub fn channel<T: Send>(capacity: usize) -> (Sender<T>, Receiver<T>) {
  let ring = Arc::new(Ring::new(capacity));
  (
    Sender {
      ring: Arc::clone(&ring),
    },
    Receiver { ring },
  )
}

/// The sending half of an MPMC channel. `Clone` and shareable.
pub struct Sender<T> {
  ring: Arc<Ring<T>>,
}

impl<T> Clone for Sender<T> {
  fn clone(&self) -> Self {
    Sender {
      ring: Arc::clone(&self.ring),
    }
  }
}

/// The receiving half of an MPMC channel. `Clone` and shareable; every
/// value is delivered to exactly one consumer.
pub struct Receiver<T> {
  ring: Arc<Ring<T>>,
}

impl<T> Clone for Receiver<T> {
  fn clone(&self) -> Self {
    Receiver {
      ring: Arc::clone(&self.ring),
    }
  }
}

impl<T: Send> Sender<T> {
  /// Non-blocking send; `Full` or `Closed` hands the value back.
  pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
    if self.ring.is_closed() {
      return Err(TrySendError::Closed(value));
    }
    self.ring.push_mp(value).map_err(TrySendError::Full)
  }

  /// Blocking send: yields until the value is accepted or the channel
  /// closes.
  pub fn send(&self, value: T) -> Result<(), SendError> {
    let mut value = value;
    let mut backoff = Backoff::new();
    while !self.ring.is_closed() {
      match self.ring.push_mp(value) {
        Ok(()) => return Ok(()),
        Err(v) => value = v,
      }
      backoff.snooze();
    }
    Err(SendError::Closed)
  }

  /// Closes the channel for every clone of either side. Idempotent.
  pub fn close(&self) {
    self.ring.close();
  }

  /// Whether the channel has been closed.
  pub fn is_closed(&self) -> bool {
    self.ring.is_closed()
  }

  /// Number of values currently buffered.
  pub fn len(&self) -> usize {
    self.ring.len()
  }

  /// Whether the buffer holds no values.
  pub fn is_empty(&self) -> bool {
    self.ring.is_empty()
  }

  /// Whether the buffer is at capacity.
  pub fn is_full(&self) -> bool {
    self.ring.is_full()
  }

  /// The channel capacity (always at least 1).
  pub fn capacity(&self) -> usize {
    self.ring.capacity()
  }
}

impl<T: Send> Receiver<T> {
  /// Non-blocking receive.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    match self.ring.pop_mc() {
      Some(value) => Ok(value),
      None if self.ring.is_closed() => Err(TryRecvError::Closed),
      None => Err(TryRecvError::Empty),
    }
  }

  /// Blocking receive: yields until a value arrives or the channel is
  /// closed and drained.
  pub fn recv(&self) -> Result<T, RecvError> {
    let mut backoff = Backoff::new();
    while !self.ring.is_closed() {
      if let Some(value) = self.ring.pop_mc() {
        return Ok(value);
      }
      backoff.snooze();
    }
    self.ring.pop_mc().ok_or(RecvError::Closed)
  }

  /// Drops every buffered value. Quiescent-state only.
  pub fn clear(&self) {
    self.ring.clear();
  }

  /// Closes the channel for every clone of either side. Idempotent.
  pub fn close(&self) {
    self.ring.close();
  }

  /// Whether the channel has been closed.
  pub fn is_closed(&self) -> bool {
    self.ring.is_closed()
  }

  /// Number of values currently buffered.
  pub fn len(&self) -> usize {
    self.ring.len()
  }

  /// Whether the buffer holds no values.
  pub fn is_empty(&self) -> bool {
    self.ring.is_empty()
  }

  /// Whether the buffer is at capacity.
  pub fn is_full(&self) -> bool {
    self.ring.is_full()
  }

  /// The channel capacity (always at least 1).
  pub fn capacity(&self) -> usize {
    self.ring.capacity()
  }
}

impl<T> fmt::Debug for Sender<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("mpmc::Sender").field("ring", &self.ring).finish()
  }
}

impl<T> fmt::Debug for Receiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("mpmc::Receiver").field("ring", &self.ring).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;
  use std::sync::Mutex;
  use std::thread;

  fn run_contended(producers: usize, consumers: usize, per_producer: usize, capacity: usize) {
    let (tx, rx) = channel(capacity);
    let total = producers * per_producer;
    let seen = Arc::new(Mutex::new(HashSet::new()));

    let consumer_handles: Vec<_> = (0..consumers)
      .map(|_| {
        let rx = rx.clone();
        let seen = Arc::clone(&seen);
        thread::spawn(move || {
          let mut count = 0usize;
          while let Ok(v) = rx.recv() {
            assert!(seen.lock().unwrap().insert(v), "duplicate {}", v);
            count += 1;
          }
          count
        })
      })
      .collect();
    drop(rx);

    let producer_handles: Vec<_> = (0..producers)
      .map(|p| {
        let tx = tx.clone();
        thread::spawn(move || {
          for i in 0..per_producer {
            tx.send(p * per_producer + i).unwrap();
          }
        })
      })
      .collect();

    for handle in producer_handles {
      handle.join().unwrap();
    }
    tx.close();

    let mut received = 0usize;
    for handle in consumer_handles {
      received += handle.join().unwrap();
    }
    assert_eq!(received, total);
    assert_eq!(seen.lock().unwrap().len(), total);
  }

  #[test]
  fn contended_4p_4c_small_buffer() {
    run_contended(4, 4, 250, 4);
  }

  #[test]
  fn contended_2p_2c_capacity_one() {
    run_contended(2, 2, 200, 1);
  }

  #[test]
  fn try_send_full_and_try_recv_empty() {
    let (tx, rx) = channel(1);
    tx.try_send(10).unwrap();
    assert!(matches!(tx.try_send(20), Err(TrySendError::Full(20))));
    assert_eq!(rx.try_recv().unwrap(), 10);
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
  }

  #[test]
  fn close_from_a_receiver_clone_stops_senders() {
    let (tx, rx) = channel::<u8>(4);
    rx.clone().close();
    assert!(matches!(tx.send(1), Err(SendError::Closed)));
  }
}
