// src/mpsc/mod.rs

//! Bounded multi-producer single-consumer channel.
//!
//! Producers contend for `tail` with a CAS: a winning producer has
//! *reserved* its slot but not yet *published* the value, and the consumer
//! waits that gap out. The sender is `Clone` and shareable; the receiver
//! stays exclusive.

use crate::error::{RecvError, SendError, TryRecvError, TrySendError};
use crate::internal::backoff::Backoff;
use crate::ring::Ring;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Creates a bounded MPSC channel with room for `capacity` values.
/// A `capacity` of 0 is coerced to 1.
pub fn channel<T: Send>(capacity: usize) -> (Sender<T>, Receiver<T>) {
  let ring = Arc::new(Ring::new(capacity));
  (
    Sender {
      ring: Arc::clone(&ring),
    },
    Receiver {
      ring,
      _exclusive: PhantomData,
    },
  )
}

/// The sending half of an MPSC channel. Cloning yields another handle to
/// the same buffer and closed flag; clones may send from any thread
/// concurrently.
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

/// The receiving half of an MPSC channel. Exclusive: not `Clone`.
pub struct Receiver<T> {
  ring: Arc<Ring<T>>,
  _exclusive: PhantomData<*mut ()>,
}

unsafe impl<T: Send> Send for Receiver<T> {}

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

  /// Closes the channel for every clone. Idempotent.
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
  /// Non-blocking receive. Tolerates producers mid-publication: a
  /// reserved-but-unwritten slot is spun out before the value is taken.
  pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
    match self.ring.pop_sc() {
      Some(value) => Ok(value),
      None if self.ring.is_closed() => Err(TryRecvError::Closed),
      None => Err(TryRecvError::Empty),
    }
  }

  /// Blocking receive: yields until a value arrives or the channel is
  /// closed and drained.
  pub fn recv(&mut self) -> Result<T, RecvError> {
    let mut backoff = Backoff::new();
    while !self.ring.is_closed() {
      if let Some(value) = self.ring.pop_sc() {
        return Ok(value);
      }
      backoff.snooze();
    }
    self.ring.pop_sc().ok_or(RecvError::Closed)
  }

  /// Drops every buffered value. Quiescent-state only.
  pub fn clear(&mut self) {
    self.ring.clear();
  }

  /// Closes the channel. Idempotent.
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
    f.debug_struct("mpsc::Sender").field("ring", &self.ring).finish()
  }
}

impl<T> fmt::Debug for Receiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("mpsc::Receiver").field("ring", &self.ring).finish()
  }
}
