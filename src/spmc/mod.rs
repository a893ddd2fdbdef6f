// src/spmc/mod.rs

//! Bounded single-producer multi-consumer channel.
//!
//! The mirror of [`mpsc`](crate::mpsc): consumers contend for `head` with
//! a CAS while the producer stays exclusive. Because there is only one
//! producer, a slot under a bumped `tail` is always already published;
//! each value is delivered to exactly one consumer.

use crate::error::{RecvError, SendError, TryRecvError, TrySendError};
use crate::internal::backoff::Backoff;
use crate::ring::Ring;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Creates a bounded SPMC channel with room for `capacity` values.
/// A `capacity` of 0 is coerced to 1.
pub fn channel<T: Send>(capacity: usize) -> (Sender<T>, Receiver<T>) {
  let ring = Arc::new(Ring::new(capacity));
  (
    Sender {
      ring: Arc::clone(&ring),
      _exclusive: PhantomData,
    },
    Receiver { ring },
  )
}

/// The sending half of an SPMC channel. Exclusive: not `Clone`.
pub struct Sender<T> {
  ring: Arc<Ring<T>>,
  _exclusive: PhantomData<*mut ()>,
}

unsafe impl<T: Send> Send for Sender<T> {}

/// The receiving half of an SPMC channel. Cloning yields another handle;
/// clones may receive from any thread concurrently, and no value is ever
/// delivered twice.
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
  pub fn try_send(&mut self, value: T) -> Result<(), TrySendError<T>> {
    if self.ring.is_closed() {
      return Err(TrySendError::Closed(value));
    }
    self.ring.push_sp(value).map_err(TrySendError::Full)
  }

  /// Blocking send: yields until the value is accepted or the channel
  /// closes.
  pub fn send(&mut self, value: T) -> Result<(), SendError> {
    let mut value = value;
    let mut backoff = Backoff::new();
    while !self.ring.is_closed() {
      match self.ring.push_sp(value) {
        Ok(()) => return Ok(()),
        Err(v) => value = v,
      }
      backoff.snooze();
    }
    Err(SendError::Closed)
  }

  /// Closes the channel. Idempotent; consumers drain residuals afterwards.
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

impl<T> fmt::Debug for Sender<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("spmc::Sender").field("ring", &self.ring).finish()
  }
}

impl<T> fmt::Debug for Receiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("spmc::Receiver").field("ring", &self.ring).finish()
  }
}
