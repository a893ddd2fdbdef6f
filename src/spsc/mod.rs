// src/spsc/mod.rs

//! Bounded single-producer single-consumer channel.
//!
//! The cheapest variant: neither side contends, so both counters advance
//! with plain release stores and nothing ever CASes. Both endpoints are
//! exclusive — neither is `Clone`, and the mutating operations take
//! `&mut self` so the compiler enforces the single-producer and
//! single-consumer constraints.

use crate::error::{RecvError, SendError, TryRecvError, TrySendError};
use crate::internal::backoff::Backoff;
use crate::ring::Ring;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Creates a bounded SPSC channel with room for `capacity` values.
///
/// A `capacity` of 0 is coerced to 1. The ring lives as long as either
/// endpoint; values still inside it are dropped with the last endpoint.
pub fn channel<T: Send>(capacity: usize) -> (Sender<T>, Receiver<T>) {
  let ring = Arc::new(Ring::new(capacity));
  (
    Sender {
      ring: Arc::clone(&ring),
      _exclusive: PhantomData,
    },
    Receiver {
      ring,
      _exclusive: PhantomData,
    },
  )
}

/// The sending half of an SPSC channel. Exclusive: not `Clone`.
pub struct Sender<T> {
  ring: Arc<Ring<T>>,
  _exclusive: PhantomData<*mut ()>,
}

// The phantom pointer suppresses the auto traits; movement between threads
// is fine, concurrent sharing is not.
unsafe impl<T: Send> Send for Sender<T> {}

/// The receiving half of an SPSC channel. Exclusive: not `Clone`.
pub struct Receiver<T> {
  ring: Arc<Ring<T>>,
  _exclusive: PhantomData<*mut ()>,
}

unsafe impl<T: Send> Send for Receiver<T> {}

impl<T: Send> Sender<T> {
  /// Non-blocking send. Fails with `Full` when the buffer is at capacity
  /// and with `Closed` after [`close`](Self::close); the value comes back
  /// either way.
  pub fn try_send(&mut self, value: T) -> Result<(), TrySendError<T>> {
    if self.ring.is_closed() {
      return Err(TrySendError::Closed(value));
    }
    self.ring.push_sp(value).map_err(TrySendError::Full)
  }

  /// Blocking send: yields cooperatively until the value is accepted or
  /// the channel closes. Sending on a closed channel fails immediately.
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

  /// Closes the channel. Idempotent; receivers may still drain residual
  /// values afterwards.
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

  /// The channel capacity (post-coercion, so always at least 1).
  pub fn capacity(&self) -> usize {
    self.ring.capacity()
  }
}

impl<T: Send> Receiver<T> {
  /// Non-blocking receive. `Empty` while the channel is open but has
  /// nothing buffered; `Closed` only once it is closed *and* drained.
  pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
    match self.ring.pop_sc() {
      Some(value) => Ok(value),
      None if self.ring.is_closed() => Err(TryRecvError::Closed),
      None => Err(TryRecvError::Empty),
    }
  }

  /// Blocking receive: yields cooperatively until a value arrives or the
  /// channel is closed and drained. Residual values keep coming out after
  /// close, one per call.
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

  /// Drops every buffered value and advances the pop index to the push
  /// index.
  ///
  /// Only valid in a quiescent state: no concurrent sends or receives may
  /// be in flight while this runs.
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

  /// The channel capacity (post-coercion, so always at least 1).
  pub fn capacity(&self) -> usize {
    self.ring.capacity()
  }
}

impl<T> fmt::Debug for Sender<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("spsc::Sender").field("ring", &self.ring).finish()
  }
}

impl<T> fmt::Debug for Receiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("spsc::Receiver").field("ring", &self.ring).finish()
  }
}
