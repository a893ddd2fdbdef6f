// src/error.rs

//! Error types returned by the channel operations.
//!
//! Every failure on a channel path is value-returned; nothing here panics.
//! Closure is an explicit [`close`](crate::spsc::Sender::close) — never
//! derived from endpoint drops — so `Closed` always means somebody asked.

use core::fmt;

/// Error returned by `try_send` when the channel cannot accept the value
/// right now. The rejected value is handed back to the caller.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum TrySendError<T> {
  /// The channel was full at observation time.
  Full(T),
  /// The channel has been closed.
  Closed(T),
}

impl<T> TrySendError<T> {
  /// Consumes the error, returning the rejected value.
  #[inline]
  pub fn into_inner(self) -> T {
    match self {
      TrySendError::Full(v) | TrySendError::Closed(v) => v,
    }
  }
}

impl<T> fmt::Debug for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => write!(f, "TrySendError::Full(..)"),
      TrySendError::Closed(_) => write!(f, "TrySendError::Closed(..)"),
    }
  }
}

impl<T> fmt::Display for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => f.write_str("channel full"),
      TrySendError::Closed(_) => f.write_str("channel closed"),
    }
  }
}

impl<T: fmt::Debug> std::error::Error for TrySendError<T> {}

/// Error returned by the blocking `send`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SendError {
  /// The channel was closed before the value could be enqueued.
  Closed,
}

impl std::error::Error for SendError {}

impl fmt::Display for SendError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SendError::Closed => f.write_str("channel closed"),
    }
  }
}

/// Error returned by `try_recv` when no value could be taken immediately.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
  /// The channel was empty at observation time.
  Empty,
  /// The channel is closed and fully drained.
  Closed,
}

impl std::error::Error for TryRecvError {}

impl fmt::Display for TryRecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryRecvError::Empty => f.write_str("channel empty"),
      TryRecvError::Closed => f.write_str("channel closed and drained"),
    }
  }
}

/// Error returned by the blocking `recv`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvError {
  /// The channel is closed and fully drained.
  Closed,
}

impl std::error::Error for RecvError {}

impl fmt::Display for RecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecvError::Closed => f.write_str("channel closed and drained"),
    }
  }
}
