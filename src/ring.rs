// src/ring.rs

//! The circular buffer shared by every channel variant.
//!
//! One fixed slot array, two monotonically increasing `u64` counters
//! (`head` = next index to pop, `tail` = next index to push; slot index is
//! always `counter % capacity`), and the `closed` flag both endpoints
//! share. The four variants differ only in which side reserves its counter
//! with a CAS; everything else is common and lives here.
//!
//! Each slot carries a publication stamp: `2n` means the slot is writable
//! for logical index `n`, `2n + 1` means a value for `n` is published.
//! Consuming index `n` recycles the stamp to `2(n + capacity)`, the
//! writable state of the next lap. The stamp is what lets a consumer
//! observe the gap between a reserved `tail` and the value actually
//! landing in the slot.
//!
//! The counters are never reset. Past 2^63 operations the stamp arithmetic
//! would wrap; no realistic workload gets there.

use crate::internal::backoff::{Backoff, SPIN_LIMIT};

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

struct Slot<T> {
  stamp: AtomicU64,
  value: UnsafeCell<MaybeUninit<T>>,
}

pub(crate) struct Ring<T> {
  buffer: Box<[Slot<T>]>,
  capacity: u64,
  head: CachePadded<AtomicU64>,
  tail: CachePadded<AtomicU64>,
  closed: AtomicBool,
}

// The stamp protocol guarantees exclusive access to a slot's value between
// its publish and consume edges, so sharing the ring only needs T: Send.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
  /// A capacity of 0 is coerced to 1: a channel always admits one
  /// in-flight value.
  pub(crate) fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    let mut buffer = Vec::with_capacity(capacity);
    for i in 0..capacity {
      buffer.push(Slot {
        stamp: AtomicU64::new(2 * i as u64),
        value: UnsafeCell::new(MaybeUninit::uninit()),
      });
    }
    Ring {
      buffer: buffer.into_boxed_slice(),
      capacity: capacity as u64,
      head: CachePadded::new(AtomicU64::new(0)),
      tail: CachePadded::new(AtomicU64::new(0)),
      closed: AtomicBool::new(false),
    }
  }

  #[inline]
  pub(crate) fn capacity(&self) -> usize {
    self.capacity as usize
  }

  /// Logical size, clamped to `[0, capacity]`. The two counters are read
  /// independently, so a snapshot racing live traffic can be momentarily
  /// stale; the clamp keeps it in range.
  pub(crate) fn len(&self) -> usize {
    let h = self.head.load(Ordering::Relaxed);
    let t = self.tail.load(Ordering::Relaxed);
    t.saturating_sub(h).min(self.capacity) as usize
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    let h = self.head.load(Ordering::Relaxed);
    let t = self.tail.load(Ordering::Acquire);
    t == h
  }

  #[inline]
  pub(crate) fn is_full(&self) -> bool {
    let h = self.head.load(Ordering::Acquire);
    let t = self.tail.load(Ordering::Relaxed);
    t.wrapping_sub(h) >= self.capacity
  }

  /// One-way, idempotent.
  #[inline]
  pub(crate) fn close(&self) {
    self.closed.store(true, Ordering::Release);
  }

  #[inline]
  pub(crate) fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  #[inline]
  fn slot(&self, index: u64) -> &Slot<T> {
    &self.buffer[(index % self.capacity) as usize]
  }

  /// Waits until the slot for `index` is writable. A multi-consumer that
  /// claimed `head` past this slot on the previous lap may still be
  /// reading it; the window closes when that consumer recycles the stamp.
  #[inline]
  fn wait_writable(&self, slot: &Slot<T>, index: u64) {
    let mut backoff = Backoff::new();
    while slot.stamp.load(Ordering::Acquire) != 2 * index {
      backoff.snooze();
    }
  }

  /// Single-producer push. No reservation step: writing the slot and
  /// bumping `tail` are both plain release stores.
  pub(crate) fn push_sp(&self, value: T) -> Result<(), T> {
    let t = self.tail.load(Ordering::Relaxed);
    let h = self.head.load(Ordering::Acquire);
    if t.wrapping_sub(h) >= self.capacity {
      return Err(value);
    }
    let slot = self.slot(t);
    self.wait_writable(slot, t);
    unsafe { (*slot.value.get()).write(value) };
    slot.stamp.store(2 * t + 1, Ordering::Release);
    self.tail.store(t + 1, Ordering::Release);
    Ok(())
  }

  /// Multi-producer push. The CAS reserves index `t`; the stamp store
  /// publishes the value. Between the two, consumers see a bumped `tail`
  /// whose slot is still empty and must wait the gap out.
  pub(crate) fn push_mp(&self, value: T) -> Result<(), T> {
    loop {
      let t = self.tail.load(Ordering::Relaxed);
      let h = self.head.load(Ordering::Acquire);
      if t.wrapping_sub(h) >= self.capacity {
        return Err(value);
      }
      if self
        .tail
        .compare_exchange_weak(t, t + 1, Ordering::AcqRel, Ordering::Relaxed)
        .is_ok()
      {
        let slot = self.slot(t);
        self.wait_writable(slot, t);
        unsafe { (*slot.value.get()).write(value) };
        slot.stamp.store(2 * t + 1, Ordering::Release);
        return Ok(());
      }
    }
  }

  /// Single-consumer pop. The consumer owns `head`, so after a non-empty
  /// snapshot the only thing to wait for is a producer that reserved the
  /// slot but has not published yet.
  pub(crate) fn pop_sc(&self) -> Option<T> {
    let h = self.head.load(Ordering::Relaxed);
    let mut t = self.tail.load(Ordering::Acquire);
    if t == h {
      return None;
    }
    let slot = self.slot(h);
    let mut spins = 0u32;
    while slot.stamp.load(Ordering::Acquire) != 2 * h + 1 {
      thread::yield_now();
      spins += 1;
      if spins > SPIN_LIMIT {
        spins = 0;
        t = self.tail.load(Ordering::Acquire);
        if t == h {
          return None;
        }
      }
    }
    let value = unsafe { (*slot.value.get()).assume_init_read() };
    slot.stamp.store(2 * (h + self.capacity), Ordering::Release);
    self.head.store(h + 1, Ordering::Release);
    Some(value)
  }

  /// Multi-consumer pop. The slot must be published before the `head` CAS
  /// claims it; losing the CAS means another consumer took this index.
  /// An unpublished slot under a bumped `tail` is waited out with a
  /// yield-and-resnapshot loop, which also notices the channel draining
  /// under us.
  pub(crate) fn pop_mc(&self) -> Option<T> {
    let mut spins = 0u32;
    loop {
      let h = self.head.load(Ordering::Relaxed);
      let t = self.tail.load(Ordering::Acquire);
      if t == h {
        return None;
      }
      let slot = self.slot(h);
      if slot.stamp.load(Ordering::Acquire) != 2 * h + 1 {
        // Reserved but not yet published, or our head snapshot went stale.
        spins += 1;
        if spins > SPIN_LIMIT {
          spins = 0;
        }
        thread::yield_now();
        continue;
      }
      spins = 0;
      if self
        .head
        .compare_exchange_weak(h, h + 1, Ordering::AcqRel, Ordering::Relaxed)
        .is_ok()
      {
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.stamp.store(2 * (h + self.capacity), Ordering::Release);
        return Some(value);
      }
    }
  }

  /// Administrative drain: drops every published value in `[head, tail)`,
  /// recycles the stamps, then advances `head` to `tail`.
  ///
  /// Not safe against live producers or consumers. Callers must be in a
  /// quiescent state — both sides paused, or closed and settled.
  pub(crate) fn clear(&self) {
    let mut h = self.head.load(Ordering::Relaxed);
    let t = self.tail.load(Ordering::Relaxed);
    while h != t {
      let slot = self.slot(h);
      if slot.stamp.load(Ordering::Acquire) == 2 * h + 1 {
        unsafe { (*slot.value.get()).assume_init_drop() };
      }
      slot.stamp.store(2 * (h + self.capacity), Ordering::Release);
      h += 1;
    }
    self.head.store(t, Ordering::Release);
  }
}

impl<T> Drop for Ring<T> {
  fn drop(&mut self) {
    // Runs once the last endpoint is gone; residual values drop with us.
    let h = *self.head.get_mut();
    let t = *self.tail.get_mut();
    let capacity = self.capacity;
    let mut i = h;
    while i != t {
      let slot = &mut self.buffer[(i % capacity) as usize];
      if *slot.stamp.get_mut() == 2 * i + 1 {
        unsafe { slot.value.get_mut().assume_init_drop() };
      }
      i += 1;
    }
  }
}

impl<T> fmt::Debug for Ring<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Ring")
      .field("capacity", &self.capacity)
      .field("head", &self.head.load(Ordering::Relaxed))
      .field("tail", &self.tail.load(Ordering::Relaxed))
      .field("closed", &self.closed.load(Ordering::Relaxed))
      .finish_non_exhaustive()
  }
}
