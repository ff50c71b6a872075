// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reference-counted handles.
//!
//! Every object crossing the boundary lives in a [`Handle`]: an atomic
//! reference count starting at one plus a mutex-guarded payload. The payload
//! is destroyed exactly when the count moves from one to zero. Parent links
//! (a context's device, a surface's context) are [`Retained`] edges that hold
//! one count on the parent and give it back when the child is destroyed.

use crate::sync::lock;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use strata_core::{GpuError, GpuResult};

/// A payload type that can live in a [`Handle`].
pub trait HandleKind: Send + 'static {
    /// Name used in error messages, e.g. `"context"`.
    const KIND: &'static str;

    /// Checked on an explicit release before the count is decremented.
    ///
    /// Returning an error leaves the count untouched.
    fn before_release(&self) -> GpuResult<()> {
        Ok(())
    }
}

/// Atomic reference count with underflow detection.
#[derive(Debug)]
pub struct RefCount(AtomicU32);

impl RefCount {
    /// A count of one.
    pub fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    /// Current value.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Increments the count and returns the new value.
    pub fn retain(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrements the count.
    ///
    /// ## Returns
    /// `Ok(true)` when this release dropped the last reference.
    /// A count already at zero is restored and reported as an internal error.
    pub fn release(&self, kind: &'static str) -> GpuResult<bool> {
        let previous = self.0.fetch_sub(1, Ordering::AcqRel);
        if previous == 0 {
            self.0.fetch_add(1, Ordering::Relaxed);
            log::error!("{kind} handle refcount underflow");
            return Err(GpuError::internal(format!("{kind} handle refcount underflow")));
        }
        Ok(previous == 1)
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

struct HandleCell<T> {
    refs: RefCount,
    payload: Mutex<Option<T>>,
}

/// A shared, reference-counted object.
///
/// Cloning a `Handle` copies the pointer; it does not take a reference. Use
/// [`Handle::retain`] or [`Retained`] for that.
pub struct Handle<T: HandleKind> {
    cell: Arc<HandleCell<T>>,
}

impl<T: HandleKind> Handle<T> {
    /// Wraps `value` with a reference count of one.
    pub fn new(value: T) -> Self {
        Self {
            cell: Arc::new(HandleCell {
                refs: RefCount::new(),
                payload: Mutex::new(Some(value)),
            }),
        }
    }

    /// Adds a reference. Fails if the object was already destroyed.
    pub fn retain(&self) -> GpuResult<()> {
        let payload = lock(&self.cell.payload);
        if payload.is_none() {
            return Err(GpuError::InvalidHandle(T::KIND));
        }
        self.cell.refs.retain();
        Ok(())
    }

    /// Drops a reference, running [`HandleKind::before_release`] first.
    ///
    /// ## Returns
    /// `Ok(true)` if the object was destroyed by this call.
    pub fn release(&self) -> GpuResult<bool> {
        self.release_inner(true)
    }

    /// Drops a reference held by a parent edge. Skips the release check.
    pub(crate) fn release_edge(&self) -> GpuResult<bool> {
        self.release_inner(false)
    }

    fn release_inner(&self, checked: bool) -> GpuResult<bool> {
        let destroyed = {
            let mut payload = lock(&self.cell.payload);
            let value = payload.as_ref().ok_or(GpuError::InvalidHandle(T::KIND))?;
            if checked {
                value.before_release()?;
            }
            if self.cell.refs.release(T::KIND)? {
                payload.take()
            } else {
                None
            }
        };
        // Destroyed outside the lock: dropping may release parent handles.
        Ok(match destroyed {
            Some(value) => {
                drop(value);
                log::trace!("Destroyed {} handle", T::KIND);
                true
            }
            None => false,
        })
    }

    /// Runs `f` on the payload under its lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> GpuResult<R>) -> GpuResult<R> {
        let mut payload = lock(&self.cell.payload);
        let value = payload.as_mut().ok_or(GpuError::InvalidHandle(T::KIND))?;
        f(value)
    }

    /// Current reference count. Zero once destroyed.
    pub fn ref_count(&self) -> u32 {
        self.cell.refs.get()
    }

    /// Returns `true` until the payload is destroyed.
    pub fn is_alive(&self) -> bool {
        lock(&self.cell.payload).is_some()
    }

    /// Returns `true` if both handles point to the same object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: HandleKind> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: HandleKind> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &T::KIND)
            .field("refs", &self.ref_count())
            .field("ptr", &Arc::as_ptr(&self.cell))
            .finish()
    }
}

/// A counted edge to a parent handle.
///
/// Holds one reference on the parent for as long as it lives.
pub struct Retained<T: HandleKind>(Handle<T>);

impl<T: HandleKind> Retained<T> {
    /// Retains `handle` and keeps the reference until dropped.
    pub fn new(handle: &Handle<T>) -> GpuResult<Self> {
        handle.retain()?;
        Ok(Self(handle.clone()))
    }

    /// The parent handle.
    pub fn handle(&self) -> &Handle<T> {
        &self.0
    }
}

impl<T: HandleKind> Deref for Retained<T> {
    type Target = Handle<T>;

    fn deref(&self) -> &Handle<T> {
        &self.0
    }
}

impl<T: HandleKind> Drop for Retained<T> {
    fn drop(&mut self) {
        if let Err(err) = self.0.release_edge() {
            log::error!("Failed to release {} reference: {err}", T::KIND);
        }
    }
}

impl<T: HandleKind> fmt::Debug for Retained<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Retained").field(&self.0).finish()
    }
}
