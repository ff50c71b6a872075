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

//! Failure injection for the software backend.

use super::device::Timeline;
use crate::sync::lock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use strata_core::NativeError;

/// Failures the software backend should produce.
///
/// One-shot failures are consumed by the first operation that observes them.
#[derive(Debug, Default)]
pub struct FaultPlan {
    fail_enumeration: AtomicBool,
    fail_open: AtomicBool,
    stall_signals: AtomicBool,
    signal: Mutex<Option<NativeError>>,
    present: Mutex<Option<NativeError>>,
    swap_chain: Mutex<Option<NativeError>>,
    resize: Mutex<Option<NativeError>>,
    stalled: Mutex<Vec<(Arc<Timeline>, u64)>>,
}

impl FaultPlan {
    /// Makes adapter enumeration fail until cleared.
    pub fn fail_enumeration(&self, fail: bool) {
        self.fail_enumeration.store(fail, Ordering::SeqCst);
    }

    /// Makes device creation fail until cleared.
    pub fn fail_device_creation(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Queues stop completing fence signals until
    /// [`FaultPlan::release_stalled_signals`] is called.
    pub fn stall_signals(&self) {
        self.stall_signals.store(true, Ordering::SeqCst);
    }

    /// Completes every stalled signal and lets later signals complete again.
    pub fn release_stalled_signals(&self) {
        self.stall_signals.store(false, Ordering::SeqCst);
        let stalled = std::mem::take(&mut *lock(&self.stalled));
        for (timeline, value) in stalled {
            timeline.advance(value);
        }
    }

    /// Fails the next queue signal with `error`.
    pub fn fail_next_signal(&self, error: NativeError) {
        *lock(&self.signal) = Some(error);
    }

    /// Fails the next present with `error`.
    pub fn fail_next_present(&self, error: NativeError) {
        *lock(&self.present) = Some(error);
    }

    /// Fails the next swapchain creation with `error`.
    pub fn fail_next_swap_chain(&self, error: NativeError) {
        *lock(&self.swap_chain) = Some(error);
    }

    /// Fails the next swapchain resize with `error`.
    pub fn fail_next_resize(&self, error: NativeError) {
        *lock(&self.resize) = Some(error);
    }

    pub(crate) fn enumeration_fails(&self) -> bool {
        self.fail_enumeration.load(Ordering::SeqCst)
    }

    pub(crate) fn open_fails(&self) -> bool {
        self.fail_open.load(Ordering::SeqCst)
    }

    /// Holds back a signal if signals are stalled. Returns `true` if it was held.
    pub(crate) fn hold_signal(&self, timeline: &Arc<Timeline>, value: u64) -> bool {
        if !self.stall_signals.load(Ordering::SeqCst) {
            return false;
        }
        lock(&self.stalled).push((Arc::clone(timeline), value));
        true
    }

    pub(crate) fn take_signal(&self) -> Option<NativeError> {
        lock(&self.signal).take()
    }

    pub(crate) fn take_present(&self) -> Option<NativeError> {
        lock(&self.present).take()
    }

    pub(crate) fn take_swap_chain(&self) -> Option<NativeError> {
        lock(&self.swap_chain).take()
    }

    pub(crate) fn take_resize(&self) -> Option<NativeError> {
        lock(&self.resize).take()
    }
}
