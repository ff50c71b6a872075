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

//! Ordered record of everything the software backend was asked to do.

use crate::sync::lock;
use std::sync::{Arc, Mutex};
use strata_core::renderer::traits::QueueKind;

/// One operation observed by the software backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// A device was opened on the named adapter.
    DeviceOpened(String),
    /// A command allocator was reset.
    AllocatorReset(QueueKind),
    /// A command list was reopened.
    ListReset(QueueKind),
    /// Work was encoded into a command list.
    Encoded {
        /// Queue of the list.
        queue: QueueKind,
        /// Label of the work.
        label: String,
    },
    /// A command list was closed.
    ListClosed(QueueKind),
    /// A command list was executed.
    Execute(QueueKind),
    /// A queue signaled a fence.
    Signal {
        /// Signaling queue.
        queue: QueueKind,
        /// Fence identity.
        fence: u64,
        /// Signaled value.
        value: u64,
    },
    /// A queue waited on a fence.
    Wait {
        /// Waiting queue.
        queue: QueueKind,
        /// Fence identity.
        fence: u64,
        /// Awaited value.
        value: u64,
    },
    /// A swapchain was created.
    SwapChainCreated {
        /// Image count.
        buffer_count: u32,
        /// Tearing support requested.
        allow_tearing: bool,
    },
    /// A swapchain image was presented.
    Present {
        /// Presented image.
        index: u32,
        /// Requested sync interval.
        sync_interval: u32,
        /// Tearing requested for this present.
        allow_tearing: bool,
    },
    /// A swapchain was resized.
    Resize {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
}

/// Shared, append-only operation log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, entry: JournalEntry) {
        log::trace!("soft backend: {entry:?}");
        lock(&self.entries).push(entry);
    }

    /// Returns a copy of every entry so far.
    pub fn entries(&self) -> Vec<JournalEntry> {
        lock(&self.entries).clone()
    }

    /// Counts the entries matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&JournalEntry) -> bool) -> usize {
        lock(&self.entries).iter().filter(|e| predicate(e)).count()
    }

    /// Forgets every entry.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}
