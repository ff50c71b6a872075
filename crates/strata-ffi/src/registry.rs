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

//! Handle tables and the process-wide runtime.
//!
//! Every object handed to C is stored in the table of its kind under a
//! process-unique, non-zero id. The id is the opaque handle value, so a
//! handle of one kind never resolves in another kind's table.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, OnceLock};
use strata_core::{GpuError, GpuResult};
use strata_infra::{default_native_apis, RecordingEngine};
use strata_runtime::{
    Buffer, Context, Device, Fence, Font, Handle, HandleKind, Image, Paint, Path, Renderer,
    Runtime, RuntimeConfig, Shader, Surface,
};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Installs the runtime used by every exported function.
///
/// Must run before the first exported call. Returns the runtime back if one
/// is already installed.
pub fn install_runtime(runtime: Runtime) -> Result<(), Runtime> {
    RUNTIME.set(runtime)
}

/// The installed runtime, built from the environment on first use.
pub fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        Runtime::builder(Arc::new(RecordingEngine))
            .config(RuntimeConfig::from_env())
            .native_apis(default_native_apis())
            .build()
    })
}

pub(crate) struct HandleTable<T: HandleKind> {
    entries: Mutex<HashMap<usize, Handle<T>>>,
}

impl<T: HandleKind> HandleTable<T> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<usize, Handle<T>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publishes `handle` and returns its opaque value.
    pub(crate) fn insert(&self, handle: Handle<T>) -> *mut c_void {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        self.entries().insert(id, handle);
        id as *mut c_void
    }

    /// Resolves an opaque value.
    ///
    /// Entries whose object was destroyed through a parent edge are dropped
    /// here.
    pub(crate) fn get(&self, raw: *mut c_void) -> GpuResult<Handle<T>> {
        let id = raw as usize;
        let mut entries = self.entries();
        let handle = entries.get(&id).cloned().ok_or(GpuError::InvalidHandle(T::KIND))?;
        if !handle.is_alive() {
            entries.remove(&id);
            return Err(GpuError::InvalidHandle(T::KIND));
        }
        Ok(handle)
    }

    /// Resolves an optional handle. Null maps to `None`.
    pub(crate) fn get_optional(&self, raw: *mut c_void) -> GpuResult<Option<Handle<T>>> {
        if raw.is_null() {
            return Ok(None);
        }
        self.get(raw).map(Some)
    }

    pub(crate) fn retain(&self, raw: *mut c_void) -> GpuResult<()> {
        self.get(raw)?.retain()
    }

    /// Drops one reference and forgets the handle once it is destroyed.
    ///
    /// A destruction can end objects of other kinds through their parent
    /// edges, so every table is swept afterwards.
    pub(crate) fn release(&self, raw: *mut c_void) -> GpuResult<()> {
        let handle = self.get(raw)?;
        if handle.release()? {
            self.entries().remove(&(raw as usize));
            sweep_destroyed();
        }
        Ok(())
    }

    /// Forgets every entry whose object is gone.
    fn sweep(&self) {
        self.entries().retain(|_, handle| handle.is_alive());
    }
}

macro_rules! tables {
    ($($name:ident: $kind:ty;)*) => {
        $(
            pub(crate) static $name: LazyLock<HandleTable<$kind>> = LazyLock::new(HandleTable::new);
        )*

        fn sweep_destroyed() {
            $($name.sweep();)*
        }
    };
}

tables! {
    DEVICES: Device;
    CONTEXTS: Context;
    SURFACES: Surface;
    FENCES: Fence;
    PATHS: Path;
    PAINTS: Paint;
    RENDERERS: Renderer;
    BUFFERS: Buffer;
    IMAGES: Image;
    FONTS: Font;
    SHADERS: Shader;
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::api::{BackendKind, DeviceDescriptor, DeviceFlags};

    fn null_device() -> Handle<Device> {
        runtime()
            .create_device(&DeviceDescriptor {
                backend: BackendKind::Null,
                adapter_index: 0,
                flags: DeviceFlags::NONE,
            })
            .unwrap()
    }

    #[test]
    fn ids_are_never_zero_and_not_shared_between_kinds() {
        let raw = DEVICES.insert(null_device());
        assert!(!raw.is_null());
        assert!(DEVICES.get(raw).is_ok());
        assert_eq!(
            CONTEXTS.get(raw).unwrap_err(),
            GpuError::InvalidHandle("context")
        );
        assert_eq!(
            DEVICES.get(std::ptr::null_mut()).unwrap_err(),
            GpuError::InvalidHandle("device")
        );
        DEVICES.release(raw).unwrap();
    }

    #[test]
    fn final_release_forgets_the_entry() {
        let raw = DEVICES.insert(null_device());
        DEVICES.retain(raw).unwrap();
        DEVICES.release(raw).unwrap();
        assert!(DEVICES.get(raw).is_ok());

        DEVICES.release(raw).unwrap();
        assert_eq!(DEVICES.release(raw).unwrap_err(), GpuError::InvalidHandle("device"));
    }

    fn is_listed<T: HandleKind>(table: &HandleTable<T>, raw: *mut c_void) -> bool {
        table.entries().contains_key(&(raw as usize))
    }

    #[test]
    fn objects_destroyed_through_edges_are_pruned() {
        let device = null_device();
        let context = Context::create(&device, 8, 8).unwrap();
        let raw = DEVICES.insert(device.clone());
        DEVICES.release(raw).unwrap();
        // The context still holds the device.
        assert!(DEVICES.get(raw).is_ok());

        context.release().unwrap();
        assert_eq!(DEVICES.get(raw).unwrap_err(), GpuError::InvalidHandle("device"));
    }

    #[test]
    fn releasing_a_child_forgets_the_parent_it_destroyed() {
        let device = null_device();
        let context = Context::create(&device, 8, 8).unwrap();
        let device_raw = DEVICES.insert(device);
        let context_raw = CONTEXTS.insert(context);

        DEVICES.release(device_raw).unwrap();
        assert!(is_listed(&DEVICES, device_raw));

        CONTEXTS.release(context_raw).unwrap();
        assert!(!is_listed(&CONTEXTS, context_raw));
        assert!(!is_listed(&DEVICES, device_raw));
    }
}
