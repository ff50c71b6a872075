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

//! Deterministic software backend.
//!
//! [`SoftApi`] behaves like a native graphics API without touching a GPU: queues
//! complete work immediately, swapchains rotate through placeholder textures and
//! every operation is appended to a shared [`Journal`]. A [`FaultPlan`] injects
//! failures (device creation, signals, presents including device removal) so the
//! lifecycle layer's error paths can be exercised.

mod command;
mod device;
mod fault;
mod journal;
mod swapchain;

pub use self::command::{SoftCommandAllocator, SoftCommandList, SoftQueue};
pub use self::device::{SoftDevice, SoftFence, SoftTexture};
pub use self::fault::FaultPlan;
pub use self::journal::{Journal, JournalEntry};
pub use self::swapchain::SoftSwapChain;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_core::renderer::api::{
    AdapterInfo, BackendKind, Capabilities, DeviceFlags, FeatureFlags, VulkanImport,
};
use strata_core::renderer::traits::{NativeAdapter, NativeApi, NativeDevice};
use strata_core::{NativeError, NativeResult};

/// An adapter exposed by a [`SoftApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct SoftAdapter {
    /// Adapter name.
    pub name: String,
    /// Reported as a software rasterizer.
    pub software: bool,
    /// The capability probe fails on this adapter.
    pub probe_fails: bool,
    /// Advertised features.
    pub features: FeatureFlags,
    /// Dedicated memory in bytes.
    pub dedicated_video_memory: u64,
}

impl SoftAdapter {
    /// A hardware adapter with raster ordering and atomics.
    pub fn hardware(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            software: false,
            probe_fails: false,
            features: FeatureFlags::RASTER_ORDERING
                | FeatureFlags::ATOMIC_PATH_RENDERING
                | FeatureFlags::HEADLESS_SUPPORTED,
            dedicated_video_memory: 2 << 30,
        }
    }

    /// A software rasterizer adapter.
    pub fn software(name: impl Into<String>) -> Self {
        Self {
            software: true,
            dedicated_video_memory: 0,
            ..Self::hardware(name)
        }
    }

    /// Makes the capability probe fail on this adapter.
    pub fn failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    /// Replaces the advertised features.
    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }
}

/// A native API implemented in software.
#[derive(Debug)]
pub struct SoftApi {
    backend: BackendKind,
    adapters: Vec<SoftAdapter>,
    tearing: bool,
    vulkan_import: bool,
    journal: Journal,
    faults: Arc<FaultPlan>,
    enumerations: AtomicUsize,
    probes: AtomicUsize,
}

impl SoftApi {
    /// Creates an API for `backend` with a single hardware adapter.
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            adapters: vec![SoftAdapter::hardware(format!("Soft {backend} Adapter"))],
            tearing: true,
            vulkan_import: false,
            journal: Journal::new(),
            faults: Arc::new(FaultPlan::default()),
            enumerations: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    /// Replaces the adapter list.
    pub fn with_adapters(mut self, adapters: Vec<SoftAdapter>) -> Self {
        self.adapters = adapters;
        self
    }

    /// Sets whether swapchains of this API can present without vertical sync.
    pub fn with_tearing(mut self, tearing: bool) -> Self {
        self.tearing = tearing;
        self
    }

    /// Accepts imported Vulkan devices.
    pub fn with_vulkan_import(mut self) -> Self {
        self.vulkan_import = true;
        self
    }

    /// The journal shared by every object of this API.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// The failure plan shared by every object of this API.
    pub fn faults(&self) -> Arc<FaultPlan> {
        Arc::clone(&self.faults)
    }

    /// Number of adapter enumerations performed.
    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    /// Number of capability probes performed.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn adapter(&self, adapter: &NativeAdapter) -> NativeResult<&SoftAdapter> {
        self.adapters.get(adapter.ordinal).ok_or_else(|| {
            NativeError::Failed(format!("no soft adapter at ordinal {}", adapter.ordinal))
        })
    }

    fn capabilities(&self, features: FeatureFlags) -> Capabilities {
        Capabilities {
            backend: self.backend,
            features,
            max_buffer_size: 1 << 30,
            max_texture_dimension: 16384,
            max_texture_array_layers: 2048,
            max_sampler_anisotropy: 16.0,
            supports_hdr: false,
            supports_presentation: true,
        }
    }

    fn device(&self, capabilities: Capabilities) -> Arc<dyn NativeDevice> {
        Arc::new(SoftDevice::new(
            capabilities,
            self.tearing,
            self.journal.clone(),
            Arc::clone(&self.faults),
        ))
    }
}

impl NativeApi for SoftApi {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    fn enumerate_adapters(&self) -> NativeResult<Vec<NativeAdapter>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        if self.faults.enumeration_fails() {
            return Err(NativeError::Failed("adapter enumeration failed".into()));
        }
        Ok(self
            .adapters
            .iter()
            .enumerate()
            .map(|(ordinal, adapter)| NativeAdapter {
                info: AdapterInfo {
                    backend: self.backend,
                    vendor_id: 0x1af4,
                    device_id: 0x1000 + ordinal as u16,
                    subsys_id: 0,
                    revision: 1,
                    dedicated_video_memory: adapter.dedicated_video_memory,
                    shared_system_memory: 1 << 30,
                    features: adapter.features,
                    name: adapter.name.clone(),
                },
                software: adapter.software,
                ordinal,
            })
            .collect())
    }

    fn probe(&self, adapter: &NativeAdapter) -> NativeResult<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.adapter(adapter)?.probe_fails {
            return Err(NativeError::Unsupported(format!(
                "{} is below the minimum feature level",
                adapter.info.name
            )));
        }
        Ok(())
    }

    fn open_device(
        &self,
        adapter: &NativeAdapter,
        flags: DeviceFlags,
    ) -> NativeResult<Arc<dyn NativeDevice>> {
        let soft = self.adapter(adapter)?;
        if self.faults.open_fails() {
            return Err(NativeError::OutOfMemory(format!(
                "cannot open a device on {}",
                soft.name
            )));
        }
        log::debug!("Opening soft device on \"{}\" with {flags:?}", soft.name);
        self.journal
            .record(JournalEntry::DeviceOpened(soft.name.clone()));
        Ok(self.device(self.capabilities(soft.features)))
    }

    fn import_vulkan(&self, import: &VulkanImport) -> NativeResult<Arc<dyn NativeDevice>> {
        if !self.vulkan_import || self.backend != BackendKind::Vulkan {
            return Err(NativeError::Unsupported(format!(
                "{} cannot import Vulkan handles",
                self.backend
            )));
        }
        self.journal
            .record(JournalEntry::DeviceOpened("imported Vulkan device".into()));
        Ok(self.device(self.capabilities(import.features.feature_flags())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::api::{SurfaceTarget, SwapChainConfig, RawHandle};
    use strata_core::renderer::traits::{EncodedWork, LoadAction, QueueKind};

    fn open(api: &SoftApi) -> Arc<dyn NativeDevice> {
        let adapter = api.enumerate_adapters().unwrap().remove(0);
        api.open_device(&adapter, DeviceFlags::NONE).unwrap()
    }

    #[test]
    fn enumeration_reports_software_adapters_and_ordinals() {
        let api = SoftApi::new(BackendKind::D3d12).with_adapters(vec![
            SoftAdapter::hardware("A"),
            SoftAdapter::software("WARP"),
        ]);
        let adapters = api.enumerate_adapters().unwrap();
        assert_eq!(adapters.len(), 2);
        assert!(!adapters[0].software);
        assert!(adapters[1].software);
        assert_eq!(adapters[1].ordinal, 1);
        assert_eq!(api.enumerations(), 1);
    }

    #[test]
    fn probe_failure_is_reported_per_adapter() {
        let api = SoftApi::new(BackendKind::Vulkan)
            .with_adapters(vec![SoftAdapter::hardware("Old").failing_probe()]);
        let adapter = api.enumerate_adapters().unwrap().remove(0);
        assert!(matches!(
            api.probe(&adapter),
            Err(NativeError::Unsupported(_))
        ));
        assert_eq!(api.probes(), 1);
    }

    #[test]
    fn closed_lists_execute_and_signals_complete() {
        let api = SoftApi::new(BackendKind::D3d12);
        let device = open(&api);
        let mut allocator = device.create_command_allocator(QueueKind::Direct).unwrap();
        let mut list = device
            .create_command_list(QueueKind::Direct, allocator.as_mut())
            .unwrap();
        list.encode(&EncodedWork::RenderPass {
            label: "clear",
            target: None,
            load: LoadAction::Clear(0xff000000),
            draw_count: 0,
        })
        .unwrap();

        let queue = device.queue(QueueKind::Direct);
        assert!(queue.execute(list.as_mut()).is_err());
        list.close().unwrap();
        queue.execute(list.as_mut()).unwrap();

        let fence = device.create_fence(0).unwrap();
        queue.signal(fence.as_ref(), 4).unwrap();
        assert_eq!(fence.completed_value(), 4);
    }

    #[test]
    fn stalled_signals_complete_on_release() {
        let api = SoftApi::new(BackendKind::D3d12);
        let device = open(&api);
        let fence = device.create_fence(0).unwrap();
        api.faults().stall_signals();
        device
            .queue(QueueKind::Copy)
            .signal(fence.as_ref(), 1)
            .unwrap();
        assert_eq!(fence.completed_value(), 0);
        api.faults().release_stalled_signals();
        assert_eq!(fence.completed_value(), 1);
    }

    #[test]
    fn swap_chain_rotates_and_refuses_resize_while_borrowed() {
        let api = SoftApi::new(BackendKind::D3d12);
        let device = open(&api);
        let target = SurfaceTarget::Win32Window {
            hwnd: RawHandle::from_raw(0x10).unwrap(),
        };
        let config = SwapChainConfig {
            width: 64,
            height: 32,
            buffer_count: 3,
            sample_count: 1,
            allow_tearing: false,
            vsync: true,
        };
        let mut chain = device.create_swap_chain(&target, &config).unwrap();
        assert_eq!(chain.current_back_buffer_index().unwrap(), 0);
        chain.present(1, false).unwrap();
        assert_eq!(chain.current_back_buffer_index().unwrap(), 1);

        let borrowed = chain.back_buffer(1).unwrap();
        assert!(chain.resize(128, 64).is_err());
        drop(borrowed);
        chain.resize(128, 64).unwrap();
        assert_eq!(chain.size(), (128, 64));
        assert_eq!(chain.back_buffer(2).unwrap().size(), (128, 64));
    }

    #[test]
    fn metal_targets_are_rejected_by_d3d12_devices() {
        let api = SoftApi::new(BackendKind::D3d12);
        let device = open(&api);
        let target = SurfaceTarget::MetalLayer {
            layer: RawHandle::from_raw(0x20).unwrap(),
        };
        let config = SwapChainConfig {
            width: 1,
            height: 1,
            buffer_count: 2,
            sample_count: 1,
            allow_tearing: false,
            vsync: false,
        };
        assert!(matches!(
            device.create_swap_chain(&target, &config),
            Err(NativeError::Unsupported(_))
        ));
    }
}
