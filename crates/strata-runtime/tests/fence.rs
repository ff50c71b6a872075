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

use anyhow::Result;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use strata_core::renderer::api::{BackendKind, DeviceDescriptor, DeviceFlags};
use strata_core::renderer::traits::{NativeApi, QueueKind};
use strata_core::{GpuError, NativeError, Status};
use strata_infra::{JournalEntry, RecordingEngine, SoftApi};
use strata_runtime::{Context, Fence, Runtime, INFINITE_TIMEOUT_MS};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn hardware_runtime(api: SoftApi) -> Runtime {
    Runtime::builder(Arc::new(RecordingEngine))
        .native_api(Arc::new(api) as Arc<dyn NativeApi>)
        .build()
}

fn d3d12() -> DeviceDescriptor {
    DeviceDescriptor {
        backend: BackendKind::D3d12,
        adapter_index: 0,
        flags: DeviceFlags::NONE,
    }
}

#[test]
fn test_hardware_fence_signals_from_the_direct_queue() -> Result<()> {
    init_logging();

    // --- 1. Setup ---
    let api = SoftApi::new(BackendKind::D3d12);
    let journal = api.journal();
    let runtime = hardware_runtime(api);
    let device = runtime.create_device(&d3d12())?;
    let context = Context::create(&device, 16, 16)?;
    let fence = Fence::create(&device)?;
    assert_eq!(fence.completed_value()?, 0);

    // --- 2. Signal and wait ---
    journal.clear();
    assert_eq!(context.signal_fence(&fence, 4)?, 4);
    fence.wait(4, 1000)?;
    assert_eq!(fence.completed_value()?, 4);
    assert!(journal.entries().iter().any(|entry| matches!(
        entry,
        JournalEntry::Signal {
            queue: QueueKind::Direct,
            value: 4,
            ..
        }
    )));

    // --- 3. Monotonicity ---
    let err = context.signal_fence(&fence, 4).unwrap_err();
    assert_eq!(err.status(), Status::InvalidParameter);
    assert_eq!(context.signal_fence(&fence, 0)?, 5);

    Ok(())
}

#[test]
fn test_failed_signal_rolls_back() -> Result<()> {
    init_logging();
    let api = SoftApi::new(BackendKind::D3d12);
    let faults = api.faults();
    let runtime = hardware_runtime(api);
    let device = runtime.create_device(&d3d12())?;
    let context = Context::create(&device, 16, 16)?;
    let fence = Fence::create(&device)?;

    faults.fail_next_signal(NativeError::Failed("queue rejected the signal".into()));
    let err = context.signal_fence(&fence, 3).unwrap_err();
    assert_eq!(err.status(), Status::InternalError);
    assert_eq!(fence.with(|f| Ok(f.last_signaled()))?, 0);

    // The same value is accepted once the queue recovers.
    assert_eq!(context.signal_fence(&fence, 3)?, 3);
    Ok(())
}

#[test]
fn test_wait_times_out_then_completes() -> Result<()> {
    init_logging();
    let api = SoftApi::new(BackendKind::D3d12);
    let faults = api.faults();
    let runtime = hardware_runtime(api);
    let device = runtime.create_device(&d3d12())?;
    let context = Context::create(&device, 16, 16)?;
    let fence = Fence::create(&device)?;

    // --- 1. A stalled GPU makes a bounded wait time out ---
    faults.stall_signals();
    context.signal_fence(&fence, 1)?;
    let err = fence.wait(1, 20).unwrap_err();
    assert!(matches!(err, GpuError::InvalidParameter(_)));

    // --- 2. An unbounded wait returns once the GPU catches up ---
    let waiter = {
        let fence = fence.clone();
        thread::spawn(move || fence.wait(1, INFINITE_TIMEOUT_MS))
    };
    thread::sleep(Duration::from_millis(20));
    faults.release_stalled_signals();
    waiter.join().expect("waiter thread")?;
    assert_eq!(fence.completed_value()?, 1);

    Ok(())
}

#[test]
fn test_fence_keeps_its_device_alive() -> Result<()> {
    init_logging();
    let runtime = Runtime::builder(Arc::new(RecordingEngine)).build();
    let device = runtime.create_device(&DeviceDescriptor {
        backend: BackendKind::Null,
        adapter_index: 0,
        flags: DeviceFlags::NONE,
    })?;
    let fence = Fence::create(&device)?;
    assert!(!device.release()?);
    assert!(device.is_alive());
    assert!(fence.release()?);
    assert!(!device.is_alive());
    Ok(())
}
