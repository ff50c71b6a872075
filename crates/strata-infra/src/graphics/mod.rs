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

//! Native graphics backends.

pub mod soft;
#[cfg(feature = "wgpu")]
pub mod wgpu;

use std::sync::Arc;
use strata_core::renderer::traits::NativeApi;

/// Returns the native APIs compiled into this build, in platform preference order.
pub fn default_native_apis() -> Vec<Arc<dyn NativeApi>> {
    #[cfg(feature = "wgpu")]
    {
        wgpu::WgpuApi::platform_apis()
            .into_iter()
            .map(|api| Arc::new(api) as Arc<dyn NativeApi>)
            .collect()
    }
    #[cfg(not(feature = "wgpu"))]
    {
        Vec::new()
    }
}
