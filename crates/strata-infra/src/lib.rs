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

//! # Strata Infra
//!
//! Concrete collaborators for the Strata lifecycle layer.
//!
//! - [`graphics::wgpu`] drives real GPUs through `wgpu` (Direct3D 12, Metal, Vulkan).
//! - [`graphics::soft`] is a deterministic software backend that records every
//!   queue operation and can be told to fail. It backs the test suites.
//! - [`engine`] is the recording render engine: it keeps drawing state, decodes
//!   images and fonts, and encodes each frame into the backend's command lists.

#![warn(missing_docs)]

pub mod engine;
pub mod graphics;
mod sync;

pub use engine::RecordingEngine;
pub use graphics::default_native_apis;
pub use graphics::soft::{FaultPlan, Journal, JournalEntry, SoftAdapter, SoftApi};
