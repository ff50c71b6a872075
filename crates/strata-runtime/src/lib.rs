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

//! # Strata Runtime
//!
//! The lifecycle layer between an application and a native rendering engine.
//!
//! Every object is a reference-counted [`Handle`]. A [`Runtime`] discovers
//! adapters and creates [`Device`]s; a [`Context`] records frames through the
//! `begin_frame` / `end_frame` / `submit` state machine; a [`Surface`] lends
//! its back buffers to a context and presents them; [`Fence`]s expose GPU
//! timelines to the host. Paths, paints, buffers and the other engine
//! resources in [`resources`] are thin wrappers over the render engine.
//!
//! Backends plug in through the traits of `strata_core::renderer::traits`.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod device;
pub mod discovery;
pub mod fence;
pub mod frame;
pub mod handle;
pub mod resources;
pub mod runtime;
pub mod surface;
mod sync;

pub use config::{RuntimeConfig, CONFIG_ENV_VAR};
pub use context::Context;
pub use device::{Device, DeviceBinding};
pub use discovery::{AdapterCache, CachedAdapter};
pub use fence::{Fence, INFINITE_TIMEOUT_MS};
pub use frame::{FrameClock, FramePhase};
pub use handle::{Handle, HandleKind, RefCount, Retained};
pub use resources::{Buffer, Font, Image, MappedRange, MeshDraw, Paint, Path, Renderer, Shader};
pub use runtime::{Runtime, RuntimeBuilder};
pub use surface::Surface;
