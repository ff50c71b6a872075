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

//! `extern "C"` entry points, grouped by object kind.

/// Exports `retain` and `release` for one handle type.
macro_rules! refcount_exports {
    ($handle:ty, $table:ident, $retain:ident, $release:ident) => {
        #[doc = concat!("Adds a reference to a `", stringify!($handle), "`.")]
        #[no_mangle]
        pub extern "C" fn $retain(handle: $handle) -> $crate::abi::StrataStatus {
            $crate::call::guard(stringify!($retain), || {
                $crate::registry::$table.retain(handle.handle)
            })
        }

        #[doc = concat!("Drops a reference to a `", stringify!($handle), "`.")]
        #[no_mangle]
        pub extern "C" fn $release(handle: $handle) -> $crate::abi::StrataStatus {
            $crate::call::guard(stringify!($release), || {
                $crate::registry::$table.release(handle.handle)
            })
        }
    };
}

pub mod assets;
pub mod context;
pub mod device;
pub mod diagnostics;
pub mod draw;
pub mod fence;
pub mod surface;
