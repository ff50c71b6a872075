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

//! Bit-flag sets exchanged with callers.
//!
//! Each set is a thin wrapper over its raw integer so that the value crossing
//! the boundary is exactly the value stored.

macro_rules! bit_flags {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(
                $(#[$flag_meta:meta])*
                const $flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name {
            bits: $repr,
        }

        impl $name {
            /// No flags set.
            pub const NONE: Self = Self { bits: 0 };
            $(
                $(#[$flag_meta])*
                pub const $flag: Self = Self { bits: $value };
            )*
            /// Every flag defined for this set.
            pub const ALL: Self = Self { bits: 0 $(| $value)* };

            /// Creates a set from raw bits, rejecting unknown bits.
            pub const fn from_bits(bits: $repr) -> Option<Self> {
                if bits & !Self::ALL.bits == 0 {
                    Some(Self { bits })
                } else {
                    None
                }
            }

            /// Creates a set from raw bits, dropping unknown bits.
            pub const fn from_bits_truncate(bits: $repr) -> Self {
                Self {
                    bits: bits & Self::ALL.bits,
                }
            }

            /// Returns the raw bits.
            pub const fn bits(&self) -> $repr {
                self.bits
            }

            /// Combines two sets.
            pub const fn union(self, other: Self) -> Self {
                Self {
                    bits: self.bits | other.bits,
                }
            }

            /// Checks whether every flag of `other` is set.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Checks if no flag is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Sets or clears the flags of `other`.
            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.bits |= other.bits;
                } else {
                    self.bits &= !other.bits;
                }
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self::Output {
                self.union(rhs)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                *self = self.union(rhs);
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self::Output {
                Self {
                    bits: self.bits & rhs.bits,
                }
            }
        }
    };
}

bit_flags! {
    /// Options requested when a device is created.
    pub struct DeviceFlags: u32 {
        /// Enable the native validation layer.
        const VALIDATION = 1 << 0;
        /// Emit debug markers around recorded passes.
        const DEBUG_MARKERS = 1 << 1;
        /// Collect backend diagnostics.
        const DIAGNOSTICS = 1 << 2;
        /// The device never presents.
        const HEADLESS = 1 << 3;
    }
}

bit_flags! {
    /// Rendering features an adapter or device supports.
    pub struct FeatureFlags: u32 {
        /// Fragment shader ordering (rasterizer ordered views or interlock).
        const RASTER_ORDERING = 1 << 0;
        /// Atomic read/write storage on the color format.
        const ATOMIC_PATH_RENDERING = 1 << 1;
        /// The clockwise fill rule is available.
        const CLOCKWISE_FILL = 1 << 2;
        /// Advanced blend modes are available.
        const ADVANCED_BLEND = 1 << 3;
        /// Advanced blending is coherent without barriers.
        const ADVANCED_BLEND_COHERENT = 1 << 4;
        /// Hardware clip distances.
        const CLIP_PLANES = 1 << 5;
        /// The framebuffer origin is the bottom-left corner.
        const BOTTOM_UP_FRAMEBUFFER = 1 << 6;
        /// The device can render without a presentable surface.
        const HEADLESS_SUPPORTED = 1 << 7;
    }
}

bit_flags! {
    /// Options requested when a surface is created.
    pub struct SurfaceFlags: u32 {
        /// Synchronize presentation with the display refresh.
        const ENABLE_VSYNC = 1 << 0;
        /// Allow tearing when presenting with a zero interval.
        const ALLOW_TEARING = 1 << 1;
    }
}

bit_flags! {
    /// Options for a single present call.
    pub struct PresentFlags: u32 {
        /// Present immediately, allowing tearing, if the surface negotiated it.
        const ALLOW_TEARING = 1 << 0;
    }
}

bit_flags! {
    /// Creation options for engine buffers.
    pub struct BufferFlags: u32 {
        /// The buffer is filled once after creation and never mapped again.
        const MAPPED_ONCE_AT_INITIALIZATION = 1 << 0;
    }
}

bit_flags! {
    /// Hints for a buffer mapping.
    pub struct MapFlags: u32 {
        /// The mapped range may be invalidated.
        const INVALIDATE_RANGE = 1 << 0;
        /// Previous contents of the range may be discarded.
        const DISCARD_RANGE = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_flags_combine_and_query() {
        let mut flags = FeatureFlags::HEADLESS_SUPPORTED | FeatureFlags::CLIP_PLANES;
        assert_eq!(flags.bits(), (1 << 7) | (1 << 5));
        assert!(flags.contains(FeatureFlags::CLIP_PLANES));
        assert!(!flags.contains(FeatureFlags::RASTER_ORDERING));

        flags.set(FeatureFlags::CLIP_PLANES, false);
        assert_eq!(flags, FeatureFlags::HEADLESS_SUPPORTED);
        assert!(FeatureFlags::NONE.is_empty());
    }

    #[test]
    fn unknown_bits_are_rejected_or_truncated() {
        assert_eq!(SurfaceFlags::from_bits(0b11), Some(SurfaceFlags::ALL));
        assert_eq!(SurfaceFlags::from_bits(0b100), None);
        assert_eq!(
            DeviceFlags::from_bits_truncate(0xff),
            DeviceFlags::ALL
        );
        assert_eq!(DeviceFlags::ALL.bits(), 0b1111);
    }

    #[test]
    fn intersection_keeps_shared_bits() {
        let requested = PresentFlags::ALLOW_TEARING;
        assert_eq!(requested & PresentFlags::NONE, PresentFlags::NONE);
        assert_eq!(
            MapFlags::INVALIDATE_RANGE & MapFlags::ALL,
            MapFlags::INVALIDATE_RANGE
        );
    }
}
