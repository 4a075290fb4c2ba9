//! GPU feature detection and management.
//!
//! A type-safe wrapper around the wgpu features the batch pipeline cares
//! about, with support for required vs requested features.

use bitflags::bitflags;

bitflags! {
    /// GPU features that can be requested or required.
    ///
    /// Use `GpuFeatures::to_wgpu()` to convert to `wgpu::Features`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GpuFeatures: u32 {
        /// Allows a non-zero `first_instance` in indirect draw commands.
        const INDIRECT_FIRST_INSTANCE = 1 << 0;

        /// Push constants, used for the model matrix and color modifier.
        const PUSH_CONSTANTS = 1 << 1;

        /// 16-bit floats in shaders, for half-float vertex attributes read
        /// from storage streams.
        const SHADER_F16 = 1 << 2;
    }
}

impl GpuFeatures {
    /// Features a program needs to receive the model matrix and color modifier.
    pub const BATCH_PROGRAMS: Self = Self::PUSH_CONSTANTS;

    /// Convert to wgpu::Features.
    pub fn to_wgpu(self) -> wgpu::Features {
        let mut features = wgpu::Features::empty();

        if self.contains(GpuFeatures::INDIRECT_FIRST_INSTANCE) {
            features |= wgpu::Features::INDIRECT_FIRST_INSTANCE;
        }
        if self.contains(GpuFeatures::PUSH_CONSTANTS) {
            features |= wgpu::Features::PUSH_CONSTANTS;
        }
        if self.contains(GpuFeatures::SHADER_F16) {
            features |= wgpu::Features::SHADER_F16;
        }

        features
    }

    /// Convert from wgpu::Features, ignoring features without a counterpart.
    pub fn from_wgpu(features: wgpu::Features) -> Self {
        let mut gpu_features = GpuFeatures::empty();

        if features.contains(wgpu::Features::INDIRECT_FIRST_INSTANCE) {
            gpu_features |= GpuFeatures::INDIRECT_FIRST_INSTANCE;
        }
        if features.contains(wgpu::Features::PUSH_CONSTANTS) {
            gpu_features |= GpuFeatures::PUSH_CONSTANTS;
        }
        if features.contains(wgpu::Features::SHADER_F16) {
            gpu_features |= GpuFeatures::SHADER_F16;
        }

        gpu_features
    }

    /// Check if all the specified features are supported by the adapter.
    pub fn check_support(self, adapter: &wgpu::Adapter) -> FeatureSupportResult {
        let adapter_features = GpuFeatures::from_wgpu(adapter.features());
        let missing = self - (self & adapter_features);

        if missing.is_empty() {
            FeatureSupportResult::Supported
        } else {
            FeatureSupportResult::Missing(missing)
        }
    }
}

impl Default for GpuFeatures {
    fn default() -> Self {
        GpuFeatures::empty()
    }
}

/// Result of checking feature support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSupportResult {
    /// All requested features are supported.
    Supported,
    /// Some features are missing.
    Missing(GpuFeatures),
}

impl FeatureSupportResult {
    pub fn is_supported(&self) -> bool {
        matches!(self, FeatureSupportResult::Supported)
    }

    /// Returns the missing features, if any.
    pub fn missing(&self) -> Option<GpuFeatures> {
        match self {
            FeatureSupportResult::Supported => None,
            FeatureSupportResult::Missing(features) => Some(*features),
        }
    }
}
