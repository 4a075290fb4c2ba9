//! Handles to GPU resources, backed by wgpu or by the mock context.
//!
//! The batch pipeline only holds these handles, so the same code records into
//! a real device or into [`MockRenderContext`](crate::MockRenderContext).
//! Every handle is cheap to clone; a clone refers to the same resource.

#[derive(Clone, Debug)]
enum Backing<T> {
    Real(T),
    #[cfg(feature = "mock")]
    Mock(usize),
}

impl<T> Backing<T> {
    /// The wgpu object. Mock handles have none; reaching for it is a test bug.
    fn real(&self) -> &T {
        match self {
            Backing::Real(resource) => resource,
            #[cfg(feature = "mock")]
            Backing::Mock(id) => panic!("mock resource #{id} has no wgpu object"),
        }
    }

    #[cfg(feature = "mock")]
    fn mock_id(&self) -> Option<usize> {
        match self {
            Backing::Mock(id) => Some(*id),
            Backing::Real(_) => None,
        }
    }
}

/// A vertex, index, storage or indirect buffer.
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    backing: Backing<wgpu::Buffer>,
    size: u64,
}

impl GpuBuffer {
    pub fn from_wgpu(buffer: wgpu::Buffer) -> Self {
        let size = buffer.size();
        Self {
            backing: Backing::Real(buffer),
            size,
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: usize, size: u64) -> Self {
        Self {
            backing: Backing::Mock(id),
            size,
        }
    }

    /// Allocated size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// # Panics
    /// On a mock buffer.
    pub fn as_wgpu(&self) -> &wgpu::Buffer {
        self.backing.real()
    }

    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        self.mock_id().is_some()
    }

    /// Id assigned by the mock context, `None` for real buffers.
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        self.backing.mock_id()
    }
}

/// Pipeline a batch program draws with.
#[derive(Clone, Debug)]
pub struct GpuRenderPipeline {
    backing: Backing<wgpu::RenderPipeline>,
}

impl GpuRenderPipeline {
    pub fn from_wgpu(pipeline: wgpu::RenderPipeline) -> Self {
        Self {
            backing: Backing::Real(pipeline),
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            backing: Backing::Mock(id),
        }
    }

    pub fn as_wgpu(&self) -> &wgpu::RenderPipeline {
        self.backing.real()
    }

    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        self.backing.mock_id()
    }
}

/// Layout of a storage slot's bind group.
#[derive(Clone, Debug)]
pub struct GpuBindGroupLayout {
    backing: Backing<wgpu::BindGroupLayout>,
}

impl GpuBindGroupLayout {
    pub fn from_wgpu(layout: wgpu::BindGroupLayout) -> Self {
        Self {
            backing: Backing::Real(layout),
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            backing: Backing::Mock(id),
        }
    }

    pub fn as_wgpu(&self) -> &wgpu::BindGroupLayout {
        self.backing.real()
    }
}

/// A storage buffer bound to a slot's layout.
#[derive(Clone, Debug)]
pub struct GpuBindGroup {
    backing: Backing<wgpu::BindGroup>,
}

impl GpuBindGroup {
    pub fn from_wgpu(bind_group: wgpu::BindGroup) -> Self {
        Self {
            backing: Backing::Real(bind_group),
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            backing: Backing::Mock(id),
        }
    }

    pub fn as_wgpu(&self) -> &wgpu::BindGroup {
        self.backing.real()
    }

    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        self.backing.mock_id()
    }
}
