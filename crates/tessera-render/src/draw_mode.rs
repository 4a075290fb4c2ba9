//! How a batch's vertices are assembled into primitives.

use bitflags::bitflags;

/// Base primitive type of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    /// Four vertices per quad, drawn as two triangles through an index block.
    Quads,
}

bitflags! {
    /// Modifiers on a [`DrawMode`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DrawModeFlags: u8 {
        /// Draws through an index stream.
        const INDEXED = 1 << 0;
        /// Vertices form separate runs split at recorded breakpoints.
        const CONNECTED = 1 << 1;
        /// Indices are synthesized from the quad count.
        const QUADS = 1 << 2;
        /// An instance stream is drawn once per instance element.
        const INSTANCED = 1 << 3;
    }
}

/// Primitive type plus drawing modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawMode {
    pub primitive: Primitive,
    pub flags: DrawModeFlags,
}

impl DrawMode {
    pub const POINTS: Self = Self::new(Primitive::Points, DrawModeFlags::empty());
    pub const LINES: Self = Self::new(Primitive::Lines, DrawModeFlags::empty());
    pub const LINE_STRIP: Self = Self::new(Primitive::LineStrip, DrawModeFlags::CONNECTED);
    pub const TRIANGLES: Self = Self::new(Primitive::Triangles, DrawModeFlags::empty());
    pub const TRIANGLE_STRIP: Self =
        Self::new(Primitive::TriangleStrip, DrawModeFlags::CONNECTED);
    pub const INDEXED_LINES: Self = Self::new(Primitive::Lines, DrawModeFlags::INDEXED);
    pub const INDEXED_TRIANGLES: Self = Self::new(Primitive::Triangles, DrawModeFlags::INDEXED);
    pub const QUADS: Self = Self::new(
        Primitive::Quads,
        DrawModeFlags::INDEXED.union(DrawModeFlags::QUADS),
    );

    pub const fn new(primitive: Primitive, flags: DrawModeFlags) -> Self {
        Self { primitive, flags }
    }

    /// The same mode, drawing an instance stream.
    pub const fn instanced(self) -> Self {
        Self::new(self.primitive, self.flags.union(DrawModeFlags::INSTANCED))
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.flags.contains(DrawModeFlags::INDEXED)
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.flags.contains(DrawModeFlags::CONNECTED)
    }

    #[inline]
    pub fn is_quads(&self) -> bool {
        self.flags.contains(DrawModeFlags::QUADS)
    }

    #[inline]
    pub fn is_instanced(&self) -> bool {
        self.flags.contains(DrawModeFlags::INSTANCED)
    }

    /// Whether the expanded primitives form a triangle list.
    pub fn is_triangle_list(&self) -> bool {
        matches!(self.primitive, Primitive::Triangles | Primitive::Quads)
    }

    /// Topology to build a render pipeline with.
    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        match self.primitive {
            Primitive::Points => wgpu::PrimitiveTopology::PointList,
            Primitive::Lines => wgpu::PrimitiveTopology::LineList,
            Primitive::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Primitive::Triangles | Primitive::Quads => wgpu::PrimitiveTopology::TriangleList,
            Primitive::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}
