//! Layout descriptors for the streams a batch writes.
//!
//! A [`VertexLayout`] describes one interleaved vertex (or instance) element:
//! its attribute formats and stride. A [`StorageLayout`] names a shader-storage
//! stream and gives its element stride. The pipeline itself only needs the
//! strides; the attribute list is turned into vertex input state when a batch
//! is realized.

/// A single attribute inside an interleaved element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Data format of the attribute.
    pub format: wgpu::VertexFormat,
    /// Byte offset within the element.
    pub offset: u32,
}

/// Interleaved element layout.
///
/// Layouts are compared and hashed by value, so two batches that describe the
/// same attributes share cached vertex input state.
///
/// # Example
///
/// ```rust
/// use tessera_render::VertexLayout;
/// use wgpu::VertexFormat;
///
/// let layout = VertexLayout::new()
///     .with_element(VertexFormat::Float32x3)
///     .with_element(VertexFormat::Unorm8x4);
/// assert_eq!(layout.stride(), 16);
/// assert_eq!(layout.element_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    elements: Vec<VertexElement>,
    stride: u32,
}

impl VertexLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute right after the previous one.
    pub fn with_element(mut self, format: wgpu::VertexFormat) -> Self {
        self.elements.push(VertexElement {
            format,
            offset: self.stride,
        });
        self.stride += format.size() as u32;
        self
    }

    /// Append `bytes` of padding after the last attribute.
    pub fn with_padding(mut self, bytes: u32) -> Self {
        self.stride += bytes;
        self
    }

    /// Position (`Float32x3`) followed by a normalized RGBA8 color.
    pub fn position_color() -> Self {
        Self::new()
            .with_element(wgpu::VertexFormat::Float32x3)
            .with_element(wgpu::VertexFormat::Unorm8x4)
    }

    /// Position, normal and texture coordinates.
    pub fn position_normal_uv() -> Self {
        Self::new()
            .with_element(wgpu::VertexFormat::Float32x3)
            .with_element(wgpu::VertexFormat::Float32x3)
            .with_element(wgpu::VertexFormat::Float32x2)
    }

    /// Bytes per element.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride as usize
    }

    /// Number of attributes.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Offset of the first `Float32x3` attribute, treated as the position.
    pub fn position_offset(&self) -> Option<usize> {
        self.elements
            .iter()
            .find(|e| e.format == wgpu::VertexFormat::Float32x3)
            .map(|e| e.offset as usize)
    }

    /// wgpu attributes with shader locations starting at `first_location`.
    pub fn attributes(&self, first_location: u32) -> Vec<wgpu::VertexAttribute> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| wgpu::VertexAttribute {
                format: e.format,
                offset: e.offset as u64,
                shader_location: first_location + i as u32,
            })
            .collect()
    }
}

/// A named shader-storage stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageLayout {
    pub name: String,
    /// Bytes per element.
    pub stride: usize,
}

impl StorageLayout {
    pub fn new(name: impl Into<String>, stride: usize) -> Self {
        Self {
            name: name.into(),
            stride,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_and_stride() {
        let layout = VertexLayout::position_normal_uv();
        let offsets: Vec<u32> = layout.elements().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        assert_eq!(layout.stride(), 32);
    }

    #[test]
    fn test_padding() {
        let layout = VertexLayout::new()
            .with_element(wgpu::VertexFormat::Float32x2)
            .with_padding(8);
        assert_eq!(layout.stride(), 16);
        assert_eq!(layout.element_count(), 1);
    }

    #[test]
    fn test_position_offset() {
        let layout = VertexLayout::new()
            .with_element(wgpu::VertexFormat::Float32x2)
            .with_element(wgpu::VertexFormat::Float32x3);
        assert_eq!(layout.position_offset(), Some(8));

        let flat = VertexLayout::new().with_element(wgpu::VertexFormat::Float32x2);
        assert_eq!(flat.position_offset(), None);
    }

    #[test]
    fn test_attribute_locations() {
        let attributes = VertexLayout::position_color().attributes(3);
        assert_eq!(attributes[0].shader_location, 3);
        assert_eq!(attributes[1].shader_location, 4);
        assert_eq!(attributes[1].offset, 12);
    }
}
