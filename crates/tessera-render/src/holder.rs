//! Per-stream data holders.
//!
//! A holder wraps an owned arena and counts the elements written into it.
//! Callers write an element's fields through [`StreamDataHolder::arena`] and
//! then call [`StreamDataHolder::end_element`], which checks that exactly one
//! stride worth of bytes was added.

use crate::arena::OwnedArena;
use crate::error::{BatchError, BatchResult};

/// Counted, fixed-stride byte stream.
#[derive(Debug)]
pub struct StreamDataHolder {
    name: &'static str,
    arena: OwnedArena,
    count: u32,
    stride: usize,
}

impl StreamDataHolder {
    pub fn new(name: &'static str, stride: usize, capacity: usize) -> Self {
        Self {
            name,
            arena: OwnedArena::with_capacity(capacity),
            count: 0,
            stride,
        }
    }

    /// Arena to write the current element's fields into.
    #[inline]
    pub fn arena(&mut self) -> &mut OwnedArena {
        &mut self.arena
    }

    /// Close the current element.
    pub fn end_element(&mut self) -> BatchResult<()> {
        let expected = (self.count as usize + 1) * self.stride;
        let position = self.arena.position();
        if position != expected {
            return Err(BatchError::ElementSizeMismatch {
                stream: self.name,
                element: self.count,
                written: position.saturating_sub(self.count as usize * self.stride),
                stride: self.stride,
            });
        }
        self.count += 1;
        Ok(())
    }

    /// Fails if bytes were written but no element was ever closed.
    pub fn check_complete(&self) -> BatchResult<()> {
        if self.count == 0 && self.arena.position() != 0 {
            return Err(BatchError::MissingEndElement { stream: self.name });
        }
        Ok(())
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Bytes of all closed elements.
    pub fn bytes(&self) -> &[u8] {
        &self.arena.written()[..self.count as usize * self.stride]
    }

    /// Take the bytes of all closed elements.
    pub fn into_bytes(self) -> Vec<u8> {
        let len = self.count as usize * self.stride;
        let mut bytes = self.arena.into_bytes();
        bytes.truncate(len);
        bytes
    }
}

/// Vertex stream with connected-primitive breakpoints.
#[derive(Debug)]
pub struct VertexDataHolder {
    stream: StreamDataHolder,
    breakpoints: Vec<u32>,
}

impl VertexDataHolder {
    pub fn new(stride: usize, capacity: usize) -> Self {
        Self {
            stream: StreamDataHolder::new("vertex", stride, capacity),
            breakpoints: Vec::new(),
        }
    }

    #[inline]
    pub fn arena(&mut self) -> &mut OwnedArena {
        self.stream.arena()
    }

    #[inline]
    pub fn end_element(&mut self) -> BatchResult<()> {
        self.stream.end_element()
    }

    /// End the current connected run (strip, line loop) at the current
    /// vertex count.
    pub fn end_connected_primitive(&mut self) {
        let count = self.stream.count();
        if self.breakpoints.is_empty() {
            self.breakpoints.push(0);
        }
        if self.breakpoints.last() != Some(&count) {
            self.breakpoints.push(count);
        }
    }

    /// Vertex offsets splitting the stream into runs, starting with 0.
    pub fn breakpoints(&self) -> &[u32] {
        &self.breakpoints
    }

    pub fn has_breakpoints(&self) -> bool {
        !self.breakpoints.is_empty()
    }

    pub fn stream(&self) -> &StreamDataHolder {
        &self.stream
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.stream.count()
    }

    pub fn check_complete(&self) -> BatchResult<()> {
        self.stream.check_complete()
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<u32>) {
        (self.stream.into_bytes(), self.breakpoints)
    }
}

/// Index element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    Uint16,
    #[default]
    Uint32,
}

impl IndexFormat {
    pub fn size(&self) -> usize {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }

    pub fn to_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

/// Index stream.
#[derive(Debug)]
pub struct IndexDataHolder {
    stream: StreamDataHolder,
    format: IndexFormat,
}

impl IndexDataHolder {
    pub fn new(format: IndexFormat, capacity: usize) -> Self {
        Self {
            stream: StreamDataHolder::new("index", format.size(), capacity),
            format,
        }
    }

    /// Write one index as a whole element.
    ///
    /// With a 16-bit format only the low 16 bits are stored.
    pub fn put_index(&mut self, index: u32) -> BatchResult<()> {
        match self.format {
            IndexFormat::Uint16 => {
                let narrow = u16::try_from(index).map_err(|_| BatchError::IndexOverflow {
                    index,
                    format: IndexFormat::Uint16,
                })?;
                self.stream.arena().put_u16(narrow)?
            }
            IndexFormat::Uint32 => self.stream.arena().put_u32(index)?,
        };
        self.stream.end_element()
    }

    /// Write several indices.
    pub fn put_indices(&mut self, indices: &[u32]) -> BatchResult<()> {
        self.stream.arena().ensure(indices.len() * self.format.size())?;
        for index in indices {
            self.put_index(*index)?;
        }
        Ok(())
    }

    /// Write a triangle.
    pub fn put_triangle(&mut self, a: u32, b: u32, c: u32) -> BatchResult<()> {
        self.put_indices(&[a, b, c])
    }

    #[inline]
    pub fn arena(&mut self) -> &mut OwnedArena {
        self.stream.arena()
    }

    #[inline]
    pub fn end_element(&mut self) -> BatchResult<()> {
        self.stream.end_element()
    }

    pub fn format(&self) -> IndexFormat {
        self.format
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.stream.count()
    }

    pub fn check_complete(&self) -> BatchResult<()> {
        self.stream.check_complete()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.stream.into_bytes()
    }
}
