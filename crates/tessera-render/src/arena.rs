//! Growable byte arena with a write cursor and typed little-endian puts.
//!
//! An [`ArenaBuilder`] either owns its storage (and grows on demand) or
//! borrows a caller-provided slice (and never grows). All multi-byte values are
//! written little-endian; matrices are written column-major.
//!
//! ```rust
//! use tessera_render::ArenaBuilder;
//! use glam::Vec3;
//!
//! # fn main() -> tessera_render::BatchResult<()> {
//! let mut arena = ArenaBuilder::with_capacity(64);
//! arena.put_vec3(Vec3::new(1.0, 2.0, 3.0))?.put_u32(0xffff_ffff)?;
//! assert_eq!(arena.finish().len(), 16);
//! assert_eq!(arena.position(), 0);
//! # Ok(())
//! # }
//! ```

use bytemuck::Pod;
use glam::{DMat3, DMat4, DVec2, DVec3, DVec4, IVec2, IVec3, IVec4, Mat3, Mat4, Vec2, Vec3, Vec4};
use half::f16;

use crate::error::{BatchError, BatchResult};

/// Owned arenas grow in multiples of this many bytes.
pub const ARENA_GROWTH_ALIGNMENT: usize = 1024;

/// Encode an `f32` as IEEE-754 half-precision bits (round to nearest even).
#[inline]
pub fn encode_f16(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

/// Decode IEEE-754 half-precision bits to an `f32`.
#[inline]
pub fn decode_f16(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

#[inline]
fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

enum Storage<'a> {
    /// `len()` of the vector is the arena capacity.
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
}

/// Byte arena with a write cursor.
///
/// Invariant: `position() <= capacity()`.
pub struct ArenaBuilder<'a> {
    storage: Storage<'a>,
    cursor: usize,
}

/// An arena that owns its storage.
pub type OwnedArena = ArenaBuilder<'static>;

macro_rules! put_le {
    ($($(#[$meta:meta])* $name:ident: $ty:ty;)*) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name(&mut self, value: $ty) -> BatchResult<&mut Self> {
                self.write(&value.to_le_bytes())
            }
        )*
    };
}

impl ArenaBuilder<'static> {
    /// Create an owned arena with `capacity` zeroed bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Storage::Owned(vec![0; capacity]),
            cursor: 0,
        }
    }
}

impl<'a> ArenaBuilder<'a> {
    /// Wrap an externally sized buffer. The arena never grows past it.
    pub fn borrowed(bytes: &'a mut [u8]) -> Self {
        Self {
            storage: Storage::Borrowed(bytes),
            cursor: 0,
        }
    }

    /// Current write offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Total bytes available before the arena must grow.
    #[inline]
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Owned(bytes) => bytes.len(),
            Storage::Borrowed(bytes) => bytes.len(),
        }
    }

    /// Bytes left before the arena must grow.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Bytes in `[0, position)`, without resetting the cursor.
    pub fn written(&self) -> &[u8] {
        &self.bytes()[..self.cursor]
    }

    fn bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Owned(bytes) => bytes,
            Storage::Borrowed(bytes) => bytes,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Owned(bytes) => bytes,
            Storage::Borrowed(bytes) => bytes,
        }
    }

    /// Make room for `needed` more bytes at the cursor.
    ///
    /// Owned arenas grow to `align(capacity + max(needed, capacity), 1024)`.
    pub fn ensure(&mut self, needed: usize) -> BatchResult<()> {
        let capacity = self.capacity();
        if self.cursor + needed <= capacity {
            return Ok(());
        }

        let available = capacity - self.cursor;
        match &mut self.storage {
            Storage::Borrowed(_) => Err(BatchError::ArenaFull { needed, available }),
            Storage::Owned(bytes) => {
                let new_capacity =
                    align_up(capacity + needed.max(capacity), ARENA_GROWTH_ALIGNMENT);
                bytes
                    .try_reserve_exact(new_capacity - capacity)
                    .map_err(|_| BatchError::OutOfMemory {
                        requested: new_capacity,
                    })?;
                bytes.resize(new_capacity, 0);
                tracing::debug!("Arena grew from {} to {} bytes", capacity, new_capacity);
                Ok(())
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> BatchResult<&mut Self> {
        self.ensure(data.len())?;
        let start = self.cursor;
        self.bytes_mut()[start..start + data.len()].copy_from_slice(data);
        self.cursor += data.len();
        Ok(self)
    }

    put_le! {
        put_u8: u8;
        put_i8: i8;
        put_u16: u16;
        put_i16: i16;
        put_u32: u32;
        put_i32: i32;
        put_f32: f32;
        put_f64: f64;
    }

    /// Write `value` as a half-precision float.
    #[inline]
    pub fn put_f16(&mut self, value: f32) -> BatchResult<&mut Self> {
        self.put_u16(encode_f16(value))
    }

    /// Write raw bytes.
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) -> BatchResult<&mut Self> {
        self.write(bytes)
    }

    /// Write any plain-old-data value in its in-memory representation.
    #[inline]
    pub fn put_pod<T: Pod>(&mut self, value: &T) -> BatchResult<&mut Self> {
        self.write(bytemuck::bytes_of(value))
    }

    fn put_f32s(&mut self, values: &[f32]) -> BatchResult<&mut Self> {
        self.ensure(values.len() * 4)?;
        for value in values {
            self.put_f32(*value)?;
        }
        Ok(self)
    }

    fn put_f64s(&mut self, values: &[f64]) -> BatchResult<&mut Self> {
        self.ensure(values.len() * 8)?;
        for value in values {
            self.put_f64(*value)?;
        }
        Ok(self)
    }

    fn put_i32s(&mut self, values: &[i32]) -> BatchResult<&mut Self> {
        self.ensure(values.len() * 4)?;
        for value in values {
            self.put_i32(*value)?;
        }
        Ok(self)
    }

    pub fn put_ivec2(&mut self, v: IVec2) -> BatchResult<&mut Self> {
        self.put_i32s(&v.to_array())
    }

    pub fn put_ivec3(&mut self, v: IVec3) -> BatchResult<&mut Self> {
        self.put_i32s(&v.to_array())
    }

    pub fn put_ivec4(&mut self, v: IVec4) -> BatchResult<&mut Self> {
        self.put_i32s(&v.to_array())
    }

    pub fn put_vec2(&mut self, v: Vec2) -> BatchResult<&mut Self> {
        self.put_f32s(&v.to_array())
    }

    pub fn put_vec3(&mut self, v: Vec3) -> BatchResult<&mut Self> {
        self.put_f32s(&v.to_array())
    }

    pub fn put_vec4(&mut self, v: Vec4) -> BatchResult<&mut Self> {
        self.put_f32s(&v.to_array())
    }

    pub fn put_dvec2(&mut self, v: DVec2) -> BatchResult<&mut Self> {
        self.put_f64s(&v.to_array())
    }

    pub fn put_dvec3(&mut self, v: DVec3) -> BatchResult<&mut Self> {
        self.put_f64s(&v.to_array())
    }

    pub fn put_dvec4(&mut self, v: DVec4) -> BatchResult<&mut Self> {
        self.put_f64s(&v.to_array())
    }

    /// Write a 3x3 matrix, column-major.
    pub fn put_mat3(&mut self, m: Mat3) -> BatchResult<&mut Self> {
        self.put_f32s(&m.to_cols_array())
    }

    /// Write a 4x4 matrix, column-major.
    pub fn put_mat4(&mut self, m: Mat4) -> BatchResult<&mut Self> {
        self.put_f32s(&m.to_cols_array())
    }

    pub fn put_dmat3(&mut self, m: DMat3) -> BatchResult<&mut Self> {
        self.put_f64s(&m.to_cols_array())
    }

    pub fn put_dmat4(&mut self, m: DMat4) -> BatchResult<&mut Self> {
        self.put_f64s(&m.to_cols_array())
    }

    /// Advance the cursor by `n` bytes without writing.
    pub fn skip(&mut self, n: usize) -> BatchResult<&mut Self> {
        self.ensure(n)?;
        self.cursor += n;
        Ok(self)
    }

    /// Advance the cursor to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> BatchResult<&mut Self> {
        if alignment == 0 {
            return Err(BatchError::ZeroAlignment);
        }
        let padding = (alignment - self.cursor % alignment) % alignment;
        self.skip(padding)
    }

    /// Move the cursor, e.g. to patch previously written bytes.
    pub fn set_cursor(&mut self, position: usize) -> BatchResult<()> {
        let capacity = self.capacity();
        if position > capacity {
            return Err(BatchError::InvalidCursor { position, capacity });
        }
        self.cursor = position;
        Ok(())
    }

    /// Return the written bytes and reset the cursor.
    ///
    /// The storage is kept, so the arena can be refilled.
    pub fn finish(&mut self) -> &[u8] {
        let len = self.cursor;
        self.cursor = 0;
        &self.bytes()[..len]
    }

    /// Reset the cursor without touching the storage.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Release owned storage. Borrowed storage is left untouched.
    pub fn free(&mut self) {
        if let Storage::Owned(bytes) = &mut self.storage {
            *bytes = Vec::new();
        }
        self.cursor = 0;
    }

    /// Take the written bytes, consuming the arena.
    pub fn into_bytes(self) -> Vec<u8> {
        match self.storage {
            Storage::Owned(mut bytes) => {
                bytes.truncate(self.cursor);
                bytes
            }
            Storage::Borrowed(bytes) => bytes[..self.cursor].to_vec(),
        }
    }
}

impl std::fmt::Debug for ArenaBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaBuilder")
            .field("owned", &self.is_owned())
            .field("position", &self.cursor)
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn le_words(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn test_little_endian_puts() {
        let mut arena = ArenaBuilder::with_capacity(16);
        arena
            .put_u16(0x0102)
            .unwrap()
            .put_i32(-2)
            .unwrap()
            .put_f32(1.0)
            .unwrap();

        assert_eq!(
            arena.written(),
            &[0x02, 0x01, 0xfe, 0xff, 0xff, 0xff, 0x00, 0x00, 0x80, 0x3f]
        );
    }

    #[test]
    fn test_matrix_is_column_major() {
        let mut arena = ArenaBuilder::with_capacity(64);
        let m = Mat4::from_cols_array(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ]);
        arena.put_mat4(m).unwrap();

        let floats: Vec<f32> = le_words(arena.written())
            .into_iter()
            .map(f32::from_bits)
            .collect();
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[4], 5.0);
        assert_eq!(floats[15], 16.0);
    }

    #[test]
    fn test_growth_formula_preserves_bytes() {
        let mut arena = ArenaBuilder::with_capacity(100);
        for i in 0..100u8 {
            arena.put_u8(i).unwrap();
        }
        arena.put_bytes(&[0xaa; 8]).unwrap();

        // align(100 + max(8, 100), 1024)
        assert_eq!(arena.capacity(), 1024);
        for i in 0..100u8 {
            assert_eq!(arena.written()[i as usize], i);
        }
        assert_eq!(&arena.written()[100..108], &[0xaa; 8]);
    }

    #[test]
    fn test_growth_satisfies_large_request() {
        let mut arena = ArenaBuilder::with_capacity(1024);
        arena.put_bytes(&vec![1; 3000]).unwrap();

        // align(1024 + max(3000, 1024), 1024)
        assert_eq!(arena.capacity(), 4096);
        assert_eq!(arena.position(), 3000);
    }

    #[test]
    fn test_borrowed_arena_never_grows() {
        let mut backing = [0u8; 6];
        let mut arena = ArenaBuilder::borrowed(&mut backing);

        arena.put_u32(7).unwrap();
        let err = arena.put_u32(8).unwrap_err();

        assert_eq!(
            err,
            BatchError::ArenaFull {
                needed: 4,
                available: 2
            }
        );
        assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);
        assert_eq!(arena.capacity(), 6);
        assert!(!arena.is_owned());
    }

    #[test]
    fn test_skip_align_and_cursor() {
        let mut arena = ArenaBuilder::with_capacity(32);
        arena.put_u8(1).unwrap().align(4).unwrap();
        assert_eq!(arena.position(), 4);

        arena.align(4).unwrap();
        assert_eq!(arena.position(), 4);

        arena.skip(3).unwrap();
        assert_eq!(arena.position(), 7);

        assert!(arena.align(0).is_err());
        assert!(arena.set_cursor(33).is_err());
        arena.set_cursor(32).unwrap();
        assert_eq!(arena.position(), 32);
    }

    #[test]
    fn test_patch_write_with_set_cursor() {
        let mut arena = ArenaBuilder::with_capacity(16);
        arena.put_u32(0).unwrap().put_u32(5).unwrap();
        arena.set_cursor(0).unwrap();
        arena.put_u32(9).unwrap();
        arena.set_cursor(8).unwrap();

        assert_eq!(le_words(arena.finish()), vec![9, 5]);
    }

    #[test]
    fn test_finish_resets_and_replays_identically() {
        let mut arena = ArenaBuilder::with_capacity(8);
        let fill = |arena: &mut ArenaBuilder| {
            arena.put_vec2(Vec2::new(0.5, -1.0)).unwrap().put_u16(3).unwrap();
        };

        fill(&mut arena);
        let first = arena.finish().to_vec();
        assert_eq!(arena.position(), 0);

        fill(&mut arena);
        let second = arena.finish().to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
    }

    #[test]
    fn test_free_releases_owned_storage() {
        let mut arena = ArenaBuilder::with_capacity(2048);
        arena.put_u32(1).unwrap();
        arena.free();
        assert_eq!(arena.capacity(), 0);
        assert_eq!(arena.position(), 0);

        arena.put_u32(2).unwrap();
        assert_eq!(arena.capacity(), 1024);
    }

    #[test]
    fn test_free_leaves_borrowed_storage() {
        let mut backing = [0u8; 4];
        {
            let mut arena = ArenaBuilder::borrowed(&mut backing);
            arena.put_u16(0xbeef).unwrap();
            arena.free();
            assert_eq!(arena.capacity(), 4);
        }
        assert_eq!(&backing[..2], &[0xef, 0xbe]);
    }

    #[test]
    fn test_half_float_known_values() {
        assert_eq!(encode_f16(1.5), 0x3e00);
        assert_eq!(encode_f16(-0.5), 0xb800);
        assert_eq!(encode_f16(0.0), 0x0000);
        assert_eq!(encode_f16(65504.0), 0x7bff);
        for value in [1.5, -0.5, 0.0, 2.0, -1024.0, 6.103_515_625e-5] {
            assert_eq!(decode_f16(encode_f16(value)), value);
        }
    }

    #[test]
    fn test_half_float_all_patterns_round_trip() {
        for bits in 0..=u16::MAX {
            let value = decode_f16(bits);
            if value.is_nan() {
                continue;
            }
            assert_eq!(encode_f16(value), bits, "pattern {bits:#06x}");
        }
    }

    #[test]
    fn test_put_f16_writes_bits() {
        let mut arena = ArenaBuilder::with_capacity(2);
        arena.put_f16(1.5).unwrap();
        assert_eq!(arena.written(), &[0x00, 0x3e]);
    }

    #[test]
    fn test_into_bytes() {
        let mut arena = ArenaBuilder::with_capacity(64);
        arena.put_ivec3(IVec3::new(1, 2, 3)).unwrap();
        let bytes = arena.into_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(le_words(&bytes), vec![1, 2, 3]);
    }
}
