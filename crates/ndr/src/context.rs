//! Byte order of an NDR stream
//!
//! The data representation label of a PDU selects the integer byte order
//! for everything that follows it. `NdrContext` carries that choice into
//! the writer and reader.

use bytes::{Buf, BufMut};

/// NDR byte-order context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NdrContext {
    /// Whether integers are little-endian
    pub little_endian: bool,
}

impl Default for NdrContext {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! byte_order_primitives {
    ($($ty:ty => $put:ident, $put_le:ident, $get:ident, $get_le:ident;)*) => {
        impl NdrContext {
            $(
                #[inline]
                pub fn $put<B: BufMut>(&self, buf: &mut B, value: $ty) {
                    if self.little_endian {
                        buf.$put_le(value)
                    } else {
                        buf.$put(value)
                    }
                }

                #[inline]
                pub fn $get<B: Buf>(&self, buf: &mut B) -> $ty {
                    if self.little_endian {
                        buf.$get_le()
                    } else {
                        buf.$get()
                    }
                }
            )*
        }
    };
}

byte_order_primitives! {
    u16 => put_u16, put_u16_le, get_u16, get_u16_le;
    i16 => put_i16, put_i16_le, get_i16, get_i16_le;
    u32 => put_u32, put_u32_le, get_u32, get_u32_le;
    i32 => put_i32, put_i32_le, get_i32, get_i32_le;
    u64 => put_u64, put_u64_le, get_u64, get_u64_le;
    i64 => put_i64, put_i64_le, get_i64, get_i64_le;
    f32 => put_f32, put_f32_le, get_f32, get_f32_le;
    f64 => put_f64, put_f64_le, get_f64, get_f64_le;
}

impl NdrContext {
    /// Little-endian context (the usual Windows label)
    pub const fn new() -> Self {
        Self { little_endian: true }
    }

    pub const fn big_endian() -> Self {
        Self { little_endian: false }
    }

    pub const fn with_byte_order(little_endian: bool) -> Self {
        Self { little_endian }
    }

    /// Bytes of padding needed to move `position` to a multiple of `alignment`.
    #[inline]
    pub const fn align_padding(position: usize, alignment: usize) -> usize {
        if alignment <= 1 {
            return 0;
        }
        match position % alignment {
            0 => 0,
            rem => alignment - rem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_align_padding() {
        assert_eq!(NdrContext::align_padding(0, 4), 0);
        assert_eq!(NdrContext::align_padding(1, 4), 3);
        assert_eq!(NdrContext::align_padding(6, 8), 2);
        assert_eq!(NdrContext::align_padding(7, 1), 0);
        assert_eq!(NdrContext::align_padding(7, 0), 0);
    }

    #[test]
    fn test_byte_order() {
        let mut buf = BytesMut::new();
        NdrContext::new().put_u32(&mut buf, 0x01020304);
        NdrContext::big_endian().put_u32(&mut buf, 0x01020304);
        assert_eq!(&buf[..], &[4, 3, 2, 1, 1, 2, 3, 4]);

        let mut bytes = buf.freeze();
        assert_eq!(NdrContext::new().get_u32(&mut bytes), 0x01020304);
        assert_eq!(NdrContext::big_endian().get_u32(&mut bytes), 0x01020304);
    }
}
