//! NDR primitive type implementations
//!
//! | IDL type            | Rust type | Size | Alignment |
//! |---------------------|-----------|------|-----------|
//! | boolean             | bool      | 1    | 1         |
//! | byte / small        | u8 / i8   | 1    | 1         |
//! | short / WORD        | i16 / u16 | 2    | 2         |
//! | long / DWORD        | i32 / u32 | 4    | 4         |
//! | hyper / ULONGLONG   | i64 / u64 | 8    | 8         |
//! | float / double      | f32 / f64 | 4/8  | 4/8       |
//! | BOOL                | Bool32    | 4    | 4         |
//! | GUID                | NdrUuid   | 16   | 4         |

use crate::{NdrAlign, NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

macro_rules! impl_ndr_primitive {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl NdrAlign for $ty {
                const NDR_ALIGN: usize = std::mem::size_of::<$ty>();
            }

            impl NdrEncode for $ty {
                fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
                    w.$write(*self);
                    Ok(())
                }
            }

            impl NdrDecode for $ty {
                fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
                    *self = r.$read()?;
                    Ok(())
                }
            }
        )*
    };
}

impl_ndr_primitive! {
    u8 => write_u8, read_u8;
    i8 => write_i8, read_i8;
    u16 => write_u16, read_u16;
    i16 => write_i16, read_i16;
    u32 => write_u32, read_u32;
    i32 => write_i32, read_i32;
    u64 => write_u64, read_u64;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

/// IDL `boolean`: one byte, any non-zero value is true
impl NdrAlign for bool {}

impl NdrEncode for bool {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_u8(u8::from(*self));
        Ok(())
    }
}

impl NdrDecode for bool {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        *self = r.read_u8()? != 0;
        Ok(())
    }
}

/// Win32 `BOOL`: a 32-bit integer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bool32(pub bool);

impl From<bool> for Bool32 {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl From<Bool32> for bool {
    fn from(value: Bool32) -> Self {
        value.0
    }
}

impl NdrAlign for Bool32 {
    const NDR_ALIGN: usize = 4;
}

impl NdrEncode for Bool32 {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_u32(u32::from(self.0));
        Ok(())
    }
}

impl NdrDecode for Bool32 {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        self.0 = r.read_u32()? != 0;
        Ok(())
    }
}

/// 128-bit UUID in its NDR layout (data1..data3 follow the stream byte order)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NdrUuid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl NdrUuid {
    pub const NIL: Self = Self::from_fields(0, 0, 0, [0; 8]);

    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Parse "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('-');
        let mut next = |len: usize| parts.next().filter(|p| p.len() == len);
        let data1 = u32::from_str_radix(next(8)?, 16).ok()?;
        let data2 = u16::from_str_radix(next(4)?, 16).ok()?;
        let data3 = u16::from_str_radix(next(4)?, 16).ok()?;
        let clock = u16::from_str_radix(next(4)?, 16).ok()?;
        let node = next(12)?;
        if parts.next().is_some() {
            return None;
        }

        let mut data4 = [0u8; 8];
        data4[..2].copy_from_slice(&clock.to_be_bytes());
        for (i, byte) in data4[2..].iter_mut().enumerate() {
            *byte = u8::from_str_radix(node.get(i * 2..i * 2 + 2)?, 16).ok()?;
        }
        Some(Self::from_fields(data1, data2, data3, data4))
    }

    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }
}

impl std::fmt::Display for NdrUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1]
        )?;
        self.data4[2..].iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

impl std::str::FromStr for NdrUuid {
    type Err = NdrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| NdrError::InvalidString(format!("malformed UUID {s:?}")))
    }
}

impl NdrAlign for NdrUuid {
    const NDR_ALIGN: usize = 4;
}

impl NdrEncode for NdrUuid {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_u32(self.data1);
        w.write_u16(self.data2);
        w.write_u16(self.data3);
        w.write_bytes(&self.data4);
        Ok(())
    }
}

impl NdrDecode for NdrUuid {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        self.data1 = r.read_u32()?;
        self.data2 = r.read_u16()?;
        self.data3 = r.read_u16()?;
        r.read_bytes(8)?.iter().zip(self.data4.iter_mut()).for_each(|(s, d)| *d = *s);
        Ok(())
    }
}
