//! NDR output stream

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{NdrContext, NdrError, Result};

/// First referent ID handed out in a stream.
pub const FIRST_REFERENT_ID: u32 = 0x0002_0000;

/// Writes one NDR stream (one stub body).
///
/// Alignment is computed from the start of the stream. Referent IDs are
/// allocated from [`FIRST_REFERENT_ID`] upwards in steps of 4.
#[derive(Debug)]
pub struct NdrWriter {
    buf: BytesMut,
    ctx: NdrContext,
    next_referent: u32,
    /// pointee address -> (referent ID, pointee already written)
    full_pointers: HashMap<usize, (u32, bool)>,
}

impl Default for NdrWriter {
    fn default() -> Self {
        Self::new(NdrContext::new())
    }
}

macro_rules! write_aligned {
    ($($name:ident: $ty:ty => $put:ident;)*) => {
        $(
            pub fn $name(&mut self, value: $ty) {
                self.align(std::mem::size_of::<$ty>());
                self.ctx.$put(&mut self.buf, value);
            }
        )*
    };
}

impl NdrWriter {
    pub fn new(ctx: NdrContext) -> Self {
        Self {
            buf: BytesMut::new(),
            ctx,
            next_referent: FIRST_REFERENT_ID,
            full_pointers: HashMap::new(),
        }
    }

    pub fn context(&self) -> NdrContext {
        self.ctx
    }

    /// Offset from the start of the stream
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Pad with zero bytes up to `alignment`
    pub fn align(&mut self, alignment: usize) {
        let padding = NdrContext::align_padding(self.buf.len(), alignment);
        self.buf.put_bytes(0, padding);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    write_aligned! {
        write_u16: u16 => put_u16;
        write_i16: i16 => put_i16;
        write_u32: u32 => put_u32;
        write_i32: i32 => put_i32;
        write_u64: u64 => put_u64;
        write_i64: i64 => put_i64;
        write_f32: f32 => put_f32;
        write_f64: f64 => put_f64;
    }

    /// Raw bytes, no alignment
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Write a unique or embedded pointer's referent ID and return it (0 for null).
    pub fn write_referent(&mut self, non_null: bool) -> u32 {
        let id = if non_null { self.allocate_referent() } else { 0 };
        self.write_u32(id);
        id
    }

    /// Write a full pointer's referent ID for the pointee at `addr`.
    ///
    /// The same address always gets the same ID within a stream.
    pub fn write_full_referent(&mut self, addr: usize) -> u32 {
        let id = match self.full_pointers.get(&addr) {
            Some(&(id, _)) => id,
            None => {
                let id = self.allocate_referent();
                self.full_pointers.insert(addr, (id, false));
                id
            }
        };
        self.write_u32(id);
        id
    }

    /// Claim the right to write the pointee at `addr`.
    ///
    /// Returns true exactly once per address; later aliases only carry the ID.
    pub fn claim_full_pointee(&mut self, addr: usize) -> bool {
        match self.full_pointers.get_mut(&addr) {
            Some((_, written)) if !*written => {
                *written = true;
                true
            }
            _ => false,
        }
    }

    /// Conformance (`max_count`) of a conformant array or string
    pub fn write_conformance(&mut self, max_count: usize) -> Result<()> {
        let max_count = wire_count(max_count)?;
        self.write_u32(max_count);
        Ok(())
    }

    /// Variance (`offset`, `actual_count`) of a varying array or string
    pub fn write_variance(&mut self, offset: usize, actual_count: usize) -> Result<()> {
        let offset = wire_count(offset)?;
        let actual_count = wire_count(actual_count)?;
        self.write_u32(offset);
        self.write_u32(actual_count);
        Ok(())
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    fn allocate_referent(&mut self) -> u32 {
        let id = self.next_referent;
        self.next_referent = self.next_referent.wrapping_add(4);
        id
    }
}

fn wire_count(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| NdrError::IntegerOverflow(value))
}
