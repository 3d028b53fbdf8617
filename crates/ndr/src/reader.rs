//! NDR input stream

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Buf, Bytes};

use crate::error::check_array_limit;
use crate::{NdrContext, NdrError, Result};

type SharedPointee = Arc<dyn Any + Send + Sync>;

/// Reads one NDR stream (one stub body).
pub struct NdrReader {
    buf: Bytes,
    len: usize,
    ctx: NdrContext,
    /// referent ID -> pointee decoded for a full pointer
    full_pointers: HashMap<u32, SharedPointee>,
}

impl std::fmt::Debug for NdrReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdrReader")
            .field("position", &self.position())
            .field("remaining", &self.remaining())
            .field("ctx", &self.ctx)
            .finish()
    }
}

macro_rules! read_aligned {
    ($($name:ident: $ty:ty => $get:ident;)*) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                self.align(std::mem::size_of::<$ty>())?;
                self.need(std::mem::size_of::<$ty>())?;
                Ok(self.ctx.$get(&mut self.buf))
            }
        )*
    };
}

impl NdrReader {
    pub fn new(buf: Bytes, ctx: NdrContext) -> Self {
        Self {
            len: buf.len(),
            buf,
            ctx,
            full_pointers: HashMap::new(),
        }
    }

    pub fn context(&self) -> NdrContext {
        self.ctx
    }

    /// Offset from the start of the stream
    pub fn position(&self) -> usize {
        self.len - self.buf.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Skip padding up to `alignment`
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = NdrContext::align_padding(self.position(), alignment);
        self.need(padding)?;
        self.buf.advance(padding);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.need(1)?;
        Ok(self.buf.get_i8())
    }

    read_aligned! {
        read_u16: u16 => get_u16;
        read_i16: i16 => get_i16;
        read_u32: u32 => get_u32;
        read_i32: i32 => get_i32;
        read_u64: u64 => get_u64;
        read_i64: i64 => get_i64;
        read_f32: f32 => get_f32;
        read_f64: f64 => get_f64;
    }

    /// Raw bytes, no alignment
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.need(len)?;
        Ok(self.buf.split_to(len))
    }

    pub fn read_referent(&mut self) -> Result<u32> {
        self.read_u32()
    }

    /// Conformance of an array whose elements are `element_size` bytes on the wire
    pub fn read_conformance(&mut self, element_size: usize) -> Result<usize> {
        let max_count = self.read_u32()? as usize;
        check_array_limit(max_count, element_size)?;
        Ok(max_count)
    }

    /// Variance (`offset`, `actual_count`), checked against `max_count` when known
    pub fn read_variance(&mut self, max_count: Option<usize>) -> Result<(usize, usize)> {
        let offset = self.read_u32()?;
        let actual_count = self.read_u32()?;
        let bound = max_count.unwrap_or(usize::MAX);
        if (offset as usize).saturating_add(actual_count as usize) > bound {
            return Err(NdrError::ConformanceMismatch {
                max_count: max_count.unwrap_or_default() as u32,
                offset,
                actual_count,
            });
        }
        check_array_limit(actual_count as usize, 1)?;
        Ok((offset as usize, actual_count as usize))
    }

    /// Pointee already decoded for full-pointer `referent`, if any.
    pub fn full_pointee<T: Any + Send + Sync>(&self, referent: u32) -> Result<Option<Arc<T>>> {
        match self.full_pointers.get(&referent) {
            None => Ok(None),
            Some(shared) => Arc::clone(shared)
                .downcast::<T>()
                .map(Some)
                .map_err(|_| NdrError::InvalidPointer(referent)),
        }
    }

    pub fn insert_full_pointee<T: Any + Send + Sync>(&mut self, referent: u32, value: Arc<T>) {
        self.full_pointers.insert(referent, value);
    }

    fn need(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(NdrError::BufferUnderflow {
                needed,
                have: self.buf.remaining(),
            });
        }
        Ok(())
    }
}
