//! NDR (Network Data Representation) codec
//!
//! This crate implements the NDR 2.0 transfer syntax used for DCE/RPC stub
//! data, as described in C706 chapter 14 and MS-RPCE.
//!
//! # NDR Wire Format
//!
//! - Primitives align to their natural size (1, 2, 4 or 8 bytes), measured
//!   from the start of the stub.
//! - Structures align to their most-aligned member.
//! - Embedded pointers are written as referent IDs; the data they point to
//!   is deferred until the enclosing top-level construct is complete.
//! - Strings are conformant varying arrays that include a terminator.
//!
//! Encoding and decoding are split into a head phase and a deferred phase
//! (see [`NdrEncode`]). Bindings are normally declared with [`ndr_struct!`],
//! [`ndr_enum!`], [`ndr_union!`] and [`ndr_params!`].

mod arrays;
mod context;
mod decode;
mod encode;
mod error;
mod macros;
mod pointers;
mod primitives;
mod reader;
mod strings;
mod writer;

pub use arrays::{ConformantArray, ConformantVaryingArray, FixedArray, SizedArray, VaryingArray};
pub use context::NdrContext;
pub use decode::NdrDecode;
pub use encode::{max_align, NdrAlign, NdrEncode};
pub use error::{NdrError, Result, MAX_NDR_ALLOCATION_SIZE, MAX_NDR_ARRAY_ELEMENTS};
pub use pointers::{FullPtr, NdrPtr, RefPtr, UniquePtr};
pub use primitives::{Bool32, NdrUuid};
pub use reader::NdrReader;
pub use strings::{LpWStr, NdrString, NdrWString};
pub use writer::{NdrWriter, FIRST_REFERENT_ID};

/// Re-export bytes for convenience
pub use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Encode `value` as one top-level construct in a fresh stream.
pub fn to_bytes<T: NdrEncode>(value: &T, ctx: NdrContext) -> Result<Bytes> {
    let mut w = NdrWriter::new(ctx);
    value.ndr_encode(&mut w)?;
    Ok(w.into_bytes())
}

/// Decode one top-level construct from the start of `data`.
///
/// Bytes after the construct are ignored.
pub fn from_bytes<T: NdrDecode>(data: Bytes, ctx: NdrContext) -> Result<T> {
    T::ndr_decode(&mut NdrReader::new(data, ctx))
}
