//! NDR decoding trait

use crate::{NdrAlign, NdrReader, Result};

/// Trait for types that can be decoded from NDR format
///
/// Decoding fills a default value in place so that the head phase can
/// record which pointers are non-null and the deferred phase can then read
/// their pointees in the same order the encoder wrote them.
pub trait NdrDecode: NdrAlign + Default {
    /// Read the inline part
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()>;

    /// Read pointees announced by the head
    fn decode_deferred(&mut self, _r: &mut NdrReader) -> Result<()> {
        Ok(())
    }

    /// Read a complete top-level construct
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let mut value = Self::default();
        value.decode_head(r)?;
        value.decode_deferred(r)?;
        Ok(value)
    }
}
