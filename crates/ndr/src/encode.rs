//! NDR encoding trait

use crate::{NdrWriter, Result};

/// Natural NDR alignment of a type.
///
/// Shared by [`NdrEncode`] and [`crate::NdrDecode`] so that generic code can
/// name `T::NDR_ALIGN` without picking a trait.
pub trait NdrAlign {
    const NDR_ALIGN: usize = 1;
}

/// Largest of a set of alignments, usable in constant position.
pub const fn max_align(aligns: &[usize]) -> usize {
    let mut max = 1;
    let mut i = 0;
    while i < aligns.len() {
        if aligns[i] > max {
            max = aligns[i];
        }
        i += 1;
    }
    max
}

/// Trait for types that can be encoded to NDR format
///
/// Encoding happens in two phases. The head is the inline representation
/// (fixed fields, referent IDs, conformance of inline arrays). The deferred
/// phase writes the pointees of embedded pointers, after the whole
/// construct that holds them.
pub trait NdrEncode: NdrAlign {
    /// Write the inline part
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()>;

    /// Write pointees referenced from the head
    fn encode_deferred(&self, _w: &mut NdrWriter) -> Result<()> {
        Ok(())
    }

    /// Write this value as a complete top-level construct
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        self.encode_head(w)?;
        self.encode_deferred(w)
    }
}
