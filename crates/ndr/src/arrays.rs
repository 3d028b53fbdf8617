//! NDR array types
//!
//! - Fixed `T[N]`: elements only.
//! - Conformant `[size_is(n)] T[]`: `max_count`, elements.
//! - Varying `[length_is(n)] T[N]`: `offset`, `actual_count`, elements.
//! - Conformant varying: `max_count`, `offset`, `actual_count`, elements.
//! - [`SizedArray`]: `DWORD Count; [size_is(Count)] T* Elements;`, the
//!   count and a referent in the head, a conformant array as pointee.
//!
//! Element heads are written back to back; element pointees follow all of
//! the heads, in element order.

use std::ops::{Deref, DerefMut};

use crate::error::check_array_limit;
use crate::{NdrAlign, NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

fn encode_heads<T: NdrEncode>(items: &[T], w: &mut NdrWriter) -> Result<()> {
    items.iter().try_for_each(|item| item.encode_head(w))
}

fn encode_deferreds<T: NdrEncode>(items: &[T], w: &mut NdrWriter) -> Result<()> {
    items.iter().try_for_each(|item| item.encode_deferred(w))
}

/// Storage for `count` decoded elements.
///
/// The count is checked against the limits with the in-memory element size,
/// and the reservation never exceeds what the rest of the stub could hold.
fn reserve_elements<T: NdrAlign>(count: usize, r: &NdrReader) -> Result<Vec<T>> {
    check_array_limit(count, std::mem::size_of::<T>())?;
    let bound = r.remaining() / T::NDR_ALIGN.max(1);
    Ok(Vec::with_capacity(count.min(bound)))
}

/// Decode `count` element heads, growing the vector as they are read.
fn decode_heads<T: NdrDecode>(count: usize, r: &mut NdrReader) -> Result<Vec<T>> {
    let mut items = reserve_elements(count, r)?;
    for _ in 0..count {
        let mut item = T::default();
        item.decode_head(r)?;
        items.push(item);
    }
    Ok(items)
}

fn decode_deferreds<T: NdrDecode>(items: &mut [T], r: &mut NdrReader) -> Result<()> {
    items.iter_mut().try_for_each(|item| item.decode_deferred(r))
}

/// Fixed-size array `T[N]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedArray<T, const N: usize>(pub [T; N]);

impl<T: Default, const N: usize> Default for FixedArray<T, N> {
    fn default() -> Self {
        Self(std::array::from_fn(|_| T::default()))
    }
}

impl<T, const N: usize> Deref for FixedArray<T, N> {
    type Target = [T; N];

    fn deref(&self) -> &[T; N] {
        &self.0
    }
}

impl<T: NdrAlign, const N: usize> NdrAlign for FixedArray<T, N> {
    const NDR_ALIGN: usize = T::NDR_ALIGN;
}

impl<T: NdrEncode, const N: usize> NdrEncode for FixedArray<T, N> {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        encode_heads(&self.0, w)
    }

    fn encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        encode_deferreds(&self.0, w)
    }
}

impl<T: NdrDecode, const N: usize> NdrDecode for FixedArray<T, N> {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        self.0.iter_mut().try_for_each(|item| item.decode_head(r))
    }

    fn decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        decode_deferreds(&mut self.0, r)
    }
}

/// Conformant array `[size_is(n)] T[]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformantArray<T>(pub Vec<T>);

impl<T> Default for ConformantArray<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Deref for ConformantArray<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> NdrAlign for ConformantArray<T> {
    const NDR_ALIGN: usize = 4;
}

impl<T: NdrEncode> NdrEncode for ConformantArray<T> {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_conformance(self.0.len())?;
        encode_heads(&self.0, w)
    }

    fn encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        encode_deferreds(&self.0, w)
    }
}

impl<T: NdrDecode> NdrDecode for ConformantArray<T> {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        let max_count = r.read_conformance(T::NDR_ALIGN)?;
        self.0 = decode_heads(max_count, r)?;
        Ok(())
    }

    fn decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        decode_deferreds(&mut self.0, r)
    }
}

/// Varying array `[length_is(n)] T[N]`; only the transmitted slice is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaryingArray<T> {
    pub offset: usize,
    pub elements: Vec<T>,
}

impl<T> VaryingArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self { offset: 0, elements }
    }
}

impl<T> Default for VaryingArray<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> NdrAlign for VaryingArray<T> {
    const NDR_ALIGN: usize = 4;
}

impl<T: NdrEncode> NdrEncode for VaryingArray<T> {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_variance(self.offset, self.elements.len())?;
        encode_heads(&self.elements, w)
    }

    fn encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        encode_deferreds(&self.elements, w)
    }
}

impl<T: NdrDecode> NdrDecode for VaryingArray<T> {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        let (offset, actual_count) = r.read_variance(None)?;
        self.offset = offset;
        self.elements = decode_heads(actual_count, r)?;
        Ok(())
    }

    fn decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        decode_deferreds(&mut self.elements, r)
    }
}

/// Conformant varying array `[size_is(m), length_is(n)] T[]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformantVaryingArray<T> {
    /// Allocated size; raised to `offset + elements.len()` when smaller
    pub max_count: usize,
    pub offset: usize,
    pub elements: Vec<T>,
}

impl<T> ConformantVaryingArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self {
            max_count: elements.len(),
            offset: 0,
            elements,
        }
    }
}

impl<T> Default for ConformantVaryingArray<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> NdrAlign for ConformantVaryingArray<T> {
    const NDR_ALIGN: usize = 4;
}

impl<T: NdrEncode> NdrEncode for ConformantVaryingArray<T> {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        let max_count = self.max_count.max(self.offset + self.elements.len());
        w.write_conformance(max_count)?;
        w.write_variance(self.offset, self.elements.len())?;
        encode_heads(&self.elements, w)
    }

    fn encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        encode_deferreds(&self.elements, w)
    }
}

impl<T: NdrDecode> NdrDecode for ConformantVaryingArray<T> {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        self.max_count = r.read_conformance(T::NDR_ALIGN)?;
        let (offset, actual_count) = r.read_variance(Some(self.max_count))?;
        self.offset = offset;
        self.elements = decode_heads(actual_count, r)?;
        Ok(())
    }

    fn decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        decode_deferreds(&mut self.elements, r)
    }
}

/// `DWORD Count; [size_is(Count)] T* Elements;` as one value
///
/// An empty array is written with a null `Elements` pointer. On decode a
/// non-null pointer with a zero count is accepted.
#[derive(Clone)]
pub struct SizedArray<T> {
    elements: Vec<T>,
    /// Count announced by a non-null head, consumed by the deferred phase
    pending: Option<usize>,
}

impl<T> SizedArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self {
            elements,
            pending: None,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.elements
    }
}

impl<T> Default for SizedArray<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> From<Vec<T>> for SizedArray<T> {
    fn from(elements: Vec<T>) -> Self {
        Self::new(elements)
    }
}

impl<T> FromIterator<T> for SizedArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for SizedArray<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a SizedArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T> Deref for SizedArray<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.elements
    }
}

impl<T> DerefMut for SizedArray<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.elements
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SizedArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.elements).finish()
    }
}

impl<T: PartialEq> PartialEq for SizedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T: Eq> Eq for SizedArray<T> {}

impl<T> NdrAlign for SizedArray<T> {
    const NDR_ALIGN: usize = 4;
}

impl<T: NdrEncode> NdrEncode for SizedArray<T> {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_conformance(self.elements.len())?;
        w.write_referent(!self.elements.is_empty());
        Ok(())
    }

    fn encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        if self.elements.is_empty() {
            return Ok(());
        }
        w.write_conformance(self.elements.len())?;
        encode_heads(&self.elements, w)?;
        encode_deferreds(&self.elements, w)
    }
}

impl<T: NdrDecode> NdrDecode for SizedArray<T> {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        let count = r.read_u32()? as usize;
        let present = r.read_referent()? != 0;
        if !present && count != 0 {
            return Err(NdrError::ArraySizeMismatch {
                expected: count,
                got: 0,
            });
        }
        check_array_limit(count, std::mem::size_of::<T>())?;
        self.elements.clear();
        self.pending = present.then_some(count);
        Ok(())
    }

    fn decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        let Some(count) = self.pending.take() else {
            return Ok(());
        };
        let max_count = r.read_conformance(T::NDR_ALIGN)?;
        if max_count != count {
            return Err(NdrError::ArraySizeMismatch {
                expected: count,
                got: max_count,
            });
        }
        self.elements = decode_heads(count, r)?;
        decode_deferreds(&mut self.elements, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LpWStr, NdrContext};
    use bytes::Bytes;

    fn encode<T: NdrEncode>(value: &T) -> Bytes {
        let mut w = NdrWriter::default();
        value.ndr_encode(&mut w).unwrap();
        w.into_bytes()
    }

    fn decode<T: NdrDecode>(bytes: Bytes) -> Result<T> {
        T::ndr_decode(&mut NdrReader::new(bytes, NdrContext::new()))
    }

    #[test]
    fn test_fixed_array() {
        let value = FixedArray([1u16, 2, 3]);
        let bytes = encode(&value);
        assert_eq!(&bytes[..], &[1, 0, 2, 0, 3, 0]);
        assert_eq!(decode::<FixedArray<u16, 3>>(bytes).unwrap(), value);
    }

    #[test]
    fn test_conformant_array() {
        let value = ConformantArray(vec![0xAAu8, 0xBB]);
        let bytes = encode(&value);
        assert_eq!(&bytes[..], &[2, 0, 0, 0, 0xAA, 0xBB]);
        assert_eq!(decode::<ConformantArray<u8>>(bytes).unwrap(), value);
    }

    #[test]
    fn test_varying_array() {
        let value = VaryingArray::new(vec![5u32]);
        let bytes = encode(&value);
        assert_eq!(&bytes[..], &[0, 0, 0, 0, 1, 0, 0, 0, 5, 0, 0, 0]);
        assert_eq!(decode::<VaryingArray<u32>>(bytes).unwrap(), value);
    }

    #[test]
    fn test_conformant_varying_array_keeps_capacity() {
        let value = ConformantVaryingArray {
            max_count: 4,
            offset: 0,
            elements: vec![9u8],
        };
        let bytes = encode(&value);
        assert_eq!(&bytes[..], &[4, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 9]);
        assert_eq!(decode::<ConformantVaryingArray<u8>>(bytes).unwrap(), value);
    }

    #[test]
    fn test_sized_array_layout() {
        let value: SizedArray<u32> = vec![0x0A000001, 0x0A000002].into();
        let bytes = encode(&value);
        assert_eq!(
            &bytes[..],
            &[
                2, 0, 0, 0, // count
                0, 0, 2, 0, // referent
                2, 0, 0, 0, // max_count
                1, 0, 0, 10, 2, 0, 0, 10,
            ]
        );
        assert_eq!(decode::<SizedArray<u32>>(bytes).unwrap(), value);
    }

    #[test]
    fn test_empty_sized_array_is_null() {
        let bytes = encode(&SizedArray::<u32>::default());
        assert_eq!(&bytes[..], &[0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(decode::<SizedArray<u32>>(bytes).unwrap().is_empty());
    }

    #[test]
    fn test_sized_array_non_null_empty() {
        let bytes = Bytes::from_static(&[0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0]);
        let mut r = NdrReader::new(bytes, NdrContext::new());
        let value = SizedArray::<u32>::ndr_decode(&mut r).unwrap();
        assert!(value.is_empty());
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_sized_array_count_mismatch() {
        let bytes = Bytes::from_static(&[2, 0, 0, 0, 0, 0, 2, 0, 1, 0, 0, 0, 7, 0, 0, 0]);
        assert!(matches!(
            decode::<SizedArray<u32>>(bytes),
            Err(NdrError::ArraySizeMismatch { expected: 2, got: 1 })
        ));

        let null_with_count = Bytes::from_static(&[1, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            decode::<SizedArray<u32>>(null_with_count),
            Err(NdrError::ArraySizeMismatch { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn test_sized_array_count_limit() {
        let bytes = Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 2, 0]);
        assert!(matches!(
            decode::<SizedArray<u32>>(bytes),
            Err(NdrError::AllocationLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_sized_array_limit_uses_element_size() {
        // 1 << 20 elements of 32 bytes each
        let bytes = Bytes::from_static(&[0, 0, 0x10, 0, 0, 0, 2, 0]);
        assert!(matches!(
            decode::<SizedArray<FixedArray<u32, 8>>>(bytes),
            Err(NdrError::AllocationLimitExceeded {
                requested: 0x200_0000,
                limit: crate::MAX_NDR_ALLOCATION_SIZE,
            })
        ));
    }

    #[test]
    fn test_reservation_bounded_by_stub() {
        let r = NdrReader::new(Bytes::from_static(&[0; 8]), NdrContext::new());
        let items: Vec<u32> = reserve_elements(1 << 20, &r).unwrap();
        assert!(items.capacity() < 16);
    }

    #[test]
    fn test_nested_counts_allocate_nothing_in_head() {
        let bytes = Bytes::from_static(&[
            3, 0, 0, 0, 0, 0, 2, 0, // outer count, referent
            3, 0, 0, 0, // outer max_count
            0, 0, 0x10, 0, 4, 0, 2, 0, // inner heads claiming 1 << 20 each
            0, 0, 0x10, 0, 8, 0, 2, 0, //
            0, 0, 0x10, 0, 12, 0, 2, 0,
        ]);
        let mut r = NdrReader::new(bytes, NdrContext::new());
        let mut value = SizedArray::<SizedArray<u32>>::default();
        value.decode_head(&mut r).unwrap();
        assert_eq!(value.capacity(), 0);

        assert!(matches!(
            value.decode_deferred(&mut r),
            Err(NdrError::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn test_sized_array_of_strings_defers_after_heads() {
        let value: SizedArray<LpWStr> = vec![LpWStr::from("a"), LpWStr::null()].into();
        let bytes = encode(&value);
        assert_eq!(
            &bytes[..],
            &[
                2, 0, 0, 0, 0, 0, 2, 0, // count, referent
                2, 0, 0, 0, // max_count
                4, 0, 2, 0, 0, 0, 0, 0, // element referents
                2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b'a', 0, 0, 0,
            ]
        );
        assert_eq!(decode::<SizedArray<LpWStr>>(bytes).unwrap(), value);
    }
}
