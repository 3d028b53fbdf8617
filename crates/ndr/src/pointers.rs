//! NDR pointer types
//!
//! - Reference (`[ref]`): never null. As a top-level parameter it has no
//!   wire representation and the pointee is marshalled in place.
//! - Unique (`[unique]`): nullable 4-byte referent ID, pointee deferred.
//! - Full (`[ptr]`): like unique, but two pointers to the same pointee
//!   share one referent ID and the pointee is sent once.

use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::{NdrAlign, NdrDecode, NdrEncode, NdrReader, NdrWriter, Result};

/// Trait for NDR pointer types
pub trait NdrPtr {
    type Target;

    fn is_null(&self) -> bool;

    fn get(&self) -> Option<&Self::Target>;
}

/// Top-level reference pointer - the pointee is marshalled where the pointer is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefPtr<T>(pub T);

impl<T> RefPtr<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for RefPtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for RefPtr<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> NdrPtr for RefPtr<T> {
    type Target = T;

    fn is_null(&self) -> bool {
        false
    }

    fn get(&self) -> Option<&T> {
        Some(&self.0)
    }
}

impl<T: NdrAlign> NdrAlign for RefPtr<T> {
    const NDR_ALIGN: usize = T::NDR_ALIGN;
}

impl<T: NdrEncode> NdrEncode for RefPtr<T> {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        self.0.encode_head(w)
    }

    fn encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        self.0.encode_deferred(w)
    }
}

impl<T: NdrDecode> NdrDecode for RefPtr<T> {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        self.0.decode_head(r)
    }

    fn decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        self.0.decode_deferred(r)
    }
}

/// Unique pointer - nullable, no aliasing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniquePtr<T>(pub Option<Box<T>>);

impl<T> UniquePtr<T> {
    pub fn new(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn null() -> Self {
        Self(None)
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.0.as_deref_mut()
    }

    pub fn into_inner(self) -> Option<T> {
        self.0.map(|boxed| *boxed)
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_deref()
    }
}

impl<T> Default for UniquePtr<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> From<Option<T>> for UniquePtr<T> {
    fn from(value: Option<T>) -> Self {
        Self(value.map(Box::new))
    }
}

impl<T> NdrPtr for UniquePtr<T> {
    type Target = T;

    fn is_null(&self) -> bool {
        self.0.is_none()
    }

    fn get(&self) -> Option<&T> {
        self.0.as_deref()
    }
}

impl<T> NdrAlign for UniquePtr<T> {
    const NDR_ALIGN: usize = 4;
}

impl<T: NdrEncode> NdrEncode for UniquePtr<T> {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_referent(self.0.is_some());
        Ok(())
    }

    fn encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        match &self.0 {
            Some(pointee) => pointee.ndr_encode(w),
            None => Ok(()),
        }
    }
}

impl<T: NdrDecode> NdrDecode for UniquePtr<T> {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        self.0 = match r.read_referent()? {
            0 => None,
            _ => Some(Box::default()),
        };
        Ok(())
    }

    fn decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        if let Some(pointee) = self.0.as_deref_mut() {
            pointee.decode_head(r)?;
            pointee.decode_deferred(r)?;
        }
        Ok(())
    }
}

/// Full pointer - nullable, aliasing allowed
///
/// Aliasing is expressed by sharing an `Arc`: clones of the same `FullPtr`
/// are written with one referent ID and decode back into one `Arc`.
/// Cyclic pointees are not representable.
#[derive(Debug, Clone)]
pub struct FullPtr<T> {
    value: Option<Arc<T>>,
    referent: u32,
}

impl<T> FullPtr<T> {
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc(value: Arc<T>) -> Self {
        Self {
            value: Some(value),
            referent: 0,
        }
    }

    pub fn null() -> Self {
        Self {
            value: None,
            referent: 0,
        }
    }

    pub fn arc(&self) -> Option<&Arc<T>> {
        self.value.as_ref()
    }

    /// Whether both pointers refer to the same pointee
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    fn address(value: &Arc<T>) -> usize {
        Arc::as_ptr(value) as *const () as usize
    }
}

impl<T> Default for FullPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: PartialEq> PartialEq for FullPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> NdrPtr for FullPtr<T> {
    type Target = T;

    fn is_null(&self) -> bool {
        self.value.is_none()
    }

    fn get(&self) -> Option<&T> {
        self.value.as_deref()
    }
}

impl<T> NdrAlign for FullPtr<T> {
    const NDR_ALIGN: usize = 4;
}

impl<T: NdrEncode> NdrEncode for FullPtr<T> {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        match &self.value {
            Some(value) => {
                w.write_full_referent(Self::address(value));
            }
            None => {
                w.write_referent(false);
            }
        }
        Ok(())
    }

    fn encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        match &self.value {
            Some(value) if w.claim_full_pointee(Self::address(value)) => value.ndr_encode(w),
            _ => Ok(()),
        }
    }
}

impl<T: NdrDecode + Any + Send + Sync> NdrDecode for FullPtr<T> {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        self.value = None;
        self.referent = r.read_referent()?;
        Ok(())
    }

    fn decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        let referent = std::mem::take(&mut self.referent);
        if referent == 0 {
            return Ok(());
        }
        let pointee = match r.full_pointee::<T>(referent)? {
            Some(seen) => seen,
            None => {
                let decoded = Arc::new(T::ndr_decode(r)?);
                r.insert_full_pointee(referent, Arc::clone(&decoded));
                decoded
            }
        };
        self.value = Some(pointee);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NdrContext;

    #[derive(Debug, Default, PartialEq)]
    struct Pair {
        first: FullPtr<u32>,
        second: FullPtr<u32>,
    }

    impl NdrAlign for Pair {
        const NDR_ALIGN: usize = 4;
    }

    impl NdrEncode for Pair {
        fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
            self.first.encode_head(w)?;
            self.second.encode_head(w)
        }

        fn encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
            self.first.encode_deferred(w)?;
            self.second.encode_deferred(w)
        }
    }

    impl NdrDecode for Pair {
        fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
            self.first.decode_head(r)?;
            self.second.decode_head(r)
        }

        fn decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
            self.first.decode_deferred(r)?;
            self.second.decode_deferred(r)
        }
    }

    fn encode<T: NdrEncode>(value: &T) -> bytes::Bytes {
        let mut w = NdrWriter::default();
        value.ndr_encode(&mut w).unwrap();
        w.into_bytes()
    }

    fn decode<T: NdrDecode>(bytes: bytes::Bytes) -> T {
        T::ndr_decode(&mut NdrReader::new(bytes, NdrContext::new())).unwrap()
    }

    #[test]
    fn test_ref_ptr_has_no_referent() {
        let bytes = encode(&RefPtr::new(42u32));
        assert_eq!(&bytes[..], &[42, 0, 0, 0]);
        assert_eq!(*decode::<RefPtr<u32>>(bytes), 42);
    }

    #[test]
    fn test_unique_ptr_non_null() {
        let bytes = encode(&UniquePtr::new(0xDEADBEEFu32));
        assert_eq!(&bytes[..], &[0, 0, 2, 0, 0xEF, 0xBE, 0xAD, 0xDE]);
        let decoded: UniquePtr<u32> = decode(bytes);
        assert_eq!(decoded.get(), Some(&0xDEADBEEF));
    }

    #[test]
    fn test_unique_ptr_null() {
        let bytes = encode(&UniquePtr::<u32>::null());
        assert_eq!(&bytes[..], &[0, 0, 0, 0]);
        assert!(decode::<UniquePtr<u32>>(bytes).is_null());
    }

    #[test]
    fn test_nested_unique_ptr() {
        let value = UniquePtr::new(UniquePtr::new(7u16));
        let bytes = encode(&value);
        assert_eq!(&bytes[..], &[0, 0, 2, 0, 4, 0, 2, 0, 7, 0]);
        assert_eq!(decode::<UniquePtr<UniquePtr<u16>>>(bytes), value);
    }

    #[test]
    fn test_full_ptr_aliases_share_pointee() {
        let shared = FullPtr::new(99u32);
        let pair = Pair {
            first: shared.clone(),
            second: shared,
        };
        let bytes = encode(&pair);
        // two identical referents, one pointee
        assert_eq!(&bytes[..], &[0, 0, 2, 0, 0, 0, 2, 0, 99, 0, 0, 0]);

        let decoded: Pair = decode(bytes);
        assert_eq!(decoded.first.get(), Some(&99));
        assert!(decoded.first.ptr_eq(&decoded.second));
    }

    #[test]
    fn test_full_ptr_distinct_pointees() {
        let pair = Pair {
            first: FullPtr::new(1),
            second: FullPtr::new(1),
        };
        let bytes = encode(&pair);
        assert_eq!(bytes.len(), 16);
        let decoded: Pair = decode(bytes);
        assert!(!decoded.first.ptr_eq(&decoded.second));
        assert_eq!(decoded, pair);
    }
}
