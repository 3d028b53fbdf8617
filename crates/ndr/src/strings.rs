//! NDR string types
//!
//! `[string]` data is a conformant varying array whose last element is a
//! terminating zero:
//!
//! ```text
//! max_count: u32     elements including the terminator
//! offset: u32        always 0
//! actual_count: u32  elements including the terminator
//! chars[actual_count]
//! ```
//!
//! No padding follows the characters; the next item aligns itself.

use crate::{NdrAlign, NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result, UniquePtr};

/// Read the conformance and variance of a string, returning the element count.
fn read_string_header(r: &mut NdrReader, char_size: usize) -> Result<usize> {
    let max_count = r.read_conformance(char_size)?;
    let (offset, actual_count) = r.read_variance(Some(max_count))?;
    if offset != 0 {
        return Err(NdrError::InvalidString(format!("non-zero offset {offset}")));
    }
    Ok(actual_count)
}

/// Characters up to (not including) the first terminator
fn until_nul<T: Copy + Default + PartialEq>(chars: &[T]) -> Result<&[T]> {
    let end = chars
        .iter()
        .position(|c| *c == T::default())
        .ok_or_else(|| {
            NdrError::InvalidString(format!("missing terminator in {} elements", chars.len()))
        })?;
    Ok(&chars[..end])
}

/// 8-bit `[string] char*`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NdrString(pub String);

impl NdrString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NdrString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl NdrAlign for NdrString {
    const NDR_ALIGN: usize = 4;
}

impl NdrEncode for NdrString {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        let count = self.0.len() + 1;
        w.write_conformance(count)?;
        w.write_variance(0, count)?;
        w.write_bytes(self.0.as_bytes());
        w.write_u8(0);
        Ok(())
    }
}

impl NdrDecode for NdrString {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        let count = read_string_header(r, 1)?;
        let raw = r.read_bytes(count)?;
        self.0 = String::from_utf8(until_nul(&raw)?.to_vec())?;
        Ok(())
    }
}

/// UTF-16 `[string] wchar_t*`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NdrWString(pub String);

impl NdrWString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NdrWString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for NdrWString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for NdrWString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl NdrAlign for NdrWString {
    const NDR_ALIGN: usize = 4;
}

impl NdrEncode for NdrWString {
    fn encode_head(&self, w: &mut NdrWriter) -> Result<()> {
        let units: Vec<u16> = self.0.encode_utf16().chain(std::iter::once(0)).collect();
        w.write_conformance(units.len())?;
        w.write_variance(0, units.len())?;
        for unit in units {
            w.write_u16(unit);
        }
        Ok(())
    }
}

impl NdrDecode for NdrWString {
    fn decode_head(&mut self, r: &mut NdrReader) -> Result<()> {
        let count = read_string_header(r, 2)?;
        let units = (0..count).map(|_| r.read_u16()).collect::<Result<Vec<u16>>>()?;
        self.0 = char::decode_utf16(until_nul(&units)?.iter().copied()).collect::<std::result::Result<String, _>>()?;
        Ok(())
    }
}

/// `LPWSTR`: a unique pointer to a UTF-16 string
pub type LpWStr = UniquePtr<NdrWString>;

impl UniquePtr<NdrWString> {
    /// Non-null string pointer
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::new(NdrWString(s.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.get().map(NdrWString::as_str)
    }
}

impl From<&str> for UniquePtr<NdrWString> {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for UniquePtr<NdrWString> {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NdrContext;
    use bytes::Bytes;

    fn encode<T: NdrEncode>(value: &T) -> Bytes {
        let mut w = NdrWriter::default();
        value.ndr_encode(&mut w).unwrap();
        w.into_bytes()
    }

    fn decode<T: NdrDecode>(bytes: &'static [u8]) -> Result<T> {
        T::ndr_decode(&mut NdrReader::new(Bytes::from_static(bytes), NdrContext::new()))
    }

    #[test]
    fn test_wstring_wire_format() {
        let bytes = encode(&NdrWString::from("Hi"));
        assert_eq!(
            &bytes[..],
            &[3, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, b'H', 0, b'i', 0, 0, 0]
        );
    }

    #[test]
    fn test_wstring_decode() {
        let s: NdrWString =
            decode(&[3, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, b'H', 0, b'i', 0, 0, 0]).unwrap();
        assert_eq!(s.as_str(), "Hi");
    }

    #[test]
    fn test_wstring_non_ascii() {
        let original = NdrWString::from("Zürich ✓");
        let bytes = encode(&original);
        let decoded =
            NdrWString::ndr_decode(&mut NdrReader::new(bytes, NdrContext::new())).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_empty_wstring_is_terminator_only() {
        let bytes = encode(&NdrWString::default());
        assert_eq!(&bytes[..], &[1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_wstring_rejects_offset() {
        let result: Result<NdrWString> = decode(&[2, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0]);
        assert!(matches!(result, Err(NdrError::InvalidString(_))));
    }

    #[test]
    fn test_wstring_actual_exceeds_max() {
        let result: Result<NdrWString> =
            decode(&[1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b'a', 0, 0, 0]);
        assert!(matches!(result, Err(NdrError::ConformanceMismatch { .. })));
    }

    #[test]
    fn test_string_missing_terminator() {
        let wide: Result<NdrWString> =
            decode(&[2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b'H', 0, b'i', 0]);
        assert!(matches!(wide, Err(NdrError::InvalidString(_))));

        let narrow: Result<NdrString> = decode(&[2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b'o', b'k']);
        assert!(matches!(narrow, Err(NdrError::InvalidString(_))));

        let empty: Result<NdrWString> = decode(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(empty, Err(NdrError::InvalidString(_))));
    }

    #[test]
    fn test_wstring_invalid_utf16() {
        let result: Result<NdrWString> =
            decode(&[2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0x00, 0xD8, 0, 0]);
        assert!(matches!(result, Err(NdrError::Utf16Error(_))));
    }

    #[test]
    fn test_string_8bit() {
        let bytes = encode(&NdrString::from("ok"));
        assert_eq!(&bytes[..], &[3, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, b'o', b'k', 0]);
        let decoded = NdrString::ndr_decode(&mut NdrReader::new(bytes, NdrContext::new())).unwrap();
        assert_eq!(decoded.as_str(), "ok");
    }

    #[test]
    fn test_lpwstr() {
        let null = LpWStr::null();
        assert_eq!(&encode(&null)[..], &[0, 0, 0, 0]);

        let name = LpWStr::from("a");
        assert_eq!(
            &encode(&name)[..],
            &[0, 0, 2, 0, 2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b'a', 0, 0, 0]
        );
        assert_eq!(name.as_str(), Some("a"));
        assert_eq!(null.as_str(), None);
    }
}
