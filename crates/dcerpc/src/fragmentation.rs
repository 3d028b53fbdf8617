//! DCE RPC PDU fragmentation (C706 section 12.5)
//!
//! Stub data larger than the negotiated fragment size is split across
//! several request or response PDUs sharing one call ID. The first carries
//! `FIRST_FRAG`, the last `LAST_FRAG`, and every fragment's `alloc_hint`
//! is the total stub length.
//!
//! ```text
//! max_frag
//! ├── PDU header (16 bytes)
//! ├── request/response body header (8 bytes)
//! ├── object UUID (16 bytes, request only, optional)
//! └── stub data fragment
//! ```

use bytes::{Bytes, BytesMut};

use crate::dcerpc::{PacketFlags, PduHeader, RequestPdu, ResponsePdu};
use crate::error::{Result, RpcError};

/// Splits outgoing stub data into fragments
pub struct FragmentGenerator;

impl FragmentGenerator {
    /// Stub bytes that fit in one fragment, rounded down to a multiple of 8.
    pub fn max_stub_size(max_frag: u16, has_object_uuid: bool) -> usize {
        let overhead = PduHeader::SIZE
            + RequestPdu::BODY_HEADER_SIZE
            + if has_object_uuid { 16 } else { 0 };
        (max_frag as usize).saturating_sub(overhead) & !7
    }

    /// Split `stub` into chunks with their fragment flags.
    fn chunks(stub: &Bytes, max_stub: usize) -> Vec<(PacketFlags, Bytes)> {
        if stub.len() <= max_stub || max_stub == 0 {
            return vec![(PacketFlags::complete(), stub.clone())];
        }
        let mut chunks = Vec::with_capacity(stub.len().div_ceil(max_stub));
        let mut offset = 0;
        while offset < stub.len() {
            let end = (offset + max_stub).min(stub.len());
            let mut flags = PacketFlags::new();
            if offset == 0 {
                flags = flags.with(PacketFlags::FIRST_FRAG);
            }
            if end == stub.len() {
                flags = flags.with(PacketFlags::LAST_FRAG);
            }
            chunks.push((flags, stub.slice(offset..end)));
            offset = end;
        }
        chunks
    }

    pub fn fragment_request(request: &RequestPdu, max_frag: u16) -> Vec<RequestPdu> {
        let max_stub = Self::max_stub_size(max_frag, request.object.is_some());
        Self::chunks(&request.stub_data, max_stub)
            .into_iter()
            .map(|(flags, stub_data)| {
                let mut fragment = request.clone();
                fragment.header.packet_flags = flags;
                fragment.alloc_hint = request.stub_data.len() as u32;
                fragment.stub_data = stub_data;
                fragment
            })
            .collect()
    }

    pub fn fragment_response(response: &ResponsePdu, max_frag: u16) -> Vec<ResponsePdu> {
        let max_stub = Self::max_stub_size(max_frag, false);
        Self::chunks(&response.stub_data, max_stub)
            .into_iter()
            .map(|(flags, stub_data)| {
                let mut fragment = response.clone();
                fragment.header.packet_flags = flags;
                fragment.alloc_hint = response.stub_data.len() as u32;
                fragment.stub_data = stub_data;
                fragment
            })
            .collect()
    }
}

/// Reassembles the stub data of one fragmented call at a time
#[derive(Debug)]
pub struct FragmentAssembler {
    call_id: Option<u32>,
    stub_data: BytesMut,
    max_size: usize,
}

impl FragmentAssembler {
    pub fn new(max_size: usize) -> Self {
        Self {
            call_id: None,
            stub_data: BytesMut::new(),
            max_size,
        }
    }

    /// Call currently being reassembled
    pub fn call_id(&self) -> Option<u32> {
        self.call_id
    }

    /// Add one fragment.
    ///
    /// Returns the complete stub once `LAST_FRAG` arrives.
    pub fn add_fragment(&mut self, header: &PduHeader, stub: &[u8]) -> Result<Option<Bytes>> {
        let flags = header.packet_flags;
        if flags.is_first_frag() {
            self.reset();
            self.call_id = Some(header.call_id);
        }
        match self.call_id {
            Some(expected) if expected != header.call_id => {
                return Err(RpcError::CallIdMismatch {
                    expected,
                    got: header.call_id,
                });
            }
            None => {
                return Err(RpcError::InvalidPduData(format!(
                    "fragment of call {} without FIRST_FRAG",
                    header.call_id
                )));
            }
            Some(_) => {}
        }

        let size = self.stub_data.len() + stub.len();
        if size > self.max_size {
            self.reset();
            return Err(RpcError::PduTooLarge {
                size,
                max: self.max_size,
            });
        }
        self.stub_data.extend_from_slice(stub);

        if flags.is_last_frag() {
            self.call_id = None;
            return Ok(Some(self.stub_data.split().freeze()));
        }
        Ok(None)
    }

    pub fn reset(&mut self) {
        self.call_id = None;
        self.stub_data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_stub_size() {
        assert_eq!(FragmentGenerator::max_stub_size(4280, false), 4256);
        assert_eq!(FragmentGenerator::max_stub_size(4280, true), 4240);
        assert_eq!(FragmentGenerator::max_stub_size(100, false), 72);
        assert_eq!(FragmentGenerator::max_stub_size(10, false), 0);
    }

    #[test]
    fn test_fragment_single_pdu() {
        let stub = Bytes::from(vec![0u8; 100]);
        let request = RequestPdu::new(1, 5, stub.clone());
        let fragments = FragmentGenerator::fragment_request(&request, 4280);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].header.packet_flags, PacketFlags::complete());
        assert_eq!(fragments[0].stub_data, stub);
    }

    #[test]
    fn test_fragment_and_reassemble_request() {
        let stub: Bytes = (0..10_000u32).map(|i| i as u8).collect::<Vec<_>>().into();
        let request = RequestPdu::new(9, 5, stub.clone());
        let fragments = FragmentGenerator::fragment_request(&request, 1000);

        // 976 stub bytes per fragment
        assert_eq!(fragments.len(), 11);
        assert!(fragments[0].header.packet_flags.is_first_frag());
        assert!(!fragments[0].header.packet_flags.is_last_frag());
        assert!(fragments[10].header.packet_flags.is_last_frag());
        assert!(fragments.iter().all(|f| f.alloc_hint == 10_000 && f.opnum == 5));
        assert!(fragments.iter().all(|f| f.encode().unwrap().len() <= 1000));

        let mut assembler = FragmentAssembler::new(1 << 20);
        let mut result = None;
        for fragment in &fragments {
            result = assembler.add_fragment(&fragment.header, &fragment.stub_data).unwrap();
        }
        assert_eq!(result, Some(stub));
        assert_eq!(assembler.call_id(), None);
    }

    #[test]
    fn test_fragment_response() {
        let response = ResponsePdu::new(3, Bytes::from(vec![1u8; 300]));
        let fragments = FragmentGenerator::fragment_response(&response, 124);
        assert_eq!(fragments.len(), 4);
        assert_eq!(fragments[0].stub_data.len(), 96);
        assert_eq!(fragments[3].stub_data.len(), 12);
        assert!(fragments[3].header.packet_flags.is_last_frag());
    }

    #[test]
    fn test_assembler_rejects_interleaved_call() {
        let mut assembler = FragmentAssembler::new(1024);
        let mut first = PduHeader::new(crate::dcerpc::PacketType::Request, 1);
        first.packet_flags = PacketFlags::new().with(PacketFlags::FIRST_FRAG);
        assert_eq!(assembler.add_fragment(&first, b"abc").unwrap(), None);

        let mut other = PduHeader::new(crate::dcerpc::PacketType::Request, 2);
        other.packet_flags = PacketFlags::new().with(PacketFlags::LAST_FRAG);
        assert!(matches!(
            assembler.add_fragment(&other, b"def"),
            Err(RpcError::CallIdMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_assembler_rejects_orphan_and_oversize() {
        let mut assembler = FragmentAssembler::new(4);
        let mut middle = PduHeader::new(crate::dcerpc::PacketType::Request, 1);
        middle.packet_flags = PacketFlags::new();
        assert!(matches!(
            assembler.add_fragment(&middle, b"x"),
            Err(RpcError::InvalidPduData(_))
        ));

        let whole = PduHeader::new(crate::dcerpc::PacketType::Request, 1);
        assert!(matches!(
            assembler.add_fragment(&whole, b"too long"),
            Err(RpcError::PduTooLarge { size: 8, max: 4 })
        ));
    }
}
