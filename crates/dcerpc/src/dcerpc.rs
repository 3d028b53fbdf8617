//! DCE RPC PDU (Protocol Data Unit) types
//!
//! Connection-oriented PDUs as defined in C706 chapter 12 and MS-RPCE.
//! Every PDU starts with the common header:
//!
//! ```text
//! +--------+--------+--------+--------+
//! |  vers  |vers_min| ptype  | pflags |
//! +--------+--------+--------+--------+
//! |        data representation        |
//! +--------+--------+--------+--------+
//! |   frag_len      |   auth_len      |
//! +--------+--------+--------+--------+
//! |             call_id               |
//! +--------+--------+--------+--------+
//! ```
//!
//! The data representation selects the byte order of everything after it,
//! so bodies are written and read with an NDR stream in that byte order.
//! The body starts at offset 16, which keeps NDR alignment intact.

use bytes::Bytes;
use ndr::{NdrContext, NdrDecode, NdrEncode, NdrReader, NdrWriter};

use crate::error::{Result, RpcError};

pub const DCE_RPC_VERSION: u8 = 5;
pub const DCE_RPC_VERSION_MINOR: u8 = 0;

pub const NDR_SYNTAX_UUID: &str = "8a885d04-1ceb-11c9-9fe8-08002b104860";
pub const NDR_SYNTAX_VERSION: u32 = 2;

pub type Uuid = ndr::NdrUuid;

/// NDR 2.0 transfer syntax
pub const NDR_TRANSFER_SYNTAX: SyntaxId = SyntaxId {
    uuid: Uuid::from_fields(
        0x8a885d04,
        0x1ceb,
        0x11c9,
        [0x9f, 0xe8, 0x08, 0x00, 0x2b, 0x10, 0x48, 0x60],
    ),
    version: NDR_SYNTAX_VERSION,
};

ndr::ndr_enum! {
    /// Connection-oriented packet types
    pub enum PacketType: u8 {
        #[default]
        Request = 0,
        Response = 2,
        Fault = 3,
        Bind = 11,
        BindAck = 12,
        BindNak = 13,
        AlterContext = 14,
        AlterContextResp = 15,
        Auth3 = 16,
        Shutdown = 17,
        CoCancel = 18,
        Orphaned = 19,
    }

    /// Presentation context negotiation result
    pub enum ContextResult: u16 {
        #[default]
        Acceptance = 0,
        UserRejection = 1,
        ProviderRejection = 2,
        NegotiateAck = 3,
    }
}

/// Reasons carried with a provider rejection or a bind_nak
pub mod provider_reason {
    pub const NOT_SPECIFIED: u16 = 0;
    pub const ABSTRACT_SYNTAX_NOT_SUPPORTED: u16 = 1;
    pub const PROPOSED_TRANSFER_SYNTAXES_NOT_SUPPORTED: u16 = 2;
    pub const LOCAL_LIMIT_EXCEEDED: u16 = 3;
}

/// PDU flags (`pfc_flags`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFlags(u8);

impl PacketFlags {
    pub const FIRST_FRAG: u8 = 0x01;
    pub const LAST_FRAG: u8 = 0x02;
    pub const PENDING_CANCEL: u8 = 0x04;
    pub const CONC_MPX: u8 = 0x10;
    pub const DID_NOT_EXECUTE: u8 = 0x20;
    pub const MAYBE: u8 = 0x40;
    pub const OBJECT_UUID: u8 = 0x80;

    pub fn new() -> Self {
        Self(0)
    }

    /// A single-fragment PDU
    pub fn complete() -> Self {
        Self(Self::FIRST_FRAG | Self::LAST_FRAG)
    }

    pub fn with(mut self, flag: u8) -> Self {
        self.0 |= flag;
        self
    }

    pub fn has(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn is_first_frag(&self) -> bool {
        self.has(Self::FIRST_FRAG)
    }

    pub fn is_last_frag(&self) -> bool {
        self.has(Self::LAST_FRAG)
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    pub fn from_u8(value: u8) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntRep {
    BigEndian = 0,
    LittleEndian = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharRep {
    Ascii = 0,
    Ebcdic = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatRep {
    Ieee = 0,
    Vax = 1,
    Cray = 2,
    Ibm = 3,
}

/// Data representation label (`drep`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRepresentation {
    pub int_rep: IntRep,
    pub char_rep: CharRep,
    pub float_rep: FloatRep,
}

impl DataRepresentation {
    /// Little-endian, ASCII, IEEE
    pub fn ndr() -> Self {
        Self::from_context(NdrContext::new())
    }

    pub fn big_endian() -> Self {
        Self::from_context(NdrContext::big_endian())
    }

    pub fn from_context(ctx: NdrContext) -> Self {
        Self {
            int_rep: if ctx.little_endian {
                IntRep::LittleEndian
            } else {
                IntRep::BigEndian
            },
            char_rep: CharRep::Ascii,
            float_rep: FloatRep::Ieee,
        }
    }

    pub fn encode(&self) -> [u8; 4] {
        [
            (self.char_rep as u8) | ((self.int_rep as u8) << 4),
            self.float_rep as u8,
            0,
            0,
        ]
    }

    pub fn decode(data: [u8; 4]) -> Self {
        let int_rep = match data[0] >> 4 {
            0 => IntRep::BigEndian,
            _ => IntRep::LittleEndian,
        };
        let char_rep = match data[0] & 0x0F {
            0 => CharRep::Ascii,
            _ => CharRep::Ebcdic,
        };
        let float_rep = match data[1] {
            0 => FloatRep::Ieee,
            1 => FloatRep::Vax,
            2 => FloatRep::Cray,
            _ => FloatRep::Ibm,
        };
        Self {
            int_rep,
            char_rep,
            float_rep,
        }
    }

    pub fn is_little_endian(&self) -> bool {
        self.int_rep == IntRep::LittleEndian
    }

    /// NDR byte order for stub data carried under this label
    pub fn context(&self) -> NdrContext {
        NdrContext::with_byte_order(self.is_little_endian())
    }
}

impl Default for DataRepresentation {
    fn default() -> Self {
        Self::ndr()
    }
}

ndr::ndr_struct! {
    /// Interface or transfer syntax identifier (`p_syntax_id_t`)
    ///
    /// `version` holds the major version in the low 16 bits and the minor
    /// version in the high 16 bits.
    #[derive(Copy, Eq, Hash)]
    pub struct SyntaxId {
        pub uuid: Uuid,
        pub version: u32,
    }

    /// One entry of a bind_ack result list (`p_result_t`)
    pub struct BindResult {
        pub result: ContextResult,
        pub reason: u16,
        pub transfer_syntax: SyntaxId,
    }
}

impl SyntaxId {
    pub const fn new(uuid: Uuid, major_version: u16, minor_version: u16) -> Self {
        Self {
            uuid,
            version: major_version as u32 | ((minor_version as u32) << 16),
        }
    }

    pub fn major_version(&self) -> u16 {
        (self.version & 0xFFFF) as u16
    }

    pub fn minor_version(&self) -> u16 {
        (self.version >> 16) as u16
    }
}

impl std::fmt::Display for SyntaxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} v{}.{}",
            self.uuid,
            self.major_version(),
            self.minor_version()
        )
    }
}

impl BindResult {
    pub fn accepted(transfer_syntax: SyntaxId) -> Self {
        Self {
            result: ContextResult::Acceptance,
            reason: provider_reason::NOT_SPECIFIED,
            transfer_syntax,
        }
    }

    pub fn rejected(reason: u16) -> Self {
        Self {
            result: ContextResult::ProviderRejection,
            reason,
            transfer_syntax: SyntaxId::default(),
        }
    }
}

/// Common PDU header (16 bytes)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub version: u8,
    pub version_minor: u8,
    pub packet_type: PacketType,
    pub packet_flags: PacketFlags,
    pub data_rep: DataRepresentation,
    /// Length of the whole fragment; filled in by `encode`
    pub frag_length: u16,
    pub auth_length: u16,
    pub call_id: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    pub fn new(packet_type: PacketType, call_id: u32) -> Self {
        Self {
            version: DCE_RPC_VERSION,
            version_minor: DCE_RPC_VERSION_MINOR,
            packet_type,
            packet_flags: PacketFlags::complete(),
            data_rep: DataRepresentation::ndr(),
            frag_length: 0,
            auth_length: 0,
            call_id,
        }
    }

    fn write(&self, w: &mut NdrWriter, frag_length: u16) {
        w.write_u8(self.version);
        w.write_u8(self.version_minor);
        w.write_u8(self.packet_type as u8);
        w.write_u8(self.packet_flags.as_u8());
        w.write_bytes(&self.data_rep.encode());
        w.write_u16(frag_length);
        w.write_u16(self.auth_length);
        w.write_u32(self.call_id);
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(RpcError::InvalidPduData(format!(
                "PDU header too short: {} bytes",
                data.len()
            )));
        }
        if data[0] != DCE_RPC_VERSION {
            return Err(RpcError::VersionMismatch {
                expected: DCE_RPC_VERSION,
                got: data[0],
            });
        }
        let packet_type =
            PacketType::try_from(data[2]).map_err(|_| RpcError::InvalidMessageType(data[2]))?;
        let data_rep = DataRepresentation::decode([data[4], data[5], data[6], data[7]]);

        let mut r = NdrReader::new(Bytes::copy_from_slice(&data[8..Self::SIZE]), data_rep.context());
        Ok(Self {
            version: data[0],
            version_minor: data[1],
            packet_type,
            packet_flags: PacketFlags::from_u8(data[3]),
            data_rep,
            frag_length: r.read_u16()?,
            auth_length: r.read_u16()?,
            call_id: r.read_u32()?,
        })
    }
}

/// Presentation context element (`p_cont_elem_t`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextElement {
    pub context_id: u16,
    pub abstract_syntax: SyntaxId,
    pub transfer_syntaxes: Vec<SyntaxId>,
}

impl ndr::NdrAlign for ContextElement {
    const NDR_ALIGN: usize = 4;
}

impl NdrEncode for ContextElement {
    fn encode_head(&self, w: &mut NdrWriter) -> ndr::Result<()> {
        let count = u8::try_from(self.transfer_syntaxes.len())
            .map_err(|_| ndr::NdrError::IntegerOverflow(self.transfer_syntaxes.len()))?;
        w.write_u16(self.context_id);
        w.write_u8(count);
        w.write_u8(0);
        self.abstract_syntax.encode_head(w)?;
        self.transfer_syntaxes
            .iter()
            .try_for_each(|syntax| syntax.encode_head(w))
    }
}

impl NdrDecode for ContextElement {
    fn decode_head(&mut self, r: &mut NdrReader) -> ndr::Result<()> {
        self.context_id = r.read_u16()?;
        let count = r.read_u8()?;
        r.read_u8()?;
        self.abstract_syntax = SyntaxId::ndr_decode(r)?;
        self.transfer_syntaxes = (0..count)
            .map(|_| SyntaxId::ndr_decode(r))
            .collect::<ndr::Result<_>>()?;
        Ok(())
    }
}

/// Bind request
#[derive(Debug, Clone, PartialEq)]
pub struct BindPdu {
    pub header: PduHeader,
    pub max_xmit_frag: u16,
    pub max_recv_frag: u16,
    pub assoc_group_id: u32,
    pub context_list: Vec<ContextElement>,
}

impl BindPdu {
    /// Bind one presentation context (id 0) for `interface` over NDR 2.0
    pub fn new(call_id: u32, interface: SyntaxId) -> Self {
        Self {
            header: PduHeader::new(PacketType::Bind, call_id),
            max_xmit_frag: 4280,
            max_recv_frag: 4280,
            assoc_group_id: 0,
            context_list: vec![ContextElement {
                context_id: 0,
                abstract_syntax: interface,
                transfer_syntaxes: vec![NDR_TRANSFER_SYNTAX],
            }],
        }
    }

    fn write_body(&self, w: &mut NdrWriter) -> ndr::Result<()> {
        let count = u8::try_from(self.context_list.len())
            .map_err(|_| ndr::NdrError::IntegerOverflow(self.context_list.len()))?;
        w.write_u16(self.max_xmit_frag);
        w.write_u16(self.max_recv_frag);
        w.write_u32(self.assoc_group_id);
        w.write_u8(count);
        w.write_u8(0);
        w.write_u16(0);
        self.context_list.iter().try_for_each(|ctx| ctx.ndr_encode(w))
    }

    fn read_body(header: PduHeader, r: &mut NdrReader) -> ndr::Result<Self> {
        let max_xmit_frag = r.read_u16()?;
        let max_recv_frag = r.read_u16()?;
        let assoc_group_id = r.read_u32()?;
        let count = r.read_u8()?;
        r.read_u8()?;
        r.read_u16()?;
        let context_list = (0..count)
            .map(|_| ContextElement::ndr_decode(r))
            .collect::<ndr::Result<_>>()?;
        Ok(Self {
            header,
            max_xmit_frag,
            max_recv_frag,
            assoc_group_id,
            context_list,
        })
    }

    pub fn encode(&self) -> Result<Bytes> {
        encode_pdu(&self.header, |w| self.write_body(w))
    }
}

/// Bind acknowledgement
#[derive(Debug, Clone, PartialEq)]
pub struct BindAckPdu {
    pub header: PduHeader,
    pub max_xmit_frag: u16,
    pub max_recv_frag: u16,
    pub assoc_group_id: u32,
    /// Secondary address (the server port as text), without terminator
    pub secondary_address: String,
    pub results: Vec<BindResult>,
}

impl BindAckPdu {
    pub fn new(call_id: u32, assoc_group_id: u32) -> Self {
        Self {
            header: PduHeader::new(PacketType::BindAck, call_id),
            max_xmit_frag: 4280,
            max_recv_frag: 4280,
            assoc_group_id,
            secondary_address: String::new(),
            results: Vec::new(),
        }
    }

    fn write_body(&self, w: &mut NdrWriter) -> ndr::Result<()> {
        w.write_u16(self.max_xmit_frag);
        w.write_u16(self.max_recv_frag);
        w.write_u32(self.assoc_group_id);
        if self.secondary_address.is_empty() {
            w.write_u16(0);
        } else {
            let len = self.secondary_address.len() + 1;
            w.write_u16(u16::try_from(len).map_err(|_| ndr::NdrError::IntegerOverflow(len))?);
            w.write_bytes(self.secondary_address.as_bytes());
            w.write_u8(0);
        }
        w.align(4);
        let count = u8::try_from(self.results.len())
            .map_err(|_| ndr::NdrError::IntegerOverflow(self.results.len()))?;
        w.write_u8(count);
        w.write_u8(0);
        w.write_u16(0);
        self.results.iter().try_for_each(|result| result.ndr_encode(w))
    }

    fn read_body(header: PduHeader, r: &mut NdrReader) -> ndr::Result<Self> {
        let max_xmit_frag = r.read_u16()?;
        let max_recv_frag = r.read_u16()?;
        let assoc_group_id = r.read_u32()?;
        let len = r.read_u16()? as usize;
        let raw = r.read_bytes(len)?;
        let text = raw.split(|b| *b == 0).next().unwrap_or_default();
        let secondary_address = String::from_utf8_lossy(text).into_owned();
        r.align(4)?;
        let count = r.read_u8()?;
        r.read_u8()?;
        r.read_u16()?;
        let results = (0..count)
            .map(|_| BindResult::ndr_decode(r))
            .collect::<ndr::Result<_>>()?;
        Ok(Self {
            header,
            max_xmit_frag,
            max_recv_frag,
            assoc_group_id,
            secondary_address,
            results,
        })
    }

    pub fn encode(&self) -> Result<Bytes> {
        encode_pdu(&self.header, |w| self.write_body(w))
    }
}

/// Bind rejection
#[derive(Debug, Clone, PartialEq)]
pub struct BindNakPdu {
    pub header: PduHeader,
    pub reject_reason: u16,
    /// Supported protocol versions as (major, minor)
    pub versions: Vec<(u8, u8)>,
}

impl BindNakPdu {
    pub fn new(call_id: u32, reject_reason: u16) -> Self {
        Self {
            header: PduHeader::new(PacketType::BindNak, call_id),
            reject_reason,
            versions: vec![(DCE_RPC_VERSION, DCE_RPC_VERSION_MINOR)],
        }
    }

    fn write_body(&self, w: &mut NdrWriter) -> ndr::Result<()> {
        let count = u8::try_from(self.versions.len())
            .map_err(|_| ndr::NdrError::IntegerOverflow(self.versions.len()))?;
        w.write_u16(self.reject_reason);
        w.write_u8(count);
        for (major, minor) in &self.versions {
            w.write_u8(*major);
            w.write_u8(*minor);
        }
        Ok(())
    }

    fn read_body(header: PduHeader, r: &mut NdrReader) -> ndr::Result<Self> {
        let reject_reason = r.read_u16()?;
        // the version list is optional in older implementations
        let count = if r.remaining() > 0 { r.read_u8()? } else { 0 };
        let versions = (0..count)
            .map(|_| -> ndr::Result<(u8, u8)> { Ok((r.read_u8()?, r.read_u8()?)) })
            .collect::<ndr::Result<_>>()?;
        Ok(Self {
            header,
            reject_reason,
            versions,
        })
    }

    pub fn encode(&self) -> Result<Bytes> {
        encode_pdu(&self.header, |w| self.write_body(w))
    }
}

/// Request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPdu {
    pub header: PduHeader,
    pub alloc_hint: u32,
    pub context_id: u16,
    pub opnum: u16,
    /// Present when `OBJECT_UUID` is set in the header flags
    pub object: Option<Uuid>,
    pub stub_data: Bytes,
}

impl RequestPdu {
    /// alloc_hint, context id, opnum
    pub const BODY_HEADER_SIZE: usize = 8;

    pub fn new(call_id: u32, opnum: u16, stub_data: Bytes) -> Self {
        Self {
            header: PduHeader::new(PacketType::Request, call_id),
            alloc_hint: stub_data.len() as u32,
            context_id: 0,
            opnum,
            object: None,
            stub_data,
        }
    }

    fn write_body(&self, w: &mut NdrWriter) -> ndr::Result<()> {
        w.write_u32(self.alloc_hint);
        w.write_u16(self.context_id);
        w.write_u16(self.opnum);
        if let Some(object) = &self.object {
            object.encode_head(w)?;
        }
        w.write_bytes(&self.stub_data);
        Ok(())
    }

    fn read_body(header: PduHeader, r: &mut NdrReader) -> ndr::Result<Self> {
        let alloc_hint = r.read_u32()?;
        let context_id = r.read_u16()?;
        let opnum = r.read_u16()?;
        let object = if header.packet_flags.has(PacketFlags::OBJECT_UUID) {
            Some(Uuid::ndr_decode(r)?)
        } else {
            None
        };
        let stub_data = r.read_bytes(r.remaining())?;
        Ok(Self {
            header,
            alloc_hint,
            context_id,
            opnum,
            object,
            stub_data,
        })
    }

    pub fn encode(&self) -> Result<Bytes> {
        let mut header = self.header.clone();
        if self.object.is_some() {
            header.packet_flags = header.packet_flags.with(PacketFlags::OBJECT_UUID);
        }
        encode_pdu(&header, |w| self.write_body(w))
    }
}

/// Response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePdu {
    pub header: PduHeader,
    pub alloc_hint: u32,
    pub context_id: u16,
    pub cancel_count: u8,
    pub stub_data: Bytes,
}

impl ResponsePdu {
    /// alloc_hint, context id, cancel count, reserved
    pub const BODY_HEADER_SIZE: usize = 8;

    pub fn new(call_id: u32, stub_data: Bytes) -> Self {
        Self {
            header: PduHeader::new(PacketType::Response, call_id),
            alloc_hint: stub_data.len() as u32,
            context_id: 0,
            cancel_count: 0,
            stub_data,
        }
    }

    fn write_body(&self, w: &mut NdrWriter) -> ndr::Result<()> {
        w.write_u32(self.alloc_hint);
        w.write_u16(self.context_id);
        w.write_u8(self.cancel_count);
        w.write_u8(0);
        w.write_bytes(&self.stub_data);
        Ok(())
    }

    fn read_body(header: PduHeader, r: &mut NdrReader) -> ndr::Result<Self> {
        let alloc_hint = r.read_u32()?;
        let context_id = r.read_u16()?;
        let cancel_count = r.read_u8()?;
        r.read_u8()?;
        let stub_data = r.read_bytes(r.remaining())?;
        Ok(Self {
            header,
            alloc_hint,
            context_id,
            cancel_count,
            stub_data,
        })
    }

    pub fn encode(&self) -> Result<Bytes> {
        encode_pdu(&self.header, |w| self.write_body(w))
    }
}

/// Fault status codes (`nca_s_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FaultStatus {
    AccessDenied = 0x0000_0005,
    /// `nca_s_fault_ndr` / RPC_X_BAD_STUB_DATA
    FaultNdr = 0x0000_06f7,
    FaultUnspec = 0x1c00_0012,
    ContextMismatch = 0x1c00_001a,
    OpRngError = 0x1c01_0002,
    UnkIf = 0x1c01_0003,
    ProtoError = 0x1c01_000b,
}

impl FaultStatus {
    pub fn from_u32(status: u32) -> Option<Self> {
        [
            Self::AccessDenied,
            Self::FaultNdr,
            Self::FaultUnspec,
            Self::ContextMismatch,
            Self::OpRngError,
            Self::UnkIf,
            Self::ProtoError,
        ]
        .into_iter()
        .find(|s| *s as u32 == status)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::FaultNdr => "nca_s_fault_ndr",
            Self::FaultUnspec => "nca_s_fault_unspec",
            Self::ContextMismatch => "nca_s_fault_context_mismatch",
            Self::OpRngError => "nca_s_op_rng_error",
            Self::UnkIf => "nca_s_unk_if",
            Self::ProtoError => "nca_s_proto_error",
        }
    }
}

/// Fault
#[derive(Debug, Clone, PartialEq)]
pub struct FaultPdu {
    pub header: PduHeader,
    pub alloc_hint: u32,
    pub context_id: u16,
    pub cancel_count: u8,
    pub status: u32,
}

impl FaultPdu {
    pub fn new(call_id: u32, status: u32) -> Self {
        Self {
            header: PduHeader::new(PacketType::Fault, call_id),
            alloc_hint: 0,
            context_id: 0,
            cancel_count: 0,
            status,
        }
    }

    fn write_body(&self, w: &mut NdrWriter) -> ndr::Result<()> {
        w.write_u32(self.alloc_hint);
        w.write_u16(self.context_id);
        w.write_u8(self.cancel_count);
        w.write_u8(0);
        w.write_u32(self.status);
        w.write_u32(0);
        Ok(())
    }

    fn read_body(header: PduHeader, r: &mut NdrReader) -> ndr::Result<Self> {
        let alloc_hint = r.read_u32()?;
        let context_id = r.read_u16()?;
        let cancel_count = r.read_u8()?;
        r.read_u8()?;
        let status = r.read_u32()?;
        Ok(Self {
            header,
            alloc_hint,
            context_id,
            cancel_count,
            status,
        })
    }

    pub fn encode(&self) -> Result<Bytes> {
        encode_pdu(&self.header, |w| self.write_body(w))
    }
}

/// A decoded connection-oriented PDU
#[derive(Debug, Clone, PartialEq)]
pub enum Pdu {
    Bind(BindPdu),
    BindAck(BindAckPdu),
    BindNak(BindNakPdu),
    Request(RequestPdu),
    Response(ResponsePdu),
    Fault(FaultPdu),
}

impl Pdu {
    pub fn header(&self) -> &PduHeader {
        match self {
            Pdu::Bind(p) => &p.header,
            Pdu::BindAck(p) => &p.header,
            Pdu::BindNak(p) => &p.header,
            Pdu::Request(p) => &p.header,
            Pdu::Response(p) => &p.header,
            Pdu::Fault(p) => &p.header,
        }
    }

    pub fn encode(&self) -> Result<Bytes> {
        match self {
            Pdu::Bind(p) => p.encode(),
            Pdu::BindAck(p) => p.encode(),
            Pdu::BindNak(p) => p.encode(),
            Pdu::Request(p) => p.encode(),
            Pdu::Response(p) => p.encode(),
            Pdu::Fault(p) => p.encode(),
        }
    }

    /// Decode one complete fragment
    pub fn decode(data: &Bytes) -> Result<Self> {
        let header = PduHeader::decode(data)?;
        let frag_length = header.frag_length as usize;
        if frag_length < PduHeader::SIZE || frag_length > data.len() {
            return Err(RpcError::InvalidPduData(format!(
                "fragment length {} does not match {} bytes",
                frag_length,
                data.len()
            )));
        }
        if header.auth_length != 0 {
            return Err(RpcError::InvalidPduData(
                "authenticated PDUs are not supported".to_string(),
            ));
        }

        let mut r = NdrReader::new(data.slice(PduHeader::SIZE..frag_length), header.data_rep.context());
        let pdu = match header.packet_type {
            PacketType::Bind => Pdu::Bind(BindPdu::read_body(header, &mut r)?),
            PacketType::BindAck => Pdu::BindAck(BindAckPdu::read_body(header, &mut r)?),
            PacketType::BindNak => Pdu::BindNak(BindNakPdu::read_body(header, &mut r)?),
            PacketType::Request => Pdu::Request(RequestPdu::read_body(header, &mut r)?),
            PacketType::Response => Pdu::Response(ResponsePdu::read_body(header, &mut r)?),
            PacketType::Fault => Pdu::Fault(FaultPdu::read_body(header, &mut r)?),
            other => return Err(RpcError::InvalidMessageType(other as u8)),
        };
        Ok(pdu)
    }
}

/// Write `header` followed by a body, filling in `frag_length`.
fn encode_pdu(
    header: &PduHeader,
    write_body: impl FnOnce(&mut NdrWriter) -> ndr::Result<()>,
) -> Result<Bytes> {
    let ctx = header.data_rep.context();
    let mut body = NdrWriter::new(ctx);
    write_body(&mut body)?;
    let body = body.into_bytes();

    let size = PduHeader::SIZE + body.len();
    let frag_length = u16::try_from(size).map_err(|_| RpcError::PduTooLarge {
        size,
        max: u16::MAX as usize,
    })?;
    let mut w = NdrWriter::new(ctx);
    header.write(&mut w, frag_length);
    w.write_bytes(&body);
    Ok(w.into_bytes())
}
