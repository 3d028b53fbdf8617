//! Option definitions, option values and the scopes they are set on

use ndr::{LpWStr, SizedArray};

use super::common::{DhcpBinaryData, DhcpIpAddress, DhcpOptionId, DwordDword};

ndr::ndr_enum! {
    /// `DHCP_OPTION_DATA_TYPE`
    pub enum DhcpOptionDataType: u16 {
        #[default]
        Byte = 0,
        Word = 1,
        DWord = 2,
        DWordDWord = 3,
        IpAddress = 4,
        StringData = 5,
        BinaryData = 6,
        EncapsulatedData = 7,
        Ipv6Address = 8,
    }

    /// `DHCP_OPTION_TYPE`
    pub enum DhcpOptionType: u16 {
        #[default]
        Unary = 0,
        Array = 1,
    }

    /// `DHCP_OPTION_SCOPE_TYPE`
    pub enum DhcpOptionScopeType: u16 {
        #[default]
        Default = 0,
        Global = 1,
        Subnet = 2,
        Reserved = 3,
        MScope = 4,
    }
}

ndr::ndr_union! {
    /// `DHCP_OPTION_DATA_ELEMENT`
    pub enum DhcpOptionDataElement: u16 {
        0 => Byte(u8),
        1 => Word(u16),
        2 => DWord(u32),
        3 => DWordDWord(DwordDword),
        4 => IpAddress(DhcpIpAddress),
        5 => StringData(LpWStr),
        6 => BinaryData(DhcpBinaryData),
        7 => EncapsulatedData(DhcpBinaryData),
        8 => Ipv6Address(LpWStr),
    }
}

ndr::ndr_struct! {
    /// `DHCP_OPTION_DATA`
    pub struct DhcpOptionData {
        pub elements: SizedArray<DhcpOptionDataElement>,
    }

    /// `DHCP_OPTION`: an option definition
    pub struct DhcpOption {
        pub option_id: DhcpOptionId,
        pub option_name: LpWStr,
        pub option_comment: LpWStr,
        pub default_value: DhcpOptionData,
        pub option_type: DhcpOptionType,
    }

    /// `DHCP_OPTION_ARRAY`
    pub struct DhcpOptionArray {
        pub options: SizedArray<DhcpOption>,
    }

    /// `DHCP_OPTION_VALUE`
    pub struct DhcpOptionValue {
        pub option_id: DhcpOptionId,
        pub value: DhcpOptionData,
    }

    /// `DHCP_OPTION_VALUE_ARRAY`
    pub struct DhcpOptionValueArray {
        pub values: SizedArray<DhcpOptionValue>,
    }

    /// `DHCP_OPTION_LIST`
    pub struct DhcpOptionList {
        pub options: SizedArray<DhcpOptionValue>,
    }

    /// `DHCP_RESERVED_SCOPE`
    #[derive(Copy, Eq, Hash)]
    pub struct DhcpReservedScope {
        pub reserved_ip_address: DhcpIpAddress,
        pub reserved_ip_subnet_address: DhcpIpAddress,
    }
}

ndr::ndr_union! {
    /// `DHCP_OPTION_SCOPE_INFO`
    pub enum DhcpOptionScopeInfo: u16 {
        0 => Default,
        1 => Global,
        2 => Subnet(DhcpIpAddress),
        3 => Reserved(DhcpReservedScope),
        4 => MScope(LpWStr),
    }
}

impl DhcpOptionDataElement {
    pub fn data_type(&self) -> DhcpOptionDataType {
        DhcpOptionDataType::try_from(self.discriminant()).unwrap_or_default()
    }
}

impl DhcpOptionData {
    pub fn new(elements: Vec<DhcpOptionDataElement>) -> Self {
        Self {
            elements: elements.into(),
        }
    }

    pub fn dword(value: u32) -> Self {
        Self::new(vec![DhcpOptionDataElement::DWord(value)])
    }

    pub fn string(value: &str) -> Self {
        Self::new(vec![DhcpOptionDataElement::StringData(value.into())])
    }

    /// One `IpAddress` element per address (routers, DNS servers)
    pub fn ip_addresses(addresses: &[DhcpIpAddress]) -> Self {
        addresses
            .iter()
            .map(|a| DhcpOptionDataElement::IpAddress(*a))
            .collect::<Vec<_>>()
            .into()
    }

    /// Type shared by the elements, `None` when empty or mixed
    pub fn data_type(&self) -> Option<DhcpOptionDataType> {
        let first = self.elements.first()?.data_type();
        self.elements
            .iter()
            .all(|e| e.data_type() == first)
            .then_some(first)
    }
}

impl From<Vec<DhcpOptionDataElement>> for DhcpOptionData {
    fn from(elements: Vec<DhcpOptionDataElement>) -> Self {
        Self::new(elements)
    }
}

impl DhcpOptionScopeInfo {
    pub fn scope_type(&self) -> DhcpOptionScopeType {
        DhcpOptionScopeType::try_from(self.discriminant()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndr::{from_bytes, to_bytes, Bytes, NdrContext, NdrError};

    #[test]
    fn test_scope_info_wire() {
        let ctx = NdrContext::default();
        assert_eq!(&to_bytes(&DhcpOptionScopeInfo::Global, ctx).unwrap()[..], &[1, 0, 0, 0, 1, 0]);

        let reserved = DhcpOptionScopeInfo::Reserved(DhcpReservedScope {
            reserved_ip_address: 0x0A00000A,
            reserved_ip_subnet_address: 0x0A000000,
        });
        let bytes = to_bytes(&reserved, ctx).unwrap();
        assert_eq!(
            &bytes[..],
            &[3, 0, 0, 0, 3, 0, 0, 0, 0x0A, 0, 0, 0x0A, 0, 0, 0, 0x0A]
        );
        assert_eq!(from_bytes::<DhcpOptionScopeInfo>(bytes, ctx).unwrap(), reserved);
        assert_eq!(reserved.scope_type(), DhcpOptionScopeType::Reserved);
    }

    #[test]
    fn test_option_data_golden() {
        let data = DhcpOptionData::ip_addresses(&[0xC0A80101]);
        assert_eq!(data.data_type(), Some(DhcpOptionDataType::IpAddress));
        let bytes = to_bytes(&data, NdrContext::default()).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                1, 0, 0, 0, 0x00, 0x00, 0x02, 0x00, // NumElements, Elements referent
                1, 0, 0, 0, // conformance
                4, 0, 0, 0, 4, 0, 0, 0, // OptionType, pad, switch, pad
                0x01, 0x01, 0xA8, 0xC0,
            ]
        );
    }

    #[test]
    fn test_option_roundtrip_mixed_elements() {
        let option = DhcpOption {
            option_id: 6,
            option_name: "DNS Servers".into(),
            option_comment: LpWStr::null(),
            default_value: vec![
                DhcpOptionDataElement::Byte(1),
                DhcpOptionDataElement::DWordDWord(DwordDword { dword1: 2, dword2: 3 }),
                DhcpOptionDataElement::StringData("s".into()),
                DhcpOptionDataElement::BinaryData(DhcpBinaryData::new(vec![9, 8, 7])),
            ]
            .into(),
            option_type: DhcpOptionType::Array,
        };
        assert_eq!(option.default_value.data_type(), None);
        for ctx in [NdrContext::default(), NdrContext::big_endian()] {
            let bytes = to_bytes(&option, ctx).unwrap();
            assert_eq!(from_bytes::<DhcpOption>(bytes, ctx).unwrap(), option);
        }
    }

    #[test]
    fn test_unknown_data_type_rejected() {
        let bytes = Bytes::from_static(&[
            1, 0, 0, 0, 0, 0, 2, 0, 1, 0, 0, 0, 9, 0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0,
        ]);
        assert!(matches!(
            from_bytes::<DhcpOptionData>(bytes, NdrContext::default()),
            Err(NdrError::InvalidDiscriminant(9))
        ));
    }
}
