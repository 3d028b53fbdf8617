//! Scopes, their elements and superscopes

use ndr::{LpWStr, SizedArray, UniquePtr};

use super::common::{DhcpClientUid, DhcpHostInfo, DhcpIpAddress, DhcpIpMask};

ndr::ndr_enum! {
    /// `DHCP_SUBNET_STATE`
    pub enum DhcpSubnetState: u16 {
        #[default]
        Enabled = 0,
        Disabled = 1,
        EnabledSwitched = 2,
        DisabledSwitched = 3,
        InvalidState = 4,
    }

    /// `DHCP_SUBNET_ELEMENT_TYPE`
    pub enum DhcpSubnetElementType: u16 {
        #[default]
        IpRanges = 0,
        SecondaryHosts = 1,
        ReservedIps = 2,
        ExcludedIpRanges = 3,
        IpUsedClusters = 4,
        IpRangesDhcpOnly = 5,
        IpRangesDhcpBootp = 6,
        IpRangesBootpOnly = 7,
    }

    /// `DHCP_FORCE_FLAG`
    pub enum DhcpForceFlag: u16 {
        #[default]
        FullForce = 0,
        NoForce = 1,
        FailoverForce = 2,
    }
}

ndr::ndr_struct! {
    /// `DHCP_SUBNET_INFO`
    pub struct DhcpSubnetInfo {
        pub subnet_address: DhcpIpAddress,
        pub subnet_mask: DhcpIpMask,
        pub subnet_name: LpWStr,
        pub subnet_comment: LpWStr,
        pub primary_host: DhcpHostInfo,
        pub subnet_state: DhcpSubnetState,
    }

    /// `DHCP_SUBNET_INFO_VQ`
    pub struct DhcpSubnetInfoVq {
        pub subnet_address: DhcpIpAddress,
        pub subnet_mask: DhcpIpMask,
        pub subnet_name: LpWStr,
        pub subnet_comment: LpWStr,
        pub primary_host: DhcpHostInfo,
        pub subnet_state: DhcpSubnetState,
        pub quarantine_on: u32,
        pub reserved1: u32,
        pub reserved2: u32,
        pub reserved3: i64,
        pub reserved4: i64,
    }

    /// `DHCP_IP_ARRAY`
    pub struct DhcpIpArray {
        pub elements: SizedArray<DhcpIpAddress>,
    }

    /// `DHCP_IP_RANGE`
    #[derive(Copy, Eq, Hash)]
    pub struct DhcpIpRange {
        pub start_address: DhcpIpAddress,
        pub end_address: DhcpIpAddress,
    }

    /// `DHCP_IP_RESERVATION`
    pub struct DhcpIpReservation {
        pub reserved_ip_address: DhcpIpAddress,
        pub reserved_for_client: UniquePtr<DhcpClientUid>,
    }

    /// `DHCP_IP_RESERVATION_V4`
    pub struct DhcpIpReservationV4 {
        pub reserved_ip_address: DhcpIpAddress,
        pub reserved_for_client: UniquePtr<DhcpClientUid>,
        pub allowed_client_types: u8,
    }

    /// `DHCP_IP_CLUSTER`
    #[derive(Copy, Eq)]
    pub struct DhcpIpCluster {
        pub cluster_address: DhcpIpAddress,
        pub cluster_mask: u32,
    }

    /// `DHCP_SUBNET_ELEMENT_INFO_ARRAY`
    pub struct DhcpSubnetElementInfoArray {
        pub elements: SizedArray<DhcpSubnetElementData>,
    }

    /// `DHCP_SUBNET_ELEMENT_INFO_ARRAY_V4`
    pub struct DhcpSubnetElementInfoArrayV4 {
        pub elements: SizedArray<DhcpSubnetElementDataV4>,
    }

    /// `DHCP_SUPER_SCOPE_TABLE_ENTRY`
    pub struct DhcpSuperScopeTableEntry {
        pub subnet_address: DhcpIpAddress,
        pub super_scope_number: u32,
        pub next_in_super_scope: u32,
        pub super_scope_name: LpWStr,
    }

    /// `DHCP_SUPER_SCOPE_TABLE`
    pub struct DhcpSuperScopeTable {
        pub entries: SizedArray<DhcpSuperScopeTableEntry>,
    }
}

ndr::ndr_union! {
    /// `DHCP_SUBNET_ELEMENT_DATA`
    pub enum DhcpSubnetElementData: u16 {
        0 => IpRange(UniquePtr<DhcpIpRange>),
        1 => SecondaryHost(UniquePtr<DhcpHostInfo>),
        2 => ReservedIp(UniquePtr<DhcpIpReservation>),
        3 => ExcludeIpRange(UniquePtr<DhcpIpRange>),
        4 => IpUsedCluster(UniquePtr<DhcpIpCluster>),
        5 as 0 => IpRangeDhcpOnly(UniquePtr<DhcpIpRange>),
        6 as 0 => IpRangeDhcpBootp(UniquePtr<DhcpIpRange>),
        7 as 0 => IpRangeBootpOnly(UniquePtr<DhcpIpRange>),
    }
}

ndr::ndr_union! {
    /// `DHCP_SUBNET_ELEMENT_DATA_V4`
    pub enum DhcpSubnetElementDataV4: u16 {
        0 => IpRange(UniquePtr<DhcpIpRange>),
        1 => SecondaryHost(UniquePtr<DhcpHostInfo>),
        2 => ReservedIp(UniquePtr<DhcpIpReservationV4>),
        3 => ExcludeIpRange(UniquePtr<DhcpIpRange>),
        4 => IpUsedCluster(UniquePtr<DhcpIpCluster>),
        5 as 0 => IpRangeDhcpOnly(UniquePtr<DhcpIpRange>),
        6 as 0 => IpRangeDhcpBootp(UniquePtr<DhcpIpRange>),
        7 as 0 => IpRangeBootpOnly(UniquePtr<DhcpIpRange>),
    }
}

impl DhcpIpRange {
    pub fn new(start_address: DhcpIpAddress, end_address: DhcpIpAddress) -> Self {
        Self {
            start_address,
            end_address,
        }
    }

    pub fn contains(&self, address: DhcpIpAddress) -> bool {
        (self.start_address..=self.end_address).contains(&address)
    }
}

impl DhcpSubnetInfo {
    /// Address that `address` belongs to under this subnet's mask
    pub fn contains(&self, address: DhcpIpAddress) -> bool {
        address & self.subnet_mask == self.subnet_address & self.subnet_mask
    }
}

impl From<DhcpSubnetInfoVq> for DhcpSubnetInfo {
    fn from(vq: DhcpSubnetInfoVq) -> Self {
        Self {
            subnet_address: vq.subnet_address,
            subnet_mask: vq.subnet_mask,
            subnet_name: vq.subnet_name,
            subnet_comment: vq.subnet_comment,
            primary_host: vq.primary_host,
            subnet_state: vq.subnet_state,
        }
    }
}

impl From<DhcpSubnetInfo> for DhcpSubnetInfoVq {
    fn from(info: DhcpSubnetInfo) -> Self {
        Self {
            subnet_address: info.subnet_address,
            subnet_mask: info.subnet_mask,
            subnet_name: info.subnet_name,
            subnet_comment: info.subnet_comment,
            primary_host: info.primary_host,
            subnet_state: info.subnet_state,
            ..Default::default()
        }
    }
}

impl DhcpSubnetElementData {
    pub fn element_type(&self) -> DhcpSubnetElementType {
        DhcpSubnetElementType::try_from(self.discriminant()).unwrap_or_default()
    }

    /// The address range of an `IpRanges*` element, whichever client kind it serves
    pub fn ip_range(&self) -> Option<&UniquePtr<DhcpIpRange>> {
        match self {
            Self::IpRange(range)
            | Self::IpRangeDhcpOnly(range)
            | Self::IpRangeDhcpBootp(range)
            | Self::IpRangeBootpOnly(range) => Some(range),
            _ => None,
        }
    }
}

impl DhcpSubnetElementDataV4 {
    pub fn element_type(&self) -> DhcpSubnetElementType {
        DhcpSubnetElementType::try_from(self.discriminant()).unwrap_or_default()
    }

    /// The address range of an `IpRanges*` element, whichever client kind it serves
    pub fn ip_range(&self) -> Option<&UniquePtr<DhcpIpRange>> {
        match self {
            Self::IpRange(range)
            | Self::IpRangeDhcpOnly(range)
            | Self::IpRangeDhcpBootp(range)
            | Self::IpRangeBootpOnly(range) => Some(range),
            _ => None,
        }
    }
}

impl From<DhcpSubnetElementData> for DhcpSubnetElementDataV4 {
    fn from(element: DhcpSubnetElementData) -> Self {
        match element {
            DhcpSubnetElementData::IpRange(range) => Self::IpRange(range),
            DhcpSubnetElementData::SecondaryHost(host) => Self::SecondaryHost(host),
            DhcpSubnetElementData::ReservedIp(reservation) => {
                Self::ReservedIp(UniquePtr(reservation.0.map(|r| {
                    Box::new(DhcpIpReservationV4 {
                        reserved_ip_address: r.reserved_ip_address,
                        reserved_for_client: r.reserved_for_client,
                        allowed_client_types: super::common::client_type::BOTH,
                    })
                })))
            }
            DhcpSubnetElementData::ExcludeIpRange(range) => Self::ExcludeIpRange(range),
            DhcpSubnetElementData::IpUsedCluster(cluster) => Self::IpUsedCluster(cluster),
            DhcpSubnetElementData::IpRangeDhcpOnly(range) => Self::IpRangeDhcpOnly(range),
            DhcpSubnetElementData::IpRangeDhcpBootp(range) => Self::IpRangeDhcpBootp(range),
            DhcpSubnetElementData::IpRangeBootpOnly(range) => Self::IpRangeBootpOnly(range),
        }
    }
}

impl From<DhcpSubnetElementDataV4> for DhcpSubnetElementData {
    fn from(element: DhcpSubnetElementDataV4) -> Self {
        match element {
            DhcpSubnetElementDataV4::IpRange(range) => Self::IpRange(range),
            DhcpSubnetElementDataV4::SecondaryHost(host) => Self::SecondaryHost(host),
            DhcpSubnetElementDataV4::ReservedIp(reservation) => {
                Self::ReservedIp(UniquePtr(reservation.0.map(|r| {
                    Box::new(DhcpIpReservation {
                        reserved_ip_address: r.reserved_ip_address,
                        reserved_for_client: r.reserved_for_client,
                    })
                })))
            }
            DhcpSubnetElementDataV4::ExcludeIpRange(range) => Self::ExcludeIpRange(range),
            DhcpSubnetElementDataV4::IpUsedCluster(cluster) => Self::IpUsedCluster(cluster),
            DhcpSubnetElementDataV4::IpRangeDhcpOnly(range) => Self::IpRangeDhcpOnly(range),
            DhcpSubnetElementDataV4::IpRangeDhcpBootp(range) => Self::IpRangeDhcpBootp(range),
            DhcpSubnetElementDataV4::IpRangeBootpOnly(range) => Self::IpRangeBootpOnly(range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::common::DhcpBinaryData;
    use ndr::{from_bytes, to_bytes, NdrContext, NdrError};

    #[test]
    fn test_subnet_info_golden() {
        let info = DhcpSubnetInfo {
            subnet_address: 0xC0A80100,
            subnet_mask: 0xFFFFFF00,
            subnet_name: "a".into(),
            subnet_comment: LpWStr::null(),
            primary_host: DhcpHostInfo::new(0xC0A80101),
            subnet_state: DhcpSubnetState::Disabled,
        };
        let bytes = to_bytes(&info, NdrContext::default()).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                0x00, 0x01, 0xA8, 0xC0, // SubnetAddress
                0x00, 0xFF, 0xFF, 0xFF, // SubnetMask
                0x00, 0x00, 0x02, 0x00, // SubnetName referent
                0x00, 0x00, 0x00, 0x00, // SubnetComment null
                0x01, 0x01, 0xA8, 0xC0, // PrimaryHost.IpAddress
                0x00, 0x00, 0x00, 0x00, // NetBiosName null
                0x00, 0x00, 0x00, 0x00, // HostName null
                0x01, 0x00, // SubnetState
                0x00, 0x00, // padding
                0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, // "a"
                b'a', 0x00, 0x00, 0x00,
            ]
        );
        assert_eq!(from_bytes::<DhcpSubnetInfo>(bytes, NdrContext::default()).unwrap(), info);
    }

    #[test]
    fn test_subnet_info_vq_alignment() {
        assert_eq!(<DhcpSubnetInfoVq as ndr::NdrAlign>::NDR_ALIGN, 8);
        let vq = DhcpSubnetInfoVq {
            reserved4: -1,
            ..Default::default()
        };
        let bytes = to_bytes(&vq, NdrContext::default()).unwrap();
        // Reserved3 starts on the next 8-byte boundary after Reserved2
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[48..56], &[0; 8]);
        assert_eq!(&bytes[56..64], &[0xFF; 8]);
    }

    #[test]
    fn test_element_reservation_golden() {
        let element = DhcpSubnetElementData::ReservedIp(UniquePtr::new(DhcpIpReservation {
            reserved_ip_address: 0x0A000005,
            reserved_for_client: UniquePtr::new(DhcpBinaryData::from_mac(&[0xAA, 0xBB])),
        }));
        assert_eq!(element.element_type(), DhcpSubnetElementType::ReservedIps);

        let bytes = to_bytes(&element, NdrContext::default()).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                2, 0, 0, 0, 2, 0, 0, 0, // ElementType, pad, switch, pad
                0x00, 0x00, 0x02, 0x00, // ReservedIp referent
                0x05, 0x00, 0x00, 0x0A, // ReservedIpAddress
                0x04, 0x00, 0x02, 0x00, // ReservedForClient referent
                2, 0, 0, 0, 0x08, 0x00, 0x02, 0x00, // DataLength, Data referent
                2, 0, 0, 0, 0xAA, 0xBB, // conformance, bytes
            ]
        );
        assert_eq!(
            from_bytes::<DhcpSubnetElementData>(bytes, NdrContext::default()).unwrap(),
            element
        );
    }

    #[test]
    fn test_element_array_roundtrip_big_endian() {
        let array = DhcpSubnetElementInfoArrayV4 {
            elements: vec![
                DhcpSubnetElementDataV4::IpRange(UniquePtr::new(DhcpIpRange::new(10, 20))),
                DhcpSubnetElementDataV4::SecondaryHost(UniquePtr::new(DhcpHostInfo {
                    ip_address: 7,
                    net_bios_name: "NB".into(),
                    host_name: "host".into(),
                })),
                DhcpSubnetElementDataV4::ExcludeIpRange(UniquePtr::null()),
            ]
            .into(),
        };
        let ctx = NdrContext::big_endian();
        let bytes = to_bytes(&array, ctx).unwrap();
        assert_eq!(from_bytes::<DhcpSubnetElementInfoArrayV4>(bytes, ctx).unwrap(), array);
    }

    #[test]
    fn test_unknown_element_type_rejected() {
        let bytes = ndr::Bytes::from_static(&[9, 0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            from_bytes::<DhcpSubnetElementData>(bytes, NdrContext::default()),
            Err(NdrError::InvalidDiscriminant(9))
        ));
    }

    #[test]
    fn test_dhcp_only_range_travels_under_switch_zero() {
        let bytes = ndr::Bytes::from_static(&[
            5, 0, 0, 0, 0, 0, 0, 0, // ElementType, pad, switch, pad
            0x00, 0x00, 0x02, 0x00, // IpRange referent
            0x01, 0x00, 0x00, 0x0A, // StartAddress
            0x0A, 0x00, 0x00, 0x0A, // EndAddress
        ]);
        let element =
            from_bytes::<DhcpSubnetElementDataV4>(bytes.clone(), NdrContext::default()).unwrap();
        assert_eq!(element.element_type(), DhcpSubnetElementType::IpRangesDhcpOnly);
        assert_eq!(element.switch_value(), 0);
        assert_eq!(
            element.ip_range().and_then(|r| r.get()),
            Some(&DhcpIpRange::new(0x0A000001, 0x0A00000A))
        );
        assert_eq!(to_bytes(&element, NdrContext::default()).unwrap(), bytes);

        let v1 = DhcpSubnetElementData::from(element);
        assert_eq!(v1.element_type(), DhcpSubnetElementType::IpRangesDhcpOnly);
        assert_eq!(&to_bytes(&v1, NdrContext::default()).unwrap()[..4], &[5, 0, 0, 0]);

        let bootp = DhcpSubnetElementData::IpRangeBootpOnly(UniquePtr::null());
        assert_eq!(
            &to_bytes(&bootp, NdrContext::default()).unwrap()[..],
            &[7, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert!(DhcpSubnetElementData::ExcludeIpRange(UniquePtr::null()).ip_range().is_none());
    }

    #[test]
    fn test_v4_conversion() {
        let element = DhcpSubnetElementData::ReservedIp(UniquePtr::new(DhcpIpReservation {
            reserved_ip_address: 1,
            reserved_for_client: UniquePtr::null(),
        }));
        let v4 = DhcpSubnetElementDataV4::from(element.clone());
        match &v4 {
            DhcpSubnetElementDataV4::ReservedIp(r) => {
                assert_eq!(r.get().unwrap().allowed_client_types, crate::types::client_type::BOTH)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(DhcpSubnetElementData::from(v4), element);
    }
}
