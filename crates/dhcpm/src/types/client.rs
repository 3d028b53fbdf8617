//! Leases and client records

use ndr::{Bool32, LpWStr, SizedArray, UniquePtr};

use super::common::{DateTime, DhcpBinaryData, DhcpHostInfo, DhcpIpAddress, DhcpIpMask};

ndr::ndr_enum! {
    /// `QuarantineStatus`
    pub enum QuarantineStatus: u16 {
        #[default]
        NoQuarantine = 0,
        RestrictedAccess = 1,
        DropPacket = 2,
        Probation = 3,
        Exempt = 4,
        DefaultQuarSetting = 5,
        NoQuarInfo = 6,
    }

    /// `DHCP_SEARCH_INFO_TYPE`
    pub enum DhcpSearchInfoType: u16 {
        #[default]
        ClientIpAddress = 0,
        ClientHardwareAddress = 1,
        ClientName = 2,
    }
}

/// `AddressState` values of a VQ client record
pub mod address_state {
    pub const OFFERED: u8 = 0;
    pub const ACTIVE: u8 = 1;
    pub const DECLINED: u8 = 2;
    pub const DOOM: u8 = 3;
}

ndr::ndr_struct! {
    /// `DHCP_CLIENT_INFO`
    pub struct DhcpClientInfo {
        pub client_ip_address: DhcpIpAddress,
        pub subnet_mask: DhcpIpMask,
        pub client_hardware_address: DhcpBinaryData,
        pub client_name: LpWStr,
        pub client_comment: LpWStr,
        pub client_lease_expires: DateTime,
        pub owner_host: DhcpHostInfo,
    }

    /// `DHCP_CLIENT_INFO_V4`
    pub struct DhcpClientInfoV4 {
        pub client_ip_address: DhcpIpAddress,
        pub subnet_mask: DhcpIpMask,
        pub client_hardware_address: DhcpBinaryData,
        pub client_name: LpWStr,
        pub client_comment: LpWStr,
        pub client_lease_expires: DateTime,
        pub owner_host: DhcpHostInfo,
        pub client_type: u8,
    }

    /// `DHCP_CLIENT_INFO_VQ`
    pub struct DhcpClientInfoVq {
        pub client_ip_address: DhcpIpAddress,
        pub subnet_mask: DhcpIpMask,
        pub client_hardware_address: DhcpBinaryData,
        pub client_name: LpWStr,
        pub client_comment: LpWStr,
        pub client_lease_expires: DateTime,
        pub owner_host: DhcpHostInfo,
        pub client_type: u8,
        pub address_state: u8,
        pub status: QuarantineStatus,
        pub probation_ends: DateTime,
        pub quarantine_capable: Bool32,
    }

    /// `DHCP_CLIENT_INFO_ARRAY`
    pub struct DhcpClientInfoArray {
        pub clients: SizedArray<UniquePtr<DhcpClientInfo>>,
    }

    /// `DHCP_CLIENT_INFO_ARRAY_V4`
    pub struct DhcpClientInfoArrayV4 {
        pub clients: SizedArray<UniquePtr<DhcpClientInfoV4>>,
    }

    /// `DHCP_CLIENT_INFO_ARRAY_VQ`
    pub struct DhcpClientInfoArrayVq {
        pub clients: SizedArray<UniquePtr<DhcpClientInfoVq>>,
    }
}

ndr::ndr_union! {
    /// `DHCP_SEARCH_INFO`
    pub enum DhcpSearchInfo: u16 {
        0 => ClientIpAddress(DhcpIpAddress),
        1 => ClientHardwareAddress(DhcpBinaryData),
        2 => ClientName(LpWStr),
    }
}

impl DhcpSearchInfo {
    pub fn search_type(&self) -> DhcpSearchInfoType {
        DhcpSearchInfoType::try_from(self.discriminant()).unwrap_or_default()
    }

    /// Whether a client record is the one searched for. Names compare
    /// case-insensitively.
    pub fn matches(&self, client: &DhcpClientInfoVq) -> bool {
        match self {
            Self::ClientIpAddress(ip) => client.client_ip_address == *ip,
            Self::ClientHardwareAddress(hw) => client.client_hardware_address == *hw,
            Self::ClientName(name) => match (name.as_str(), client.client_name.as_str()) {
                (Some(wanted), Some(have)) => wanted.eq_ignore_ascii_case(have),
                _ => false,
            },
        }
    }
}

impl From<DhcpClientInfoVq> for DhcpClientInfo {
    fn from(vq: DhcpClientInfoVq) -> Self {
        Self {
            client_ip_address: vq.client_ip_address,
            subnet_mask: vq.subnet_mask,
            client_hardware_address: vq.client_hardware_address,
            client_name: vq.client_name,
            client_comment: vq.client_comment,
            client_lease_expires: vq.client_lease_expires,
            owner_host: vq.owner_host,
        }
    }
}

impl From<DhcpClientInfoVq> for DhcpClientInfoV4 {
    fn from(vq: DhcpClientInfoVq) -> Self {
        Self {
            client_ip_address: vq.client_ip_address,
            subnet_mask: vq.subnet_mask,
            client_hardware_address: vq.client_hardware_address,
            client_name: vq.client_name,
            client_comment: vq.client_comment,
            client_lease_expires: vq.client_lease_expires,
            owner_host: vq.owner_host,
            client_type: vq.client_type,
        }
    }
}

impl From<DhcpClientInfo> for DhcpClientInfoVq {
    fn from(info: DhcpClientInfo) -> Self {
        Self {
            client_ip_address: info.client_ip_address,
            subnet_mask: info.subnet_mask,
            client_hardware_address: info.client_hardware_address,
            client_name: info.client_name,
            client_comment: info.client_comment,
            client_lease_expires: info.client_lease_expires,
            owner_host: info.owner_host,
            client_type: super::common::client_type::DHCP,
            address_state: address_state::ACTIVE,
            ..Default::default()
        }
    }
}

impl From<DhcpClientInfoV4> for DhcpClientInfoVq {
    fn from(info: DhcpClientInfoV4) -> Self {
        Self {
            client_ip_address: info.client_ip_address,
            subnet_mask: info.subnet_mask,
            client_hardware_address: info.client_hardware_address,
            client_name: info.client_name,
            client_comment: info.client_comment,
            client_lease_expires: info.client_lease_expires,
            owner_host: info.owner_host,
            client_type: info.client_type,
            address_state: address_state::ACTIVE,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndr::{from_bytes, to_bytes, NdrContext};

    fn sample() -> DhcpClientInfoVq {
        DhcpClientInfoVq {
            client_ip_address: 0xC0A8010A,
            subnet_mask: 0xFFFFFF00,
            client_hardware_address: DhcpBinaryData::from_mac(&[1, 2, 3, 4, 5, 6]),
            client_name: "Laptop".into(),
            client_comment: LpWStr::null(),
            client_lease_expires: DateTime::from_filetime(42),
            owner_host: DhcpHostInfo::new(0xC0A80101),
            client_type: 1,
            address_state: address_state::ACTIVE,
            status: QuarantineStatus::Probation,
            probation_ends: DateTime::INFINITE,
            quarantine_capable: Bool32(true),
        }
    }

    #[test]
    fn test_search_matches() {
        let client = sample();
        assert!(DhcpSearchInfo::ClientIpAddress(0xC0A8010A).matches(&client));
        assert!(!DhcpSearchInfo::ClientIpAddress(1).matches(&client));
        assert!(DhcpSearchInfo::ClientHardwareAddress(DhcpBinaryData::from_mac(&[1, 2, 3, 4, 5, 6]))
            .matches(&client));
        assert!(DhcpSearchInfo::ClientName("laptop".into()).matches(&client));
        assert!(!DhcpSearchInfo::ClientName(LpWStr::null()).matches(&client));
    }

    #[test]
    fn test_search_info_wire() {
        let search = DhcpSearchInfo::ClientIpAddress(0x0A000001);
        assert_eq!(search.search_type(), DhcpSearchInfoType::ClientIpAddress);
        let bytes = to_bytes(&search, NdrContext::default()).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0x0A]);
    }

    #[test]
    fn test_client_array_roundtrip() {
        let array = DhcpClientInfoArrayVq {
            clients: vec![UniquePtr::new(sample()), UniquePtr::null()].into(),
        };
        for ctx in [NdrContext::default(), NdrContext::big_endian()] {
            let bytes = to_bytes(&array, ctx).unwrap();
            assert_eq!(from_bytes::<DhcpClientInfoArrayVq>(bytes, ctx).unwrap(), array);
        }
    }

    #[test]
    fn test_version_conversions() {
        let vq = sample();
        let v4 = DhcpClientInfoV4::from(vq.clone());
        assert_eq!(v4.client_type, 1);
        let back = DhcpClientInfoVq::from(v4);
        assert_eq!(back.status, QuarantineStatus::NoQuarantine);
        assert_eq!(back.client_name, vq.client_name);

        let plain = DhcpClientInfo::from(vq);
        assert_eq!(plain.client_lease_expires, DateTime::from_filetime(42));
    }
}
