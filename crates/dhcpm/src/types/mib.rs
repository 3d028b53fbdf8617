//! Server statistics

use ndr::SizedArray;

use super::common::{DateTime, DhcpIpAddress};

ndr::ndr_struct! {
    /// `SCOPE_MIB_INFO`
    #[derive(Copy, Eq)]
    pub struct ScopeMibInfo {
        pub subnet: DhcpIpAddress,
        pub num_addresses_inuse: u32,
        pub num_addresses_free: u32,
        pub num_pending_offers: u32,
    }

    /// `SCOPE_MIB_INFO_VQ`
    #[derive(Copy, Eq)]
    pub struct ScopeMibInfoVq {
        pub subnet: DhcpIpAddress,
        pub num_addresses_inuse: u32,
        pub num_addresses_free: u32,
        pub num_pending_offers: u32,
        pub qtn_num_leases: u32,
        pub qtn_pct_qtn_leases: u32,
        pub qtn_probation_leases: u32,
        pub qtn_non_qtn_leases: u32,
        pub qtn_exempt_leases: u32,
        pub qtn_capable_clients: u32,
    }

    /// `DHCP_MIB_INFO`
    pub struct DhcpMibInfo {
        pub discovers: u32,
        pub offers: u32,
        pub requests: u32,
        pub acks: u32,
        pub naks: u32,
        pub declines: u32,
        pub releases: u32,
        pub server_start_time: DateTime,
        pub scope_info: SizedArray<ScopeMibInfo>,
    }

    /// `DHCP_MIB_INFO_VQ`
    pub struct DhcpMibInfoVq {
        pub discovers: u32,
        pub offers: u32,
        pub requests: u32,
        pub acks: u32,
        pub naks: u32,
        pub declines: u32,
        pub releases: u32,
        pub server_start_time: DateTime,
        pub qtn_num_leases: u32,
        pub qtn_pct_qtn_leases: u32,
        pub qtn_probation_leases: u32,
        pub qtn_non_qtn_leases: u32,
        pub qtn_exempt_leases: u32,
        pub qtn_capable_clients: u32,
        pub qtn_ias_errors: u32,
        pub scope_info: SizedArray<ScopeMibInfoVq>,
    }
}

impl From<ScopeMibInfoVq> for ScopeMibInfo {
    fn from(vq: ScopeMibInfoVq) -> Self {
        Self {
            subnet: vq.subnet,
            num_addresses_inuse: vq.num_addresses_inuse,
            num_addresses_free: vq.num_addresses_free,
            num_pending_offers: vq.num_pending_offers,
        }
    }
}

impl From<DhcpMibInfoVq> for DhcpMibInfo {
    fn from(vq: DhcpMibInfoVq) -> Self {
        Self {
            discovers: vq.discovers,
            offers: vq.offers,
            requests: vq.requests,
            acks: vq.acks,
            naks: vq.naks,
            declines: vq.declines,
            releases: vq.releases,
            server_start_time: vq.server_start_time,
            scope_info: vq.scope_info.into_iter().map(ScopeMibInfo::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndr::{from_bytes, to_bytes, NdrContext};

    #[test]
    fn test_mib_golden() {
        let mib = DhcpMibInfo {
            discovers: 1,
            acks: 2,
            server_start_time: DateTime::from_filetime(3),
            scope_info: vec![ScopeMibInfo {
                subnet: 0x0A000000,
                num_addresses_inuse: 4,
                num_addresses_free: 5,
                num_pending_offers: 6,
            }]
            .into(),
            ..Default::default()
        };
        let bytes = to_bytes(&mib, NdrContext::default()).unwrap();
        assert_eq!(bytes.len(), 44 + 4 + 16);
        assert_eq!(&bytes[36..44], &[1, 0, 0, 0, 0x00, 0x00, 0x02, 0x00]);
        assert_eq!(&bytes[44..52], &[1, 0, 0, 0, 0, 0, 0, 0x0A]);
        assert_eq!(from_bytes::<DhcpMibInfo>(bytes, NdrContext::default()).unwrap(), mib);
    }

    #[test]
    fn test_vq_downgrade() {
        let vq = DhcpMibInfoVq {
            offers: 9,
            qtn_ias_errors: 1,
            scope_info: vec![ScopeMibInfoVq {
                subnet: 7,
                qtn_num_leases: 3,
                ..Default::default()
            }]
            .into(),
            ..Default::default()
        };
        let plain = DhcpMibInfo::from(vq);
        assert_eq!(plain.offers, 9);
        assert_eq!(plain.scope_info[0].subnet, 7);
    }
}
