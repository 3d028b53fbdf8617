//! Database consistency scan results

use ndr::SizedArray;

use super::common::DhcpIpAddress;

ndr::ndr_enum! {
    /// `DHCP_SCAN_FLAG`: which store holds the stale entry
    pub enum DhcpScanFlag: u16 {
        #[default]
        RegistryFix = 0,
        DatabaseFix = 1,
    }
}

ndr::ndr_struct! {
    /// `DHCP_SCAN_ITEM`
    #[derive(Copy, Eq)]
    pub struct DhcpScanItem {
        pub ip_address: DhcpIpAddress,
        pub scan_flag: DhcpScanFlag,
    }

    /// `DHCP_SCAN_LIST`
    pub struct DhcpScanList {
        pub scan_items: SizedArray<DhcpScanItem>,
    }
}
