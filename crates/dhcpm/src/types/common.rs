//! Scalar aliases and records shared by every part of the interface

use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ndr::{LpWStr, SizedArray};

/// IPv4 address in host order, as the protocol carries it
pub type DhcpIpAddress = u32;
pub type DhcpIpMask = u32;
pub type DhcpOptionId = u32;
/// Opaque enumeration cursor; 0 starts a new enumeration
pub type DhcpResumeHandle = u32;
/// Client unique identifier (normally the hardware address)
pub type DhcpClientUid = DhcpBinaryData;

/// `DHCP_SRV_HANDLE`
pub type DhcpSrvHandle = LpWStr;

pub fn ipv4(address: DhcpIpAddress) -> Ipv4Addr {
    Ipv4Addr::from(address)
}

pub fn dhcp_ip(address: Ipv4Addr) -> DhcpIpAddress {
    u32::from(address)
}

/// Seconds between 1601-01-01 and 1970-01-01
const FILETIME_UNIX_OFFSET_SECS: u64 = 11_644_473_600;
const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

ndr::ndr_struct! {
    /// `DATE_TIME`: a FILETIME split in two DWORDs
    #[derive(Copy, Eq, Hash)]
    pub struct DateTime {
        pub low_date_time: u32,
        pub high_date_time: u32,
    }

    /// `DWORD_DWORD`
    #[derive(Copy, Eq, Hash)]
    pub struct DwordDword {
        pub dword1: u32,
        pub dword2: u32,
    }

    /// `DHCP_BINARY_DATA`
    #[derive(Eq)]
    pub struct DhcpBinaryData {
        pub data: SizedArray<u8>,
    }

    /// `DHCP_HOST_INFO`
    pub struct DhcpHostInfo {
        pub ip_address: DhcpIpAddress,
        pub net_bios_name: LpWStr,
        pub host_name: LpWStr,
    }
}

impl DateTime {
    /// Lease that never expires (reservations)
    pub const INFINITE: DateTime = DateTime {
        low_date_time: 0xFFFF_FFFF,
        high_date_time: 0x7FFF_FFFF,
    };

    pub fn from_filetime(ticks: u64) -> Self {
        Self {
            low_date_time: ticks as u32,
            high_date_time: (ticks >> 32) as u32,
        }
    }

    /// 100ns intervals since 1601-01-01 UTC
    pub fn filetime(&self) -> u64 {
        (u64::from(self.high_date_time) << 32) | u64::from(self.low_date_time)
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(since) => {
                FILETIME_UNIX_OFFSET_SECS * FILETIME_TICKS_PER_SEC
                    + since.as_secs() * FILETIME_TICKS_PER_SEC
                    + u64::from(since.subsec_nanos()) / 100
            }
            Err(before) => {
                let before = before.duration();
                (FILETIME_UNIX_OFFSET_SECS * FILETIME_TICKS_PER_SEC).saturating_sub(
                    before.as_secs() * FILETIME_TICKS_PER_SEC
                        + u64::from(before.subsec_nanos()) / 100,
                )
            }
        };
        Self::from_filetime(ticks)
    }

    /// `None` for [`DateTime::INFINITE`] and values the platform clock cannot hold
    pub fn to_system_time(&self) -> Option<SystemTime> {
        if *self == Self::INFINITE {
            return None;
        }
        let ticks = self.filetime();
        let epoch = FILETIME_UNIX_OFFSET_SECS * FILETIME_TICKS_PER_SEC;
        let to_duration =
            |t: u64| Duration::new(t / FILETIME_TICKS_PER_SEC, ((t % FILETIME_TICKS_PER_SEC) * 100) as u32);
        if ticks >= epoch {
            UNIX_EPOCH.checked_add(to_duration(ticks - epoch))
        } else {
            UNIX_EPOCH.checked_sub(to_duration(epoch - ticks))
        }
    }
}

impl DhcpBinaryData {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: SizedArray::new(bytes.into()),
        }
    }

    /// Hardware address as a client UID
    pub fn from_mac(mac: &[u8]) -> Self {
        Self::new(mac)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Display for DhcpBinaryData {
    /// Colon-separated hex, the way hardware addresses are shown
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl DhcpHostInfo {
    pub fn new(ip_address: DhcpIpAddress) -> Self {
        Self {
            ip_address,
            ..Default::default()
        }
    }
}

/// `bClientType` values
pub mod client_type {
    pub const UNSPECIFIED: u8 = 0x00;
    pub const DHCP: u8 = 0x01;
    pub const BOOTP: u8 = 0x02;
    pub const BOTH: u8 = 0x03;
    pub const RESERVATION_FLAG: u8 = 0x04;
    pub const NONE: u8 = 0x64;
}
