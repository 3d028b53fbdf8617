//! Server configuration records
//!
//! `Set*` requests carry a field mask; only the flagged members of the
//! record are applied.

use ndr::{
    Bool32, LpWStr, NdrAlign, NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter,
};

/// `FieldsToSet` bits of the server configuration calls
pub mod config_fields {
    pub const API_PROTOCOL_SUPPORT: u32 = 0x0000_0001;
    pub const DATABASE_NAME: u32 = 0x0000_0002;
    pub const DATABASE_PATH: u32 = 0x0000_0004;
    pub const BACKUP_PATH: u32 = 0x0000_0008;
    pub const BACKUP_INTERVAL: u32 = 0x0000_0010;
    pub const DATABASE_LOGGING_FLAG: u32 = 0x0000_0020;
    pub const RESTORE_FLAG: u32 = 0x0000_0040;
    pub const DATABASE_CLEANUP_INTERVAL: u32 = 0x0000_0080;
    pub const DEBUG_FLAG: u32 = 0x0000_0100;
    pub const PING_RETRIES: u32 = 0x0000_0200;
    pub const BOOT_FILE_TABLE: u32 = 0x0000_0400;
    pub const AUDIT_LOG_STATE: u32 = 0x0000_0800;
    pub const QUARANTINE_ON: u32 = 0x0000_1000;
    pub const QUARANTINE_DEF_FAIL: u32 = 0x0000_2000;

    /// Fields of the base record
    pub const BASE: u32 = 0x0000_01FF;
    /// Fields of the V4 record
    pub const V4: u32 = 0x0000_0FFF;
    pub const ALL: u32 = 0x0000_3FFF;
}

/// `APIProtocolSupport` bits
pub mod api_protocol {
    pub const RPC_OVER_TCPIP: u32 = 0x1;
    pub const RPC_OVER_NP: u32 = 0x2;
    pub const RPC_OVER_LPC: u32 = 0x4;
    pub const RPC_OVER_ALL: u32 = 0x7;
}

/// `cbBootTableString` with `[size_is(cbBootTableString/2)] WCHAR*
/// wszBootTableString`.
///
/// The byte count is written inline; the pointee is a conformant array of
/// UTF-16 units, without variance or terminator handling, so embedded NULs
/// separating table entries survive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootTableString {
    units: Option<Vec<u16>>,
    byte_count: u32,
}

impl BootTableString {
    pub fn new(table: &str) -> Self {
        let units: Vec<u16> = table.encode_utf16().collect();
        Self {
            byte_count: (units.len() * 2) as u32,
            units: Some(units),
        }
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.units.is_none()
    }

    /// Size in bytes as carried in `cbBootTableString`
    pub fn byte_count(&self) -> u32 {
        self.byte_count
    }

    pub fn to_string_lossy(&self) -> Option<String> {
        self.units.as_deref().map(String::from_utf16_lossy)
    }
}

impl NdrAlign for BootTableString {
    const NDR_ALIGN: usize = 4;
}

impl NdrEncode for BootTableString {
    fn encode_head(&self, w: &mut NdrWriter) -> ndr::Result<()> {
        w.write_u32(self.byte_count);
        w.write_referent(self.units.is_some());
        Ok(())
    }

    fn encode_deferred(&self, w: &mut NdrWriter) -> ndr::Result<()> {
        if let Some(units) = &self.units {
            w.write_conformance(units.len())?;
            for unit in units {
                w.write_u16(*unit);
            }
        }
        Ok(())
    }
}

impl NdrDecode for BootTableString {
    fn decode_head(&mut self, r: &mut NdrReader) -> ndr::Result<()> {
        self.byte_count = r.read_u32()?;
        self.units = match r.read_referent()? {
            0 => None,
            _ => Some(Vec::new()),
        };
        Ok(())
    }

    fn decode_deferred(&mut self, r: &mut NdrReader) -> ndr::Result<()> {
        let expected = (self.byte_count / 2) as usize;
        if let Some(units) = self.units.as_mut() {
            let count = r.read_conformance(2)?;
            if count != expected {
                return Err(NdrError::ArraySizeMismatch {
                    expected,
                    got: count,
                });
            }
            *units = (0..count).map(|_| r.read_u16()).collect::<ndr::Result<Vec<u16>>>()?;
        }
        Ok(())
    }
}

ndr::ndr_struct! {
    /// `DHCP_SERVER_CONFIG_INFO`
    pub struct DhcpServerConfigInfo {
        pub api_protocol_support: u32,
        pub database_name: LpWStr,
        pub database_path: LpWStr,
        pub backup_path: LpWStr,
        pub backup_interval: u32,
        pub database_logging_flag: u32,
        pub restore_flag: u32,
        pub database_cleanup_interval: u32,
        pub debug_flag: u32,
    }

    /// `DHCP_SERVER_CONFIG_INFO_V4`
    pub struct DhcpServerConfigInfoV4 {
        pub api_protocol_support: u32,
        pub database_name: LpWStr,
        pub database_path: LpWStr,
        pub backup_path: LpWStr,
        pub backup_interval: u32,
        pub database_logging_flag: u32,
        pub restore_flag: u32,
        pub database_cleanup_interval: u32,
        pub debug_flag: u32,
        pub ping_retries: u32,
        pub boot_table: BootTableString,
        pub audit_log: Bool32,
    }

    /// `DHCP_SERVER_CONFIG_INFO_VQ`
    pub struct DhcpServerConfigInfoVq {
        pub api_protocol_support: u32,
        pub database_name: LpWStr,
        pub database_path: LpWStr,
        pub backup_path: LpWStr,
        pub backup_interval: u32,
        pub database_logging_flag: u32,
        pub restore_flag: u32,
        pub database_cleanup_interval: u32,
        pub debug_flag: u32,
        pub ping_retries: u32,
        pub boot_table: BootTableString,
        pub audit_log: Bool32,
        pub quarantine_on: Bool32,
        pub quar_def_fail: u32,
        pub quar_runtime_status: Bool32,
    }
}

impl DhcpServerConfigInfoVq {
    /// Copy the members flagged in `fields` from `update`
    pub fn apply(&mut self, fields: u32, update: &DhcpServerConfigInfoVq) {
        use config_fields::*;

        macro_rules! set {
            ($flag:expr, $($field:ident),+) => {
                if fields & $flag != 0 {
                    $( self.$field = update.$field.clone(); )+
                }
            };
        }

        set!(API_PROTOCOL_SUPPORT, api_protocol_support);
        set!(DATABASE_NAME, database_name);
        set!(DATABASE_PATH, database_path);
        set!(BACKUP_PATH, backup_path);
        set!(BACKUP_INTERVAL, backup_interval);
        set!(DATABASE_LOGGING_FLAG, database_logging_flag);
        set!(RESTORE_FLAG, restore_flag);
        set!(DATABASE_CLEANUP_INTERVAL, database_cleanup_interval);
        set!(DEBUG_FLAG, debug_flag);
        set!(PING_RETRIES, ping_retries);
        set!(BOOT_FILE_TABLE, boot_table);
        set!(AUDIT_LOG_STATE, audit_log);
        set!(QUARANTINE_ON, quarantine_on);
        set!(QUARANTINE_DEF_FAIL, quar_def_fail);
    }
}

impl From<DhcpServerConfigInfo> for DhcpServerConfigInfoVq {
    fn from(info: DhcpServerConfigInfo) -> Self {
        Self {
            api_protocol_support: info.api_protocol_support,
            database_name: info.database_name,
            database_path: info.database_path,
            backup_path: info.backup_path,
            backup_interval: info.backup_interval,
            database_logging_flag: info.database_logging_flag,
            restore_flag: info.restore_flag,
            database_cleanup_interval: info.database_cleanup_interval,
            debug_flag: info.debug_flag,
            ..Default::default()
        }
    }
}

impl From<DhcpServerConfigInfoV4> for DhcpServerConfigInfoVq {
    fn from(info: DhcpServerConfigInfoV4) -> Self {
        Self {
            api_protocol_support: info.api_protocol_support,
            database_name: info.database_name,
            database_path: info.database_path,
            backup_path: info.backup_path,
            backup_interval: info.backup_interval,
            database_logging_flag: info.database_logging_flag,
            restore_flag: info.restore_flag,
            database_cleanup_interval: info.database_cleanup_interval,
            debug_flag: info.debug_flag,
            ping_retries: info.ping_retries,
            boot_table: info.boot_table,
            audit_log: info.audit_log,
            ..Default::default()
        }
    }
}

impl From<DhcpServerConfigInfoVq> for DhcpServerConfigInfo {
    fn from(vq: DhcpServerConfigInfoVq) -> Self {
        Self {
            api_protocol_support: vq.api_protocol_support,
            database_name: vq.database_name,
            database_path: vq.database_path,
            backup_path: vq.backup_path,
            backup_interval: vq.backup_interval,
            database_logging_flag: vq.database_logging_flag,
            restore_flag: vq.restore_flag,
            database_cleanup_interval: vq.database_cleanup_interval,
            debug_flag: vq.debug_flag,
        }
    }
}

impl From<DhcpServerConfigInfoVq> for DhcpServerConfigInfoV4 {
    fn from(vq: DhcpServerConfigInfoVq) -> Self {
        Self {
            api_protocol_support: vq.api_protocol_support,
            database_name: vq.database_name,
            database_path: vq.database_path,
            backup_path: vq.backup_path,
            backup_interval: vq.backup_interval,
            database_logging_flag: vq.database_logging_flag,
            restore_flag: vq.restore_flag,
            database_cleanup_interval: vq.database_cleanup_interval,
            debug_flag: vq.debug_flag,
            ping_retries: vq.ping_retries,
            boot_table: vq.boot_table,
            audit_log: vq.audit_log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndr::{from_bytes, to_bytes, Bytes, NdrContext};

    #[test]
    fn test_boot_table_wire() {
        let table = BootTableString::new("a\0b");
        assert_eq!(table.byte_count(), 6);
        let bytes = to_bytes(&table, NdrContext::default()).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                6, 0, 0, 0, 0x00, 0x00, 0x02, 0x00, // cbBootTableString, referent
                3, 0, 0, 0, b'a', 0, 0, 0, b'b', 0,
            ]
        );
        let decoded = from_bytes::<BootTableString>(bytes, NdrContext::default()).unwrap();
        assert_eq!(decoded.to_string_lossy().as_deref(), Some("a\0b"));
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_boot_table_count_mismatch() {
        let bytes = Bytes::from_static(&[8, 0, 0, 0, 0, 0, 2, 0, 3, 0, 0, 0, 1, 0, 2, 0, 3, 0]);
        assert!(matches!(
            from_bytes::<BootTableString>(bytes, NdrContext::default()),
            Err(NdrError::ArraySizeMismatch { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn test_config_v4_roundtrip() {
        let config = DhcpServerConfigInfoV4 {
            api_protocol_support: api_protocol::RPC_OVER_ALL,
            database_name: "dhcp.mdb".into(),
            database_path: "C:\\dhcp".into(),
            backup_path: LpWStr::null(),
            backup_interval: 60,
            ping_retries: 2,
            boot_table: BootTableString::new("pxe,boot.com,tftp"),
            audit_log: Bool32(true),
            ..Default::default()
        };
        for ctx in [NdrContext::default(), NdrContext::big_endian()] {
            let bytes = to_bytes(&config, ctx).unwrap();
            assert_eq!(from_bytes::<DhcpServerConfigInfoV4>(bytes, ctx).unwrap(), config);
        }
    }

    #[test]
    fn test_apply_masked_fields() {
        let mut current = DhcpServerConfigInfoVq {
            backup_interval: 60,
            ping_retries: 0,
            database_name: "dhcp.mdb".into(),
            ..Default::default()
        };
        let update = DhcpServerConfigInfoVq {
            backup_interval: 15,
            ping_retries: 5,
            database_name: "other.mdb".into(),
            ..Default::default()
        };
        current.apply(config_fields::PING_RETRIES, &update);
        assert_eq!(current.ping_retries, 5);
        assert_eq!(current.backup_interval, 60);
        assert_eq!(current.database_name.as_str(), Some("dhcp.mdb"));

        current.apply(config_fields::ALL, &update);
        assert_eq!(current, update);
    }
}
