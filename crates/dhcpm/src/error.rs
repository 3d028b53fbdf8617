//! Status codes returned by `dhcpsrv` operations
//!
//! Operations report failure in the `return_value` of their response, not
//! as an RPC fault. These codes are Win32 errors or the DHCP server range
//! starting at 20000.

use dcerpc::RpcError;
use thiserror::Error;

use crate::ops::DhcpResponse;

macro_rules! status_codes {
    ($($name:ident = $code:literal;)*) => {
        $( pub const $name: u32 = $code; )*

        /// Symbolic name of a known status code
        pub fn status_name(code: u32) -> Option<&'static str> {
            match code {
                $( $code => Some(stringify!($name)), )*
                _ => None,
            }
        }
    };
}

status_codes! {
    ERROR_SUCCESS = 0x0000_0000;
    ERROR_FILE_NOT_FOUND = 0x0000_0002;
    ERROR_ACCESS_DENIED = 0x0000_0005;
    ERROR_NOT_ENOUGH_MEMORY = 0x0000_0008;
    ERROR_INVALID_DATA = 0x0000_000D;
    ERROR_NOT_SUPPORTED = 0x0000_0032;
    ERROR_INVALID_PARAMETER = 0x0000_0057;
    ERROR_CALL_NOT_IMPLEMENTED = 0x0000_0078;
    ERROR_MORE_DATA = 0x0000_00EA;
    ERROR_NO_MORE_ITEMS = 0x0000_0103;
    ERROR_DHCP_SUBNET_EXITS = 0x0000_4E24;
    ERROR_DHCP_SUBNET_NOT_PRESENT = 0x0000_4E25;
    ERROR_DHCP_ELEMENT_CANT_REMOVE = 0x0000_4E27;
    ERROR_DHCP_OPTION_EXITS = 0x0000_4E29;
    ERROR_DHCP_OPTION_NOT_PRESENT = 0x0000_4E2A;
    ERROR_DHCP_JET_ERROR = 0x0000_4E2D;
    ERROR_DHCP_CLIENT_EXISTS = 0x0000_4E2E;
    ERROR_DHCP_INVALID_DHCP_CLIENT = 0x0000_4E30;
    ERROR_DHCP_NOT_RESERVED_CLIENT = 0x0000_4E32;
    ERROR_DHCP_RESERVED_CLIENT = 0x0000_4E33;
    ERROR_DHCP_IPRANGE_EXITS = 0x0000_4E35;
    ERROR_DHCP_RESERVEDIP_EXITS = 0x0000_4E36;
    ERROR_DHCP_INVALID_RANGE = 0x0000_4E37;
    ERROR_DHCP_CLASS_NOT_FOUND = 0x0000_4E4C;
    ERROR_DHCP_IPRANGE_CONV_ILLEGAL = 0x0000_4E51;
    ERROR_DHCP_SUBNET_EXISTS = 0x0000_4E54;
    ERROR_SCOPE_RANGE_POLICY_RANGE_CONFLICT = 0x0000_4E90;
    ERROR_DHCP_FO_IPRANGE_TYPE_CONV_ILLEGAL = 0x0000_4EA1;
}

/// Failure of a `dhcpsrv` call, either on the wire or reported by the server
#[derive(Debug, Error)]
pub enum DhcpError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("{}", describe(*.0))]
    Status(u32),
}

fn describe(code: u32) -> String {
    match status_name(code) {
        Some(name) => format!("{} (0x{:08x})", name, code),
        None => format!("status 0x{:08x}", code),
    }
}

impl DhcpError {
    /// `None` for `ERROR_SUCCESS`
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            ERROR_SUCCESS => None,
            code => Some(DhcpError::Status(code)),
        }
    }

    /// Server status, if the call reached the server
    pub fn code(&self) -> Option<u32> {
        match self {
            DhcpError::Status(code) => Some(*code),
            DhcpError::Rpc(_) => None,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        self.code().and_then(status_name)
    }
}

pub type Result<T> = std::result::Result<T, DhcpError>;

/// Turn a response with a failure status into an error.
///
/// `ERROR_MORE_DATA` is a success for enumerations: the response holds a
/// page and the resume handle continues from it.
pub fn check<R: DhcpResponse>(response: R) -> Result<R> {
    match response.return_value() {
        ERROR_SUCCESS | ERROR_MORE_DATA => Ok(response),
        code => Err(DhcpError::Status(code)),
    }
}
