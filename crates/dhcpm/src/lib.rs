//! MS-DHCPM `dhcpsrv` interface
//!
//! Typed bindings for the DHCP Server Management Protocol carried over the
//! connection-oriented DCE RPC runtime of the `dcerpc` crate:
//!
//! - [`types`]: IDL records, enumerations and unions with their NDR codecs
//! - [`ops`]: request and response parameters of the 51 operations
//! - [`DhcpSrvServer`] and [`create_dhcpsrv_interface`] to serve the interface
//! - [`DhcpSrvClient`] to call it
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dcerpc::DceRpcServer;
//! use dhcpm::{create_dhcpsrv_interface, ops, DhcpSrvClient, DhcpSrvServer};
//!
//! struct Server;
//!
//! #[async_trait::async_trait]
//! impl DhcpSrvServer for Server {
//!     async fn get_version(
//!         &self,
//!         _request: ops::GetVersionRequest,
//!     ) -> dcerpc::Result<ops::GetVersionResponse> {
//!         Ok(ops::GetVersionResponse {
//!             major_version: 10,
//!             minor_version: 0,
//!             return_value: dhcpm::error::ERROR_SUCCESS,
//!         })
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = DceRpcServer::new();
//! server.register_interface(create_dhcpsrv_interface(Arc::new(Server))).await;
//! tokio::spawn(async move { server.run("127.0.0.1:6700".parse().unwrap()).await });
//!
//! let client = DhcpSrvClient::connect("127.0.0.1:6700".parse()?).await?;
//! let version = client.get_version(Default::default()).await?;
//! println!("server version {}.{}", version.major_version, version.minor_version);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod ops;
pub mod server;
pub mod types;

use dcerpc::{SyntaxId, Uuid};

pub use client::DhcpSrvClient;
pub use error::{DhcpError, Result};
pub use ops::{DhcpResponse, Opnum};
pub use server::{create_dhcpsrv_interface, DhcpSrvServer};

pub const DHCPSRV_UUID: &str = "6bffd098-a112-3610-9833-46c3f874532d";
pub const DHCPSRV_VERSION: (u16, u16) = (1, 0);

/// Abstract syntax of `dhcpsrv` 1.0
pub const DHCPSRV_SYNTAX: SyntaxId = SyntaxId::new(
    Uuid::from_fields(
        0x6bffd098,
        0xa112,
        0x3610,
        [0x98, 0x33, 0x46, 0xc3, 0xf8, 0x74, 0x53, 0x2d],
    ),
    DHCPSRV_VERSION.0,
    DHCPSRV_VERSION.1,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_matches_uuid_string() {
        assert_eq!(DHCPSRV_SYNTAX.uuid, Uuid::parse(DHCPSRV_UUID).unwrap());
        assert_eq!(DHCPSRV_SYNTAX, SyntaxId::new(Uuid::parse(DHCPSRV_UUID).unwrap(), 1, 0));
    }
}
