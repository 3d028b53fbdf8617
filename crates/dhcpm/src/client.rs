//! Client stub for `dhcpsrv`

use std::net::SocketAddr;

use bytes::Bytes;
use dcerpc::{DceRpcClient, DceRpcClientConfig, Result, RpcError};
use ndr::{NdrDecode, NdrEncode};
use tokio::net::TcpStream;
use tracing::debug;

use crate::ops::*;
use crate::DHCPSRV_SYNTAX;

/// `dhcpsrv` client over one bound connection.
///
/// Methods return the decoded response whatever its `return_value`; use
/// [`crate::error::check`] to turn a failure status into an error.
pub struct DhcpSrvClient {
    rpc: DceRpcClient,
}

impl DhcpSrvClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_config(addr, DceRpcClientConfig::default()).await
    }

    pub async fn connect_with_config(addr: SocketAddr, config: DceRpcClientConfig) -> Result<Self> {
        let rpc = DceRpcClient::connect_with_config(addr, DHCPSRV_SYNTAX, config).await?;
        Ok(Self { rpc })
    }

    /// Bind over an existing connection
    pub async fn from_stream(stream: TcpStream, config: DceRpcClientConfig) -> Result<Self> {
        let mut rpc = DceRpcClient::from_stream(stream, DHCPSRV_SYNTAX, config);
        rpc.bind().await?;
        Ok(Self { rpc })
    }

    /// Underlying RPC client, for fragment sizes and byte order
    pub fn rpc(&self) -> &DceRpcClient {
        &self.rpc
    }

    async fn invoke<Req, Resp>(&self, opnum: Opnum, request: &Req) -> Result<Resp>
    where
        Req: NdrEncode,
        Resp: NdrDecode + DhcpResponse,
    {
        let stub: Bytes = ndr::to_bytes(request, self.rpc.ndr_context())?;
        let response = self.rpc.call(opnum as u16, stub).await?;
        let decoded: Resp = ndr::from_bytes(response.stub, response.ndr).map_err(RpcError::from)?;
        debug!("{} returned 0x{:08x}", opnum, decoded.return_value());
        Ok(decoded)
    }
}

macro_rules! define_client_methods {
    ($($opnum:literal => $variant:ident, $method:ident, $idl:literal, $req:ident, $resp:ident;)*) => {
        impl DhcpSrvClient {
            $(
                #[doc = $idl]
                pub async fn $method(&self, request: $req) -> Result<$resp> {
                    self.invoke(Opnum::$variant, &request).await
                }
            )*
        }
    };
}

dhcpsrv_operations!(define_client_methods);
